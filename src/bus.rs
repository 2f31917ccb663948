/// Register bus transport for the IR transceiver
///
/// The SC16IS750 exposes its UART register file through an I2C slave
/// interface: each access names a register subaddress, and the FIFO
/// register supports sequential burst transfers.

use anyhow::Result;

#[cfg(any(target_os = "linux", target_os = "android"))]
use anyhow::Context;

#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cdev::core::I2CDevice;
#[cfg(any(target_os = "linux", target_os = "android"))]
use i2cdev::linux::LinuxI2CDevice;

/// Byte-oriented access to a peripheral's register space.
///
/// Burst operations target FIFO-style registers: reads consume from the
/// hardware FIFO, writes queue into it.
pub trait RegisterBus {
    /// Read a single register
    fn read_byte(&mut self, addr: u8) -> Result<u8>;

    /// Write a single register
    fn write_byte(&mut self, addr: u8, value: u8) -> Result<()>;

    /// Read `buf.len()` sequential bytes from a FIFO-style register
    fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<()>;

    /// Write bytes sequentially into a FIFO-style register
    fn write_burst(&mut self, addr: u8, data: &[u8]) -> Result<()>;
}

/// Register bus over a Linux I2C character device
#[cfg(any(target_os = "linux", target_os = "android"))]
pub struct LinuxI2cBus {
    device: LinuxI2CDevice,
    address: u16,
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl LinuxI2cBus {
    /// Open the transceiver's I2C device node
    ///
    /// # Arguments
    /// * `bus` - I2C bus path (e.g., "/dev/i2c-1")
    /// * `address` - 7-bit I2C address of the transceiver
    pub fn new(bus: &str, address: u16) -> Result<Self> {
        let device = LinuxI2CDevice::new(bus, address)
            .with_context(|| format!("Failed to open I2C device {} at address 0x{:02X}", bus, address))?;

        Ok(Self { device, address })
    }

    /// Get the I2C address of this device
    pub fn address(&self) -> u16 {
        self.address
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
impl RegisterBus for LinuxI2cBus {
    fn read_byte(&mut self, addr: u8) -> Result<u8> {
        let value = self.device.smbus_read_byte_data(addr)
            .with_context(|| format!("Failed to read register 0x{:02X}", addr))?;
        Ok(value)
    }

    fn write_byte(&mut self, addr: u8, value: u8) -> Result<()> {
        self.device.smbus_write_byte_data(addr, value)
            .with_context(|| format!("Failed to write register 0x{:02X}", addr))?;
        Ok(())
    }

    fn read_burst(&mut self, addr: u8, buf: &mut [u8]) -> Result<()> {
        // SMBus block transfers cap at 32 bytes and FIFO bursts reach 64,
        // so set the register pointer and read sequentially instead.
        self.device.write(&[addr])
            .with_context(|| format!("Failed to select register 0x{:02X}", addr))?;
        self.device.read(buf)
            .with_context(|| format!("Failed to burst-read {} bytes from register 0x{:02X}", buf.len(), addr))?;
        Ok(())
    }

    fn write_burst(&mut self, addr: u8, data: &[u8]) -> Result<()> {
        let mut frame = Vec::with_capacity(1 + data.len());
        frame.push(addr);
        frame.extend_from_slice(data);

        self.device.write(&frame)
            .with_context(|| format!("Failed to burst-write {} bytes to register 0x{:02X}", data.len(), addr))?;
        Ok(())
    }
}

/// Stub implementation for non-Linux platforms
#[cfg(not(any(target_os = "linux", target_os = "android")))]
pub struct LinuxI2cBus {
    _address: u16,
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl LinuxI2cBus {
    pub fn new(_bus: &str, address: u16) -> Result<Self> {
        Ok(Self { _address: address })
    }

    pub fn address(&self) -> u16 {
        self._address
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
impl RegisterBus for LinuxI2cBus {
    fn read_byte(&mut self, _addr: u8) -> Result<u8> {
        anyhow::bail!("I2C register access is only supported on Linux/Android")
    }

    fn write_byte(&mut self, _addr: u8, _value: u8) -> Result<()> {
        anyhow::bail!("I2C register access is only supported on Linux/Android")
    }

    fn read_burst(&mut self, _addr: u8, _buf: &mut [u8]) -> Result<()> {
        anyhow::bail!("I2C register access is only supported on Linux/Android")
    }

    fn write_burst(&mut self, _addr: u8, _data: &[u8]) -> Result<()> {
        anyhow::bail!("I2C register access is only supported on Linux/Android")
    }
}
