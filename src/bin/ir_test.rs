/// SC16IS750 IR Link Test and Debug Tool
///
/// This tool helps diagnose issues with the I2C-attached IR transceiver.
/// It tests I2C connectivity, reads status registers, and runs a full
/// bring-up plus session bracket with a receive poll.

use anyhow::Result;

#[cfg(any(target_os = "linux", target_os = "android"))]
use ir_station::bus::{LinuxI2cBus, RegisterBus};
#[cfg(any(target_os = "linux", target_os = "android"))]
use ir_station::components::sc16is750::Sc16is750;

#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_BUS: &str = "/dev/i2c-1";
#[cfg(any(target_os = "linux", target_os = "android"))]
const IR_ADDR: u16 = 0x4D;

// Register subaddresses probed raw before the driver takes over
#[cfg(any(target_os = "linux", target_os = "android"))]
const REG_LSR: u8 = 0x28;
#[cfg(any(target_os = "linux", target_os = "android"))]
const REG_RXLVL: u8 = 0x48;
#[cfg(any(target_os = "linux", target_os = "android"))]
const REG_IOSTATE: u8 = 0x58;

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() -> Result<()> {
    println!("====================================");
    println!("  SC16IS750 IR Link Diagnostic Tool");
    println!("====================================\n");

    println!("Configuration:");
    println!("  I2C Bus: {}", I2C_BUS);
    println!("  Transceiver Address: 0x{:02X}\n", IR_ADDR);

    println!("Testing transceiver (0x{:02X})...", IR_ADDR);
    match test_transceiver(I2C_BUS, IR_ADDR) {
        Ok(_) => println!("✓ Transceiver test passed\n"),
        Err(e) => println!("✗ Transceiver test failed: {}\n", e),
    }

    println!("\nStarting receive poll test...");
    println!("Point a paired unit at the receiver (Press Ctrl+C to stop)\n");

    let bus = LinuxI2cBus::new(I2C_BUS, IR_ADDR)?;
    let mut ir = Sc16is750::new(bus);
    ir.begin_session()?;

    for i in 0..20 {
        let count = ir.recv()?;
        if count > 0 {
            print!("Poll {:3}: {} bytes:", i + 1, count);
            for byte in &ir.rx_buffer()[..count] {
                print!(" {:02X}", byte);
            }
            println!();
        } else {
            println!("Poll {:3}: no data", i + 1);
        }
    }

    ir.end_session()?;

    println!("\n✓ Test completed successfully!");
    println!("If polls report data, the link is working correctly.");
    println!("If every poll reports no data, check:");
    println!("  - I2C bus permissions (try: sudo chmod 666 /dev/i2c-1)");
    println!("  - Wiring connections (SDA, SCL, VDD, GND, IRQ left floating)");
    println!("  - Pull-up resistors on I2C lines (typically 4.7kΩ)");
    println!("  - Crystal frequency (the baud divisor assumes the stock clock)");

    Ok(())
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn test_transceiver(bus: &str, address: u16) -> Result<()> {
    // Test 1: Open device
    print!("  [1/4] Opening I2C device... ");
    let mut raw = LinuxI2cBus::new(bus, address)?;
    println!("OK");

    // Test 2: Line status register should be readable
    print!("  [2/4] Reading line status register... ");
    let lsr = raw.read_byte(REG_LSR)?;
    println!("OK (0x{:02X})", lsr);

    // Test 3: Level and IO state registers
    print!("  [3/4] Reading RX level and IO state... ");
    let rxlvl = raw.read_byte(REG_RXLVL)?;
    let iostate = raw.read_byte(REG_IOSTATE)?;
    println!("OK (RXLVL={}, IOSTATE=0x{:02X})", rxlvl, iostate);

    // Test 4: Full bring-up plus one unsolicited receive poll
    print!("  [4/4] Running bring-up and session bracket... ");
    let mut ir = Sc16is750::new(LinuxI2cBus::new(bus, address)?);
    ir.begin_session()?;
    let count = ir.recv()?;
    ir.end_session()?;
    println!("OK");
    println!("       Unsolicited poll returned {} bytes", count);

    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {
    eprintln!("ERROR: This program requires Linux with I2C support.");
    std::process::exit(1);
}
