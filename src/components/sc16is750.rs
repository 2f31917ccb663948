/// SC16IS750 I2C-UART IR transceiver driver
///
/// This module drives the SC16IS750 bridge that fronts the infrared link.
/// The part is a 16550-style UART reachable only through its I2C register
/// file: no interrupt line is wired, so all sequencing is polled. Bring-up,
/// session bracketing, and the transmit/receive protocol are register-write
/// sequences whose order the hardware is sensitive to.
///
/// Example usage:
/// ```no_run
/// use ir_station::bus::LinuxI2cBus;
/// use ir_station::components::sc16is750::Sc16is750;
///
/// let bus = LinuxI2cBus::new("/dev/i2c-1", 0x4D)?;
/// let mut ir = Sc16is750::new(bus);
/// ir.begin_session()?;
/// ir.send(&[0x01, 0x02, 0x03])?;
/// let count = ir.recv()?;
/// let reply = &ir.rx_buffer()[..count];
/// ir.end_session()?;
/// # anyhow::Ok(())
/// ```

use anyhow::{bail, Result};
use tracing::{debug, info, trace};

use crate::bus::RegisterBus;
use crate::delay::{Delay, SpinDelay};

// Register subaddresses as seen on the I2C bus (datasheet register << 3)
const REG_FIFO: u8 = 0x00; // Receive / transmit holding register
const REG_DLL: u8 = 0x00; // Baud divisor latch low (LCR[7] set)
const REG_IER: u8 = 0x08; // Interrupt enable register
const REG_DLH: u8 = 0x08; // Baud divisor latch high (LCR[7] set)
const REG_FCR: u8 = 0x10; // FIFO control register
const REG_LCR: u8 = 0x18; // Line control register
const REG_LSR: u8 = 0x28; // Line status register
const REG_TXLVL: u8 = 0x40; // Transmit FIFO free-space level
const REG_RXLVL: u8 = 0x48; // Receive FIFO fill level
const REG_IOSTATE: u8 = 0x58; // IO pin state register
const REG_EFCR: u8 = 0x78; // Extra features control register

// Control values
const LCR_8N1: u8 = 0x03; // 8 data bits, no parity, 1 stop bit
const LCR_DIVISOR_LATCH: u8 = 0x80; // divisor latch access bit
const FCR_RESET_ENABLE: u8 = 0x07; // reset both FIFOs, FIFO enabled
const FCR_RESET_DISABLE: u8 = 0x06; // reset both FIFOs, FIFO disabled
const EFCR_DISABLE_BOTH: u8 = 0x06; // transmitter and receiver off
const EFCR_TX_MODE: u8 = 0x02; // transmitter on, receiver off
const EFCR_RX_MODE: u8 = 0x04; // receiver on, transmitter off
const IER_SLEEP: u8 = 0x10; // sleep mode enable
const LSR_TX_IDLE: u8 = 0x40; // THR and TSR both empty
const IOSTATE_IDLE: u8 = 0x01;

// Termination bound for the flush loop under a stuck level register
const FLUSH_MAX_ROUNDS: usize = 32;

/// Largest payload the link carries; receives are capped here
pub const IR_PAYLOAD_MAX: usize = 136;

/// Transmit FIFO depth; payloads up to this size go out in one burst
pub const TX_FIFO_CAPACITY: usize = 64;

/// Baud divisor for the IR carrier rate on the target clock
pub const BAUD_DIVISOR: u16 = 10;

/// Settle delay after hard-stopping the transceiver, in spin units
pub const SETTLE_SPINS: u32 = 20_000;

/// Per-iteration pause while polling the receive level, in spin units
pub const POLL_SPINS: u32 = 300;

/// Short receive budget, in polling iterations: used once a stream has
/// started and for unsolicited receive polls
pub const RX_MAX_WAIT: u16 = 40;

/// Long receive budget used right after a transmit, allowing the far end
/// time to process and respond
pub const RX_POST_TX_WAIT: u16 = 1000;

/// Timing and divisor tuning values
///
/// These are clock- and hardware-specific; the defaults match the observed
/// target configuration. Override them for units on a different clock.
#[derive(Debug, Clone, Copy)]
pub struct Tuning {
    pub baud_divisor: u16,
    pub settle_spins: u32,
    pub poll_spins: u32,
    pub rx_max_wait: u16,
    pub rx_post_tx_wait: u16,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            baud_divisor: BAUD_DIVISOR,
            settle_spins: SETTLE_SPINS,
            poll_spins: POLL_SPINS,
            rx_max_wait: RX_MAX_WAIT,
            rx_post_tx_wait: RX_POST_TX_WAIT,
        }
    }
}

/// SC16IS750 IR transceiver driver
///
/// Owns the receive buffer and the one-shot bring-up guard. Callers must
/// bracket every send/recv exchange between `begin_session` and
/// `end_session` and serialize their own access; the driver is strictly
/// synchronous and holds no lock.
pub struct Sc16is750<B, D = SpinDelay> {
    bus: B,
    delay: D,
    tuning: Tuning,
    buffer: [u8; IR_PAYLOAD_MAX],
    pending: usize,
    initialized: bool,
}

impl<B: RegisterBus> Sc16is750<B> {
    /// Create a driver over the given register bus with default tuning
    pub fn new(bus: B) -> Self {
        Self::with_parts(bus, SpinDelay, Tuning::default())
    }
}

impl<B: RegisterBus, D: Delay> Sc16is750<B, D> {
    /// Create a driver with an explicit delay strategy and tuning
    pub fn with_parts(bus: B, delay: D, tuning: Tuning) -> Self {
        Self {
            bus,
            delay,
            tuning,
            buffer: [0; IR_PAYLOAD_MAX],
            pending: 0,
            initialized: false,
        }
    }

    /// Bytes collected by the most recent receive
    ///
    /// A receive call returning `count` makes indices `[0, count)` valid;
    /// everything past that is stale.
    pub fn rx_buffer(&self) -> &[u8] {
        &self.buffer
    }

    /// One-time hardware bring-up
    ///
    /// Hard-stops the transceiver, programs the baud divisor and 8N1
    /// framing, then re-arms the receiver. The whole sequence is
    /// fire-and-forget: the part latches writes without a readable
    /// handshake, and the order below is what the hardware tolerates.
    pub fn initialize_hardware(&mut self) -> Result<()> {
        // Hard stop + clear
        self.bus.write_byte(REG_EFCR, EFCR_DISABLE_BOTH)?;
        self.bus.write_byte(REG_FCR, 0x00)?;
        self.bus.write_byte(REG_IER, 0x00)?;
        self.bus.write_byte(REG_IOSTATE, 0x00)?;

        self.delay.pause(self.tuning.settle_spins);

        self.write_divisor()?;

        // Re-arm RX
        self.bus.write_byte(REG_FCR, FCR_RESET_ENABLE)?;
        self.bus.write_byte(REG_EFCR, EFCR_RX_MODE)?;

        self.delay.pause(self.tuning.settle_spins);
        self.flush_receive_fifo()?;

        // Some units only latch the divisor on a second programming pass,
        // so repeat the write and re-arm. Not redundant.
        self.write_divisor()?;

        self.bus.write_byte(REG_FCR, FCR_RESET_ENABLE)?;
        self.bus.write_byte(REG_EFCR, EFCR_RX_MODE)?;
        self.flush_receive_fifo()?;

        info!("SC16IS750 bring-up complete (divisor = {})", self.tuning.baud_divisor);
        Ok(())
    }

    /// Program the baud divisor with known-good 8N1 framing
    fn write_divisor(&mut self) -> Result<()> {
        let [low, high] = self.tuning.baud_divisor.to_le_bytes();

        // Force 8N1 with the divisor latch closed, then open it for DLL/DLH
        self.bus.write_byte(REG_LCR, LCR_8N1)?;
        self.bus.write_byte(REG_LCR, LCR_8N1 | LCR_DIVISOR_LATCH)?;

        self.bus.write_byte(REG_DLL, low)?;
        self.bus.write_byte(REG_DLH, high)?;

        // Back to 8N1, latch closed
        self.bus.write_byte(REG_LCR, LCR_8N1)?;
        Ok(())
    }

    /// Drain buffered-but-unread bytes without exposing them
    ///
    /// Bounded so a stuck level register cannot hang the caller.
    fn flush_receive_fifo(&mut self) -> Result<()> {
        let mut scratch = [0u8; TX_FIFO_CAPACITY];

        for _ in 0..FLUSH_MAX_ROUNDS {
            let level = self.bus.read_byte(REG_RXLVL)? as usize;
            if level == 0 {
                break;
            }
            let take = level.min(scratch.len());
            self.bus.read_burst(REG_FIFO, &mut scratch[..take])?;
        }
        Ok(())
    }

    /// Start a communication session
    ///
    /// Runs bring-up on the first call only, then wakes the part, resets
    /// the FIFO, and arms the receiver. Any unread payload from a previous
    /// session is discarded.
    pub fn begin_session(&mut self) -> Result<()> {
        if !self.initialized {
            self.initialize_hardware()?;
            self.initialized = true;
        }

        // Disable sleep mode
        self.bus.write_byte(REG_IER, 0x00)?;
        // IO state must be 0 while the link is active
        self.bus.write_byte(REG_IOSTATE, 0x00)?;
        // Reset and enable FIFO
        self.bus.write_byte(REG_FCR, FCR_RESET_ENABLE)?;
        // Ensure we are listening
        self.bus.write_byte(REG_EFCR, EFCR_RX_MODE)?;

        self.pending = 0;

        debug!("IR session started");
        Ok(())
    }

    /// End a communication session and let the part sleep
    ///
    /// Safe to call without a matching `begin_session`; it only writes
    /// known registers.
    pub fn end_session(&mut self) -> Result<()> {
        // Reset and disable FIFO
        self.bus.write_byte(REG_FCR, FCR_RESET_DISABLE)?;
        // Enable sleep mode
        self.bus.write_byte(REG_IER, IER_SLEEP)?;
        self.bus.write_byte(REG_IOSTATE, IOSTATE_IDLE)?;

        debug!("IR session ended");
        Ok(())
    }

    /// Transmit a payload, then listen for the reply
    ///
    /// Payloads up to the FIFO depth go out in a single burst; longer ones
    /// are chunked against the reported free space so the FIFO never
    /// overflows. After the line turns around, a receive with the long
    /// budget runs immediately and its count is cached for the next
    /// `recv`. The wait for the transmitter to drain has no timeout: a
    /// stuck unit stalls the caller here.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > IR_PAYLOAD_MAX {
            bail!(
                "payload of {} bytes exceeds the {} byte link maximum",
                payload.len(),
                IR_PAYLOAD_MAX
            );
        }

        // Enable transmitter / disable receiver
        self.bus.write_byte(REG_EFCR, EFCR_TX_MODE)?;

        if payload.len() <= TX_FIFO_CAPACITY {
            self.bus.write_burst(REG_FIFO, payload)?;
        } else {
            let mut offset = 0;
            while offset < payload.len() {
                let free = self.bus.read_byte(REG_TXLVL)? as usize;
                if free == 0 {
                    continue;
                }
                let take = free.min(payload.len() - offset);
                self.bus.write_burst(REG_FIFO, &payload[offset..offset + take])?;
                offset += take;
            }
        }

        // Wait until THR and TSR are both empty before turning the line around
        while (self.bus.read_byte(REG_LSR)? & LSR_TX_IDLE) == 0 {}

        // Enable receiver / disable transmitter
        self.bus.write_byte(REG_EFCR, EFCR_RX_MODE)?;

        let count = self.receive_with_timeout(self.tuning.rx_post_tx_wait)?;

        // Keep the receiver enabled
        self.bus.write_byte(REG_EFCR, EFCR_RX_MODE)?;

        self.pending = count;

        trace!("sent {} bytes, {} byte reply buffered", payload.len(), count);
        Ok(())
    }

    /// Poll for received data
    ///
    /// A count cached by a prior `send` is consumed and returned at most
    /// once, without touching the bus. Otherwise the receiver is re-armed
    /// and a fresh short-budget receive runs; 0 means no data arrived
    /// within budget, not a hard error.
    pub fn recv(&mut self) -> Result<usize> {
        if self.pending > 0 {
            let count = self.pending;
            self.pending = 0;
            return Ok(count);
        }

        // Reset and enable FIFO, make sure the receiver is armed
        self.bus.write_byte(REG_FCR, FCR_RESET_ENABLE)?;
        self.bus.write_byte(REG_EFCR, EFCR_RX_MODE)?;

        self.receive_with_timeout(self.tuning.rx_max_wait)
    }

    /// Poll the receive level and drain the FIFO until the buffer fills or
    /// the budget expires with nothing waiting
    ///
    /// The first wait honors the caller's budget; once bytes start
    /// arriving, every subsequent wait drops to the short budget — a gap in
    /// a stream that has started means end-of-message. Each drain is
    /// clamped to remaining capacity, so the reported level can never push
    /// the total past the buffer.
    fn receive_with_timeout(&mut self, budget: u16) -> Result<usize> {
        let mut total = 0;
        let mut budget = budget;

        loop {
            let mut waited = 0;
            let mut level = self.bus.read_byte(REG_RXLVL)?;
            while level == 0 && waited < budget {
                self.delay.pause(self.tuning.poll_spins);
                waited += 1;
                level = self.bus.read_byte(REG_RXLVL)?;
            }
            if level == 0 {
                // Budget expired with nothing buffered
                break;
            }
            budget = self.tuning.rx_max_wait;

            let take = (level as usize).min(IR_PAYLOAD_MAX - total);
            self.bus.read_burst(REG_FIFO, &mut self.buffer[total..total + take])?;
            total += take;

            if total >= IR_PAYLOAD_MAX {
                break;
            }
        }

        Ok(total)
    }
}
