/// Busy-wait pacing for the driver's polling loops.
///
/// The transceiver has no interrupt line on this bus, so every wait is a
/// spin. Spin counts are tuning values for the target clock, not wall-clock
/// units; injecting the strategy lets tests substitute instant timing.
pub trait Delay {
    /// Burn roughly `spins` loop iterations
    fn pause(&mut self, spins: u32);
}

/// Spin-loop delay calibrated in raw loop iterations
#[derive(Debug, Default, Clone, Copy)]
pub struct SpinDelay;

impl Delay for SpinDelay {
    fn pause(&mut self, spins: u32) {
        for _ in 0..spins {
            std::hint::spin_loop();
        }
    }
}
