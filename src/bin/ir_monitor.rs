/// IR Link Receive Monitor
///
/// Continuously polls the IR transceiver for unsolicited payloads and
/// prints them as hex rows. Lifecycle events go to tracing (stdout plus a
/// rolling file), data rows to stdout.

use anyhow::Result;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::fmt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(any(target_os = "linux", target_os = "android"))]
use ir_station::bus::LinuxI2cBus;
#[cfg(any(target_os = "linux", target_os = "android"))]
use ir_station::components::sc16is750::Sc16is750;

#[cfg(any(target_os = "linux", target_os = "android"))]
const I2C_BUS: &str = "/dev/i2c-1";
#[cfg(any(target_os = "linux", target_os = "android"))]
const IR_ADDR: u16 = 0x4D;

/// Pause between receive polls; the driver's own short budget bounds the
/// time spent inside each poll
#[cfg(any(target_os = "linux", target_os = "android"))]
const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[cfg(any(target_os = "linux", target_os = "android"))]
fn main() -> Result<()> {
    // Create a log layer for file output
    #[cfg(target_os = "linux")]
    let log_dir = "/tmp/ir-station/logs";
    #[cfg(not(target_os = "linux"))]
    let log_dir = "logs";

    let file_appender = tracing_appender::rolling::hourly(log_dir, "ir-monitor.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false); // Disable colors in file

    // Create a log layer for stdout
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Combine both layers and enable logging
    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .init();

    info!("Initializing IR transceiver on {} at 0x{:02X}...", I2C_BUS, IR_ADDR);

    let bus = LinuxI2cBus::new(I2C_BUS, IR_ADDR)?;
    let mut ir = Sc16is750::new(bus);
    ir.begin_session()?;

    info!("Listening for IR payloads (Press Ctrl+C to stop)");

    let start_time = Instant::now();
    let mut poll_count = 0u64;
    let mut payload_count = 0u64;
    let mut last_status = Instant::now();

    loop {
        poll_count += 1;

        let count = ir.recv()?;
        if count > 0 {
            payload_count += 1;

            let elapsed = start_time.elapsed().as_secs();
            print!("[{:5}s] {:3} bytes │", elapsed, count);
            for byte in &ir.rx_buffer()[..count] {
                print!(" {:02X}", byte);
            }
            println!();
        }

        // Status line every 10 seconds so a silent link is visibly alive
        if last_status.elapsed() >= Duration::from_secs(10) {
            info!("{} polls, {} payloads received", poll_count, payload_count);
            last_status = Instant::now();
        }

        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn main() {
    eprintln!("ERROR: This program requires Linux with I2C support.");
    std::process::exit(1);
}
