//! Tarang-IO - Line-oriented serial terminal daemon
//!
//! Opens the configured serial port, arms line-buffered receptions, and
//! logs each completed line. Every byte typed at the far end is echoed
//! back as it arrives; output that the port cannot take immediately is
//! queued in the outbound ring and drained on transmit completion.

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tarang_io::{event_loop, AppConfig, Error, Reception, Result, SerialTransport, TerminalDriver};

/// How often the main loop rechecks the shutdown flag while waiting for
/// a completed line
const LINE_POLL: Duration = Duration::from_millis(200);

/// Parse config path from command line arguments.
///
/// Supports:
/// - `tarang-io <path>` (positional)
/// - `tarang-io --config <path>` (flag-based)
/// - `tarang-io -c <path>` (short flag)
///
/// Defaults to `/etc/tarangio.toml` if not specified.
fn parse_config_path() -> String {
    let args: Vec<String> = env::args().collect();

    // Look for --config or -c flag
    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }

    // Fall back to first positional argument (if it doesn't start with -)
    if args.len() > 1 && !args[1].starts_with('-') {
        return args[1].clone();
    }

    // Default path
    "/etc/tarangio.toml".to_string()
}

fn main() -> Result<()> {
    let config_path = parse_config_path();
    let config = if Path::new(&config_path).exists() {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::console_defaults()
    };

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Tarang-IO v0.1.0 starting...");
    log::info!("Using config: {}", config_path);

    // Set up shutdown signal handler
    let shutdown = Arc::new(AtomicBool::new(false));
    let s = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        s.store(true, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    // Transport completions flow to the event pump; completed lines flow
    // back to this loop
    let (event_tx, event_rx) = crossbeam_channel::unbounded();
    let (line_tx, line_rx) = crossbeam_channel::unbounded::<Reception>();

    let transport = SerialTransport::open(&config.serial.port, config.serial.baud_rate, event_tx)?;
    let mut driver = TerminalDriver::new(transport, config.terminal.tx_ring_capacity);
    driver.set_completion(Box::new(move |line| {
        let _ = line_tx.send(line);
    }));
    let driver = Arc::new(Mutex::new(driver));

    let pump_handle = thread::Builder::new()
        .name("event-pump".to_string())
        .spawn({
            let driver = Arc::clone(&driver);
            let shutdown = Arc::clone(&shutdown);
            move || event_loop(driver, event_rx, shutdown)
        })
        .map_err(|e| Error::Other(format!("Failed to spawn event pump: {}", e)))?;

    let line_length = config.terminal.line_length.max(2);
    log::info!(
        "Terminal ready on {} ({} byte lines, {} byte outbound ring)",
        config.serial.port,
        line_length,
        config.terminal.tx_ring_capacity
    );
    log::info!("Tarang-IO running. Press Ctrl-C to stop.");

    while !shutdown.load(Ordering::Relaxed) {
        // Re-arm whenever the previous reception has finished
        {
            let mut drv = driver.lock();
            if !drv.busy() {
                let armed = drv
                    .initialize_reception(line_length)
                    .and_then(|_| drv.start_reception(vec![0u8; line_length]));
                if let Err(e) = armed {
                    log::error!("Failed to arm reception: {}", e);
                }
            }
        }

        match line_rx.recv_timeout(LINE_POLL) {
            Ok(line) => {
                let text = String::from_utf8_lossy(line.line());
                log::info!("Line received ({} bytes): {}", line.len(), text.trim_end());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Shutdown
    log::info!("Shutting down...");
    shutdown.store(true, Ordering::Relaxed);
    pump_handle
        .join()
        .map_err(|_| Error::Other("Event pump thread panicked".to_string()))?;

    {
        let drv = driver.lock();
        if drv.lost_bytes() > 0 {
            log::warn!(
                "{} outbound bytes were dropped during this run",
                drv.lost_bytes()
            );
        }
    }

    log::info!("Tarang-IO stopped");
    Ok(())
}
