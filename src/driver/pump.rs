//! Event pump for transport completions
//!
//! Bridges a transport's completion channel to the driver's event
//! handlers on a dedicated thread. Each event maps to exactly one
//! handler invocation, so reception bytes advance in arrival order.

use super::TerminalDriver;
use crate::transport::{Transport, TransportEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shutdown-check granularity while waiting for events
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Dispatch transport events to the driver until shutdown
///
/// Exits when the shutdown flag is set or every event sender has been
/// dropped. The driver lock is held only for the duration of one
/// handler call.
pub fn event_loop<T: Transport>(
    driver: Arc<Mutex<TerminalDriver<T>>>,
    events: Receiver<TransportEvent>,
    shutdown: Arc<AtomicBool>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match events.recv_timeout(POLL_INTERVAL) {
            Ok(TransportEvent::ReceiveComplete(byte)) => {
                driver.lock().on_receive_complete(byte);
            }
            Ok(TransportEvent::TransmitComplete) => {
                driver.lock().on_transmit_complete();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::info!("Event pump exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use std::thread;

    #[test]
    fn test_pump_dispatches_reception_events() {
        let mock = MockTransport::new();
        let driver = Arc::new(Mutex::new(TerminalDriver::new(mock.clone(), 32)));
        {
            let mut drv = driver.lock();
            drv.initialize_reception(8).unwrap();
            drv.start_reception(vec![0u8; 8]).unwrap();
        }

        let (sender, receiver) = crossbeam_channel::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let pump = thread::Builder::new()
            .name("event-pump".to_string())
            .spawn({
                let driver = Arc::clone(&driver);
                let shutdown = Arc::clone(&shutdown);
                move || event_loop(driver, receiver, shutdown)
            })
            .unwrap();

        for &byte in b"hey\r" {
            sender.send(TransportEvent::ReceiveComplete(byte)).unwrap();
        }
        drop(sender);
        pump.join().unwrap();

        let mut drv = driver.lock();
        assert!(!drv.busy());
        let line = drv.take_completed().unwrap();
        assert_eq!(line.line(), b"hey\r");
    }

    #[test]
    fn test_pump_exits_on_shutdown_flag() {
        let mock = MockTransport::new();
        let driver = Arc::new(Mutex::new(TerminalDriver::new(mock, 8)));
        let (_sender, receiver) = crossbeam_channel::unbounded::<TransportEvent>();
        let shutdown = Arc::new(AtomicBool::new(true));

        // Flag already set: the loop must return promptly
        event_loop(driver, receiver, shutdown);
    }
}
