//! Serial transport implementation
//!
//! Backs the `Transport` capability with a real serial port. Hardware
//! DMA is emulated with two service threads:
//!
//! - **Writer thread**: services accepted asynchronous transmits and
//!   emits `TransmitComplete` when a span has fully drained. The
//!   `tx_busy` flag is set for exactly the in-flight window, so
//!   `begin_transmit` reports `Busy` the way an occupied peripheral
//!   would.
//! - **Reader thread**: polls the port while a reception is armed and
//!   emits `ReceiveComplete` with the single received byte.
//!
//! Both threads share the port behind one mutex, the same arrangement
//! the port would get from a half-duplex UART.

use super::{TransferStart, Transport, TransportEvent};
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Poll granularity for the service threads and blocking reads
const READ_TIMEOUT: Duration = Duration::from_millis(10);
/// Idle sleep while no reception is armed
const IDLE_POLL: Duration = Duration::from_millis(2);

/// Serial transport for UART communication
pub struct SerialTransport {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    tx_queue: Sender<Vec<u8>>,
    tx_busy: Arc<AtomicBool>,
    rx_armed: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    writer_handle: Option<JoinHandle<()>>,
    reader_handle: Option<JoinHandle<()>>,
}

impl SerialTransport {
    /// Open a serial port and start the service threads
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (e.g., 115200)
    /// * `events` - Channel on which transfer completions are delivered
    pub fn open(path: &str, baud_rate: u32, events: Sender<TransportEvent>) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;

        log::info!("Opened serial port: {} at {} baud", path, baud_rate);

        let port = Arc::new(Mutex::new(port));
        let tx_busy = Arc::new(AtomicBool::new(false));
        let rx_armed = Arc::new(AtomicBool::new(false));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx_queue, tx_jobs) = crossbeam_channel::unbounded::<Vec<u8>>();

        let writer_handle = thread::Builder::new()
            .name("serial-writer".to_string())
            .spawn({
                let port = Arc::clone(&port);
                let tx_busy = Arc::clone(&tx_busy);
                let shutdown = Arc::clone(&shutdown);
                let events = events.clone();
                move || writer_loop(port, tx_jobs, tx_busy, shutdown, events)
            })
            .map_err(Error::Io)?;

        let reader_handle = thread::Builder::new()
            .name("serial-reader".to_string())
            .spawn({
                let port = Arc::clone(&port);
                let rx_armed = Arc::clone(&rx_armed);
                let shutdown = Arc::clone(&shutdown);
                move || reader_loop(port, rx_armed, shutdown, events)
            })
            .map_err(Error::Io)?;

        Ok(Self {
            port,
            tx_queue,
            tx_busy,
            rx_armed,
            shutdown,
            writer_handle: Some(writer_handle),
            reader_handle: Some(reader_handle),
        })
    }
}

impl Transport for SerialTransport {
    fn begin_transmit(&mut self, data: &[u8]) -> Result<TransferStart> {
        if self.tx_busy.swap(true, Ordering::AcqRel) {
            return Ok(TransferStart::Busy);
        }
        if self.tx_queue.send(data.to_vec()).is_err() {
            self.tx_busy.store(false, Ordering::Release);
            return Err(Error::ChannelClosed);
        }
        Ok(TransferStart::Accepted)
    }

    fn begin_receive(&mut self) -> Result<TransferStart> {
        if self.rx_armed.swap(true, Ordering::AcqRel) {
            return Ok(TransferStart::Busy);
        }
        Ok(TransferStart::Accepted)
    }

    fn transmit_blocking(&mut self, data: &[u8], timeout: Duration) -> Result<()> {
        let mut port = self.port.lock();
        port.set_timeout(timeout)?;
        let result = port.write_all(data).and_then(|_| port.flush());
        // Restore the short poll timeout before the reader thread resumes
        port.set_timeout(READ_TIMEOUT)?;
        result.map_err(Error::Io)
    }

    fn receive_blocking(&mut self, timeout: Duration) -> Result<u8> {
        let deadline = Instant::now() + timeout;
        let mut byte = [0u8; 1];
        loop {
            let attempt = {
                let mut port = self.port.lock();
                port.read(&mut byte)
            };
            match attempt {
                Ok(n) if n > 0 => return Ok(byte[0]),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout);
            }
        }
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.reader_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Writer loop - drains queued transmit spans and reports completions
fn writer_loop(
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    jobs: Receiver<Vec<u8>>,
    tx_busy: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    events: Sender<TransportEvent>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        match jobs.recv_timeout(READ_TIMEOUT) {
            Ok(span) => {
                let result = {
                    let mut port = port.lock();
                    port.write_all(&span).and_then(|_| port.flush())
                };
                tx_busy.store(false, Ordering::Release);
                if let Err(e) = result {
                    log::error!("Async transmit of {} bytes failed: {}", span.len(), e);
                }
                if events.send(TransportEvent::TransmitComplete).is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    log::debug!("Serial writer thread exiting");
}

/// Reader loop - services armed single-byte receptions
fn reader_loop(
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    rx_armed: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    events: Sender<TransportEvent>,
) {
    let mut byte = [0u8; 1];
    while !shutdown.load(Ordering::Relaxed) {
        if !rx_armed.load(Ordering::Acquire) {
            thread::sleep(IDLE_POLL);
            continue;
        }
        let attempt = {
            let mut port = port.lock();
            port.read(&mut byte)
        };
        match attempt {
            Ok(n) if n > 0 => {
                rx_armed.store(false, Ordering::Release);
                if events
                    .send(TransportEvent::ReceiveComplete(byte[0]))
                    .is_err()
                {
                    break;
                }
            }
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("Serial read error: {}", e);
                thread::sleep(READ_TIMEOUT);
            }
        }
    }
    log::debug!("Serial reader thread exiting");
}
