//! Terminal driver
//!
//! Turns byte-at-a-time asynchronous transport events into echoing,
//! line-buffered input and overflow-safe buffered output.
//!
//! # Architecture
//!
//! The driver is an explicit state machine transitioned by two event
//! handlers, `on_receive_complete` and `on_transmit_complete`, which a
//! transport (or the event pump in `pump`) invokes on hardware
//! completions. No handler blocks except the drain transmit inside
//! `on_transmit_complete` and the synchronous `read_line` path.
//!
//! # Reception state machine
//!
//! ```text
//! ┌──────┐ initialize_reception ┌───────┐ start_reception ┌───────────┐
//! │ Idle │ ────────────────────▶│ Armed │ ───────────────▶│ Receiving │
//! └──────┘                      └───────┘                 └───────────┘
//!     ▲                                                        │  ▲
//!     │        CR seen, or filled == requested                 │  │ byte ≠ CR,
//!     └────────────────────────────────────────────────────────┘  │ not done
//!                                                                 └─ re-arm
//! ```
//!
//! Every non-terminator byte is echoed back through the transmit path as
//! it arrives; the carriage-return terminator is answered with a single
//! line feed. `busy()` holds exactly while `Receiving` or while a
//! blocking line read is in progress.
//!
//! # Output path
//!
//! `transmit` tries an immediate asynchronous transfer under the
//! outbound ring's lock and falls back to queueing the span in the ring
//! when the transport is occupied. `on_transmit_complete` drains the
//! ring with one blocking transfer. A drain that the transport rejects
//! cannot be reported to any caller, so its bytes are counted in
//! `lost_bytes` and logged instead of being dropped silently.

mod pump;

pub use pump::event_loop;

use crate::error::{Error, Result};
use crate::ring::SharedRing;
use crate::transport::{TransferStart, Transport};
use std::time::Duration;

/// Line terminator on input
const CR: u8 = b'\r';
/// Echo sent in response to the terminator
const LF: u8 = b'\n';
/// Line termination transmitted after a blocking read
const CRLF: &[u8] = b"\r\n";

/// Deadline for the drain transfer issued from `on_transmit_complete`
const DRAIN_TIMEOUT: Duration = Duration::from_millis(500);
/// Default per-byte deadline for the blocking line read
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Callback invoked with the finished line when an asynchronous
/// reception reaches a terminal state
pub type LineCallback = Box<dyn FnMut(Reception) + Send>;

/// An in-flight or completed reception: destination buffer plus fill
/// progress
///
/// Ownership of the buffer moves into the driver at `start_reception`
/// and returns to the caller only through the completion callback,
/// `take_completed`, or `cancel_reception`.
pub struct Reception {
    buf: Vec<u8>,
    requested: usize,
    filled: usize,
}

impl Reception {
    /// Bytes received so far, terminator included
    pub fn line(&self) -> &[u8] {
        &self.buf[..self.filled]
    }

    /// Number of bytes received, terminator included
    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    /// Declared reception length
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Recover the destination buffer
    pub fn into_buf(self) -> Vec<u8> {
        self.buf
    }
}

/// Reception phase
enum RxState {
    /// Nothing declared
    Idle,
    /// Length declared, destination not yet supplied; `consumed` tracks
    /// blocking-read progress against the declared length
    Armed { requested: usize, consumed: usize },
    /// Asynchronous reception in flight; the driver is busy
    Receiving(Reception),
}

/// Line-oriented terminal driver over an injected transport
pub struct TerminalDriver<T: Transport> {
    transport: T,
    /// Outbound ring, used only for transmit overflow
    tx_ring: SharedRing,
    rx: RxState,
    /// True while a blocking line read owns the transport
    blocking: bool,
    completion: Option<LineCallback>,
    /// Finished line kept for `take_completed` when no callback is set
    completed: Option<Reception>,
    /// Reused by the drain path so the completion handler never allocates
    drain_scratch: Vec<u8>,
    lost_bytes: u64,
    read_timeout: Duration,
}

impl<T: Transport> TerminalDriver<T> {
    /// Create a driver over `transport` with an outbound ring holding
    /// `tx_capacity` bytes
    pub fn new(transport: T, tx_capacity: usize) -> Self {
        Self {
            transport,
            tx_ring: SharedRing::with_capacity(tx_capacity),
            rx: RxState::Idle,
            blocking: false,
            completion: None,
            completed: None,
            drain_scratch: vec![0u8; tx_capacity],
            lost_bytes: 0,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Register the completion callback for asynchronous receptions
    pub fn set_completion(&mut self, callback: LineCallback) {
        self.completion = Some(callback);
    }

    /// Per-byte deadline used by `read_line`
    pub fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }

    /// True while a reception or blocking read owns the transport
    pub fn busy(&self) -> bool {
        self.blocking || matches!(self.rx, RxState::Receiving(_))
    }

    /// Total bytes dropped by drain transfers the transport rejected
    pub fn lost_bytes(&self) -> u64 {
        self.lost_bytes
    }

    /// Declare the length of the next reception
    ///
    /// Fails with `BadLength` if `len < 2` (a single-byte line has no
    /// room for its terminator), leaving any pending reception state
    /// untouched, or with `Busy` while a reception is in flight.
    pub fn initialize_reception(&mut self, len: usize) -> Result<()> {
        if len < 2 {
            return Err(Error::BadLength(len));
        }
        if self.busy() {
            return Err(Error::Busy);
        }
        self.rx = RxState::Armed {
            requested: len,
            consumed: 0,
        };
        Ok(())
    }

    /// Arm the asynchronous reception into `buf`
    ///
    /// Ownership of `buf` moves into the driver until the reception
    /// finishes or is cancelled. The buffer must cover the declared
    /// length.
    pub fn start_reception(&mut self, buf: Vec<u8>) -> Result<()> {
        if self.busy() {
            return Err(Error::Busy);
        }
        let requested = match self.rx {
            RxState::Armed { requested, .. } => requested,
            RxState::Idle | RxState::Receiving(_) => return Err(Error::NotInitialized),
        };
        if buf.len() < requested {
            return Err(Error::BadLength(buf.len()));
        }
        match self.transport.begin_receive()? {
            TransferStart::Accepted => {}
            TransferStart::Busy => return Err(Error::Busy),
        }
        self.rx = RxState::Receiving(Reception {
            buf,
            requested,
            filled: 0,
        });
        Ok(())
    }

    /// Abandon the in-flight reception, returning its buffer
    ///
    /// Returns `None` when no reception is in flight. A completion
    /// event for the cancelled reception that is already in the pipe is
    /// ignored by `on_receive_complete`.
    pub fn cancel_reception(&mut self) -> Option<Vec<u8>> {
        match std::mem::replace(&mut self.rx, RxState::Idle) {
            RxState::Receiving(rx) => Some(rx.buf),
            other => {
                self.rx = other;
                None
            }
        }
    }

    /// Take the line finished by the asynchronous path when no
    /// completion callback is registered
    pub fn take_completed(&mut self) -> Option<Reception> {
        self.completed.take()
    }

    /// Handle a single-byte receive completion
    ///
    /// Stores the byte, echoes it (or answers the terminator with a
    /// line feed), and either re-arms the next byte or finishes the
    /// line. Bytes advance strictly in fill order because exactly one
    /// reception is armed per invocation.
    pub fn on_receive_complete(&mut self, byte: u8) {
        let done = match &mut self.rx {
            RxState::Receiving(rx) => {
                rx.buf[rx.filled] = byte;
                rx.filled += 1;
                byte == CR || rx.filled >= rx.requested
            }
            _ => {
                log::warn!("Receive completion with no reception in flight, dropping byte");
                return;
            }
        };

        let echo = if byte == CR { LF } else { byte };
        if let Err(e) = self.transmit(&[echo]) {
            log::warn!("Echo transmit failed: {}", e);
        }

        if !done {
            match self.transport.begin_receive() {
                Ok(TransferStart::Accepted) => {}
                Ok(TransferStart::Busy) => {
                    log::error!("Transport busy while re-arming reception")
                }
                Err(e) => log::error!("Failed to re-arm reception: {}", e),
            }
            return;
        }

        if let RxState::Receiving(line) = std::mem::replace(&mut self.rx, RxState::Idle) {
            match self.completion.as_mut() {
                Some(callback) => callback(line),
                None => self.completed = Some(line),
            }
        }
    }

    /// Handle an asynchronous transmit completion
    ///
    /// Drains the outbound ring, if non-empty, with one blocking
    /// transfer. Spurious completions with an empty ring do nothing.
    /// There is no caller to report a failed drain to; the bytes are
    /// counted in `lost_bytes` and logged.
    pub fn on_transmit_complete(&mut self) {
        let drained = {
            let mut ring = self.tx_ring.lock();
            if ring.is_empty() {
                return;
            }
            ring.flush_linear(&mut self.drain_scratch)
        };
        if let Err(e) = self
            .transport
            .transmit_blocking(&self.drain_scratch[..drained], DRAIN_TIMEOUT)
        {
            self.lost_bytes += drained as u64;
            log::warn!("Dropped {} buffered bytes, drain transfer failed: {}", drained, e);
        }
    }

    /// Synchronous line read into `dest`
    ///
    /// Consumes bytes one blocking reception at a time until the
    /// declared length is reached or a carriage return arrives, echoing
    /// each non-terminator byte. When the loop ends without a carriage
    /// return the last stored byte is overwritten with one, so callers
    /// can always assume line termination; the CRLF terminator is then
    /// transmitted either way.
    ///
    /// Returns the cumulative count of bytes consumed against the
    /// declared length, `Ok(0)` once that length is exhausted, or
    /// `Busy` while an asynchronous reception is in flight.
    pub fn read_line(&mut self, dest: &mut [u8]) -> Result<usize> {
        let (requested, consumed) = match self.rx {
            RxState::Armed {
                requested,
                consumed,
            } => (requested, consumed),
            RxState::Receiving(_) => return Err(Error::Busy),
            RxState::Idle => return Ok(0),
        };
        if consumed >= requested {
            return Ok(0);
        }

        self.blocking = true;
        let mut count = consumed;
        let mut idx = 0usize;
        let mut saw_cr = false;

        while count < requested && idx < dest.len() {
            match self.transport.receive_blocking(self.read_timeout) {
                Ok(byte) => {
                    dest[idx] = byte;
                    count += 1;
                    idx += 1;
                    if byte == CR {
                        saw_cr = true;
                        break;
                    }
                    if let Err(e) = self.transmit(&dest[idx - 1..idx]) {
                        log::warn!("Echo transmit failed: {}", e);
                    }
                }
                Err(e) => {
                    log::warn!("Blocking receive failed: {}", e);
                    break;
                }
            }
        }

        // Normalization: callers may always assume the line is terminated
        if !saw_cr && idx > 0 {
            dest[idx - 1] = CR;
        }
        if let Err(e) = self.transmit(CRLF) {
            log::warn!("Line termination transmit failed: {}", e);
        }

        if let RxState::Armed { consumed, .. } = &mut self.rx {
            *consumed = count;
        }
        self.blocking = false;
        Ok(count)
    }

    /// Transmit `data`, falling back to the outbound ring on a busy
    /// transport
    ///
    /// The whole attempt runs under the ring's lock so a concurrent
    /// drain cannot interleave with the fallback enqueue. Fails with
    /// `Full` when the transport is occupied and the ring cannot take
    /// the span. Returns the number of bytes accepted.
    pub fn transmit(&mut self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut ring = self.tx_ring.lock();
        match self.transport.begin_transmit(data)? {
            TransferStart::Accepted => Ok(data.len()),
            TransferStart::Busy => {
                ring.write_linear(data)?;
                Ok(data.len())
            }
        }
    }

    /// Outbound ring, exposed for inspection
    pub fn outbound(&self) -> &SharedRing {
        &self.tx_ring
    }
}
