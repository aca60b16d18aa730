//! Transport layer for I/O abstraction
//!
//! The driver consumes two capabilities from the hardware: start an
//! asynchronous transfer, and perform a blocking one. Completions of
//! asynchronous transfers come back as `TransportEvent`s on a channel,
//! so tests can substitute `MockTransport` and drive the driver's event
//! handlers directly.

use crate::error::Result;
use std::time::Duration;

mod mock;
mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// Outcome of requesting a non-blocking transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStart {
    /// Transfer started; a completion event will follow
    Accepted,
    /// Peripheral occupied; the caller must queue or reject
    Busy,
}

/// Asynchronous notifications emitted by a transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    /// Exactly one armed byte has arrived
    ReceiveComplete(u8),
    /// A previously accepted asynchronous transmit has fully drained
    TransmitComplete,
}

/// Transport trait for terminal communication
///
/// Reception is constrained to one byte per armed transfer; the driver
/// chains receptions from its completion handler to build up a line.
pub trait Transport: Send {
    /// Start a non-blocking transmit of the whole span
    ///
    /// `Busy` means a previous transmit is still in flight and nothing
    /// was sent.
    fn begin_transmit(&mut self, data: &[u8]) -> Result<TransferStart>;

    /// Arm a non-blocking single-byte reception
    ///
    /// The received byte is delivered later as
    /// `TransportEvent::ReceiveComplete`.
    fn begin_receive(&mut self) -> Result<TransferStart>;

    /// Synchronous transmit, used only by the drain and line-termination
    /// paths
    fn transmit_blocking(&mut self, data: &[u8], timeout: Duration) -> Result<()>;

    /// Synchronous single-byte reception, used by the blocking line read
    fn receive_blocking(&mut self, timeout: Duration) -> Result<u8>;
}
