//! Tarang-IO - Line-oriented serial terminal core
//!
//! This library provides a fixed-capacity ring buffer shared between
//! foreground code and asynchronous transfer completions, and a driver
//! state machine that turns byte-at-a-time transport events into
//! echoing, line-buffered terminal input and buffered, overflow-safe
//! output.
//!
//! ## Layering
//!
//! - [`ring`] is the leaf: the byte container with its exclusive-access
//!   ("linear") and lock-guarded access modes.
//! - [`transport`] defines the capability the driver consumes from the
//!   hardware, with a real serial implementation and a mock for tests.
//! - [`driver`] owns one outbound ring and the reception state machine,
//!   reacting to transfer completions delivered by the event pump.

pub mod config;
pub mod driver;
pub mod error;
pub mod ring;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use driver::{event_loop, Reception, TerminalDriver};
pub use error::{Error, Result};
pub use ring::{RingBuffer, SharedRing};
pub use transport::{MockTransport, SerialTransport, TransferStart, Transport, TransportEvent};
