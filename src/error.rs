//! Error types for Tarang-IO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Tarang-IO error types
///
/// Every entry point reports failure through this enum; there is no
/// panic-based control transfer anywhere in the crate outside of tests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An operation requiring exclusive driver state is already in progress.
    /// Recoverable: retry once the pending operation completes.
    #[error("driver busy: reception already in progress")]
    Busy,

    /// Ring buffer has insufficient free space for the requested write.
    /// Recoverable: reduce the request or wait for a drain.
    #[error("ring buffer full")]
    Full,

    /// Ring buffer holds fewer bytes than the requested read.
    #[error("ring buffer empty")]
    Empty,

    /// Reception length below the two-byte minimum (a line with no
    /// terminator is meaningless). Caller programming error.
    #[error("bad reception length: {0} (minimum is 2)")]
    BadLength(usize),

    /// A reception was started or read without a preceding
    /// `initialize_reception`.
    #[error("reception not initialized")]
    NotInitialized,

    /// The transport cannot accept a transfer right now.
    #[error("transport rejected transfer")]
    Rejected,

    /// A blocking transfer exceeded its deadline.
    #[error("transfer timed out")]
    Timeout,

    /// Serial port error
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration parse error
    #[error("configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Configuration serialization error
    #[error("configuration write error: {0}")]
    ConfigWrite(#[from] toml::ser::Error),

    /// The transport event channel was torn down.
    #[error("event channel closed")]
    ChannelClosed,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
