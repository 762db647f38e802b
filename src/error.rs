//! Error types for localwire.

use thiserror::Error;

/// Main error type for all localwire operations.
#[derive(Debug, Error)]
pub enum LocalwireError {
    /// `connect`/`set_descriptor` on a socket that is already open.
    #[error("Socket is already open")]
    AlreadyOpen,

    /// The socket was opened and closed before; a new handle is required.
    #[error("Socket was closed and cannot be reopened")]
    Closed,

    /// Empty path, zero descriptor, or similar bad input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation requires an open socket.
    #[error("Socket is not open")]
    NotOpen,

    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A blocking wait ran out of time before its condition held.
    #[error("Timed out")]
    Timeout,

    /// Peer sent a frame that violates the wire format.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Configuration could not be parsed.
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias using LocalwireError.
pub type Result<T> = std::result::Result<T, LocalwireError>;
