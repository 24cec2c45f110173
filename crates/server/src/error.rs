//! Server error types

use thiserror::Error;

/// Errors raised by the transport server
#[derive(Error, Debug)]
pub enum ServerError {
    /// The configured host/port does not parse as a socket address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A wire frame could not be encoded or decoded
    #[error("protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    /// Socket-level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
