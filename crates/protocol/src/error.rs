//! Protocol error type

use thiserror::Error;

/// Errors raised while encoding or decoding wire frames
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Frame length field exceeds the protocol cap
    #[error("frame too large: {length} bytes (max {max})")]
    FrameTooLarge { length: usize, max: usize },

    /// Frame length field is smaller than the header
    #[error("bad frame length: {0} bytes")]
    BadFrameLength(usize),

    /// Unrecognized message kind byte
    #[error("unknown message kind: {0:#04x}")]
    UnknownMessageKind(u8),

    /// Payload size does not match the fixed layout for the kind
    #[error("invalid payload for {kind:?}: expected {expected} bytes, got {actual}")]
    InvalidPayloadLength {
        kind: crate::messages::MessageKind,
        expected: usize,
        actual: usize,
    },

    /// A field held a value outside its encoding
    #[error("invalid {field} value: {value:#04x}")]
    InvalidField { field: &'static str, value: u8 },

    /// Underlying transport error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
