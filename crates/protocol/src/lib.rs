//! Wire protocol for Matchbook
//!
//! Fixed-layout, big-endian records carried over TCP. Every frame starts
//! with a 13-byte header (kind, total length, timestamp) followed by a
//! payload whose size is fixed per message kind. Text fields are NUL-padded
//! to their declared width.
//!
//! The matching core never sees these types: the transport decodes frames
//! into engine requests and encodes engine results back into frames.
//!
//! # Modules
//!
//! - [`messages`] - Message structs and their fixed layouts
//! - [`codec`] - `tokio_util` framed encoder/decoder
//! - [`error`] - Protocol error type

pub mod codec;
pub mod error;
pub mod messages;

pub use codec::MessageCodec;
pub use error::ProtocolError;
pub use messages::{
    CancelOrderRequest, ExecutionReport, Heartbeat, MarketData, Message, MessageKind,
    ModifyOrderRequest, NewOrderRequest, OrderAck, OrderReject, ACK_MESSAGE_LEN, CLIENT_TAG_LEN,
    HEADER_LEN, MAX_FRAME_LEN, REJECT_REASON_LEN, SYMBOL_LEN,
};
