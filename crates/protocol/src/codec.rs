//! Framed encoder/decoder for wire messages
//!
//! Frames are validated before any payload parsing: the length field must
//! cover at least the header, stay under [`MAX_FRAME_LEN`], and match the
//! fixed payload size of the message kind. Incomplete frames leave the
//! buffer untouched until more bytes arrive.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::messages::{Message, MessageKind, HEADER_LEN, MAX_FRAME_LEN};

/// Codec for [`Message`] frames, usable on both ends of the connection
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec;

impl MessageCodec {
    /// Create a codec
    pub fn new() -> Self {
        Self
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl Decoder for MessageCodec {
    type Item = Message;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Message>, ProtocolError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        // peek the length without consuming the header
        let length = u32::from_be_bytes([src[1], src[2], src[3], src[4]]) as usize;
        if length < HEADER_LEN {
            return Err(ProtocolError::BadFrameLength(length));
        }
        if length > MAX_FRAME_LEN {
            return Err(ProtocolError::FrameTooLarge {
                length,
                max: MAX_FRAME_LEN,
            });
        }
        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(length);
        let kind = MessageKind::try_from(frame.get_u8())?;
        let _length = frame.get_u32();
        let _timestamp_ns = frame.get_u64();

        let expected = Message::payload_len(kind);
        if frame.remaining() != expected {
            return Err(ProtocolError::InvalidPayloadLength {
                kind,
                expected,
                actual: frame.remaining(),
            });
        }

        Message::decode_payload(kind, &mut frame).map(Some)
    }
}

impl Encoder<Message> for MessageCodec {
    type Error = ProtocolError;

    fn encode(&mut self, message: Message, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let kind = message.kind();
        let total = HEADER_LEN + Message::payload_len(kind);
        dst.reserve(total);
        dst.put_u8(kind as u8);
        dst.put_u32(total as u32);
        dst.put_u64(now_nanos());
        message.encode_payload(dst);
        Ok(())
    }
}
