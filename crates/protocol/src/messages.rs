//! Wire message layouts
//!
//! Every message is `header ‖ payload` with a fixed payload size per kind.
//! Integers are big-endian; text fields are NUL-padded to a fixed width and
//! trimmed at the first NUL when decoded.

use bytes::{Buf, BufMut, BytesMut};
use common::{OrderId, Price, Quantity, TradeId};
use matching_engine::{OrderStatus, OrderType, Side};

use crate::error::ProtocolError;

/// Header size: kind (u8) + length (u32) + timestamp (u64)
pub const HEADER_LEN: usize = 13;

/// Hard cap on a single frame
pub const MAX_FRAME_LEN: usize = 4096;

/// Width of the NUL-padded symbol field
pub const SYMBOL_LEN: usize = 16;

/// Width of the NUL-padded client tag field
pub const CLIENT_TAG_LEN: usize = 32;

/// Width of the NUL-padded human message in an ack
pub const ACK_MESSAGE_LEN: usize = 128;

/// Width of the NUL-padded reason in a reject
pub const REJECT_REASON_LEN: usize = 256;

// ============================================================================
// Message kinds
// ============================================================================

/// Discriminant carried in the frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageKind {
    NewOrder = 0,
    CancelOrder = 1,
    ModifyOrder = 2,
    OrderAck = 3,
    OrderReject = 4,
    ExecutionReport = 5,
    MarketData = 6,
    Heartbeat = 7,
}

impl TryFrom<u8> for MessageKind {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, ProtocolError> {
        match value {
            0 => Ok(MessageKind::NewOrder),
            1 => Ok(MessageKind::CancelOrder),
            2 => Ok(MessageKind::ModifyOrder),
            3 => Ok(MessageKind::OrderAck),
            4 => Ok(MessageKind::OrderReject),
            5 => Ok(MessageKind::ExecutionReport),
            6 => Ok(MessageKind::MarketData),
            7 => Ok(MessageKind::Heartbeat),
            other => Err(ProtocolError::UnknownMessageKind(other)),
        }
    }
}

// ============================================================================
// Commands (client → server)
// ============================================================================

/// Submit a new order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderRequest {
    /// Client-chosen id, echoed back in the ack
    pub client_order_id: u64,
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Price,
    pub quantity: Quantity,
    pub stop_price: Price,
    pub client_tag: String,
}

/// Cancel a resting order by its server-assigned id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelOrderRequest {
    pub order_id: OrderId,
    pub client_tag: String,
}

/// Replace a resting order's price and quantity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifyOrderRequest {
    pub order_id: OrderId,
    pub new_price: Price,
    pub new_quantity: Quantity,
    pub client_tag: String,
}

/// Liveness probe; the server echoes the sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Heartbeat {
    pub sequence: u64,
}

// ============================================================================
// Events (server → client)
// ============================================================================

/// Acknowledgement of a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub client_order_id: u64,
    /// Server-assigned id (0 when the ack answers a cancel/modify)
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub message: String,
}

/// Rejection of a new order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReject {
    pub client_order_id: u64,
    pub reason: String,
}

/// One execution against the submitted order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub symbol: String,
    pub side: Side,
    pub execution_price: Price,
    pub execution_quantity: Quantity,
    pub remaining_quantity: Quantity,
    pub status: OrderStatus,
    pub trade_id: TradeId,
}

/// Top-of-book snapshot; zero prices mean the side is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketData {
    pub symbol: String,
    pub best_bid: Price,
    pub best_ask: Price,
    pub bid_quantity: Quantity,
    pub ask_quantity: Quantity,
}

// ============================================================================
// Message envelope
// ============================================================================

/// Any frame that can cross the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    NewOrder(NewOrderRequest),
    CancelOrder(CancelOrderRequest),
    ModifyOrder(ModifyOrderRequest),
    OrderAck(OrderAck),
    OrderReject(OrderReject),
    ExecutionReport(ExecutionReport),
    MarketData(MarketData),
    Heartbeat(Heartbeat),
}

impl Message {
    /// The header discriminant for this message
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::NewOrder(_) => MessageKind::NewOrder,
            Message::CancelOrder(_) => MessageKind::CancelOrder,
            Message::ModifyOrder(_) => MessageKind::ModifyOrder,
            Message::OrderAck(_) => MessageKind::OrderAck,
            Message::OrderReject(_) => MessageKind::OrderReject,
            Message::ExecutionReport(_) => MessageKind::ExecutionReport,
            Message::MarketData(_) => MessageKind::MarketData,
            Message::Heartbeat(_) => MessageKind::Heartbeat,
        }
    }

    /// Fixed payload size for a message kind
    pub fn payload_len(kind: MessageKind) -> usize {
        match kind {
            // client_order_id + symbol + side + type + price + qty + stop + tag
            MessageKind::NewOrder => 8 + SYMBOL_LEN + 1 + 1 + 8 + 8 + 8 + CLIENT_TAG_LEN,
            // order_id + tag
            MessageKind::CancelOrder => 8 + CLIENT_TAG_LEN,
            // order_id + price + qty + tag
            MessageKind::ModifyOrder => 8 + 8 + 8 + CLIENT_TAG_LEN,
            // client_order_id + order_id + status + message
            MessageKind::OrderAck => 8 + 8 + 1 + ACK_MESSAGE_LEN,
            // client_order_id + reason
            MessageKind::OrderReject => 8 + REJECT_REASON_LEN,
            // order_id + symbol + side + price + qty + remaining + status + trade_id
            MessageKind::ExecutionReport => 8 + SYMBOL_LEN + 1 + 8 + 8 + 8 + 1 + 8,
            // symbol + bid + ask + bid_qty + ask_qty
            MessageKind::MarketData => SYMBOL_LEN + 8 + 8 + 8 + 8,
            // sequence
            MessageKind::Heartbeat => 8,
        }
    }

    /// Write the payload (header excluded) into `buf`
    pub fn encode_payload(&self, buf: &mut BytesMut) {
        match self {
            Message::NewOrder(msg) => {
                buf.put_u64(msg.client_order_id);
                put_fixed_str(buf, &msg.symbol, SYMBOL_LEN);
                buf.put_u8(side_to_wire(msg.side));
                buf.put_u8(order_type_to_wire(msg.order_type));
                buf.put_i64(msg.price);
                buf.put_u64(msg.quantity);
                buf.put_i64(msg.stop_price);
                put_fixed_str(buf, &msg.client_tag, CLIENT_TAG_LEN);
            }
            Message::CancelOrder(msg) => {
                buf.put_u64(msg.order_id);
                put_fixed_str(buf, &msg.client_tag, CLIENT_TAG_LEN);
            }
            Message::ModifyOrder(msg) => {
                buf.put_u64(msg.order_id);
                buf.put_i64(msg.new_price);
                buf.put_u64(msg.new_quantity);
                put_fixed_str(buf, &msg.client_tag, CLIENT_TAG_LEN);
            }
            Message::OrderAck(msg) => {
                buf.put_u64(msg.client_order_id);
                buf.put_u64(msg.order_id);
                buf.put_u8(status_to_wire(msg.status));
                put_fixed_str(buf, &msg.message, ACK_MESSAGE_LEN);
            }
            Message::OrderReject(msg) => {
                buf.put_u64(msg.client_order_id);
                put_fixed_str(buf, &msg.reason, REJECT_REASON_LEN);
            }
            Message::ExecutionReport(msg) => {
                buf.put_u64(msg.order_id);
                put_fixed_str(buf, &msg.symbol, SYMBOL_LEN);
                buf.put_u8(side_to_wire(msg.side));
                buf.put_i64(msg.execution_price);
                buf.put_u64(msg.execution_quantity);
                buf.put_u64(msg.remaining_quantity);
                buf.put_u8(status_to_wire(msg.status));
                buf.put_u64(msg.trade_id);
            }
            Message::MarketData(msg) => {
                put_fixed_str(buf, &msg.symbol, SYMBOL_LEN);
                buf.put_i64(msg.best_bid);
                buf.put_i64(msg.best_ask);
                buf.put_u64(msg.bid_quantity);
                buf.put_u64(msg.ask_quantity);
            }
            Message::Heartbeat(msg) => {
                buf.put_u64(msg.sequence);
            }
        }
    }

    /// Decode a payload of the given kind; `buf` must hold exactly the
    /// payload bytes.
    pub fn decode_payload(kind: MessageKind, buf: &mut impl Buf) -> Result<Self, ProtocolError> {
        let message = match kind {
            MessageKind::NewOrder => Message::NewOrder(NewOrderRequest {
                client_order_id: buf.get_u64(),
                symbol: get_fixed_str(buf, SYMBOL_LEN),
                side: side_from_wire(buf.get_u8())?,
                order_type: order_type_from_wire(buf.get_u8())?,
                price: buf.get_i64(),
                quantity: buf.get_u64(),
                stop_price: buf.get_i64(),
                client_tag: get_fixed_str(buf, CLIENT_TAG_LEN),
            }),
            MessageKind::CancelOrder => Message::CancelOrder(CancelOrderRequest {
                order_id: buf.get_u64(),
                client_tag: get_fixed_str(buf, CLIENT_TAG_LEN),
            }),
            MessageKind::ModifyOrder => Message::ModifyOrder(ModifyOrderRequest {
                order_id: buf.get_u64(),
                new_price: buf.get_i64(),
                new_quantity: buf.get_u64(),
                client_tag: get_fixed_str(buf, CLIENT_TAG_LEN),
            }),
            MessageKind::OrderAck => Message::OrderAck(OrderAck {
                client_order_id: buf.get_u64(),
                order_id: buf.get_u64(),
                status: status_from_wire(buf.get_u8())?,
                message: get_fixed_str(buf, ACK_MESSAGE_LEN),
            }),
            MessageKind::OrderReject => Message::OrderReject(OrderReject {
                client_order_id: buf.get_u64(),
                reason: get_fixed_str(buf, REJECT_REASON_LEN),
            }),
            MessageKind::ExecutionReport => Message::ExecutionReport(ExecutionReport {
                order_id: buf.get_u64(),
                symbol: get_fixed_str(buf, SYMBOL_LEN),
                side: side_from_wire(buf.get_u8())?,
                execution_price: buf.get_i64(),
                execution_quantity: buf.get_u64(),
                remaining_quantity: buf.get_u64(),
                status: status_from_wire(buf.get_u8())?,
                trade_id: buf.get_u64(),
            }),
            MessageKind::MarketData => Message::MarketData(MarketData {
                symbol: get_fixed_str(buf, SYMBOL_LEN),
                best_bid: buf.get_i64(),
                best_ask: buf.get_i64(),
                bid_quantity: buf.get_u64(),
                ask_quantity: buf.get_u64(),
            }),
            MessageKind::Heartbeat => Message::Heartbeat(Heartbeat {
                sequence: buf.get_u64(),
            }),
        };
        Ok(message)
    }
}

// ============================================================================
// Field encodings
// ============================================================================

fn side_to_wire(side: Side) -> u8 {
    match side {
        Side::Buy => 0,
        Side::Sell => 1,
    }
}

fn side_from_wire(value: u8) -> Result<Side, ProtocolError> {
    match value {
        0 => Ok(Side::Buy),
        1 => Ok(Side::Sell),
        other => Err(ProtocolError::InvalidField {
            field: "side",
            value: other,
        }),
    }
}

fn order_type_to_wire(order_type: OrderType) -> u8 {
    match order_type {
        OrderType::Limit => 0,
        OrderType::Market => 1,
        OrderType::Ioc => 2,
        OrderType::Fok => 3,
        OrderType::StopLoss => 4,
        OrderType::StopLimit => 5,
    }
}

fn order_type_from_wire(value: u8) -> Result<OrderType, ProtocolError> {
    match value {
        0 => Ok(OrderType::Limit),
        1 => Ok(OrderType::Market),
        2 => Ok(OrderType::Ioc),
        3 => Ok(OrderType::Fok),
        4 => Ok(OrderType::StopLoss),
        5 => Ok(OrderType::StopLimit),
        other => Err(ProtocolError::InvalidField {
            field: "order_type",
            value: other,
        }),
    }
}

fn status_to_wire(status: OrderStatus) -> u8 {
    match status {
        OrderStatus::Pending => 0,
        OrderStatus::PartiallyFilled => 1,
        OrderStatus::Filled => 2,
        OrderStatus::Cancelled => 3,
        OrderStatus::Rejected => 4,
    }
}

fn status_from_wire(value: u8) -> Result<OrderStatus, ProtocolError> {
    match value {
        0 => Ok(OrderStatus::Pending),
        1 => Ok(OrderStatus::PartiallyFilled),
        2 => Ok(OrderStatus::Filled),
        3 => Ok(OrderStatus::Cancelled),
        4 => Ok(OrderStatus::Rejected),
        other => Err(ProtocolError::InvalidField {
            field: "status",
            value: other,
        }),
    }
}

/// Write `s` NUL-padded to exactly `len` bytes, truncating if needed
fn put_fixed_str(buf: &mut BytesMut, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    buf.put_slice(&bytes[..n]);
    buf.put_bytes(0, len - n);
}

/// Read a `len`-byte field, trimming at the first NUL
fn get_fixed_str(buf: &mut impl Buf, len: usize) -> String {
    let mut raw = vec![0u8; len];
    buf.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
