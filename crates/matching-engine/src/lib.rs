//! Order matching engine for Matchbook
//!
//! This crate implements the core of the exchange: a per-symbol limit order
//! book with strict price-time priority, and the cross-book engine that
//! routes orders by symbol.
//!
//! # Guarantees
//!
//! 1. Deterministic matching: best price first, FIFO within a price level
//! 2. Trades always execute at the resting order's price
//! 3. A book is never left crossed by any public operation
//! 4. Per-symbol isolation: books never interact
//! 5. Thread safety: per-book mutexes behind an engine-level index
//!
//! # Modules
//!
//! - [`order`] - Order, side, type, and status types
//! - [`trade`] - Executed trade records
//! - [`book`] - Per-symbol order book and matching algorithms
//! - [`engine`] - Cross-book routing, id allocation, observer callbacks
//! - [`error`] - Rejection reasons for defensive validation

pub mod book;
pub mod engine;
pub mod error;
pub mod order;
pub mod trade;

pub use book::{MatchOutcome, OrderBook, PriceLevel};
pub use engine::{MatchingEngine, NewOrder, SubmitResult, MAX_SYMBOL_LEN};
pub use error::RejectReason;
pub use order::{Order, OrderStatus, OrderType, Side};
pub use trade::Trade;
