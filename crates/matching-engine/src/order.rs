//! Order domain types
//!
//! An [`Order`] pairs an immutable identity (id, symbol, side, type, limit
//! price) with the mutable fill state (remaining quantity, status) that the
//! book updates while the order lives in it.

use chrono::{DateTime, Utc};
use common::{price_to_f64, OrderId, Price, Quantity};
use serde::{Deserialize, Serialize};

// ============================================================================
// Side
// ============================================================================

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Returns the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Returns true if this is a buy order
    pub fn is_buy(&self) -> bool {
        matches!(self, Side::Buy)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

// ============================================================================
// Order type
// ============================================================================

/// Order type, determining the matching policy applied on submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Execute at the limit price or better; the remainder rests in the book
    Limit,
    /// Execute immediately at the best available prices; never rests
    Market,
    /// Immediate-or-cancel: fill what crosses now, cancel the rest
    Ioc,
    /// Fill-or-kill: fill the entire quantity atomically or do nothing
    Fok,
    /// Becomes a market order once the stop price is reached
    StopLoss,
    /// Becomes a limit order once the stop price is reached
    StopLimit,
}

impl OrderType {
    /// True for types whose matching is bounded by the order's limit price.
    pub fn has_price_bound(&self) -> bool {
        matches!(
            self,
            OrderType::Limit | OrderType::Ioc | OrderType::Fok | OrderType::StopLimit
        )
    }

    /// True for the stop-triggered types
    pub fn is_stop(&self) -> bool {
        matches!(self, OrderType::StopLoss | OrderType::StopLimit)
    }
}

impl std::fmt::Display for OrderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderType::Limit => "LIMIT",
            OrderType::Market => "MARKET",
            OrderType::Ioc => "IOC",
            OrderType::Fok => "FOK",
            OrderType::StopLoss => "STOP_LOSS",
            OrderType::StopLimit => "STOP_LIMIT",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Order status
// ============================================================================

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Accepted, no fills yet
    Pending,
    /// Some quantity filled, some remaining
    PartiallyFilled,
    /// Fully filled
    Filled,
    /// Cancelled before completion (explicitly, or by IOC/FOK/market policy)
    Cancelled,
    /// Rejected on submission; the book was never touched
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses admit no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::PartiallyFilled => "PARTIAL_FILL",
            OrderStatus::Filled => "FILLED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Order
// ============================================================================

/// A single order instruction
///
/// Identity fields are set at construction; `remaining` and `status` are
/// updated by the book under its lock. Once a terminal status is reached the
/// order has left the book and is no longer mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Server-assigned identifier
    pub id: OrderId,
    /// Instrument symbol
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Matching policy
    pub order_type: OrderType,
    /// Limit price (fixed-point); 0 for pure market orders
    pub price: Price,
    /// Original quantity
    pub quantity: Quantity,
    /// Quantity still unfilled
    pub remaining: Quantity,
    /// Trigger price for stop orders; 0 otherwise
    pub stop_price: Price,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Opaque tag supplied by the submitting client
    pub client_tag: String,
}

impl Order {
    /// Create a new pending order
    pub fn new(
        id: OrderId,
        symbol: impl Into<String>,
        side: Side,
        order_type: OrderType,
        price: Price,
        quantity: Quantity,
        stop_price: Price,
    ) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            side,
            order_type,
            price,
            quantity,
            remaining: quantity,
            stop_price,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
            client_tag: String::new(),
        }
    }

    /// Set the client tag for this order
    pub fn with_client_tag(mut self, tag: impl Into<String>) -> Self {
        self.client_tag = tag.into();
        self
    }

    /// Apply a fill of up to `quantity` units
    ///
    /// Reduces `remaining` by `min(quantity, remaining)` and moves the status
    /// to `PartiallyFilled` or `Filled`. A zero fill leaves the order
    /// untouched.
    pub fn fill(&mut self, quantity: Quantity) {
        let fill = quantity.min(self.remaining);
        if fill == 0 {
            return;
        }
        self.remaining -= fill;
        if self.remaining == 0 {
            self.status = OrderStatus::Filled;
        } else {
            self.status = OrderStatus::PartiallyFilled;
        }
    }

    /// Replace the order quantity, resetting `remaining` to the new value.
    /// Used only by modify; any prior fills are forgotten.
    pub fn set_quantity(&mut self, quantity: Quantity) {
        self.quantity = quantity;
        self.remaining = quantity;
    }

    /// Quantity filled so far
    pub fn filled_quantity(&self) -> Quantity {
        self.quantity - self.remaining
    }

    /// True once the full quantity has been filled
    pub fn is_filled(&self) -> bool {
        self.remaining == 0
    }

    /// True while the order can still trade or rest in the book
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Pending | OrderStatus::PartiallyFilled
        )
    }

    /// Stop trigger predicate
    ///
    /// For stop orders only: a BUY stop triggers when the reference price
    /// rises to or above the stop price, a SELL stop when it falls to or
    /// below. Always false for non-stop types. The engine exposes this
    /// predicate but does not itself maintain a reference price; activation
    /// is the caller's concern.
    pub fn should_trigger(&self, reference_price: Price) -> bool {
        if !self.order_type.is_stop() {
            return false;
        }
        match self.side {
            Side::Buy => reference_price >= self.stop_price,
            Side::Sell => reference_price <= self.stop_price,
        }
    }
}

impl std::fmt::Display for Order {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Order[id={} {} {} {} {:.4} qty={} rem={} {}]",
            self.id,
            self.symbol,
            self.side,
            self.order_type,
            price_to_f64(self.price),
            self.quantity,
            self.remaining,
            self.status
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use common::price_from_f64;

    fn limit_buy(quantity: Quantity) -> Order {
        Order::new(
            1,
            "AAPL",
            Side::Buy,
            OrderType::Limit,
            price_from_f64(150.0),
            quantity,
            0,
        )
    }

    #[test]
    fn test_new_order_is_pending() {
        let order = limit_buy(100);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.remaining, 100);
        assert_eq!(order.filled_quantity(), 0);
        assert!(order.is_active());
        assert!(!order.is_filled());
    }

    #[test]
    fn test_fill_transitions() {
        let mut order = limit_buy(100);

        order.fill(40);
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining, 60);
        assert_eq!(order.filled_quantity(), 40);

        order.fill(60);
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.remaining, 0);
        assert!(order.is_filled());
        assert!(!order.is_active());
    }

    #[test]
    fn test_overfill_is_clamped() {
        let mut order = limit_buy(50);
        order.fill(80);
        assert_eq!(order.remaining, 0);
        assert_eq!(order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_zero_fill_is_a_no_op() {
        let mut order = limit_buy(50);
        order.fill(0);
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.remaining, 50);
    }

    #[test]
    fn test_set_quantity_resets_remaining() {
        let mut order = limit_buy(100);
        order.fill(30);
        order.set_quantity(80);
        assert_eq!(order.quantity, 80);
        assert_eq!(order.remaining, 80);
        assert_eq!(order.filled_quantity(), 0);
    }

    #[test]
    fn test_buy_stop_triggers_on_rise() {
        let stop = Order::new(
            2,
            "AAPL",
            Side::Buy,
            OrderType::StopLoss,
            0,
            100,
            price_from_f64(155.0),
        );
        assert!(!stop.should_trigger(price_from_f64(154.9)));
        assert!(stop.should_trigger(price_from_f64(155.0)));
        assert!(stop.should_trigger(price_from_f64(156.0)));
    }

    #[test]
    fn test_sell_stop_triggers_on_fall() {
        let stop = Order::new(
            3,
            "AAPL",
            Side::Sell,
            OrderType::StopLimit,
            price_from_f64(144.0),
            100,
            price_from_f64(145.0),
        );
        assert!(!stop.should_trigger(price_from_f64(145.1)));
        assert!(stop.should_trigger(price_from_f64(145.0)));
        assert!(stop.should_trigger(price_from_f64(140.0)));
    }

    #[test]
    fn test_non_stop_types_never_trigger() {
        let order = limit_buy(10);
        assert!(!order.should_trigger(price_from_f64(0.0)));
        assert!(!order.should_trigger(price_from_f64(1_000_000.0)));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(OrderStatus::Filled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::PartiallyFilled.is_terminal());
    }

    #[test]
    fn test_price_bound_types() {
        assert!(OrderType::Limit.has_price_bound());
        assert!(OrderType::Ioc.has_price_bound());
        assert!(OrderType::Fok.has_price_bound());
        assert!(OrderType::StopLimit.has_price_bound());
        assert!(!OrderType::Market.has_price_bound());
        assert!(!OrderType::StopLoss.has_price_bound());
    }
}
