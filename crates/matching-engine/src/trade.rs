//! Trade records
//!
//! A [`Trade`] is the immutable result of matching one resting order against
//! one incoming order. Its price is always the resting order's price at the
//! time of the match.

use chrono::{DateTime, Utc};
use common::{price_to_f64, OrderId, Price, Quantity, TradeId};
use serde::{Deserialize, Serialize};

/// An executed match between a buy order and a sell order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Engine-assigned trade identifier (monotonically increasing)
    pub id: TradeId,
    /// Id of the buy-side order
    pub buy_order_id: OrderId,
    /// Id of the sell-side order
    pub sell_order_id: OrderId,
    /// Instrument symbol
    pub symbol: String,
    /// Execution price, always the resting order's price
    pub price: Price,
    /// Executed quantity
    pub quantity: Quantity,
    /// Execution time
    pub executed_at: DateTime<Utc>,
}

impl Trade {
    /// Create a trade record; the engine assigns the trade id after matching.
    pub fn new(
        buy_order_id: OrderId,
        sell_order_id: OrderId,
        symbol: impl Into<String>,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id: 0,
            buy_order_id,
            sell_order_id,
            symbol: symbol.into(),
            price,
            quantity,
            executed_at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Trade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Trade[id={} {} {} @ {:.4} buy={} sell={}]",
            self.id,
            self.symbol,
            self.quantity,
            price_to_f64(self.price),
            self.buy_order_id,
            self.sell_order_id
        )
    }
}
