//! Cross-book matching engine
//!
//! The [`MatchingEngine`] owns one [`OrderBook`] per symbol, allocates order
//! and trade ids, routes submit/cancel/modify to the right book, and fans
//! matching results out to observer callbacks.
//!
//! # Locking
//!
//! Two levels of locking: an engine mutex guards the symbol→book and
//! id→symbol indices, and each book carries its own mutex. The lock order is
//! strictly engine first, then book (no path holds a book lock while taking
//! the engine lock), so submit/cancel/modify may be called freely from any
//! number of threads. Ids come from atomic counters allocated before the
//! book lock is taken; within a book, priority is determined by arrival
//! order at the book lock.
//!
//! # Callbacks
//!
//! `on_order` fires twice per submit (pre-match and post-match snapshots)
//! and `on_trade` once per trade, synchronously on the submitting thread and
//! outside any book lock. Callbacks must not call back into the engine.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use common::{OrderId, Price, Quantity};
use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::book::OrderBook;
use crate::error::RejectReason;
use crate::order::{Order, OrderStatus, OrderType, Side};
use crate::trade::Trade;

/// Longest symbol the engine accepts, matching the wire field width.
pub const MAX_SYMBOL_LEN: usize = 16;

/// Observer invoked with order snapshots (pre- and post-match)
pub type OrderCallback = Box<dyn Fn(&Order) + Send + Sync>;

/// Observer invoked once per executed trade
pub type TradeCallback = Box<dyn Fn(&Trade) + Send + Sync>;

/// A new-order instruction, as parsed by the transport
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Instrument symbol
    pub symbol: String,
    /// Buy or sell
    pub side: Side,
    /// Matching policy
    pub order_type: OrderType,
    /// Limit price (fixed-point); 0 for pure market orders
    pub price: Price,
    /// Quantity to trade
    pub quantity: Quantity,
    /// Trigger price for stop orders; 0 otherwise
    pub stop_price: Price,
    /// Opaque client tag echoed on the order
    pub client_tag: String,
}

/// Everything the caller needs to know about one submit
#[derive(Debug, Clone)]
pub struct SubmitResult {
    /// The id allocated for this order
    pub order_id: OrderId,
    /// Post-match snapshot of the order
    pub order: Order,
    /// Trades produced by this submit, in execution order
    pub trades: Vec<Trade>,
    /// Set when the order failed defensive validation; the book was not
    /// touched
    pub rejection: Option<RejectReason>,
}

struct EngineIndex {
    books: HashMap<String, Arc<OrderBook>>,
    /// Routes cancel/modify (which carry no symbol) to the owning book
    order_symbols: HashMap<OrderId, String>,
}

/// The cross-book matching engine
pub struct MatchingEngine {
    index: Mutex<EngineIndex>,
    next_order_id: AtomicU64,
    next_trade_id: AtomicU64,
    total_orders: AtomicU64,
    total_trades: AtomicU64,
    order_callback: RwLock<Option<OrderCallback>>,
    trade_callback: RwLock<Option<TradeCallback>>,
}

impl MatchingEngine {
    /// Create an engine with no books; books are created lazily on the
    /// first order for each symbol.
    pub fn new() -> Self {
        Self {
            index: Mutex::new(EngineIndex {
                books: HashMap::new(),
                order_symbols: HashMap::new(),
            }),
            next_order_id: AtomicU64::new(1),
            next_trade_id: AtomicU64::new(1),
            total_orders: AtomicU64::new(0),
            total_trades: AtomicU64::new(0),
            order_callback: RwLock::new(None),
            trade_callback: RwLock::new(None),
        }
    }

    /// Register the order observer. Fired pre- and post-match for every
    /// submit; must not re-enter the engine.
    pub fn set_order_callback(&self, callback: impl Fn(&Order) + Send + Sync + 'static) {
        *self.order_callback.write() = Some(Box::new(callback));
    }

    /// Register the trade observer. Fired once per trade; must not re-enter
    /// the engine.
    pub fn set_trade_callback(&self, callback: impl Fn(&Trade) + Send + Sync + 'static) {
        *self.trade_callback.write() = Some(Box::new(callback));
    }

    /// Submit an order: allocate an id, validate, match against the symbol's
    /// book, and deliver callbacks.
    pub fn submit(&self, request: NewOrder) -> SubmitResult {
        let order_id = self.next_order_id.fetch_add(1, Ordering::SeqCst);
        self.total_orders.fetch_add(1, Ordering::Relaxed);

        let mut order = Order::new(
            order_id,
            request.symbol.clone(),
            request.side,
            request.order_type,
            request.price,
            request.quantity,
            request.stop_price,
        )
        .with_client_tag(request.client_tag.clone());

        if let Err(reason) = validate(&request) {
            warn!(order_id, symbol = %request.symbol, %reason, "order rejected");
            order.status = OrderStatus::Rejected;
            self.notify_order(&order);
            return SubmitResult {
                order_id,
                order,
                trades: Vec::new(),
                rejection: Some(reason),
            };
        }

        info!(
            order_id,
            symbol = %order.symbol,
            side = %order.side,
            order_type = %order.order_type,
            price = order.price,
            quantity = order.quantity,
            "submitting order"
        );

        let book = {
            let mut index = self.index.lock();
            let book = index
                .books
                .entry(request.symbol.clone())
                .or_insert_with(|| Arc::new(OrderBook::new(request.symbol.clone())))
                .clone();
            index.order_symbols.insert(order_id, request.symbol);
            book
        };

        self.notify_order(&order);

        let mut outcome = book.match_order(order);

        for trade in &mut outcome.trades {
            trade.id = self.next_trade_id.fetch_add(1, Ordering::SeqCst);
            self.total_trades.fetch_add(1, Ordering::Relaxed);
            self.notify_trade(trade);
        }

        self.notify_order(&outcome.order);

        // retired orders have left the book; drop their routing entries.
        // Makers consumed by this match are found via the trade list.
        if outcome.order.status.is_terminal() || !outcome.trades.is_empty() {
            let mut index = self.index.lock();
            if outcome.order.status.is_terminal() {
                index.order_symbols.remove(&order_id);
            }
            for trade in &outcome.trades {
                let maker_id = match outcome.order.side {
                    Side::Buy => trade.sell_order_id,
                    Side::Sell => trade.buy_order_id,
                };
                if book.get(maker_id).is_none() {
                    index.order_symbols.remove(&maker_id);
                }
            }
        }

        SubmitResult {
            order_id,
            order: outcome.order,
            trades: outcome.trades,
            rejection: None,
        }
    }

    /// Cancel a resting order by id; false if the id is unknown or already
    /// retired.
    pub fn cancel(&self, order_id: OrderId) -> bool {
        let Some(book) = self.book_for_order(order_id) else {
            return false;
        };
        let cancelled = book.cancel(order_id);
        if cancelled {
            info!(order_id, symbol = %book.symbol(), "order cancelled");
            self.index.lock().order_symbols.remove(&order_id);
        }
        cancelled
    }

    /// Modify a resting order's price and quantity; time priority is lost.
    pub fn modify(&self, order_id: OrderId, new_price: Price, new_quantity: Quantity) -> bool {
        let Some(book) = self.book_for_order(order_id) else {
            return false;
        };
        let modified = book.modify(order_id, new_price, new_quantity);
        if modified {
            info!(
                order_id,
                symbol = %book.symbol(),
                price = new_price,
                quantity = new_quantity,
                "order modified"
            );
        }
        modified
    }

    /// Look up a resting order by id
    pub fn get(&self, order_id: OrderId) -> Option<Order> {
        self.book_for_order(order_id)?.get(order_id)
    }

    /// Best bid for a symbol, if its book exists and has bids
    pub fn best_bid(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.best_bid()
    }

    /// Best ask for a symbol, if its book exists and has asks
    pub fn best_ask(&self, symbol: &str) -> Option<Price> {
        self.book(symbol)?.best_ask()
    }

    /// Aggregate resting quantity at an exact price
    pub fn quantity_at(&self, symbol: &str, side: Side, price: Price) -> Quantity {
        self.book(symbol)
            .map(|book| book.quantity_at(side, price))
            .unwrap_or(0)
    }

    /// Book depth for one side of a symbol, best price first
    pub fn depth(&self, symbol: &str, side: Side, levels: usize) -> Vec<(Price, Quantity)> {
        self.book(symbol)
            .map(|book| book.depth(side, levels))
            .unwrap_or_default()
    }

    /// Total orders submitted over the engine's lifetime
    pub fn total_orders(&self) -> u64 {
        self.total_orders.load(Ordering::Relaxed)
    }

    /// Total trades executed over the engine's lifetime
    pub fn total_trades(&self) -> u64 {
        self.total_trades.load(Ordering::Relaxed)
    }

    fn book(&self, symbol: &str) -> Option<Arc<OrderBook>> {
        self.index.lock().books.get(symbol).cloned()
    }

    fn book_for_order(&self, order_id: OrderId) -> Option<Arc<OrderBook>> {
        let index = self.index.lock();
        let symbol = index.order_symbols.get(&order_id)?;
        index.books.get(symbol).cloned()
    }

    fn notify_order(&self, order: &Order) {
        if let Some(callback) = self.order_callback.read().as_ref() {
            callback(order);
        }
    }

    fn notify_trade(&self, trade: &Trade) {
        if let Some(callback) = self.trade_callback.read().as_ref() {
            callback(trade);
        }
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(request: &NewOrder) -> Result<(), RejectReason> {
    if request.symbol.is_empty() {
        return Err(RejectReason::EmptySymbol);
    }
    if request.symbol.len() > MAX_SYMBOL_LEN {
        return Err(RejectReason::SymbolTooLong(MAX_SYMBOL_LEN));
    }
    if request.quantity == 0 {
        return Err(RejectReason::ZeroQuantity);
    }
    if request.order_type.has_price_bound() && request.price <= 0 {
        return Err(RejectReason::NonPositivePrice);
    }
    if request.order_type.is_stop() && request.stop_price <= 0 {
        return Err(RejectReason::NonPositiveStopPrice);
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
