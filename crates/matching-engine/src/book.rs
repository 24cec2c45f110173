//! Per-symbol order book
//!
//! One [`OrderBook`] holds the resting liquidity for a single symbol: bids
//! sorted descending, asks sorted ascending, each price level a FIFO queue.
//! All mutable state sits behind one mutex, so every public operation
//! (matching included) is atomic with respect to concurrent calls.
//!
//! Matching walks the opposing side in priority order and fills against
//! resting orders head-first. Trades always execute at the resting order's
//! price; price improvement accrues to the incoming order.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use common::{OrderId, Price, Quantity};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::order::{Order, OrderStatus, OrderType, Side};
use crate::trade::Trade;

// ============================================================================
// Price level
// ============================================================================

/// All resting orders at a single price on one side of the book
///
/// Arrival order is tracked by a queue of order ids; the orders themselves
/// live in an id-keyed map so that removal by id is O(1). A removed id stays
/// in the queue as a tombstone until the matcher walks past it. Re-adding a
/// removed id (modify back onto the same level) reclaims the stale entry
/// first, so each live id appears in the queue exactly once, at the tail.
pub struct PriceLevel {
    price: Price,
    /// Order ids in arrival order; may contain tombstones
    queue: VecDeque<OrderId>,
    orders: HashMap<OrderId, Order>,
    /// Ids removed from `orders` whose queue entries are still pending
    /// reclamation
    tombstones: HashSet<OrderId>,
    /// Sum of `remaining` over the live orders at this level
    total_quantity: Quantity,
}

impl PriceLevel {
    fn new(price: Price) -> Self {
        Self {
            price,
            queue: VecDeque::new(),
            orders: HashMap::new(),
            tombstones: HashSet::new(),
            total_quantity: 0,
        }
    }

    /// Append an order at the tail of the queue
    pub fn add(&mut self, order: Order) {
        // a re-added id must not revive its old queue position
        if self.tombstones.remove(&order.id) {
            self.queue.retain(|&id| id != order.id);
        }
        self.total_quantity += order.remaining;
        self.queue.push_back(order.id);
        self.orders.insert(order.id, order);
    }

    /// Remove an order by id in O(1); returns the removed order.
    pub fn remove(&mut self, id: OrderId) -> Option<Order> {
        let order = self.orders.remove(&id)?;
        self.total_quantity -= order.remaining;
        // the id stays in the arrival queue as a tombstone
        self.tombstones.insert(id);
        Some(order)
    }

    /// Iterate live orders in arrival order
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.queue.iter().filter_map(|id| self.orders.get(id))
    }

    /// The level's price
    pub fn price(&self) -> Price {
        self.price
    }

    /// Aggregate remaining quantity at this level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Number of live orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// True when no live orders remain
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

// ============================================================================
// Order book
// ============================================================================

/// Result of matching one incoming order
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// The incoming order's state after matching (it may also now rest in
    /// the book; this is a snapshot)
    pub order: Order,
    /// Trades produced, in execution order; trade ids are assigned by the
    /// engine after the book returns
    pub trades: Vec<Trade>,
}

struct BookInner {
    /// Bids keyed descending: best (highest) price first
    bids: BTreeMap<Reverse<Price>, PriceLevel>,
    /// Asks keyed ascending: best (lowest) price first
    asks: BTreeMap<Price, PriceLevel>,
    /// Locates the level holding each resting order
    locators: HashMap<OrderId, (Side, Price)>,
}

/// Order book for a single symbol
///
/// One mutex guards the whole book, so a matching pass observes and leaves a
/// consistent book: bids never cross asks after a matching call returns, and
/// level aggregates always equal the sum of their orders' remainders. Only
/// [`modify`](OrderBook::modify) and [`insert_order`](OrderBook::insert_order)
/// can leave a crossed book, since neither re-enters the matcher.
pub struct OrderBook {
    symbol: String,
    inner: Mutex<BookInner>,
}

impl OrderBook {
    /// Create an empty book for `symbol`
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            inner: Mutex::new(BookInner {
                bids: BTreeMap::new(),
                asks: BTreeMap::new(),
                locators: HashMap::new(),
            }),
        }
    }

    /// The symbol this book trades
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Match an incoming order against the book
    ///
    /// Applies the type-specific policy:
    /// - `Limit` matches up to its limit price and rests the remainder.
    /// - `Market` matches without a price bound; any residual is cancelled.
    /// - `Ioc` matches up to its limit; any residual is cancelled.
    /// - `Fok` first checks that the full quantity is available at
    ///   acceptable prices; if not, the order is cancelled and the book is
    ///   left untouched.
    /// - Stop orders submitted directly match as limit orders; trigger
    ///   handling against a reference price is the caller's concern.
    pub fn match_order(&self, mut order: Order) -> MatchOutcome {
        let mut inner = self.inner.lock();
        let mut trades = Vec::new();

        match order.order_type {
            OrderType::Market => {
                inner.match_taker(&mut order, false, &mut trades);
                if order.remaining > 0 {
                    // book exhausted; market orders never rest
                    order.status = OrderStatus::Cancelled;
                }
            }
            OrderType::Limit | OrderType::StopLoss | OrderType::StopLimit => {
                inner.match_taker(&mut order, true, &mut trades);
                if order.remaining > 0 && order.is_active() {
                    inner.insert(order.clone());
                }
            }
            OrderType::Ioc => {
                inner.match_taker(&mut order, true, &mut trades);
                if order.remaining > 0 {
                    order.status = OrderStatus::Cancelled;
                }
            }
            OrderType::Fok => {
                let available = match order.side {
                    Side::Buy => inner.ask_quantity_within(order.price, order.remaining),
                    Side::Sell => inner.bid_quantity_within(order.price, order.remaining),
                };
                if available < order.remaining {
                    debug!(
                        order_id = order.id,
                        available,
                        required = order.remaining,
                        "FOK order cancelled: insufficient liquidity"
                    );
                    order.status = OrderStatus::Cancelled;
                } else {
                    inner.match_taker(&mut order, true, &mut trades);
                }
            }
        }

        MatchOutcome { order, trades }
    }

    /// Insert a resting order without attempting to match it
    pub fn insert_order(&self, order: Order) {
        self.inner.lock().insert(order);
    }

    /// Cancel a resting order; returns false if the id is not in the book.
    pub fn cancel(&self, id: OrderId) -> bool {
        let mut inner = self.inner.lock();
        match inner.remove(id) {
            Some(_) => {
                trace!(order_id = id, symbol = %self.symbol, "order cancelled");
                true
            }
            None => false,
        }
    }

    /// Replace a resting order's price and quantity
    ///
    /// The order is re-queued at the tail of its new price level, so time
    /// priority is lost, and `remaining` is reset to the new quantity even
    /// after partial fills. No re-match is attempted: if the new price
    /// crosses, the order simply rests; callers wanting re-match semantics
    /// should cancel and resubmit.
    pub fn modify(&self, id: OrderId, new_price: Price, new_quantity: Quantity) -> bool {
        let mut inner = self.inner.lock();
        let Some(mut order) = inner.remove(id) else {
            return false;
        };
        order.price = new_price;
        order.set_quantity(new_quantity);
        order.status = OrderStatus::Pending;
        trace!(order_id = id, symbol = %self.symbol, "order modified");
        inner.insert(order);
        true
    }

    /// Look up a resting order by id
    ///
    /// Filled and cancelled orders have left the book and return `None`.
    pub fn get(&self, id: OrderId) -> Option<Order> {
        let inner = self.inner.lock();
        let &(side, price) = inner.locators.get(&id)?;
        let level = match side {
            Side::Buy => inner.bids.get(&Reverse(price)),
            Side::Sell => inner.asks.get(&price),
        }?;
        level.orders.get(&id).cloned()
    }

    /// Best (highest) bid price, if any bids rest
    pub fn best_bid(&self) -> Option<Price> {
        self.inner.lock().bids.keys().next().map(|key| key.0)
    }

    /// Best (lowest) ask price, if any asks rest
    pub fn best_ask(&self) -> Option<Price> {
        self.inner.lock().asks.keys().next().copied()
    }

    /// Aggregate resting quantity at an exact price on one side
    pub fn quantity_at(&self, side: Side, price: Price) -> Quantity {
        let inner = self.inner.lock();
        match side {
            Side::Buy => inner
                .bids
                .get(&Reverse(price))
                .map(|level| level.total_quantity)
                .unwrap_or(0),
            Side::Sell => inner
                .asks
                .get(&price)
                .map(|level| level.total_quantity)
                .unwrap_or(0),
        }
    }

    /// The first `levels` (price, aggregate quantity) pairs on one side, in
    /// priority order
    pub fn depth(&self, side: Side, levels: usize) -> Vec<(Price, Quantity)> {
        let inner = self.inner.lock();
        match side {
            Side::Buy => inner
                .bids
                .iter()
                .take(levels)
                .map(|(key, level)| (key.0, level.total_quantity))
                .collect(),
            Side::Sell => inner
                .asks
                .iter()
                .take(levels)
                .map(|(&price, level)| (price, level.total_quantity))
                .collect(),
        }
    }

    /// Total number of resting orders across both sides
    pub fn order_count(&self) -> usize {
        self.inner.lock().locators.len()
    }

    /// True when neither side holds any orders
    pub fn is_empty(&self) -> bool {
        self.inner.lock().locators.is_empty()
    }
}

impl BookInner {
    /// Match the taker against the opposing side until it is filled, the
    /// price bound stops the scan, or the side is exhausted.
    fn match_taker(&mut self, taker: &mut Order, price_check: bool, trades: &mut Vec<Trade>) {
        match taker.side {
            Side::Buy => self.match_against_asks(taker, price_check, trades),
            Side::Sell => self.match_against_bids(taker, price_check, trades),
        }
    }

    fn match_against_asks(&mut self, taker: &mut Order, price_check: bool, trades: &mut Vec<Trade>) {
        while taker.remaining > 0 {
            let Some(&level_price) = self.asks.keys().next() else {
                break;
            };
            if price_check && level_price > taker.price {
                break;
            }
            let Some(level) = self.asks.get_mut(&level_price) else {
                break;
            };
            fill_at_level(taker, level, &mut self.locators, trades);
            if level.is_empty() {
                self.asks.remove(&level_price);
            }
        }
    }

    fn match_against_bids(&mut self, taker: &mut Order, price_check: bool, trades: &mut Vec<Trade>) {
        while taker.remaining > 0 {
            let Some(&Reverse(level_price)) = self.bids.keys().next() else {
                break;
            };
            if price_check && level_price < taker.price {
                break;
            }
            let Some(level) = self.bids.get_mut(&Reverse(level_price)) else {
                break;
            };
            fill_at_level(taker, level, &mut self.locators, trades);
            if level.is_empty() {
                self.bids.remove(&Reverse(level_price));
            }
        }
    }

    /// Insert a resting order at its price level, creating the level on
    /// first use
    fn insert(&mut self, order: Order) {
        self.locators.insert(order.id, (order.side, order.price));
        match order.side {
            Side::Buy => self
                .bids
                .entry(Reverse(order.price))
                .or_insert_with(|| PriceLevel::new(order.price))
                .add(order),
            Side::Sell => self
                .asks
                .entry(order.price)
                .or_insert_with(|| PriceLevel::new(order.price))
                .add(order),
        }
    }

    /// Remove a resting order, deleting its level if it becomes empty
    fn remove(&mut self, id: OrderId) -> Option<Order> {
        let &(side, price) = self.locators.get(&id)?;
        let order = match side {
            Side::Buy => {
                let level = self.bids.get_mut(&Reverse(price))?;
                let order = level.remove(id)?;
                if level.is_empty() {
                    self.bids.remove(&Reverse(price));
                }
                order
            }
            Side::Sell => {
                let level = self.asks.get_mut(&price)?;
                let order = level.remove(id)?;
                if level.is_empty() {
                    self.asks.remove(&price);
                }
                order
            }
        };
        self.locators.remove(&id);
        Some(order)
    }

    /// Ask quantity available at or below `limit`, scanning best-first and
    /// stopping early once `required` is reached
    fn ask_quantity_within(&self, limit: Price, required: Quantity) -> Quantity {
        let mut available = 0;
        for (&price, level) in &self.asks {
            if price > limit {
                break;
            }
            available += level.total_quantity;
            if available >= required {
                break;
            }
        }
        available
    }

    /// Bid quantity available at or above `limit`
    fn bid_quantity_within(&self, limit: Price, required: Quantity) -> Quantity {
        let mut available = 0;
        for (&Reverse(price), level) in &self.bids {
            if price < limit {
                break;
            }
            available += level.total_quantity;
            if available >= required {
                break;
            }
        }
        available
    }
}

/// Fill the taker against one price level, head-first, until the taker is
/// done or the level is exhausted. Fully filled makers are removed from the
/// level and the locator index.
fn fill_at_level(
    taker: &mut Order,
    level: &mut PriceLevel,
    locators: &mut HashMap<OrderId, (Side, Price)>,
    trades: &mut Vec<Trade>,
) {
    while taker.remaining > 0 {
        // drop tombstones left by cancel/modify at the head of the queue
        while let Some(&id) = level.queue.front() {
            if level.orders.contains_key(&id) {
                break;
            }
            level.queue.pop_front();
            level.tombstones.remove(&id);
        }
        let Some(&maker_id) = level.queue.front() else {
            break;
        };
        let Some(maker) = level.orders.get_mut(&maker_id) else {
            break;
        };

        let fill = taker.remaining.min(maker.remaining);
        let (buy_id, sell_id) = match taker.side {
            Side::Buy => (taker.id, maker.id),
            Side::Sell => (maker.id, taker.id),
        };
        trades.push(Trade::new(
            buy_id,
            sell_id,
            taker.symbol.clone(),
            maker.price,
            fill,
        ));
        debug!(
            buy_order_id = buy_id,
            sell_order_id = sell_id,
            price = maker.price,
            quantity = fill,
            "trade executed"
        );

        taker.fill(fill);
        maker.fill(fill);
        level.total_quantity -= fill;

        if maker.is_filled() {
            level.orders.remove(&maker_id);
            level.queue.pop_front();
            locators.remove(&maker_id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use common::price_from_f64;

    fn order(id: OrderId, side: Side, order_type: OrderType, price: f64, qty: Quantity) -> Order {
        Order::new(
            id,
            "AAPL",
            side,
            order_type,
            price_from_f64(price),
            qty,
            0,
        )
    }

    fn limit(id: OrderId, side: Side, price: f64, qty: Quantity) -> Order {
        order(id, side, OrderType::Limit, price, qty)
    }

    /// Sum of remaining over every resting order equals every level's
    /// reported aggregate
    fn assert_level_aggregates(book: &OrderBook) {
        let inner = book.inner.lock();
        for level in inner.bids.values().chain(inner.asks.values()) {
            let sum: Quantity = level.orders().map(|o| o.remaining).sum();
            assert_eq!(level.total_quantity(), sum);
        }
    }

    fn assert_not_crossed(book: &OrderBook) {
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            assert!(bid < ask, "book crossed: bid {} >= ask {}", bid, ask);
        }
    }

    #[test]
    fn test_empty_book() {
        let book = OrderBook::new("AAPL");
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert!(book.is_empty());
        assert_eq!(book.order_count(), 0);
    }

    #[test]
    fn test_resting_orders_do_not_cross() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Buy, 149.0, 100));
        book.match_order(limit(2, Side::Sell, 151.0, 100));

        assert_eq!(book.best_bid(), Some(price_from_f64(149.0)));
        assert_eq!(book.best_ask(), Some(price_from_f64(151.0)));
        assert_eq!(book.order_count(), 2);
        assert_not_crossed(&book);
    }

    #[test]
    fn test_simple_cross() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 100));
        let outcome = book.match_order(limit(2, Side::Buy, 150.0, 100));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, price_from_f64(150.0));
        assert_eq!(outcome.trades[0].quantity, 100);
        assert_eq!(outcome.trades[0].buy_order_id, 2);
        assert_eq!(outcome.trades[0].sell_order_id, 1);
        assert_eq!(outcome.order.status, OrderStatus::Filled);
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_partial_fill_rests_remainder() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));
        let outcome = book.match_order(limit(2, Side::Buy, 150.0, 120));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, 50);
        assert_eq!(outcome.order.status, OrderStatus::PartiallyFilled);
        assert_eq!(outcome.order.remaining, 70);

        // the remainder now rests as the best bid
        assert_eq!(book.best_bid(), Some(price_from_f64(150.0)));
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.quantity_at(Side::Buy, price_from_f64(150.0)), 70);
        assert_level_aggregates(&book);
    }

    #[test]
    fn test_multi_level_walk() {
        let book = OrderBook::new("AAPL");
        book.insert_order(limit(1, Side::Sell, 150.0, 50));
        book.insert_order(limit(2, Side::Sell, 150.5, 50));
        book.insert_order(limit(3, Side::Sell, 151.0, 50));

        let outcome = book.match_order(limit(4, Side::Buy, 151.0, 120));

        let executed: Vec<(Price, Quantity)> =
            outcome.trades.iter().map(|t| (t.price, t.quantity)).collect();
        assert_eq!(
            executed,
            vec![
                (price_from_f64(150.0), 50),
                (price_from_f64(150.5), 50),
                (price_from_f64(151.0), 20),
            ]
        );
        assert_eq!(outcome.order.status, OrderStatus::Filled);
        assert_eq!(book.quantity_at(Side::Sell, price_from_f64(151.0)), 30);
        assert_not_crossed(&book);
        assert_level_aggregates(&book);
    }

    #[test]
    fn test_price_time_priority_within_level() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 100));
        book.match_order(limit(2, Side::Sell, 150.0, 100));
        book.match_order(limit(3, Side::Sell, 150.0, 100));

        let outcome = book.match_order(limit(4, Side::Buy, 150.0, 150));

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].sell_order_id, 1);
        assert_eq!(outcome.trades[0].quantity, 100);
        assert_eq!(outcome.trades[1].sell_order_id, 2);
        assert_eq!(outcome.trades[1].quantity, 50);

        // s2 keeps 50, s3 untouched
        assert_eq!(book.get(2).map(|o| o.remaining), Some(50));
        assert_eq!(book.get(3).map(|o| o.remaining), Some(100));
        assert_eq!(book.get(1), None);
        assert_level_aggregates(&book);
    }

    #[test]
    fn test_passive_order_price_used() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 100));
        let outcome = book.match_order(limit(2, Side::Buy, 152.0, 50));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, price_from_f64(150.0));
    }

    #[test]
    fn test_aggressive_sell_takes_best_bids_first() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Buy, 150.0, 100));
        book.match_order(limit(2, Side::Buy, 149.5, 100));

        let outcome = book.match_order(limit(3, Side::Sell, 149.0, 150));

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price, price_from_f64(150.0));
        assert_eq!(outcome.trades[0].quantity, 100);
        assert_eq!(outcome.trades[1].price, price_from_f64(149.5));
        assert_eq!(outcome.trades[1].quantity, 50);
        assert_eq!(book.quantity_at(Side::Buy, price_from_f64(149.5)), 50);
        assert_not_crossed(&book);
    }

    #[test]
    fn test_market_order_ignores_price() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));
        book.match_order(limit(2, Side::Sell, 199.0, 50));

        let outcome = book.match_order(order(3, Side::Buy, OrderType::Market, 0.0, 80));

        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].price, price_from_f64(150.0));
        assert_eq!(outcome.trades[1].price, price_from_f64(199.0));
        assert_eq!(outcome.order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_market_order_residual_is_cancelled() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));

        let outcome = book.match_order(order(2, Side::Buy, OrderType::Market, 0.0, 100));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(outcome.order.remaining, 50);
        // the residual never rests
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_ioc_partial_then_cancelled() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));

        let outcome = book.match_order(order(2, Side::Buy, OrderType::Ioc, 150.0, 100));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].quantity, 50);
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(book.best_bid(), None);
        assert!(book.is_empty());
    }

    #[test]
    fn test_ioc_respects_its_limit() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));
        book.match_order(limit(2, Side::Sell, 151.0, 50));

        let outcome = book.match_order(order(3, Side::Buy, OrderType::Ioc, 150.0, 100));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, price_from_f64(150.0));
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        // the level beyond the limit is untouched
        assert_eq!(book.quantity_at(Side::Sell, price_from_f64(151.0)), 50);
    }

    #[test]
    fn test_fok_fills_entirely() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 60));
        book.match_order(limit(2, Side::Sell, 150.5, 60));

        let outcome = book.match_order(order(3, Side::Buy, OrderType::Fok, 150.5, 100));

        assert_eq!(outcome.order.status, OrderStatus::Filled);
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades.iter().map(|t| t.quantity).sum::<u64>(), 100);
        assert_eq!(book.quantity_at(Side::Sell, price_from_f64(150.5)), 20);
    }

    #[test]
    fn test_fok_rejected_leaves_book_untouched() {
        let book = OrderBook::new("AAPL");
        book.insert_order(limit(1, Side::Sell, 150.0, 50));

        let outcome = book.match_order(order(2, Side::Buy, OrderType::Fok, 150.0, 100));

        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        // resting ask is exactly as before
        assert_eq!(book.best_ask(), Some(price_from_f64(150.0)));
        assert_eq!(book.quantity_at(Side::Sell, price_from_f64(150.0)), 50);
        assert_eq!(book.get(1).map(|o| o.remaining), Some(50));
    }

    #[test]
    fn test_fok_ignores_liquidity_beyond_its_limit() {
        let book = OrderBook::new("AAPL");
        book.insert_order(limit(1, Side::Sell, 150.0, 50));
        book.insert_order(limit(2, Side::Sell, 152.0, 100));

        // enough total quantity, but not at acceptable prices
        let outcome = book.match_order(order(3, Side::Buy, OrderType::Fok, 150.0, 100));

        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(book.quantity_at(Side::Sell, price_from_f64(150.0)), 50);
    }

    #[test]
    fn test_stop_order_matches_as_limit() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 100));

        let mut stop = order(2, Side::Buy, OrderType::StopLimit, 150.0, 50);
        stop.stop_price = price_from_f64(149.0);
        let outcome = book.match_order(stop);

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].price, price_from_f64(150.0));
        assert_eq!(outcome.order.status, OrderStatus::Filled);
    }

    #[test]
    fn test_cancel_resting_order() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Buy, 150.0, 100));

        assert!(book.cancel(1));
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);

        // a second cancel of the same id fails
        assert!(!book.cancel(1));
    }

    #[test]
    fn test_cancel_unknown_order() {
        let book = OrderBook::new("AAPL");
        assert!(!book.cancel(999));
    }

    #[test]
    fn test_cancelled_order_is_skipped_by_matching() {
        let book = OrderBook::new("AAPL");
        book.insert_order(limit(1, Side::Sell, 150.0, 50));
        book.insert_order(limit(2, Side::Sell, 150.0, 50));
        assert!(book.cancel(1));

        let outcome = book.match_order(limit(3, Side::Buy, 150.0, 50));

        assert_eq!(outcome.trades.len(), 1);
        assert_eq!(outcome.trades[0].sell_order_id, 2);
        assert!(book.is_empty());
    }

    #[test]
    fn test_modify_moves_order_and_resets_quantity() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Buy, 150.0, 100));

        assert!(book.modify(1, price_from_f64(151.0), 80));

        let modified = book.get(1).unwrap();
        assert_eq!(modified.price, price_from_f64(151.0));
        assert_eq!(modified.quantity, 80);
        assert_eq!(modified.remaining, 80);
        assert_eq!(modified.status, OrderStatus::Pending);
        assert_eq!(book.best_bid(), Some(price_from_f64(151.0)));
        assert_eq!(book.quantity_at(Side::Buy, price_from_f64(150.0)), 0);
    }

    #[test]
    fn test_modify_loses_time_priority() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));
        book.match_order(limit(2, Side::Sell, 150.0, 50));

        // o1 re-queues behind o2 at the same price
        assert!(book.modify(1, price_from_f64(150.0), 50));

        let outcome = book.match_order(limit(3, Side::Buy, 150.0, 50));
        assert_eq!(outcome.trades[0].sell_order_id, 2);
    }

    #[test]
    fn test_modify_within_same_level_requeues_at_the_tail() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 50));
        book.match_order(limit(2, Side::Sell, 150.0, 50));

        // same price: the stale queue entry for o1 must not be revived
        assert!(book.modify(1, price_from_f64(150.0), 80));

        {
            let inner = book.inner.lock();
            let level = inner.asks.get(&price_from_f64(150.0)).unwrap();
            let ids: Vec<OrderId> = level.orders().map(|o| o.id).collect();
            assert_eq!(ids, vec![2, 1]);
            assert_eq!(level.total_quantity(), 130);
        }

        // the matcher consumes o2 first, then the re-queued o1
        let outcome = book.match_order(limit(3, Side::Buy, 150.0, 70));
        assert_eq!(outcome.trades.len(), 2);
        assert_eq!(outcome.trades[0].sell_order_id, 2);
        assert_eq!(outcome.trades[0].quantity, 50);
        assert_eq!(outcome.trades[1].sell_order_id, 1);
        assert_eq!(outcome.trades[1].quantity, 20);
        assert_level_aggregates(&book);
    }

    #[test]
    fn test_modify_does_not_rematch() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 151.0, 50));
        book.match_order(limit(2, Side::Buy, 150.0, 50));

        // the new bid price crosses the ask, but modify never matches
        assert!(book.modify(2, price_from_f64(151.0), 50));
        assert_eq!(book.best_bid(), Some(price_from_f64(151.0)));
        assert_eq!(book.best_ask(), Some(price_from_f64(151.0)));
        assert_eq!(book.get(1).map(|o| o.remaining), Some(50));
    }

    #[test]
    fn test_modify_unknown_order() {
        let book = OrderBook::new("AAPL");
        assert!(!book.modify(42, price_from_f64(1.0), 1));
    }

    #[test]
    fn test_get_resting_and_absent() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Buy, 150.0, 100));

        let found = book.get(1).unwrap();
        assert_eq!(found.id, 1);
        assert_eq!(found.remaining, 100);
        assert_eq!(book.get(2), None);
    }

    #[test]
    fn test_depth_in_priority_order() {
        let book = OrderBook::new("AAPL");
        book.insert_order(limit(1, Side::Buy, 149.0, 10));
        book.insert_order(limit(2, Side::Buy, 150.0, 20));
        book.insert_order(limit(3, Side::Buy, 148.0, 30));
        book.insert_order(limit(4, Side::Sell, 151.0, 40));
        book.insert_order(limit(5, Side::Sell, 152.0, 50));

        let bids = book.depth(Side::Buy, 2);
        assert_eq!(
            bids,
            vec![(price_from_f64(150.0), 20), (price_from_f64(149.0), 10)]
        );

        let asks = book.depth(Side::Sell, 10);
        assert_eq!(
            asks,
            vec![(price_from_f64(151.0), 40), (price_from_f64(152.0), 50)]
        );
    }

    #[test]
    fn test_level_aggregate_tracks_partial_fills() {
        let book = OrderBook::new("AAPL");
        book.match_order(limit(1, Side::Sell, 150.0, 100));
        book.match_order(limit(2, Side::Sell, 150.0, 100));
        book.match_order(limit(3, Side::Buy, 150.0, 130));

        assert_eq!(book.quantity_at(Side::Sell, price_from_f64(150.0)), 70);
        assert_level_aggregates(&book);
    }

    #[test]
    fn test_conservation_across_operations() {
        let book = OrderBook::new("AAPL");
        let submitted: Vec<Order> = vec![
            limit(1, Side::Sell, 150.0, 100),
            limit(2, Side::Sell, 150.5, 80),
            limit(3, Side::Buy, 150.5, 120),
            limit(4, Side::Buy, 149.0, 40),
            order(5, Side::Sell, OrderType::Ioc, 149.0, 90),
        ];

        let mut all_trades = Vec::new();
        let mut outcomes = Vec::new();
        for o in submitted {
            let outcome = book.match_order(o);
            all_trades.extend(outcome.trades.clone());
            outcomes.push(outcome.order);
        }

        // original = remaining + traded quantity, for every order. An order
        // absent from the book either filled completely (remaining 0) or had
        // its residual cancelled at submit time (the snapshot is final).
        for snapshot in &outcomes {
            let traded: Quantity = all_trades
                .iter()
                .filter(|t| t.buy_order_id == snapshot.id || t.sell_order_id == snapshot.id)
                .map(|t| t.quantity)
                .sum();
            let remaining = match book.get(snapshot.id) {
                Some(resting) => resting.remaining,
                None if snapshot.status == OrderStatus::Cancelled => snapshot.remaining,
                None => 0,
            };
            assert_eq!(snapshot.quantity, remaining + traded, "order {}", snapshot.id);
        }
        assert_not_crossed(&book);
        assert_level_aggregates(&book);
    }
}
