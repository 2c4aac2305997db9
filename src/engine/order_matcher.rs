// ============================================================================
// Order Matcher
// Price/time priority (FIFO) limit order book
// ============================================================================

use crate::domain::{BookLevel, Order, OrderBookSide, OrderHandle, Side};
use crate::error::{MarketError, MarketResult};
use rust_decimal::Decimal;
use slab::Slab;
use std::collections::HashMap;

/// Result of inserting an order
#[derive(Debug, Clone, Default)]
pub struct InsertOutcome {
    /// Handle of the resting remainder, if any quantity was left in the book
    pub resting: Option<OrderHandle>,

    /// Post-fill copies of both orders of every match, resting order first
    pub fills: Vec<Order>,

    /// Number of individual matches
    pub match_count: usize,
}

/// Arena entry: a resting order tagged with the sequence of its handle
#[derive(Debug)]
struct Resting {
    sequence: u64,
    order: Order,
}

/// Price/time priority matching engine for one instrument.
///
/// Orders at the same price level are matched in arrival order. An incoming
/// order always trades at the resting order's price and drains every
/// eligible contra level before its remainder rests, so the book is never
/// left crossed.
///
/// # Example
/// ```text
/// Book:  100 @ 1 (Order A, t=100)
///        100 @ 2 (Order B, t=101)
///
/// Incoming: Buy 1.5 @ 100
/// Result: Match 1.0 with A, then 0.5 with B
/// ```
#[derive(Debug)]
pub struct OrderMatcher {
    /// Trading instrument (e.g., "EURUSD")
    symbol: String,

    /// Arena owning every resting order
    orders: Slab<Resting>,

    /// Bid side of the order book
    bids: OrderBookSide,

    /// Ask side of the order book
    asks: OrderBookSide,

    /// Client id index for O(1) lookups (for find/erase)
    index: HashMap<(Side, String), OrderHandle>,

    /// Sequence counter distinguishing reused arena slots
    sequence_counter: u64,
}

impl OrderMatcher {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            orders: Slab::new(),
            bids: OrderBookSide::new(Side::Buy),
            asks: OrderBookSide::new(Side::Sell),
            index: HashMap::new(),
            sequence_counter: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Match `order` against the opposite side, then rest any limit remainder.
    pub fn insert(&mut self, mut order: Order) -> MarketResult<InsertOutcome> {
        self.validate_order(&order)?;

        let mut outcome = InsertOutcome::default();
        let halted = self.match_order(&mut order, &mut outcome);

        if order.is_closed() {
            return Ok(outcome);
        }

        if halted {
            // Resting the remainder would leave the book crossed
            order.cancel();
            tracing::warn!(
                client_order_id = %order.client_order_id,
                cancelled = %order.cancelled_quantity(),
                "remainder cancelled after out of range fill"
            );
            return Ok(outcome);
        }

        if order.is_market_order() {
            // Nothing left to trade against and no price to rest at
            order.cancel();
            tracing::debug!(
                client_order_id = %order.client_order_id,
                cancelled = %order.cancelled_quantity(),
                "market order remainder cancelled"
            );
            return Ok(outcome);
        }

        outcome.resting = Some(self.add_to_book(order));
        Ok(outcome)
    }

    /// Remove a resting order by side and client id.
    ///
    /// Returns the cancelled order, or `None` if it was not resting
    /// (already filled, already erased, or never inserted).
    pub fn erase(&mut self, side: Side, client_order_id: &str) -> Option<Order> {
        let handle = self.index.remove(&(side, client_order_id.to_string()))?;
        let mut order = self.orders.try_remove(handle.key)?.order;

        if let Some(price) = order.price {
            self.side_mut(side).remove_order(price, handle);
        }
        order.cancel();

        tracing::debug!(%client_order_id, ?side, "order erased");
        Some(order)
    }

    pub fn find(&self, side: Side, client_order_id: &str) -> MarketResult<&Order> {
        self.index
            .get(&(side, client_order_id.to_string()))
            .and_then(|handle| self.get(*handle))
            .ok_or_else(|| MarketError::NotFound {
                side,
                id: client_order_id.to_string(),
            })
    }

    /// Resolve a handle returned by [`insert`](Self::insert)
    pub fn get(&self, handle: OrderHandle) -> Option<&Order> {
        self.orders
            .get(handle.key)
            .filter(|resting| resting.sequence == handle.sequence)
            .map(|resting| &resting.order)
    }

    /// Aggregated view: one row per price tier with the sum of `valuation`
    /// over the orders at that tier.
    pub fn book_levels(&self, valuation: impl Fn(&Order) -> Decimal) -> Vec<BookLevel> {
        let aggregate = |side: &OrderBookSide| -> Vec<(Decimal, Decimal)> {
            side.iter_levels()
                .map(|(price, handles)| {
                    let value = handles
                        .iter()
                        .filter_map(|handle| self.orders.get(handle.key))
                        .map(|resting| valuation(&resting.order))
                        .sum();
                    (*price, value)
                })
                .collect()
        };

        let bids = aggregate(&self.bids);
        let asks = aggregate(&self.asks);

        (0..bids.len().max(asks.len()))
            .map(|i| BookLevel {
                bid_price: bids.get(i).map(|(price, _)| *price),
                bid_value: bids.get(i).map_or(Decimal::ZERO, |(_, value)| *value),
                ask_price: asks.get(i).map(|(price, _)| *price),
                ask_value: asks.get(i).map_or(Decimal::ZERO, |(_, value)| *value),
            })
            .collect()
    }

    pub fn best_bid(&self) -> Option<Decimal> {
        self.bids.best_price()
    }

    pub fn best_ask(&self) -> Option<Decimal> {
        self.asks.best_price()
    }

    pub fn bid_depth(&self) -> usize {
        self.bids.depth()
    }

    pub fn ask_depth(&self) -> usize {
        self.asks.depth()
    }

    /// Number of resting orders
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    // ========================================================================
    // Private methods
    // ========================================================================

    /// Returns true when matching stopped at a fill whose notional does not
    /// fit a `Decimal`, with the book still crossing the incoming order.
    fn match_order(&mut self, incoming: &mut Order, outcome: &mut InsertOutcome) -> bool {
        let Self {
            orders,
            bids,
            asks,
            index,
            ..
        } = self;
        let opposite = match incoming.side {
            Side::Buy => asks,
            Side::Sell => bids,
        };

        while !incoming.is_closed() {
            // Get best price level
            let Some((price, handle)) = opposite.front() else {
                break;
            };

            // Check if prices cross
            if !prices_cross(incoming, price) {
                break;
            }

            let Some(maker) = orders.get_mut(handle.key).map(|resting| &mut resting.order) else {
                opposite.pop_front(price);
                continue;
            };

            let quantity = maker.open_quantity().min(incoming.open_quantity());
            if !maker.can_execute(price, quantity) || !incoming.can_execute(price, quantity) {
                tracing::warn!(
                    maker = %maker.client_order_id,
                    taker = %incoming.client_order_id,
                    %price,
                    %quantity,
                    "fill out of range, matching halted"
                );
                return true;
            }
            let filled = maker.execute(price, quantity) && incoming.execute(price, quantity);
            debug_assert!(filled, "crossing orders failed to fill {}", quantity);

            outcome.fills.push(maker.clone());
            outcome.fills.push(incoming.clone());
            outcome.match_count += 1;

            tracing::debug!(
                maker = %maker.client_order_id,
                taker = %incoming.client_order_id,
                %price,
                %quantity,
                "orders matched"
            );

            if maker.is_closed() {
                opposite.pop_front(price);
                let maker = orders.remove(handle.key).order;
                index.remove(&(maker.side, maker.client_order_id));
            }
        }
        false
    }

    fn add_to_book(&mut self, order: Order) -> OrderHandle {
        self.sequence_counter += 1;
        let side = order.side;
        let price = order.price.unwrap_or_default();
        let client_order_id = order.client_order_id.clone();

        let sequence = self.sequence_counter;
        let handle = OrderHandle {
            key: self.orders.insert(Resting { sequence, order }),
            sequence,
        };
        self.side_mut(side).add_order(price, handle);
        self.index.insert((side, client_order_id), handle);
        handle
    }

    fn side_mut(&mut self, side: Side) -> &mut OrderBookSide {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn validate_order(&self, order: &Order) -> MarketResult<()> {
        if order.symbol != self.symbol {
            return Err(MarketError::InvalidOrder(format!(
                "symbol {} does not trade here ({})",
                order.symbol, self.symbol
            )));
        }

        if order.quantity <= Decimal::ZERO || order.open_quantity() != order.quantity {
            return Err(MarketError::InvalidOrder(
                "Quantity must be positive and unfilled".to_string(),
            ));
        }

        if order.is_limit_order() {
            match order.price {
                Some(price) if price > Decimal::ZERO => {
                    if price.checked_mul(order.quantity).is_none() {
                        return Err(MarketError::InvalidOrder(format!(
                            "notional of {} at {} is out of range",
                            order.quantity, price
                        )));
                    }
                },
                _ => {
                    return Err(MarketError::InvalidOrder(
                        "Limit orders must have a positive price".to_string(),
                    ))
                },
            }
        }

        if self
            .index
            .contains_key(&(order.side, order.client_order_id.clone()))
        {
            return Err(MarketError::InvalidOrder(format!(
                "duplicate client order id {}",
                order.client_order_id
            )));
        }

        Ok(())
    }
}

/// Check if an incoming order can trade against a resting price
fn prices_cross(incoming: &Order, book_price: Decimal) -> bool {
    match (incoming.side, incoming.price) {
        (_, None) => true,
        (Side::Buy, Some(limit)) => limit >= book_price,
        (Side::Sell, Some(limit)) => limit <= book_price,
    }
}
