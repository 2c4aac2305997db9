// ============================================================================
// Order Book Domain Model
// Price-ordered resting-order sides used by the matcher
// ============================================================================

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use super::{OrderHandle, Side};

// ============================================================================
// Order Book Side
// ============================================================================

/// One side (bids or asks) of the resting book.
///
/// Levels are kept in a sorted map; the best level is the highest price for
/// bids and the lowest for asks. Each level is a FIFO queue of handles, so
/// arrival order at a price defines time priority.
#[derive(Debug)]
pub struct OrderBookSide {
    pub levels: BTreeMap<Decimal, VecDeque<OrderHandle>>,
    pub side: Side,
}

impl OrderBookSide {
    pub fn new(side: Side) -> Self {
        Self {
            levels: BTreeMap::new(),
            side,
        }
    }

    /// Append a handle at the back of its price level
    pub fn add_order(&mut self, price: Decimal, handle: OrderHandle) {
        self.levels.entry(price).or_default().push_back(handle);
    }

    /// Remove a specific handle, dropping the level once empty
    pub fn remove_order(&mut self, price: Decimal, handle: OrderHandle) -> bool {
        let Some(level) = self.levels.get_mut(&price) else {
            return false;
        };
        let Some(position) = level.iter().position(|h| *h == handle) else {
            return false;
        };

        level.remove(position);
        if level.is_empty() {
            self.levels.remove(&price);
        }
        true
    }

    /// Get the best (top-of-book) price
    pub fn best_price(&self) -> Option<Decimal> {
        match self.side {
            // Highest bid (last in sorted order)
            Side::Buy => self.levels.keys().next_back().copied(),
            // Lowest ask (first in sorted order)
            Side::Sell => self.levels.keys().next().copied(),
        }
    }

    /// Oldest handle at the best price
    pub fn front(&self) -> Option<(Decimal, OrderHandle)> {
        let price = self.best_price()?;
        self.levels
            .get(&price)
            .and_then(|level| level.front())
            .map(|handle| (price, *handle))
    }

    /// Drop the oldest handle at `price`
    pub fn pop_front(&mut self, price: Decimal) {
        if let Some(level) = self.levels.get_mut(&price) {
            level.pop_front();
            if level.is_empty() {
                self.levels.remove(&price);
            }
        }
    }

    /// Price levels in priority order (best first)
    pub fn iter_levels(&self) -> Box<dyn Iterator<Item = (&Decimal, &VecDeque<OrderHandle>)> + '_> {
        match self.side {
            Side::Buy => Box::new(self.levels.iter().rev()),
            Side::Sell => Box::new(self.levels.iter()),
        }
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn order_count(&self) -> usize {
        self.levels.values().map(VecDeque::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

// ============================================================================
// Aggregated Book Levels
// ============================================================================

/// One row of the aggregated book: the n-th best bid tier next to the
/// n-th best ask tier. A side with fewer tiers leaves its columns empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub bid_price: Option<Decimal>,
    pub bid_value: Decimal,
    pub ask_price: Option<Decimal>,
    pub ask_value: Decimal,
}

/// Common per-order valuations for [`OrderMatcher::book_levels`]
///
/// [`OrderMatcher::book_levels`]: crate::engine::OrderMatcher::book_levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Valuation {
    Quantity,
    OpenQuantity,
    LastExecutedQuantity,
}

impl Valuation {
    pub fn value(self, order: &super::Order) -> Decimal {
        match self {
            Valuation::Quantity => order.quantity,
            Valuation::OpenQuantity => order.open_quantity(),
            Valuation::LastExecutedQuantity => order.last_executed_quantity(),
        }
    }
}
