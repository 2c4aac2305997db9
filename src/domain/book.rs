// ============================================================================
// Market Data Book
// Price-level book built from absolute (price, size) updates
// ============================================================================

use crate::domain::TopOfBook;
use crate::error::{MarketError, MarketResult};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Default price scaling: one decimal place
pub const DEFAULT_PRECISION: u32 = 10;

/// Level-aggregated book fed by a market-data stream.
///
/// Prices are stored as `round(price * precision)` so that keys are exact.
/// The first entry of each map is the top of book on that side.
#[derive(Debug, Clone)]
pub struct Book {
    symbol: String,
    precision: u32,
    bids: BTreeMap<Reverse<i64>, f64>,
    asks: BTreeMap<i64, f64>,
    timestamp: DateTime<Utc>,
}

impl Book {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_precision(symbol, DEFAULT_PRECISION)
    }

    pub fn with_precision(symbol: impl Into<String>, precision: u32) -> Self {
        Self {
            symbol: symbol.into(),
            precision: precision.max(1),
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Upsert a level; a size of zero removes it
    pub fn update_book(&mut self, price: f64, size: f64, is_bid: bool) {
        self.update_book_at(Utc::now(), price, size, is_bid);
    }

    pub fn update_book_at(&mut self, timestamp: DateTime<Utc>, price: f64, size: f64, is_bid: bool) {
        let key = self.scale(price);
        match (is_bid, size == 0.0) {
            (true, true) => {
                self.bids.remove(&Reverse(key));
            },
            (true, false) => {
                self.bids.insert(Reverse(key), size);
            },
            (false, true) => {
                self.asks.remove(&key);
            },
            (false, false) => {
                self.asks.insert(key, size);
            },
        }
        self.timestamp = timestamp;
    }

    pub fn clear(&mut self) {
        self.bids.clear();
        self.asks.clear();
    }

    pub fn best_bid(&self) -> MarketResult<(f64, f64)> {
        self.bids
            .iter()
            .next()
            .map(|(Reverse(key), size)| (self.unscale(*key), *size))
            .ok_or(MarketError::EmptyBook)
    }

    pub fn best_ask(&self) -> MarketResult<(f64, f64)> {
        self.asks
            .iter()
            .next()
            .map(|(key, size)| (self.unscale(*key), *size))
            .ok_or(MarketError::EmptyBook)
    }

    /// Best bid and ask together; fails unless both sides are populated
    pub fn top(&self) -> MarketResult<TopOfBook> {
        let (bid_price, bid_volume) = self.best_bid()?;
        let (ask_price, ask_volume) = self.best_ask()?;
        Ok(TopOfBook::new(
            self.symbol.clone(),
            self.timestamp,
            bid_price,
            bid_volume,
            ask_price,
            ask_volume,
        ))
    }

    pub fn is_crossing(&self) -> bool {
        match (self.bids.keys().next(), self.asks.keys().next()) {
            (Some(Reverse(bid)), Some(ask)) => bid >= ask,
            _ => false,
        }
    }

    /// `NaN` when either side is empty
    pub fn spread(&self) -> f64 {
        match (self.best_bid(), self.best_ask()) {
            (Ok((bid, _)), Ok((ask, _))) => ask - bid,
            _ => f64::NAN,
        }
    }

    /// `NaN` when either side is empty
    pub fn mid(&self) -> f64 {
        match (self.best_bid(), self.best_ask()) {
            (Ok((bid, _)), Ok((ask, _))) => (bid + ask) / 2.0,
            _ => f64::NAN,
        }
    }

    /// Volume-weighted price over all levels at or better than `price_level`.
    ///
    /// Returns `NaN` when no volume qualifies (including an empty side).
    pub fn vwap(&self, price_level: f64, is_bid: bool) -> f64 {
        let limit = self.scale(price_level);
        let (notional, volume) = if is_bid {
            self.bids
                .iter()
                .take_while(|(Reverse(key), _)| *key >= limit)
                .fold((0.0, 0.0), |(n, v), (Reverse(key), size)| {
                    (n + self.unscale(*key) * size, v + size)
                })
        } else {
            self.asks
                .iter()
                .take_while(|(key, _)| **key <= limit)
                .fold((0.0, 0.0), |(n, v), (key, size)| {
                    (n + self.unscale(*key) * size, v + size)
                })
        };

        if volume > 0.0 {
            notional / volume
        } else {
            f64::NAN
        }
    }

    /// Levels of one side in priority order as `(price, size)`
    pub fn depth(&self, is_bid: bool) -> Vec<(f64, f64)> {
        if is_bid {
            self.bids
                .iter()
                .map(|(Reverse(key), size)| (self.unscale(*key), *size))
                .collect()
        } else {
            self.asks
                .iter()
                .map(|(key, size)| (self.unscale(*key), *size))
                .collect()
        }
    }

    fn scale(&self, price: f64) -> i64 {
        (price * self.precision as f64).round() as i64
    }

    fn unscale(&self, key: i64) -> f64 {
        key as f64 / self.precision as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> Book {
        let mut book = Book::new("ES");
        book.update_book(100.0, 5.0, true);
        book.update_book(99.5, 10.0, true);
        book.update_book(100.5, 3.0, false);
        book.update_book(101.0, 7.0, false);
        book
    }

    #[test]
    fn test_top_of_book() {
        let book = populated();
        let top = book.top().unwrap();

        assert_eq!((top.bid_price, top.bid_volume), (100.0, 5.0));
        assert_eq!((top.ask_price, top.ask_volume), (100.5, 3.0));
        assert_eq!(book.spread(), 0.5);
        assert!(!book.is_crossing());
    }

    #[test]
    fn test_zero_size_removes_level() {
        let mut book = populated();
        book.update_book(100.0, 0.0, true);

        assert_eq!(book.best_bid().unwrap(), (99.5, 10.0));
    }

    #[test]
    fn test_upsert_replaces_size() {
        let mut book = populated();
        book.update_book(100.5, 9.0, false);

        assert_eq!(book.best_ask().unwrap(), (100.5, 9.0));
        assert_eq!(book.depth(false).len(), 2);
    }

    #[test]
    fn test_one_sided_book() {
        let mut book = Book::new("ES");
        book.update_book(100.0, 5.0, true);

        assert!(matches!(book.top(), Err(MarketError::EmptyBook)));
        assert!(matches!(book.best_ask(), Err(MarketError::EmptyBook)));
        assert!(book.spread().is_nan());
        assert!(book.mid().is_nan());
        assert!(!book.is_crossing());
    }

    #[test]
    fn test_crossing() {
        let mut book = populated();
        book.update_book(100.5, 1.0, true);

        assert!(book.is_crossing());
    }

    #[test]
    fn test_vwap() {
        let book = populated();

        // Bids at or above 99.5: (100*5 + 99.5*10) / 15
        let expected = (100.0 * 5.0 + 99.5 * 10.0) / 15.0;
        assert!((book.vwap(99.5, true) - expected).abs() < 1e-9);
        // Only the best ask qualifies
        assert_eq!(book.vwap(100.5, false), 100.5);
        // Nothing qualifies
        assert!(book.vwap(100.1, true).is_nan());
        assert!(book.vwap(100.4, false).is_nan());
        assert!(Book::new("ES").vwap(100.0, true).is_nan());
    }

    #[test]
    fn test_precision_merges_nearby_prices() {
        let mut book = Book::with_precision("ES", 10);
        book.update_book(100.01, 1.0, true);
        book.update_book(100.04, 2.0, true);

        // Both round to 100.0 at one decimal place
        assert_eq!(book.depth(true), vec![(100.0, 2.0)]);
    }
}
