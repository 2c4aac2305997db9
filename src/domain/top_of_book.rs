// ============================================================================
// Top Of Book
// ============================================================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Best bid/ask snapshot of one instrument at one instant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopOfBook {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub bid_price: f64,
    pub bid_volume: f64,
    pub ask_price: f64,
    pub ask_volume: f64,
}

impl TopOfBook {
    pub fn new(
        symbol: impl Into<String>,
        timestamp: DateTime<Utc>,
        bid_price: f64,
        bid_volume: f64,
        ask_price: f64,
        ask_volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            bid_price,
            bid_volume,
            ask_price,
            ask_volume,
        }
    }

    pub fn mid(&self) -> f64 {
        (self.bid_price + self.ask_price) / 2.0
    }

    pub fn spread(&self) -> f64 {
        self.ask_price - self.bid_price
    }

    /// Same quote re-centred on `mid`, keeping spread and volumes
    pub fn recentred(&self, timestamp: DateTime<Utc>, mid: f64) -> Self {
        let half_spread = self.spread() / 2.0;
        Self {
            symbol: self.symbol.clone(),
            timestamp,
            bid_price: mid - half_spread,
            bid_volume: self.bid_volume,
            ask_price: mid + half_spread,
            ask_volume: self.ask_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_and_spread() {
        let top = TopOfBook::new("EURUSD", Utc::now(), 1.1000, 5.0, 1.1002, 7.0);

        assert!((top.mid() - 1.1001).abs() < 1e-12);
        assert!((top.spread() - 0.0002).abs() < 1e-12);
    }

    #[test]
    fn test_recentred_keeps_spread_and_volumes() {
        let top = TopOfBook::new("EURUSD", Utc::now(), 99.0, 5.0, 101.0, 7.0);
        let moved = top.recentred(top.timestamp, 110.0);

        assert_eq!(moved.bid_price, 109.0);
        assert_eq!(moved.ask_price, 111.0);
        assert_eq!(moved.bid_volume, 5.0);
        assert_eq!(moved.ask_volume, 7.0);
    }
}
