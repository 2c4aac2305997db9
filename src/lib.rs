// ============================================================================
// Market Simulation Library
// Synthetic quotes, bar aggregation and price/time order matching
// ============================================================================

//! # Market Sim
//!
//! A single-process simulated trading venue.
//!
//! ## Features
//!
//! - **Price/time priority matching** with an arena-backed FIFO book
//! - **Stochastic quote models** (semi-Markov tick model, Gaussian white noise)
//! - **OHLC bar aggregation** forwards from live samples and backwards for backfill
//! - **Coarse-locked market** tying sampler, bars and matcher together
//! - **Blocking queues** for handing events between threads
//!
//! ## Example
//!
//! ```rust
//! use market_sim::prelude::*;
//! use chrono::{TimeDelta, Utc};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let config = MarketConfig::fx_style("EURUSD".to_string()).with_seed(42);
//! let market = Market::new(config, Arc::new(NoOpEventHandler)).unwrap();
//!
//! // Seed the first quote; synthetic market-maker orders are posted
//! let now = Utc::now();
//! market
//!     .open(TopOfBook::new("EURUSD", now, 1.1000, 5.0, 1.1002, 5.0))
//!     .unwrap();
//!
//! // Advance the simulation
//! let step = market.simulate_at(now + TimeDelta::seconds(1)).unwrap();
//! println!("Mid: {}", step.top_of_book.mid());
//!
//! // Trade against the synthetic quote
//! let ask = market.get_top_of_book().unwrap().ask_price;
//! let order = Order::limit(
//!     "client-1",
//!     "EURUSD",
//!     "client",
//!     Side::Buy,
//!     Decimal::try_from(ask + 0.01).unwrap(),
//!     Decimal::ONE,
//! );
//! let outcome = market.insert_order(order).unwrap();
//! println!("Matches: {}", outcome.match_count);
//! ```

pub mod bars;
pub mod domain;
pub mod engine;
pub mod error;
pub mod interfaces;
pub mod queue;
pub mod sampler;

// Re-exports for convenience
pub mod prelude {
    pub use crate::bars::{BarBuilder, ReverseBarBuilder};
    pub use crate::domain::order::state::{OrderState, OrderStateTransition};
    pub use crate::domain::{
        bars_from_json, bars_to_json, Bar, BarMap, Book, BookLevel, MarketConfig, Order,
        OrderHandle, OrderType, SamplerConfig, Side, TopOfBook, Valuation,
    };
    pub use crate::engine::{
        create_market, InsertOutcome, Market, MarketBuilder, OrderMatcher, SimulationStep,
        MARKET_MAKER_OWNER,
    };
    pub use crate::error::{MarketError, MarketResult};
    pub use crate::interfaces::{
        BarBuffer, BarSink, EventHandler, LoggingEventHandler, MarketEvent, NoOpEventHandler,
        PriceSampler, QueueEventHandler,
    };
    pub use crate::queue::{BoundedQueue, UnboundedQueue};
    pub use crate::sampler::{Sampler, SemiMarkovSampler, WhiteNoiseSampler};
}
