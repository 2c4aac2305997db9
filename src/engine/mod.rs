// ============================================================================
// Engine Module
// Order matching and market orchestration
// ============================================================================

mod market;
mod order_matcher;

pub mod factory;

pub use factory::{create_market, MarketBuilder};
pub use market::{Market, SimulationStep, MARKET_MAKER_OWNER};
pub use order_matcher::{InsertOutcome, OrderMatcher};
