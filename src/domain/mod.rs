// ============================================================================
// Domain Models Module
// Contains all core domain entities and value objects
// ============================================================================

pub mod bar;
pub mod book;
pub mod config;
pub mod order;
pub mod order_book;
pub mod top_of_book;

pub use bar::{bars_from_json, bars_to_json, floor_time, Bar, BarMap, BarSeries};
pub use book::Book;
pub use config::{MarketConfig, SamplerConfig};
pub use order::{Order, OrderHandle, OrderType, Side};
pub use order_book::{BookLevel, OrderBookSide, Valuation};
pub use top_of_book::TopOfBook;

// Re-export state machine
pub use order::state::{OrderState, OrderStateTransition};
