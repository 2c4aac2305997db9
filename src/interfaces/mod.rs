// ============================================================================
// Interfaces Module
// Contains all trait definitions and contracts
// ============================================================================

mod bar_sink;
mod event_handler;
mod price_sampler;

pub use bar_sink::{BarBuffer, BarSink};
pub use event_handler::{
    EventHandler, LoggingEventHandler, MarketEvent, NoOpEventHandler, QueueEventHandler,
};
pub use price_sampler::PriceSampler;
