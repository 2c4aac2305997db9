// ============================================================================
// Event Handler Interface
// Defines the contract for handling fills, quotes and bars
// ============================================================================

use crate::domain::{Bar, Order, TopOfBook};
use crate::queue::UnboundedQueue;
use serde::{Deserialize, Serialize};

/// Events emitted by the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// Post-fill copy of an order that just traded (both sides are emitted)
    Fill(Order),

    /// New simulated top of book
    TopOfBook(TopOfBook),

    /// Bar completed by the live bar builder
    Bar(Bar),
}

/// Event handler trait for processing market events
/// Implementations can translate events to a wire format, log them, etc.
pub trait EventHandler: Send + Sync {
    /// Handle a market event
    fn on_event(&self, event: MarketEvent);

    /// Batch event handler (optional optimization)
    fn on_events(&self, events: Vec<MarketEvent>) {
        for event in events {
            self.on_event(event);
        }
    }
}

/// No-op event handler for testing
pub struct NoOpEventHandler;

impl EventHandler for NoOpEventHandler {
    fn on_event(&self, _event: MarketEvent) {
        // Do nothing
    }
}

/// Logging event handler
pub struct LoggingEventHandler;

impl EventHandler for LoggingEventHandler {
    fn on_event(&self, event: MarketEvent) {
        tracing::debug!("Market event: {:?}", event);
    }
}

/// Forwards every event into a queue drained by another thread
#[derive(Clone, Default)]
pub struct QueueEventHandler {
    queue: UnboundedQueue<MarketEvent>,
}

impl QueueEventHandler {
    pub fn new(queue: UnboundedQueue<MarketEvent>) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &UnboundedQueue<MarketEvent> {
        &self.queue
    }
}

impl EventHandler for QueueEventHandler {
    fn on_event(&self, event: MarketEvent) {
        self.queue.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn quote() -> MarketEvent {
        MarketEvent::TopOfBook(TopOfBook::new("EURUSD", Utc::now(), 1.0, 1.0, 1.1, 1.0))
    }

    #[test]
    fn test_noop_handler() {
        let handler = NoOpEventHandler;
        handler.on_event(quote());
        // Should not panic
    }

    #[test]
    fn test_queue_handler_preserves_order() {
        let handler = QueueEventHandler::default();
        let first = quote();
        handler.on_events(vec![first.clone(), quote()]);

        assert_eq!(handler.queue().len(), 2);
        assert_eq!(handler.queue().try_pop(), Some(first));
    }
}
