// ============================================================================
// Bar Sink Interface
// Receives bars completed by a bar builder
// ============================================================================

use crate::domain::Bar;
use crate::queue::{BoundedQueue, UnboundedQueue};

/// Capability injected into a bar builder to receive completed bars
pub trait BarSink {
    fn on_bar(&mut self, bar: Bar);
}

impl<F> BarSink for F
where
    F: FnMut(Bar),
{
    fn on_bar(&mut self, bar: Bar) {
        self(bar)
    }
}

/// Buffers completed bars until the owner collects them
#[derive(Debug, Default)]
pub struct BarBuffer {
    bars: Vec<Bar>,
}

impl BarBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every buffered bar, oldest emission first
    pub fn take(&mut self) -> Vec<Bar> {
        std::mem::take(&mut self.bars)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}

impl BarSink for BarBuffer {
    fn on_bar(&mut self, bar: Bar) {
        self.bars.push(bar);
    }
}

impl BarSink for UnboundedQueue<Bar> {
    fn on_bar(&mut self, bar: Bar) {
        self.push(bar);
    }
}

/// Blocks the builder while the queue is full
impl BarSink for BoundedQueue<Bar> {
    fn on_bar(&mut self, bar: Bar) {
        self.push(bar);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bars::BarBuilder;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};
    use std::time::Duration;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_queue_sinks_hand_bars_to_consumer() {
        let unbounded = UnboundedQueue::new();
        let bounded = BoundedQueue::new(4);
        let mut forward = BarBuilder::new(TimeDelta::seconds(60), unbounded.clone());
        let mut throttled = BarBuilder::new(TimeDelta::seconds(60), bounded.clone());

        for secs in [0, 30, 60, 130] {
            forward.add(at(secs), 100.0 + secs as f64);
            throttled.add(at(secs), 100.0 + secs as f64);
        }

        let ends: Vec<_> = (0..2).map(|_| unbounded.pop().end).collect();
        assert_eq!(ends, vec![at(60), at(120)]);
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded.pop_timeout(Duration::from_millis(5)).map(|bar| bar.close), Some(130.0));
    }

    #[test]
    fn test_closure_and_buffer_sinks() {
        let mut seen = Vec::new();
        let mut sink = |bar: Bar| seen.push(bar.end);
        let mut buffer = BarBuffer::new();
        let bar = Bar {
            start: at(0),
            end: at(60),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        };

        sink.on_bar(bar);
        buffer.on_bar(bar);

        assert_eq!(seen, vec![at(60)]);
        assert_eq!(buffer.take(), vec![bar]);
        assert!(buffer.is_empty());
    }
}
