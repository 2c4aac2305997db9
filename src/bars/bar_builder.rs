// ============================================================================
// Forward Bar Builder
// Aggregates a live (increasing-time) sample stream into OHLC bars
// ============================================================================

use super::accepts_value;
use crate::domain::{floor_time, Bar};
use crate::interfaces::BarSink;
use chrono::{DateTime, TimeDelta, Utc};

/// Streaming OHLC aggregator for samples arriving in increasing time order.
///
/// A bar is in progress while `open != 0`. When a sample lands at or after
/// the end of the current bar, the bar is handed to the sink and the next
/// bar opens at `floor(time, period)`. When the new bar directly follows the
/// previous one and either the incoming sample or the last flush sits exactly
/// on its start, it opens at the previous close; otherwise at the incoming
/// value.
///
/// # Example
/// ```text
/// period = 60s
/// add(00:00:10, 100) add(00:00:50, 102) add(00:01:05, 101)
///   => emits [00:00, 00:01) O=100 H=102 L=100 C=102
///      current [00:01, 00:02) O=101
/// ```
#[derive(Debug)]
pub struct BarBuilder<S: BarSink> {
    period: TimeDelta,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    last_time: Option<DateTime<Utc>>,
    sink: S,
}

impl<S: BarSink> BarBuilder<S> {
    pub fn new(period: TimeDelta, sink: S) -> Self {
        Self {
            period,
            start: DateTime::UNIX_EPOCH,
            end: DateTime::UNIX_EPOCH,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            last_time: None,
            sink,
        }
    }

    pub fn period(&self) -> TimeDelta {
        self.period
    }

    pub fn is_in_progress(&self) -> bool {
        self.open != 0.0
    }

    /// The bar being built, if any
    pub fn current(&self) -> Option<Bar> {
        self.is_in_progress().then(|| self.bar())
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.last_time
    }

    /// Feed one sample
    pub fn add(&mut self, time: DateTime<Utc>, value: f64) {
        if !accepts_value(value) {
            return;
        }

        if self.is_in_progress() && time >= self.end {
            self.emit();
        }

        if !self.is_in_progress() {
            let start = floor_time(time, self.period);
            let open = if self.continues_at(start, time) {
                self.close
            } else {
                value
            };
            self.begin(start, open);
        } else if time < self.start {
            tracing::warn!(%time, start = %self.start, "sample older than current bar ignored");
            return;
        }

        self.high = self.high.max(value);
        self.low = self.low.min(value);
        self.close = value;
        self.last_time = Some(time);
    }

    /// Emit the current bar if `time` has reached its end.
    ///
    /// Returns true when a bar was emitted.
    pub fn check_close(&mut self, time: DateTime<Utc>) -> bool {
        if self.is_in_progress() && time >= self.end {
            self.emit();
            self.last_time = Some(time);
            true
        } else {
            false
        }
    }

    /// Forget the bar in progress and the continuity state
    pub fn reset(&mut self) {
        self.open = 0.0;
        self.close = 0.0;
        self.last_time = None;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// A bar starting at `start` continues the previous one when they are
    /// adjacent and the stream touched the boundary, either through a sample
    /// exactly on it or a flush at it.
    fn continues_at(&self, start: DateTime<Utc>, time: DateTime<Utc>) -> bool {
        self.close > 0.0
            && self.end == start
            && (time == start || self.last_time == Some(start))
    }

    fn begin(&mut self, start: DateTime<Utc>, open: f64) {
        self.start = start;
        self.end = start + self.period;
        self.open = open;
        self.high = open;
        self.low = open;
        self.close = open;
    }

    fn bar(&self) -> Bar {
        Bar {
            start: self.start,
            end: self.end,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
        }
    }

    fn emit(&mut self) {
        let bar = self.bar();
        debug_assert!(bar.is_well_formed(), "malformed bar {:?}", bar);
        self.sink.on_bar(bar);
        self.open = 0.0;
    }
}
