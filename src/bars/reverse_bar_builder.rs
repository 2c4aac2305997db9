// ============================================================================
// Reverse Bar Builder
// Aggregates a backward-walking (decreasing-time) sample stream into bars
// ============================================================================

use super::accepts_value;
use crate::domain::{floor_time, Bar};
use crate::interfaces::BarSink;
use chrono::{DateTime, TimeDelta, Utc};

/// Mirror image of [`BarBuilder`](super::BarBuilder) used to backfill
/// history.
///
/// Bar boundaries are the same `floor(time, period)` grid as the forward
/// builder. The first sample seen for a bar is its close and the latest one
/// becomes its open. A bar is emitted once a sample falls before its start.
/// The next (earlier) bar closes at the previous bar's open when the two
/// bars are adjacent and the last observed time sits exactly on the
/// boundary between them, otherwise at the incoming value.
#[derive(Debug)]
pub struct ReverseBarBuilder<S: BarSink> {
    period: TimeDelta,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    /// Open of the last emitted bar
    carried_open: f64,
    last_time: Option<DateTime<Utc>>,
    sink: S,
}

impl<S: BarSink> ReverseBarBuilder<S> {
    pub fn new(period: TimeDelta, sink: S) -> Self {
        Self {
            period,
            start: DateTime::UNIX_EPOCH,
            end: DateTime::UNIX_EPOCH,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            carried_open: 0.0,
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

    pub fn current(&self) -> Option<Bar> {
        self.is_in_progress().then(|| self.bar())
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.last_time
    }

    /// Feed one sample, older than every sample fed so far
    pub fn add(&mut self, time: DateTime<Utc>, value: f64) {
        if !accepts_value(value) {
            return;
        }

        if self.is_in_progress() && time < self.start {
            self.emit();
        }

        if !self.is_in_progress() {
            let start = floor_time(time, self.period);
            let end = start + self.period;
            let close = if self.carried_open > 0.0
                && self.start == end
                && self.last_time == Some(end)
            {
                self.carried_open
            } else {
                value
            };
            self.begin(start, close);
        } else if time >= self.end {
            tracing::warn!(%time, end = %self.end, "sample newer than backfill bar ignored");
            return;
        }

        self.high = self.high.max(value);
        self.low = self.low.min(value);
        self.open = value;
        self.last_time = Some(time);
    }

    /// Emit the current bar if `time` lies before its start.
    ///
    /// Returns true when a bar was emitted.
    pub fn check_close(&mut self, time: DateTime<Utc>) -> bool {
        if self.is_in_progress() && time < self.start {
            self.emit();
            self.last_time = Some(time);
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.open = 0.0;
        self.carried_open = 0.0;
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

    fn begin(&mut self, start: DateTime<Utc>, close: f64) {
        self.start = start;
        self.end = start + self.period;
        self.open = close;
        self.high = close;
        self.low = close;
        self.close = close;
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
        self.carried_open = self.open;
        self.open = 0.0;
    }
}
