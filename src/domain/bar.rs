// ============================================================================
// Bar Domain Model
// OHLC aggregates and their columnar JSON representation
// ============================================================================

use crate::error::{MarketError, MarketResult};
use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Time-ordered bar history keyed by bar end time
pub type BarMap = BTreeMap<DateTime<Utc>, Bar>;

/// OHLC aggregate over `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start <= time && time < self.end
    }

    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open.min(self.close) && self.open.max(self.close) <= self.high
    }
}

/// Align `time` down to a multiple of `period` since the Unix epoch.
///
/// Times before the epoch floor towards negative infinity, so every instant
/// belongs to exactly one period.
pub fn floor_time(time: DateTime<Utc>, period: TimeDelta) -> DateTime<Utc> {
    match time.duration_trunc(period) {
        Ok(floored) => floored,
        Err(err) => {
            tracing::warn!(%time, ?period, %err, "cannot align timestamp to bar period");
            time
        },
    }
}

// ============================================================================
// JSON Bar Series
// ============================================================================

/// Columnar bar series: index-aligned arrays of end time (ns) and OHLC
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub t: Vec<i64>,
    pub o: Vec<f64>,
    pub h: Vec<f64>,
    pub l: Vec<f64>,
    pub c: Vec<f64>,
}

impl BarSeries {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    /// Append one bar; fails when its end is outside the nanosecond range
    pub fn push(&mut self, bar: &Bar) -> MarketResult<()> {
        let end = bar.end.timestamp_nanos_opt().ok_or_else(|| {
            MarketError::MalformedHistory(format!(
                "bar end {} is outside the nanosecond timestamp range",
                bar.end
            ))
        })?;
        self.t.push(end);
        self.o.push(bar.open);
        self.h.push(bar.high);
        self.l.push(bar.low);
        self.c.push(bar.close);
        Ok(())
    }

    /// Rebuild bars; `start` is recovered as `end - period`
    pub fn into_bars(self, period: TimeDelta) -> MarketResult<BarMap> {
        let len = self.t.len();
        if [self.o.len(), self.h.len(), self.l.len(), self.c.len()]
            .iter()
            .any(|column| *column != len)
        {
            return Err(MarketError::MalformedHistory(format!(
                "column lengths differ from {} timestamps",
                len
            )));
        }

        let mut bars = BarMap::new();
        for i in 0..len {
            let end = DateTime::from_timestamp_nanos(self.t[i]);
            bars.insert(
                end,
                Bar {
                    start: end - period,
                    end,
                    open: self.o[i],
                    high: self.h[i],
                    low: self.l[i],
                    close: self.c[i],
                },
            );
        }
        Ok(bars)
    }
}

/// Serialize bars as a columnar JSON object, returning it with the bar count
pub fn bars_to_json<'a>(bars: impl IntoIterator<Item = &'a Bar>) -> MarketResult<(String, usize)> {
    let mut series = BarSeries::default();
    for bar in bars {
        series.push(bar)?;
    }
    let count = series.len();
    Ok((serde_json::to_string(&series)?, count))
}

/// Parse a columnar JSON bar series back into a bar map
pub fn bars_from_json(json: &str, period: TimeDelta) -> MarketResult<BarMap> {
    let series: BarSeries = serde_json::from_str(json)?;
    series.into_bars(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_floor_time() {
        let minute = TimeDelta::minutes(1);

        assert_eq!(floor_time(at(125), minute), at(120));
        assert_eq!(floor_time(at(120), minute), at(120));
        // Pre-epoch timestamps floor downwards
        assert_eq!(floor_time(at(-1), minute), at(-60));
    }

    #[test]
    fn test_bar_contains_is_half_open() {
        let bar = Bar {
            start: at(60),
            end: at(120),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
        };

        assert!(bar.contains(at(60)));
        assert!(bar.contains(at(119)));
        assert!(!bar.contains(at(120)));
        assert!(bar.is_well_formed());
    }

    #[test]
    fn test_json_layout() {
        let bar = Bar {
            start: at(0),
            end: at(60),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
        };

        let (json, count) = bars_to_json([&bar]).unwrap();
        assert_eq!(count, 1);
        assert_eq!(
            json,
            r#"{"t":[60000000000],"o":[1.0],"h":[2.0],"l":[0.5],"c":[1.5]}"#
        );
    }

    #[test]
    fn test_bar_end_beyond_nanosecond_range_rejected() {
        // Nanosecond timestamps run out in April 2262
        let end = Utc.with_ymd_and_hms(2300, 1, 1, 0, 0, 0).unwrap();
        let bar = Bar {
            start: end - TimeDelta::minutes(1),
            end,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
        };

        assert!(matches!(
            bars_to_json([&bar]),
            Err(MarketError::MalformedHistory(_))
        ));
        let mut series = BarSeries::default();
        assert!(series.push(&bar).is_err());
        assert!(series.is_empty());
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let json = r#"{"t":[60000000000],"o":[1.0],"h":[],"l":[0.5],"c":[1.5]}"#;

        assert!(matches!(
            bars_from_json(json, TimeDelta::minutes(1)),
            Err(MarketError::MalformedHistory(_))
        ));
    }
}
