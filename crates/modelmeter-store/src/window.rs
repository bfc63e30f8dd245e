//! Half-open time windows for bounding scans and aggregation

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A half-open UTC range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `hours` hours ending at `now`.
    pub fn trailing_hours(now: DateTime<Utc>, hours: i64) -> Self {
        Self { start: now - Duration::hours(hours), end: now }
    }

    /// The `days` days ending at `now`.
    pub fn trailing_days(now: DateTime<Utc>, days: i64) -> Self {
        Self { start: now - Duration::days(days), end: now }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }

    /// Window length in hours, 0.0 for empty or inverted windows.
    pub fn duration_hours(&self) -> f64 {
        let ms = (self.end - self.start).num_milliseconds();
        if ms <= 0 {
            0.0
        } else {
            ms as f64 / 3_600_000.0
        }
    }

    /// Every calendar day the window touches, in order. The end day is
    /// included even when `end` falls at midnight; the time filter keeps
    /// out-of-range records from that day anyway.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days = Vec::new();
        if self.start > self.end {
            return days;
        }
        let mut day = self.start.date_naive();
        let last = self.end.date_naive();
        while day <= last {
            days.push(day);
            match day.succ_opt() {
                Some(next) => day = next,
                None => break,
            }
        }
        days
    }
}
