//! Time window model
//!
//! This module provides the half-open time range transferred as one batch.
//! Windows are the unit of work for the migration engine: each one is sized
//! by the adaptive controller and handed to the transfer driver.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A half-open time range `[start, end)`
///
/// The start bound is inclusive, the end bound exclusive, so adjacent windows
/// share a boundary timestamp without overlapping. Construction enforces
/// `start < end`.
///
/// # Examples
///
/// ```
/// use caravel::domain::window::TimeWindow;
/// use chrono::{TimeZone, Utc};
///
/// let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
/// let end = Utc.with_ymd_and_hms(2025, 6, 1, 1, 0, 0).unwrap();
/// let window = TimeWindow::new(start, end).unwrap();
/// assert_eq!(window.duration().num_minutes(), 60);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new window, rejecting empty or inverted ranges
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, String> {
        if start >= end {
            return Err(format!(
                "window start {} must be before end {}",
                start.to_rfc3339(),
                end.to_rfc3339()
            ));
        }
        Ok(Self { start, end })
    }

    /// Creates a window of the given duration beginning at `start`
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Result<Self, String> {
        Self::new(start, start + duration)
    }

    /// Inclusive lower bound
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Exclusive upper bound
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Length of the window
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `ts` falls inside the window (start inclusive, end exclusive)
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start && ts < self.end
    }

    /// Whether this window starts exactly where `previous` ended
    pub fn follows(&self, previous: &TimeWindow) -> bool {
        self.start == previous.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start.to_rfc3339(), self.end.to_rfc3339())
    }
}
