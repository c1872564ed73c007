//! Run summary reporting
//!
//! Counters collected while the engine loops, folded into a final report
//! the CLI prints when the run ends. The resume point is always included
//! so an operator knows exactly where the next run will pick up.

use crate::core::state::MigrationState;
use crate::domain::MigrationOutcome;
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, Instant};

/// Final report for one engine run
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    /// How the run ended
    pub outcome: MigrationOutcome,
    /// Windows transferred successfully this run
    pub windows_completed: u64,
    /// Window attempts that failed this run (after per-window retries)
    pub windows_failed: u64,
    /// Rows moved by this run
    pub rows_this_run: u64,
    /// Rows moved across all runs, per the checkpoint
    pub total_rows_migrated: u64,
    /// Where the next run resumes; None when no baseline was established
    pub resume_timestamp: Option<DateTime<Utc>>,
    /// Wall-clock time of the run
    pub elapsed: Duration,
}

impl MigrationSummary {
    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }
}

impl fmt::Display for MigrationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "outcome: {}", self.outcome)?;
        writeln!(
            f,
            "windows: {} completed, {} failed",
            self.windows_completed, self.windows_failed
        )?;
        writeln!(
            f,
            "rows: {} this run, {} in total",
            self.rows_this_run, self.total_rows_migrated
        )?;
        writeln!(f, "elapsed: {}s", self.elapsed.as_secs())?;
        match self.resume_timestamp {
            Some(ts) => write!(f, "resume point: {}", ts.to_rfc3339()),
            None => write!(f, "resume point: none"),
        }
    }
}

/// Accumulates counters during a run
pub(crate) struct RunTracker {
    started: Instant,
    windows_completed: u64,
    windows_failed: u64,
    rows_this_run: u64,
}

impl RunTracker {
    pub(crate) fn new() -> Self {
        Self {
            started: Instant::now(),
            windows_completed: 0,
            windows_failed: 0,
            rows_this_run: 0,
        }
    }

    pub(crate) fn window_succeeded(&mut self, rows: u64) {
        self.windows_completed += 1;
        self.rows_this_run = self.rows_this_run.saturating_add(rows);
    }

    pub(crate) fn window_failed(&mut self) {
        self.windows_failed += 1;
    }

    /// Fold the counters into a summary for the given outcome
    ///
    /// `state` is absent when the run aborted before a baseline was
    /// established, in which case no rows can have moved.
    pub(crate) fn finish(
        self,
        outcome: MigrationOutcome,
        state: Option<&MigrationState>,
    ) -> MigrationSummary {
        MigrationSummary {
            outcome,
            windows_completed: self.windows_completed,
            windows_failed: self.windows_failed,
            rows_this_run: self.rows_this_run,
            total_rows_migrated: state.map_or(self.rows_this_run, |s| s.total_rows_migrated),
            resume_timestamp: state.map(|s| s.resume_timestamp),
            elapsed: self.started.elapsed(),
        }
    }
}
