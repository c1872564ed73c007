//! Batch transfer models
//!
//! One bounded-time transfer job and its reported outcome. A job is produced
//! by the adaptive controller, executed by the transfer driver, and its
//! result consumed immediately by the workflow engine.

use super::errors::FailureKind;
use super::window::TimeWindow;
use serde::{Deserialize, Serialize};

/// A single bounded transfer job
///
/// Carries the window to copy and the row count the density probe observed
/// for it, so drivers and reporting don't need to re-query the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferJob {
    /// The half-open time range to transfer
    pub window: TimeWindow,
    /// Rows the source reported inside `window` at planning time
    pub estimated_rows: u64,
}

impl TransferJob {
    pub fn new(window: TimeWindow, estimated_rows: u64) -> Self {
        Self {
            window,
            estimated_rows,
        }
    }
}

/// Outcome of one transfer attempt
///
/// Produced once per attempt; `window.end` becomes the next resume point
/// only when `succeeded` is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResult {
    /// The window this attempt covered
    pub window: TimeWindow,
    /// Rows moved by this attempt (estimate for drivers that don't count)
    pub rows_transferred: u64,
    /// Whether the transfer completed
    pub succeeded: bool,
    /// Failure classification when `succeeded` is false
    pub error_kind: Option<FailureKind>,
}

impl BatchResult {
    /// A completed transfer of `rows` over `window`
    pub fn success(window: TimeWindow, rows: u64) -> Self {
        Self {
            window,
            rows_transferred: rows,
            succeeded: true,
            error_kind: None,
        }
    }

    /// A failed transfer over `window`, classified for retry policy
    pub fn failure(window: TimeWindow, kind: FailureKind) -> Self {
        Self {
            window,
            rows_transferred: 0,
            succeeded: false,
            error_kind: Some(kind),
        }
    }
}
