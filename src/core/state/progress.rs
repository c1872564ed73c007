//! Migration progress model
//!
//! This module defines the resumable state of a migration run and the
//! versioned on-disk record that wraps it. The record carries a schema
//! version and a SHA-256 checksum so a half-written or hand-edited
//! checkpoint file can be detected before it is trusted.

use crate::domain::{CaravelError, Result, TimeWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Current checkpoint record schema version.
///
/// Bump this when the shape of [`MigrationState`] changes in a way that
/// older binaries cannot read.
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// Resumable state of a migration run
///
/// Tracks the high-water mark of migrated data. `resume_timestamp` is the
/// exclusive end of the last successfully transferred window, so the next
/// window always starts exactly where the previous one ended.
///
/// # Examples
///
/// ```
/// use caravel::core::state::MigrationState;
/// use caravel::domain::TimeWindow;
/// use chrono::{TimeZone, Utc};
///
/// let baseline = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let mut state = MigrationState::new(baseline);
///
/// let window = TimeWindow::starting_at(baseline, chrono::Duration::hours(1)).unwrap();
/// state.advance(&window, 42_000);
///
/// assert_eq!(state.resume_timestamp, window.end());
/// assert_eq!(state.total_rows_migrated, 42_000);
/// assert_eq!(state.consecutive_failures, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationState {
    /// Point from which the next window starts (exclusive end of migrated data)
    pub resume_timestamp: DateTime<Utc>,

    /// End of the last window that completed successfully (None before the first)
    pub last_completed_window_end: Option<DateTime<Utc>>,

    /// Running total of rows reported transferred across all windows
    pub total_rows_migrated: u64,

    /// Failures since the last successful window; reset to zero on success
    pub consecutive_failures: u32,
}

impl MigrationState {
    /// Create a fresh state anchored at the given baseline timestamp
    pub fn new(baseline: DateTime<Utc>) -> Self {
        Self {
            resume_timestamp: baseline,
            last_completed_window_end: None,
            total_rows_migrated: 0,
            consecutive_failures: 0,
        }
    }

    /// Record a successfully transferred window
    ///
    /// Moves the resume point to the window's end, adds the transferred row
    /// count to the running total, and clears the failure streak.
    pub fn advance(&mut self, window: &TimeWindow, rows_transferred: u64) {
        self.resume_timestamp = window.end();
        self.last_completed_window_end = Some(window.end());
        self.total_rows_migrated = self.total_rows_migrated.saturating_add(rows_transferred);
        self.consecutive_failures = 0;
    }

    /// Record a failed window attempt
    ///
    /// The resume point is left untouched so the same window is retried on
    /// the next iteration (or after a restart).
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
    }

    /// Check whether the failure streak has reached the configured ceiling
    pub fn at_failure_ceiling(&self, ceiling: u32) -> bool {
        self.consecutive_failures >= ceiling
    }
}

/// Versioned, integrity-checked checkpoint record
///
/// This is the exact shape written to the checkpoint file. The checksum is
/// a SHA-256 over the canonical JSON serialization of the embedded state,
/// which makes it stable across key reordering in a hand-edited file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    /// Record schema version; readers reject versions newer than their own
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,

    /// Hex-encoded SHA-256 of the canonical state JSON
    pub checksum: String,

    /// When this record was sealed
    pub saved_at: DateTime<Utc>,

    /// The migration state being persisted
    pub state: MigrationState,
}

impl CheckpointRecord {
    /// Seal a state snapshot into a record ready to be written
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be serialized for checksumming.
    pub fn seal(state: &MigrationState) -> Result<Self> {
        let checksum = state_checksum(state)?;
        Ok(Self {
            schema_version: CHECKPOINT_SCHEMA_VERSION,
            checksum,
            saved_at: Utc::now(),
            state: state.clone(),
        })
    }

    /// Verify that the embedded state still matches the recorded checksum
    ///
    /// Returns `Ok(true)` when the record is intact and `Ok(false)` when the
    /// checksum does not match the state payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the state cannot be re-serialized.
    pub fn verify_integrity(&self) -> Result<bool> {
        Ok(state_checksum(&self.state)? == self.checksum)
    }

    /// Check whether this record was written by a newer schema than we know
    pub fn is_from_newer_schema(&self) -> bool {
        self.schema_version > CHECKPOINT_SCHEMA_VERSION
    }
}

/// Calculate the SHA-256 checksum of a state's canonical JSON form
///
/// Object keys are sorted recursively before hashing so that semantically
/// identical state always produces the same checksum.
fn state_checksum(state: &MigrationState) -> Result<String> {
    let value = serde_json::to_value(state)
        .map_err(|e| CaravelError::Serialization(e.to_string()))?;
    let normalized = normalize_json(&value);
    let data_str = serde_json::to_string(&normalized)
        .map_err(|e| CaravelError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(data_str.as_bytes());
    let result = hasher.finalize();

    Ok(format!("{result:x}"))
}

/// Normalize JSON value to ensure consistent key ordering
fn normalize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: std::collections::BTreeMap<String, Value> =
                std::collections::BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), normalize_json(v));
            }
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.iter().map(normalize_json).collect()),
        _ => value.clone(),
    }
}

fn default_schema_version() -> u32 {
    CHECKPOINT_SCHEMA_VERSION
}
