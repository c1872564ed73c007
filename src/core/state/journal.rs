//! Per-window migration journal
//!
//! Append-only NDJSON log of every window attempt. Unlike the checkpoint,
//! the journal is advisory: it exists so an operator can reconstruct what
//! a run did (or was doing when it died) without trawling log files.

use crate::domain::{BatchResult, CaravelError, FailureKind, Result, TimeWindow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One journal line, describing a single window attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Identifier of the migration run that produced this entry
    pub run_id: Uuid,

    /// The window that was attempted
    pub window: TimeWindow,

    /// Row count the window was sized for
    pub estimated_rows: u64,

    /// Rows actually reported transferred (zero on failure)
    pub rows_transferred: u64,

    /// Whether the window ultimately succeeded
    pub succeeded: bool,

    /// Classification of the final failure, when the window failed
    pub error_kind: Option<FailureKind>,

    /// Transfer attempts made for this window, including retries
    pub attempts: u32,

    /// Wall-clock time spent on the window across all attempts
    pub duration_ms: u64,

    /// When the entry was written
    pub recorded_at: DateTime<Utc>,
}

/// Append-only journal of window outcomes for one migration run
pub struct WindowJournal {
    path: PathBuf,
    run_id: Uuid,
}

impl WindowJournal {
    /// Create a journal writing to the given path under a fresh run id
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            run_id: Uuid::new_v4(),
        }
    }

    /// Identifier of this run, stamped on every entry
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Path of the journal file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the outcome of one window attempt
    ///
    /// # Errors
    ///
    /// Returns an error if the journal file cannot be opened or written.
    pub fn record(
        &self,
        result: &BatchResult,
        estimated_rows: u64,
        attempts: u32,
        duration_ms: u64,
    ) -> Result<()> {
        let entry = JournalEntry {
            run_id: self.run_id,
            window: result.window,
            estimated_rows,
            rows_transferred: result.rows_transferred,
            succeeded: result.succeeded,
            error_kind: result.error_kind,
            attempts,
            duration_ms,
            recorded_at: Utc::now(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaravelError::Checkpoint(format!(
                    "failed to create journal directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let line = serde_json::to_string(&entry)
            .map_err(|e| CaravelError::Serialization(e.to_string()))?;
        let mut file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|e| {
                CaravelError::Checkpoint(format!("failed to open {}: {e}", self.path.display()))
            })?;
        writeln!(file, "{line}").map_err(|e| {
            CaravelError::Checkpoint(format!("failed to append to {}: {e}", self.path.display()))
        })?;

        Ok(())
    }

    /// Read every entry in the journal, oldest first
    ///
    /// Lines that fail to parse are skipped with a warning rather than
    /// aborting, since a crash can leave a torn final line.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal file exists but cannot be opened.
    pub fn read_entries(&self) -> Result<Vec<JournalEntry>> {
        read_entries(&self.path)
    }
}

/// Read journal entries from an arbitrary path, oldest first
pub fn read_entries(path: &Path) -> Result<Vec<JournalEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(path)
        .map_err(|e| CaravelError::Checkpoint(format!("failed to open {}: {e}", path.display())))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| {
            CaravelError::Checkpoint(format!("failed to read {}: {e}", path.display()))
        })?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    line = index + 1,
                    error = %e,
                    "Skipping unparseable journal line"
                );
            }
        }
    }

    Ok(entries)
}
