//! Checkpoint persistence
//!
//! This module provides the CheckpointStore trait and its file-backed
//! implementation. Saves are atomic (temp file, fsync, rename) so a crash
//! mid-write never leaves a truncated checkpoint, and unreadable files are
//! quarantined rather than trusted or silently deleted.

use crate::core::state::progress::{CheckpointRecord, MigrationState};
use crate::domain::{CaravelError, Result};
use async_trait::async_trait;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persistence boundary for migration state
///
/// The engine only ever talks to this trait, which keeps the workflow
/// testable with an in-memory implementation.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the persisted state, if any usable checkpoint exists
    ///
    /// Returns `Ok(None)` both when no checkpoint has ever been written and
    /// when the existing file was unreadable and had to be quarantined.
    async fn load(&self) -> Result<Option<MigrationState>>;

    /// Persist the given state, replacing any previous checkpoint
    async fn save(&self, state: &MigrationState) -> Result<()>;
}

/// File-backed checkpoint store
///
/// Writes land in a sibling temp file first and are renamed into place
/// after fsync. A `.lock` file guards against two processes migrating
/// with the same checkpoint at once.
pub struct FileCheckpointStore {
    path: PathBuf,
    temp_path: PathBuf,
    lock_path: PathBuf,
}

impl FileCheckpointStore {
    /// Create a store rooted at the given checkpoint file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let temp_path = PathBuf::from(format!("{}.tmp", path.display()));
        let lock_path = PathBuf::from(format!("{}.lock", path.display()));
        Self {
            path,
            temp_path,
            lock_path,
        }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full checkpoint record, including its metadata
    ///
    /// Falls back to the temp file when the main file is missing, which
    /// covers a crash between fsync and rename. Unparseable or
    /// checksum-mismatched files are quarantined and reported as absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, cannot be quarantined,
    /// or was written by a newer schema version than this binary supports.
    pub fn load_record(&self) -> Result<Option<CheckpointRecord>> {
        let source = if self.path.exists() {
            Some(self.path.as_path())
        } else if self.temp_path.exists() {
            Some(self.temp_path.as_path())
        } else {
            None
        };
        let Some(source) = source else {
            return Ok(None);
        };

        let bytes = fs::read(source)
            .map_err(|e| CaravelError::Checkpoint(format!("failed to read {}: {e}", source.display())))?;
        if bytes.is_empty() {
            return Ok(None);
        }

        let record: CheckpointRecord = match serde_json::from_slice(&bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    path = %source.display(),
                    error = %e,
                    "Checkpoint file is not valid JSON, quarantining"
                );
                self.quarantine_corrupt()?;
                return Ok(None);
            }
        };

        if record.is_from_newer_schema() {
            return Err(CaravelError::Checkpoint(format!(
                "checkpoint at {} uses schema version {} but this build only understands up to {}",
                source.display(),
                record.schema_version,
                super::progress::CHECKPOINT_SCHEMA_VERSION
            )));
        }

        if !record.verify_integrity()? {
            tracing::warn!(
                path = %source.display(),
                "Checkpoint checksum mismatch, quarantining"
            );
            self.quarantine_corrupt()?;
            return Ok(None);
        }

        Ok(Some(record))
    }

    /// Acquire the exclusive lock for this checkpoint
    ///
    /// The lock file holds the owning process id. It is removed when the
    /// returned guard drops; after a hard crash the stale file must be
    /// cleared manually (the `reset` command does this).
    ///
    /// # Errors
    ///
    /// Returns [`CaravelError::CheckpointLocked`] when another process
    /// already holds the lock.
    pub fn acquire_lock(&self) -> Result<CheckpointLock> {
        if let Some(parent) = self.lock_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaravelError::Checkpoint(format!(
                    "failed to create checkpoint directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(mut file) => {
                let pid = std::process::id();
                writeln!(file, "{pid}").map_err(|e| {
                    CaravelError::Checkpoint(format!(
                        "failed to write lock file {}: {e}",
                        self.lock_path.display()
                    ))
                })?;
                Ok(CheckpointLock {
                    path: self.lock_path.clone(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&self.lock_path)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty());
                let detail = match holder {
                    Some(pid) => format!("{} (held by pid {pid})", self.lock_path.display()),
                    None => self.lock_path.display().to_string(),
                };
                Err(CaravelError::CheckpointLocked(detail))
            }
            Err(e) => Err(CaravelError::Checkpoint(format!(
                "failed to create lock file {}: {e}",
                self.lock_path.display()
            ))),
        }
    }

    /// Remove the checkpoint, its temp file, and any stale lock
    ///
    /// Returns the paths that were actually removed. This is the manual
    /// escape hatch behind the `reset` command; the engine itself never
    /// deletes a checkpoint.
    pub fn clear(&self) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for path in [&self.path, &self.temp_path, &self.lock_path] {
            if path.exists() {
                fs::remove_file(path).map_err(|e| {
                    CaravelError::Checkpoint(format!("failed to remove {}: {e}", path.display()))
                })?;
                removed.push(path.clone());
            }
        }
        Ok(removed)
    }

    fn write_record(&self, record: &CheckpointRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaravelError::Checkpoint(format!(
                    "failed to create checkpoint directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let payload = serde_json::to_vec_pretty(record)
            .map_err(|e| CaravelError::Serialization(e.to_string()))?;

        let mut file = fs::File::create(&self.temp_path).map_err(|e| {
            CaravelError::Checkpoint(format!(
                "failed to create {}: {e}",
                self.temp_path.display()
            ))
        })?;
        file.write_all(&payload).map_err(|e| {
            CaravelError::Checkpoint(format!("failed to write {}: {e}", self.temp_path.display()))
        })?;
        file.sync_all().map_err(|e| {
            CaravelError::Checkpoint(format!("failed to sync {}: {e}", self.temp_path.display()))
        })?;
        fs::rename(&self.temp_path, &self.path).map_err(|e| {
            CaravelError::Checkpoint(format!(
                "failed to move checkpoint into place at {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(())
    }

    fn quarantine_corrupt(&self) -> Result<()> {
        let suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let corrupt_path = PathBuf::from(format!("{}.corrupt.{suffix}", self.path.display()));

        if self.path.exists() {
            fs::rename(&self.path, &corrupt_path).map_err(|e| {
                CaravelError::Checkpoint(format!(
                    "failed to quarantine corrupt checkpoint to {}: {e}",
                    corrupt_path.display()
                ))
            })?;
            tracing::warn!(
                quarantined = %corrupt_path.display(),
                "Corrupt checkpoint moved aside; migration will re-detect its baseline"
            );
        }
        if self.temp_path.exists() {
            fs::remove_file(&self.temp_path).map_err(|e| {
                CaravelError::Checkpoint(format!(
                    "failed to remove stale temp file {}: {e}",
                    self.temp_path.display()
                ))
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    async fn load(&self) -> Result<Option<MigrationState>> {
        Ok(self.load_record()?.map(|record| record.state))
    }

    async fn save(&self, state: &MigrationState) -> Result<()> {
        let record = CheckpointRecord::seal(state)?;
        self.write_record(&record)
    }
}

/// Guard representing ownership of the checkpoint lock file
///
/// Removes the lock file when dropped.
pub struct CheckpointLock {
    path: PathBuf,
}

impl Drop for CheckpointLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
