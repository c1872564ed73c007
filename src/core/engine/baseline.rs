//! Baseline resolution
//!
//! Decides where an incremental run starts. Precedence: a checkpoint from
//! a previous run wins outright, then the newest completed snapshot in the
//! configured repository, then the newest document already on the target,
//! then the oldest document on the source for a from-scratch migration.
//! A snapshot older than data already on the target is flagged as
//! ambiguous so the operator makes the call instead of the tool guessing.

use crate::adapters::cluster::{ClusterQuery, SnapshotInfo};
use crate::core::retry::{execute_with_policy, RetryPolicy};
use crate::core::state::MigrationState;
use crate::domain::{BaselineCandidate, BaselineSource, Result};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Walks the baseline precedence chain against live clusters
pub struct BaselineResolver {
    source: Arc<dyn ClusterQuery>,
    target: Arc<dyn ClusterQuery>,
    snapshot_repository: Option<String>,
    timestamp_field: String,
    policy: RetryPolicy,
}

impl BaselineResolver {
    pub fn new(
        source: Arc<dyn ClusterQuery>,
        target: Arc<dyn ClusterQuery>,
        snapshot_repository: Option<String>,
        timestamp_field: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            target,
            snapshot_repository,
            timestamp_field: timestamp_field.into(),
            policy,
        }
    }

    /// Resolve the starting point for this run
    ///
    /// A loaded checkpoint short-circuits every cluster query: whatever the
    /// clusters say now, the checkpoint records how far transfers actually
    /// got. Returns `Ok(None)` when neither cluster holds anything to
    /// anchor a baseline on.
    ///
    /// # Errors
    ///
    /// Returns an error when the cluster queries fail even after retries.
    pub async fn resolve(
        &self,
        checkpoint: Option<&MigrationState>,
    ) -> Result<Option<BaselineCandidate>> {
        if let Some(state) = checkpoint {
            tracing::info!(
                resume = %state.resume_timestamp.to_rfc3339(),
                rows_so_far = state.total_rows_migrated,
                "Resuming from checkpoint"
            );
            return Ok(Some(BaselineCandidate::new(
                BaselineSource::Checkpoint,
                state.resume_timestamp,
            )));
        }

        let target_max = self.target_max().await?;

        if let Some(repository) = &self.snapshot_repository {
            if let Some(snapshot) = self.latest_snapshot(repository).await? {
                let mut candidate =
                    BaselineCandidate::new(BaselineSource::Snapshot, snapshot.captured_at);
                if let Some(max) = target_max {
                    if max > snapshot.captured_at {
                        candidate = candidate.with_conflict(max);
                    }
                }
                tracing::info!(
                    snapshot = %snapshot.name,
                    baseline = %candidate,
                    "Derived baseline from snapshot catalog"
                );
                return Ok(Some(candidate));
            }
            tracing::info!(
                repository = %repository,
                "No completed snapshot in the repository"
            );
        }

        if let Some(max) = target_max {
            tracing::info!(
                target_max = %max.to_rfc3339(),
                "Derived baseline from data already on the target"
            );
            return Ok(Some(BaselineCandidate::new(
                BaselineSource::TargetClusterMax,
                max,
            )));
        }

        if let Some(min) = self.source_min().await? {
            tracing::info!(
                source_min = %min.to_rfc3339(),
                "Target is empty; starting a full migration from the oldest source document"
            );
            return Ok(Some(BaselineCandidate::new(BaselineSource::SourceMin, min)));
        }

        Ok(None)
    }

    async fn target_max(&self) -> Result<Option<DateTime<Utc>>> {
        let target = Arc::clone(&self.target);
        let field = self.timestamp_field.clone();

        execute_with_policy(&self.policy, "target max timestamp", || {
            let target = Arc::clone(&target);
            let field = field.clone();
            async move { target.max_timestamp(&field).await }
        })
        .await
    }

    async fn source_min(&self) -> Result<Option<DateTime<Utc>>> {
        let source = Arc::clone(&self.source);
        let field = self.timestamp_field.clone();

        execute_with_policy(&self.policy, "source min timestamp", || {
            let source = Arc::clone(&source);
            let field = field.clone();
            async move { source.min_timestamp(&field).await }
        })
        .await
    }

    async fn latest_snapshot(&self, repository: &str) -> Result<Option<SnapshotInfo>> {
        let source = Arc::clone(&self.source);
        let repository = repository.to_string();

        execute_with_policy(&self.policy, "snapshot catalog", || {
            let source = Arc::clone(&source);
            let repository = repository.clone();
            async move { source.latest_snapshot(&repository).await }
        })
        .await
    }
}
