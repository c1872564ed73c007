//! Cluster query abstraction
//!
//! This module defines the read-only trait the engine uses to interrogate
//! a cluster. Both the source and target clusters are accessed exclusively
//! through this interface, which keeps the workflow testable against
//! scripted fakes.

use crate::domain::{Result, TimeWindow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A completed snapshot found in a snapshot repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    /// Snapshot name as reported by the repository
    pub name: String,

    /// When the snapshot capture began; data up to this instant is covered
    pub captured_at: DateTime<Utc>,
}

/// Basic cluster health as reported by the cluster itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterHealth {
    /// Cluster name
    pub cluster_name: String,

    /// Health color: green or yellow (red is reported as an error)
    pub status: String,
}

/// Read-only query facade over one cluster
///
/// All methods are safe to retry; none of them mutate cluster state.
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// Newest value of the given timestamp field across the index pattern
    ///
    /// Returns `Ok(None)` when the index holds no documents (or does not
    /// exist yet).
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster cannot be reached or rejects the
    /// query.
    async fn max_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>>;

    /// Oldest value of the given timestamp field across the index pattern
    ///
    /// Returns `Ok(None)` when the index holds no documents (or does not
    /// exist yet).
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster cannot be reached or rejects the
    /// query.
    async fn min_timestamp(&self, field: &str) -> Result<Option<DateTime<Utc>>>;

    /// Number of documents whose timestamp falls inside the window
    ///
    /// The window is half-open: documents at exactly `window.end()` are
    /// not counted. A missing index counts as zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster cannot be reached or rejects the
    /// query.
    async fn count_in_range(&self, field: &str, window: &TimeWindow) -> Result<u64>;

    /// Most recent successfully completed snapshot in the repository
    ///
    /// Returns `Ok(None)` when the repository exists but holds no
    /// completed snapshots, or when the repository is not registered on
    /// the cluster.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot catalog cannot be queried.
    async fn latest_snapshot(&self, repository: &str) -> Result<Option<SnapshotInfo>>;

    /// Probe cluster health
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster is unreachable or reports red
    /// status.
    async fn health(&self) -> Result<ClusterHealth>;
}
