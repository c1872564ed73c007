//! Domain error types
//!
//! This module defines the error hierarchy for Caravel. All errors are
//! domain-specific and don't expose third-party types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main Caravel error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum CaravelError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Cluster query errors
    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Batch transfer errors
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    /// Checkpoint persistence errors
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Another process holds the checkpoint lock
    #[error("Checkpoint is locked by another process: {0}")]
    CheckpointLocked(String),

    /// Baseline could not be resolved without operator input
    #[error("Ambiguous baseline: {0}")]
    AmbiguousBaseline(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

/// Cluster-specific errors
///
/// Errors that occur when querying a source or target cluster.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Failed to connect to the cluster
    #[error("Failed to connect to cluster: {0}")]
    ConnectionFailed(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Invalid response from the cluster
    #[error("Invalid response from cluster: {0}")]
    InvalidResponse(String),

    /// Cluster rejected the query
    #[error("Query rejected: {0}")]
    QueryRejected(String),

    /// Snapshot repository missing or unreadable
    #[error("Snapshot repository unavailable: {0}")]
    SnapshotRepository(String),

    /// Cluster reported an unusable health state
    #[error("Cluster unhealthy: {0}")]
    Unhealthy(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
}

impl ClusterError {
    /// Whether a retry can reasonably succeed.
    ///
    /// Connection failures, timeouts, 5xx responses and degraded health are
    /// transient; authentication failures and 4xx rejections are not.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ClusterError::ConnectionFailed(_)
            | ClusterError::Timeout(_)
            | ClusterError::Unhealthy(_)
            | ClusterError::ServerError { .. } => FailureKind::Transient,
            ClusterError::AuthenticationFailed(_)
            | ClusterError::InvalidResponse(_)
            | ClusterError::QueryRejected(_)
            | ClusterError::SnapshotRepository(_)
            | ClusterError::ClientError { .. } => FailureKind::Rejected,
        }
    }
}

/// Transfer-tool errors
///
/// Errors that occur when running the external batch transfer process.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transfer process could not be started
    #[error("Failed to start transfer process: {0}")]
    SpawnFailed(String),

    /// The transfer process exited with a failure status
    #[error("Transfer process failed (exit code {code}): {message}")]
    ExitFailure { code: i32, message: String },

    /// The transfer process exceeded its time budget and was stopped
    #[error("Transfer timed out after {0}s")]
    Timeout(u64),

    /// The pipeline template could not be rendered
    #[error("Invalid pipeline template: {0}")]
    Template(String),

    /// The transfer workspace could not be prepared
    #[error("Transfer workspace error: {0}")]
    Workspace(String),
}

impl TransferError {
    /// Whether a retry can reasonably succeed.
    ///
    /// Process failures and timeouts are transient (network hiccups surface
    /// as non-zero exits); a broken template or workspace never self-heals.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            TransferError::SpawnFailed(_)
            | TransferError::ExitFailure { .. }
            | TransferError::Timeout(_) => FailureKind::Transient,
            TransferError::Template(_) | TransferError::Workspace(_) => FailureKind::Rejected,
        }
    }
}

/// Classification of a failed operation for retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network/timeout class failure; a retry may succeed
    Transient,
    /// The remote side refused the request; retrying is pointless
    Rejected,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Transient => write!(f, "transient"),
            FailureKind::Rejected => write!(f, "rejected"),
        }
    }
}

impl CaravelError {
    /// Classifies this error for retry purposes, if it maps to a batch failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            CaravelError::Cluster(e) => Some(e.failure_kind()),
            CaravelError::Transfer(e) => Some(e.failure_kind()),
            _ => None,
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for CaravelError {
    fn from(err: std::io::Error) -> Self {
        CaravelError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for CaravelError {
    fn from(err: serde_json::Error) -> Self {
        CaravelError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for CaravelError {
    fn from(err: toml::de::Error) -> Self {
        CaravelError::Configuration(format!("TOML parse error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caravel_error_display() {
        let err = CaravelError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_cluster_error_conversion() {
        let cluster_err = ClusterError::ConnectionFailed("Network error".to_string());
        let caravel_err: CaravelError = cluster_err.into();
        assert!(matches!(caravel_err, CaravelError::Cluster(_)));
    }

    #[test]
    fn test_transfer_error_conversion() {
        let transfer_err = TransferError::Timeout(3600);
        let caravel_err: CaravelError = transfer_err.into();
        assert!(matches!(caravel_err, CaravelError::Transfer(_)));
    }

    #[test]
    fn test_cluster_transient_classification() {
        assert_eq!(
            ClusterError::Timeout("30s".to_string()).failure_kind(),
            FailureKind::Transient
        );
        assert_eq!(
            ClusterError::ServerError {
                status: 503,
                message: "unavailable".to_string()
            }
            .failure_kind(),
            FailureKind::Transient
        );
    }

    #[test]
    fn test_cluster_rejected_classification() {
        assert_eq!(
            ClusterError::QueryRejected("bad field".to_string()).failure_kind(),
            FailureKind::Rejected
        );
        assert_eq!(
            ClusterError::ClientError {
                status: 400,
                message: "parse failure".to_string()
            }
            .failure_kind(),
            FailureKind::Rejected
        );
    }

    #[test]
    fn test_transfer_classification() {
        assert_eq!(
            TransferError::ExitFailure {
                code: 1,
                message: "pipeline died".to_string()
            }
            .failure_kind(),
            FailureKind::Transient
        );
        assert_eq!(
            TransferError::Template("missing placeholder".to_string()).failure_kind(),
            FailureKind::Rejected
        );
    }

    #[test]
    fn test_failure_kind_from_top_level() {
        let err: CaravelError = ClusterError::Timeout("10s".to_string()).into();
        assert_eq!(err.failure_kind(), Some(FailureKind::Transient));
        let err = CaravelError::Validation("nope".to_string());
        assert_eq!(err.failure_kind(), None);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let caravel_err: CaravelError = io_err.into();
        assert!(matches!(caravel_err, CaravelError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let caravel_err: CaravelError = json_err.into();
        assert!(matches!(caravel_err, CaravelError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let caravel_err: CaravelError = toml_err.into();
        assert!(matches!(caravel_err, CaravelError::Configuration(_)));
        assert!(caravel_err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_caravel_error_implements_std_error() {
        let err = CaravelError::Validation("Test error".to_string());
        let _: &dyn std::error::Error = &err;
    }

    #[test]
    fn test_failure_kind_display() {
        assert_eq!(FailureKind::Transient.to_string(), "transient");
        assert_eq!(FailureKind::Rejected.to_string(), "rejected");
    }
}
