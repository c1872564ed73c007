//! Baseline and outcome models
//!
//! The baseline is the timestamp incremental migration starts from. It is
//! resolved once at startup from the first available of: checkpoint, snapshot
//! catalog, target cluster data, source cluster data. The outcome describes
//! how a whole run ended.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a baseline timestamp came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineSource {
    /// A previous run's checkpoint record
    Checkpoint,
    /// The most recent completed snapshot in the configured repository
    Snapshot,
    /// The newest document already present on the target cluster
    TargetClusterMax,
    /// The oldest document on the source cluster (full migration)
    SourceMin,
}

impl fmt::Display for BaselineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BaselineSource::Checkpoint => "checkpoint",
            BaselineSource::Snapshot => "snapshot catalog",
            BaselineSource::TargetClusterMax => "target cluster max timestamp",
            BaselineSource::SourceMin => "source cluster min timestamp",
        };
        write!(f, "{label}")
    }
}

/// A resolved starting point for the migration, pending operator confirmation
///
/// `conflicting_target_max` is set when a snapshot baseline is older than the
/// newest document already on the target: precedence still picks the snapshot,
/// but the conflict must be surfaced and explicitly accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineCandidate {
    pub source: BaselineSource,
    pub timestamp: DateTime<Utc>,
    pub conflicting_target_max: Option<DateTime<Utc>>,
}

impl BaselineCandidate {
    pub fn new(source: BaselineSource, timestamp: DateTime<Utc>) -> Self {
        Self {
            source,
            timestamp,
            conflicting_target_max: None,
        }
    }

    /// Flags a snapshot baseline that predates data already on the target
    pub fn with_conflict(mut self, target_max: DateTime<Utc>) -> Self {
        self.conflicting_target_max = Some(target_max);
        self
    }

    /// Whether this candidate needs the stronger ambiguity warning
    pub fn is_ambiguous(&self) -> bool {
        self.conflicting_target_max.is_some()
    }
}

impl fmt::Display for BaselineCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (from {})", self.timestamp.to_rfc3339(), self.source)?;
        if let Some(target_max) = self.conflicting_target_max {
            write!(
                f,
                "; conflicts with target max {}",
                target_max.to_rfc3339()
            )?;
        }
        Ok(())
    }
}

/// Why a run ended in `Aborted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// No checkpoint, snapshot, target data or source data to start from
    NoBaseline,
    /// Operator rejected the proposed baseline
    BaselineDeclined,
    /// Operator rejected an ambiguous baseline (snapshot older than target data)
    AmbiguousBaseline,
    /// Consecutive window failures passed the configured ceiling
    CeilingExceeded { consecutive_failures: u32 },
    /// Shutdown was requested; stopped at a window boundary
    OperatorStop,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::NoBaseline => {
                write!(f, "no baseline could be derived (source cluster is empty)")
            }
            AbortReason::BaselineDeclined => write!(f, "operator declined the baseline"),
            AbortReason::AmbiguousBaseline => {
                write!(f, "ambiguous baseline was not confirmed by the operator")
            }
            AbortReason::CeilingExceeded {
                consecutive_failures,
            } => write!(
                f,
                "{consecutive_failures} consecutive window failures exceeded the ceiling"
            ),
            AbortReason::OperatorStop => write!(f, "stop requested; halted at window boundary"),
        }
    }
}

/// How a migration run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationOutcome {
    /// The final cutover pass finished; clusters are in sync up to write-stop
    Completed,
    /// Lag is inside the cutover threshold; waiting for the operator to stop
    /// source writes and re-run
    AwaitingCutoverConfirmation,
    /// The run stopped without finishing; checkpoint holds the resume point
    Aborted(AbortReason),
}

impl MigrationOutcome {
    /// Process exit code for this outcome
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationOutcome::Completed => 0,
            MigrationOutcome::AwaitingCutoverConfirmation => 0,
            MigrationOutcome::Aborted(_) => 4,
        }
    }
}

impl fmt::Display for MigrationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationOutcome::Completed => write!(f, "completed"),
            MigrationOutcome::AwaitingCutoverConfirmation => {
                write!(f, "awaiting cutover confirmation")
            }
            MigrationOutcome::Aborted(reason) => write!(f, "aborted: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, 0, 0).unwrap()
    }

    #[test]
    fn test_candidate_without_conflict() {
        let candidate = BaselineCandidate::new(BaselineSource::Snapshot, ts(3));
        assert!(!candidate.is_ambiguous());
        assert!(candidate.to_string().contains("snapshot catalog"));
    }

    #[test]
    fn test_candidate_with_conflict() {
        let candidate = BaselineCandidate::new(BaselineSource::Snapshot, ts(3)).with_conflict(ts(5));
        assert!(candidate.is_ambiguous());
        assert!(candidate.to_string().contains("conflicts with target max"));
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(MigrationOutcome::Completed.exit_code(), 0);
        assert_eq!(MigrationOutcome::AwaitingCutoverConfirmation.exit_code(), 0);
        assert_eq!(
            MigrationOutcome::Aborted(AbortReason::NoBaseline).exit_code(),
            4
        );
    }

    #[test]
    fn test_abort_reason_display() {
        let reason = AbortReason::CeilingExceeded {
            consecutive_failures: 4,
        };
        assert_eq!(
            reason.to_string(),
            "4 consecutive window failures exceeded the ceiling"
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = MigrationOutcome::Aborted(AbortReason::OperatorStop);
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("operator_stop"));
    }
}
