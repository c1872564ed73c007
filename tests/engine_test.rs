//! Integration tests for the migration workflow engine
//!
//! The engine runs against scripted collaborators instead of live
//! clusters: a scenario cluster answering timestamp and density queries
//! from fixed values, a transfer driver following a per-window script,
//! an in-memory checkpoint store, and pre-scripted operator answers.
//!
//! These tests verify that:
//! - The baseline precedence chain is honored and every baseline is
//!   confirmed before any data moves
//! - Windows are planned contiguously and the final drain window is
//!   clipped to the write-stop bound
//! - The checkpoint advances only on success, so an aborted run resumes
//!   exactly at the window that failed
//! - A failed window is retried as planned until the failure ceiling
//!   aborts the run
//! - Stop requests halt the run at a window boundary with the
//!   checkpoint intact

use async_trait::async_trait;
use caravel::adapters::cluster::{ClusterHealth, ClusterQuery, SnapshotInfo};
use caravel::adapters::operator::ScriptedPrompt;
use caravel::adapters::transfer::TransferDriver;
use caravel::config::CaravelConfig;
use caravel::core::engine::MigrationEngine;
use caravel::core::state::journal::read_entries;
use caravel::core::state::{CheckpointStore, MigrationState};
use caravel::domain::{
    AbortReason, BatchResult, MigrationOutcome, Result, TimeWindow, TransferError, TransferJob,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::watch;

/// Cluster facade answering from fixed values
///
/// Density probes always report `count` rows, which keeps the adaptive
/// controller at its initial window duration so the tests can predict
/// window bounds exactly.
struct ScenarioCluster {
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
    snapshot: Option<SnapshotInfo>,
    count: u64,
    probes: AtomicUsize,
}

impl ScenarioCluster {
    fn empty() -> Arc<Self> {
        Arc::new(Self {
            min: None,
            max: None,
            snapshot: None,
            count: 1_000,
            probes: AtomicUsize::new(0),
        })
    }

    fn with_range(min: DateTime<Utc>, max: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            min: Some(min),
            max: Some(max),
            snapshot: None,
            count: 1_000,
            probes: AtomicUsize::new(0),
        })
    }

    fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterQuery for ScenarioCluster {
    async fn max_timestamp(&self, _field: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.max)
    }

    async fn min_timestamp(&self, _field: &str) -> Result<Option<DateTime<Utc>>> {
        Ok(self.min)
    }

    async fn count_in_range(&self, _field: &str, _window: &TimeWindow) -> Result<u64> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(self.count)
    }

    async fn latest_snapshot(&self, _repository: &str) -> Result<Option<SnapshotInfo>> {
        Ok(self.snapshot.clone())
    }

    async fn health(&self) -> Result<ClusterHealth> {
        Ok(ClusterHealth {
            cluster_name: "scenario".to_string(),
            status: "green".to_string(),
        })
    }
}

/// Checkpoint store keeping state in memory and recording every save
#[derive(Default)]
struct InMemoryStore {
    state: Mutex<Option<MigrationState>>,
    saves: Mutex<Vec<MigrationState>>,
}

impl InMemoryStore {
    fn empty() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_state(state: MigrationState) -> Arc<Self> {
        let store = Self::default();
        *store.state.lock().unwrap() = Some(state);
        Arc::new(store)
    }

    fn current(&self) -> Option<MigrationState> {
        self.state.lock().unwrap().clone()
    }

    fn saved_states(&self) -> Vec<MigrationState> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryStore {
    async fn load(&self) -> Result<Option<MigrationState>> {
        Ok(self.state.lock().unwrap().clone())
    }

    async fn save(&self, state: &MigrationState) -> Result<()> {
        *self.state.lock().unwrap() = Some(state.clone());
        self.saves.lock().unwrap().push(state.clone());
        Ok(())
    }
}

/// Transfer driver following a per-window script
///
/// `Some(rows)` completes the window with that row count, `None` fails
/// it with a transient process exit. Once the script runs out every
/// window succeeds with its estimated rows.
struct ScriptedDriver {
    script: Mutex<VecDeque<Option<u64>>>,
    jobs: Mutex<Vec<TransferJob>>,
}

impl ScriptedDriver {
    fn always_succeeding() -> Arc<Self> {
        Self::scripted([])
    }

    fn scripted(outcomes: impl IntoIterator<Item = Option<u64>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.into_iter().collect()),
            jobs: Mutex::new(Vec::new()),
        })
    }

    fn jobs_seen(&self) -> Vec<TransferJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferDriver for ScriptedDriver {
    async fn transfer(&self, job: &TransferJob) -> Result<BatchResult> {
        self.jobs.lock().unwrap().push(*job);
        match self.script.lock().unwrap().pop_front() {
            Some(Some(rows)) => Ok(BatchResult::success(job.window, rows)),
            Some(None) => Err(TransferError::ExitFailure {
                code: 1,
                message: "pipeline crashed".to_string(),
            }
            .into()),
            None => Ok(BatchResult::success(job.window, job.estimated_rows)),
        }
    }
}

/// Driver that requests a stop while its first window is in flight
struct StopRequestingDriver {
    stop: watch::Sender<bool>,
    jobs: Mutex<Vec<TransferJob>>,
}

impl StopRequestingDriver {
    fn jobs_seen(&self) -> Vec<TransferJob> {
        self.jobs.lock().unwrap().clone()
    }
}

#[async_trait]
impl TransferDriver for StopRequestingDriver {
    async fn transfer(&self, job: &TransferJob) -> Result<BatchResult> {
        self.jobs.lock().unwrap().push(*job);
        let _ = self.stop.send(true);
        Ok(BatchResult::success(job.window, job.estimated_rows))
    }
}

/// Minutes past a fixed anchor, so window math stays readable
fn ts(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
}

/// Configuration tuned for fast deterministic runs
///
/// One transfer attempt per window, no pause between windows, and a
/// density target matching the scenario cluster's fixed count so every
/// window keeps the 60 minute initial duration.
fn test_config(dir: &TempDir) -> CaravelConfig {
    let checkpoint = dir.path().join("checkpoint.json");
    let toml = format!(
        r#"
[source]
url = "http://source.internal:9200"

[target]
url = "http://target.internal:9200"

[migration]
index_pattern = "events-*"
timestamp_field = "@timestamp"
cutover_threshold_minutes = 5
failure_ceiling = 3
pause_between_windows_secs = 0

[window]
target_rows = 1000
min_minutes = 1
initial_minutes = 60
max_minutes = 720

[retry]
max_attempts = 1
initial_delay_ms = 1
max_delay_ms = 2

[checkpoint]
path = "{}"
"#,
        checkpoint.display()
    );
    toml::from_str(&toml).unwrap()
}

fn engine(
    config: &CaravelConfig,
    source: &Arc<ScenarioCluster>,
    target: &Arc<ScenarioCluster>,
    driver: Arc<dyn TransferDriver>,
    store: &Arc<InMemoryStore>,
    prompt: &Arc<ScriptedPrompt>,
    shutdown: watch::Receiver<bool>,
) -> MigrationEngine {
    MigrationEngine::new(
        config,
        Arc::clone(source),
        Arc::clone(target),
        driver,
        Arc::clone(store),
        Arc::clone(prompt),
        shutdown,
    )
}

#[tokio::test]
async fn test_fresh_run_completes_through_cutover_drain() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = ScenarioCluster::with_range(ts(0), ts(63));
    let target = ScenarioCluster::empty();
    let driver = ScriptedDriver::scripted([Some(1_000), Some(500)]);
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([true, true]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.outcome, MigrationOutcome::Completed);
    assert_eq!(summary.windows_completed, 2);
    assert_eq!(summary.windows_failed, 0);
    assert_eq!(summary.rows_this_run, 1_500);
    assert_eq!(summary.exit_code(), 0);

    // First window spans the initial duration; the drain window is clipped
    // to just past the newest source document
    let jobs = driver.jobs_seen();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].window.start(), ts(0));
    assert_eq!(jobs[0].window.end(), ts(60));
    assert!(jobs[1].window.follows(&jobs[0].window));
    assert_eq!(jobs[1].window.end(), ts(63) + Duration::milliseconds(1));

    let state = store.current().unwrap();
    assert_eq!(state.resume_timestamp, ts(63) + Duration::milliseconds(1));
    assert_eq!(state.total_rows_migrated, 1_500);

    // One save for the confirmed baseline, one per completed window
    let saves = store.saved_states();
    assert_eq!(saves.len(), 3);
    assert_eq!(saves[0].resume_timestamp, ts(0));
    assert_eq!(saves[0].total_rows_migrated, 0);
    assert_eq!(saves[1].resume_timestamp, ts(60));

    let prompts = prompt.prompts_seen();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("source cluster min timestamp"));
    assert!(prompts[1].contains("writes to the source cluster been stopped"));

    let entries = read_entries(Path::new(&config.checkpoint.journal_path())).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.succeeded));
}

#[tokio::test]
async fn test_lag_inside_threshold_waits_for_write_stop() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = ScenarioCluster::with_range(ts(0), ts(3));
    let target = ScenarioCluster::empty();
    let driver = ScriptedDriver::always_succeeding();
    let mut resumed = MigrationState::new(ts(0));
    resumed.total_rows_migrated = 7_000;
    let store = InMemoryStore::with_state(resumed);
    let prompt = Arc::new(ScriptedPrompt::new([true, false]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    // Declining the write-stop question keeps everything as it was
    assert_eq!(summary.outcome, MigrationOutcome::AwaitingCutoverConfirmation);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.windows_completed, 0);
    assert_eq!(summary.total_rows_migrated, 7_000);
    assert_eq!(summary.resume_timestamp, Some(ts(0)));

    assert!(driver.jobs_seen().is_empty());
    assert!(store.saved_states().is_empty());

    let prompts = prompt.prompts_seen();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("(from checkpoint)"));
    assert!(prompts[1].contains("Lag is down to 3 minute(s)"));
}

#[tokio::test]
async fn test_failure_ceiling_aborts_and_reuses_failed_window() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.migration.failure_ceiling = 2;
    let source = ScenarioCluster::with_range(ts(0), ts(63));
    let target = ScenarioCluster::empty();
    let driver = ScriptedDriver::scripted([None, None]);
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([true]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(
        summary.outcome,
        MigrationOutcome::Aborted(AbortReason::CeilingExceeded {
            consecutive_failures: 2
        })
    );
    assert_eq!(summary.exit_code(), 4);
    assert_eq!(summary.windows_failed, 2);
    assert_eq!(summary.windows_completed, 0);

    // The failed window is retried as planned, without re-probing density
    let jobs = driver.jobs_seen();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0], jobs[1]);
    assert_eq!(source.probe_count(), 1);

    // The resume point never moved; only the failure streak was persisted
    let state = store.current().unwrap();
    assert_eq!(state.resume_timestamp, ts(0));
    assert_eq!(state.consecutive_failures, 2);
    assert_eq!(state.total_rows_migrated, 0);

    let entries = read_entries(Path::new(&config.checkpoint.journal_path())).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| !e.succeeded));
}

#[tokio::test]
async fn test_aborted_run_resumes_from_checkpoint() {
    let dir = TempDir::new().unwrap();
    let source = ScenarioCluster::with_range(ts(0), ts(119));
    let target = ScenarioCluster::empty();
    let store = InMemoryStore::empty();

    // First run: one window lands, the next fails, a ceiling of one aborts
    let mut first_config = test_config(&dir);
    first_config.migration.failure_ceiling = 1;
    let first_driver = ScriptedDriver::scripted([Some(1_000), None]);
    let first_prompt = Arc::new(ScriptedPrompt::new([true]));
    let (_first_tx, first_rx) = watch::channel(false);

    let mut first = engine(
        &first_config,
        &source,
        &target,
        Arc::clone(&first_driver),
        &store,
        &first_prompt,
        first_rx,
    );
    let aborted = first.run().await.unwrap();

    assert_eq!(
        aborted.outcome,
        MigrationOutcome::Aborted(AbortReason::CeilingExceeded {
            consecutive_failures: 1
        })
    );
    assert_eq!(store.current().unwrap().resume_timestamp, ts(60));

    // Second run against the same store picks up at the failed window
    let config = test_config(&dir);
    let driver = ScriptedDriver::always_succeeding();
    let prompt = Arc::new(ScriptedPrompt::new([true, true]));
    let (_second_tx, second_rx) = watch::channel(false);

    let mut second = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        second_rx,
    );
    let summary = second.run().await.unwrap();

    assert_eq!(summary.outcome, MigrationOutcome::Completed);
    assert_eq!(summary.rows_this_run, 1_000);
    assert_eq!(summary.total_rows_migrated, 2_000);
    assert!(prompt.prompts_seen()[0].contains("(from checkpoint)"));

    let jobs = driver.jobs_seen();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].window.start(), ts(60));
    assert_eq!(store.current().unwrap().consecutive_failures, 0);

    // Both runs append to the same journal under their own run ids
    let entries = read_entries(Path::new(&config.checkpoint.journal_path())).unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].run_id, entries[1].run_id);
    assert_ne!(entries[2].run_id, entries[0].run_id);
}

#[tokio::test]
async fn test_empty_clusters_abort_without_baseline() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = ScenarioCluster::empty();
    let target = ScenarioCluster::empty();
    let driver = ScriptedDriver::always_succeeding();
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(
        summary.outcome,
        MigrationOutcome::Aborted(AbortReason::NoBaseline)
    );
    assert_eq!(summary.resume_timestamp, None);
    assert!(prompt.prompts_seen().is_empty());
    assert!(store.saved_states().is_empty());
    assert!(driver.jobs_seen().is_empty());
}

#[tokio::test]
async fn test_declined_baseline_aborts_without_state() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = ScenarioCluster::with_range(ts(0), ts(63));
    let target = ScenarioCluster::empty();
    let driver = ScriptedDriver::always_succeeding();
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([false]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(
        summary.outcome,
        MigrationOutcome::Aborted(AbortReason::BaselineDeclined)
    );
    assert_eq!(summary.resume_timestamp, None);
    assert!(store.saved_states().is_empty());
    assert!(driver.jobs_seen().is_empty());
}

#[tokio::test]
async fn test_ambiguous_snapshot_baseline_needs_explicit_acceptance() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.migration.snapshot_repository = Some("backups".to_string());
    let source = Arc::new(ScenarioCluster {
        min: Some(ts(0)),
        max: Some(ts(70)),
        snapshot: Some(SnapshotInfo {
            name: "nightly-0430".to_string(),
            captured_at: ts(10),
        }),
        count: 1_000,
        probes: AtomicUsize::new(0),
    });
    let target = ScenarioCluster::with_range(ts(0), ts(20));
    let driver = ScriptedDriver::always_succeeding();
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([false]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    // The snapshot predates data already on the target; declining the
    // flagged baseline aborts with the stronger reason
    assert_eq!(
        summary.outcome,
        MigrationOutcome::Aborted(AbortReason::AmbiguousBaseline)
    );
    let prompts = prompt.prompts_seen();
    assert!(prompts[0].contains("(from snapshot catalog)"));
    assert!(prompts[0].contains("conflicts with target max"));
    assert!(store.saved_states().is_empty());
    assert!(driver.jobs_seen().is_empty());
}

#[tokio::test]
async fn test_accepted_snapshot_baseline_starts_at_snapshot_time() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.migration.snapshot_repository = Some("backups".to_string());
    let source = Arc::new(ScenarioCluster {
        min: Some(ts(0)),
        max: Some(ts(70)),
        snapshot: Some(SnapshotInfo {
            name: "nightly-0430".to_string(),
            captured_at: ts(10),
        }),
        count: 1_000,
        probes: AtomicUsize::new(0),
    });
    let target = ScenarioCluster::with_range(ts(0), ts(20));
    let driver = ScriptedDriver::always_succeeding();
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([true, false]));
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    // Snapshot precedence holds even though the target has newer data
    assert_eq!(summary.outcome, MigrationOutcome::AwaitingCutoverConfirmation);
    let jobs = driver.jobs_seen();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].window.start(), ts(10));
    assert_eq!(jobs[0].window.end(), ts(70));
    assert_eq!(store.current().unwrap().resume_timestamp, ts(70));
}

#[tokio::test]
async fn test_stop_request_before_first_window_halts_cleanly() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = ScenarioCluster::with_range(ts(0), ts(63));
    let target = ScenarioCluster::empty();
    let driver = ScriptedDriver::always_succeeding();
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([true]));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    shutdown_tx.send(true).unwrap();

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    assert_eq!(
        summary.outcome,
        MigrationOutcome::Aborted(AbortReason::OperatorStop)
    );
    // The confirmed baseline is already checkpointed for the next run
    assert_eq!(store.saved_states().len(), 1);
    assert_eq!(store.current().unwrap().resume_timestamp, ts(0));
    assert!(driver.jobs_seen().is_empty());
}

#[tokio::test]
async fn test_stop_request_during_run_halts_at_window_boundary() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let source = ScenarioCluster::with_range(ts(0), ts(240));
    let target = ScenarioCluster::empty();
    let store = InMemoryStore::empty();
    let prompt = Arc::new(ScriptedPrompt::new([true]));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = Arc::new(StopRequestingDriver {
        stop: shutdown_tx,
        jobs: Mutex::new(Vec::new()),
    });

    let mut engine = engine(
        &config,
        &source,
        &target,
        Arc::clone(&driver),
        &store,
        &prompt,
        shutdown_rx,
    );
    let summary = engine.run().await.unwrap();

    // The in-flight window finishes and checkpoints before the stop lands
    assert_eq!(
        summary.outcome,
        MigrationOutcome::Aborted(AbortReason::OperatorStop)
    );
    assert_eq!(summary.windows_completed, 1);
    assert_eq!(driver.jobs_seen().len(), 1);
    assert_eq!(store.current().unwrap().resume_timestamp, ts(60));
}
