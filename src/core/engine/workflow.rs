//! Migration workflow engine
//!
//! Single-threaded, sequential orchestration of one incremental run:
//! resolve the baseline, get it confirmed, then loop planning one window
//! at a time, transferring it, and checkpointing after every success.
//! Windows never overlap and are never reordered; the resume point only
//! moves forward. When source lag falls inside the cutover threshold the
//! engine asks for a write stop and drains the remainder in a final pass.
//!
//! The engine is the only place that decides whether a run continues or
//! stops. Adapters report what happened; policy lives here.

use crate::adapters::cluster::ClusterQuery;
use crate::adapters::operator::OperatorPrompt;
use crate::adapters::transfer::TransferDriver;
use crate::config::{CaravelConfig, MigrationConfig};
use crate::core::engine::baseline::BaselineResolver;
use crate::core::engine::summary::{MigrationSummary, RunTracker};
use crate::core::retry::{execute_transfer, execute_with_policy, RetryPolicy};
use crate::core::state::{CheckpointStore, MigrationState, WindowJournal};
use crate::core::window::WindowController;
use crate::domain::{
    AbortReason, BaselineCandidate, CaravelError, MigrationOutcome, Result, TimeWindow, TransferJob,
};
use crate::{log_error_with_context, log_window_complete};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::watch;

/// Outcome of the cutover gate
enum CutoverDecision {
    /// Writes are still flowing; leave the checkpoint and stop for now
    Wait,
    /// Nothing newer than the resume point remains
    Done,
    /// Drain windows up to this exclusive bound, then complete
    Drain(DateTime<Utc>),
}

/// Drives one migration run end to end
pub struct MigrationEngine {
    source: Arc<dyn ClusterQuery>,
    target: Arc<dyn ClusterQuery>,
    driver: Arc<dyn TransferDriver>,
    store: Arc<dyn CheckpointStore>,
    prompt: Arc<dyn OperatorPrompt>,
    journal: WindowJournal,
    controller: WindowController,
    resolver: BaselineResolver,
    migration: MigrationConfig,
    query_policy: RetryPolicy,
    transfer_policy: RetryPolicy,
    shutdown: watch::Receiver<bool>,
}

impl MigrationEngine {
    /// Wire up an engine from configuration and its collaborators
    ///
    /// Cluster queries run under the configured retry policy including its
    /// per-attempt deadline. Transfers drop the deadline, since the driver
    /// bounds its own process runtime.
    pub fn new(
        config: &CaravelConfig,
        source: Arc<dyn ClusterQuery>,
        target: Arc<dyn ClusterQuery>,
        driver: Arc<dyn TransferDriver>,
        store: Arc<dyn CheckpointStore>,
        prompt: Arc<dyn OperatorPrompt>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let query_policy = RetryPolicy::from_config(&config.retry);
        let transfer_policy = query_policy.without_attempt_timeout();

        let controller = WindowController::new(
            Arc::clone(&source),
            config.window.clone(),
            config.migration.timestamp_field.clone(),
            query_policy.clone(),
        );
        let resolver = BaselineResolver::new(
            Arc::clone(&source),
            Arc::clone(&target),
            config.migration.snapshot_repository.clone(),
            config.migration.timestamp_field.clone(),
            query_policy.clone(),
        );
        let journal = WindowJournal::new(config.checkpoint.journal_path());

        Self {
            source,
            target,
            driver,
            store,
            prompt,
            journal,
            controller,
            resolver,
            migration: config.migration.clone(),
            query_policy,
            transfer_policy,
            shutdown,
        }
    }

    /// Run the migration until it completes, waits, or aborts
    ///
    /// Returns `Ok` with a summary for every migration-level ending,
    /// including aborts; the checkpoint then holds the exact resume point.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures the engine cannot fold into an
    /// outcome, such as an unwritable checkpoint or clusters that stay
    /// unreachable through every retry.
    pub async fn run(&mut self) -> Result<MigrationSummary> {
        let mut tracker = RunTracker::new();

        self.preflight().await?;

        let checkpoint = self.store.load().await?;
        let candidate = match self.resolver.resolve(checkpoint.as_ref()).await? {
            Some(candidate) => candidate,
            None => {
                tracing::error!("Neither cluster holds any data; there is nothing to migrate");
                return Ok(tracker.finish(
                    MigrationOutcome::Aborted(AbortReason::NoBaseline),
                    None,
                ));
            }
        };

        if !self.confirm_baseline(&candidate).await? {
            let reason = if candidate.is_ambiguous() {
                AbortReason::AmbiguousBaseline
            } else {
                AbortReason::BaselineDeclined
            };
            tracing::warn!(baseline = %candidate, "Baseline was not confirmed");
            return Ok(tracker.finish(MigrationOutcome::Aborted(reason), None));
        }

        let mut state = match checkpoint {
            Some(state) => state,
            None => {
                let state = MigrationState::new(candidate.timestamp);
                // Persist the accepted baseline before the first transfer so
                // a crash cannot reopen the question
                self.store.save(&state).await?;
                state
            }
        };

        let outcome = self.drive(&mut state, &mut tracker).await?;
        let summary = tracker.finish(outcome, Some(&state));
        tracing::info!(
            outcome = %summary.outcome,
            rows = summary.rows_this_run,
            windows = summary.windows_completed,
            "Run finished"
        );
        Ok(summary)
    }

    /// The main window loop
    async fn drive(
        &mut self,
        state: &mut MigrationState,
        tracker: &mut RunTracker,
    ) -> Result<MigrationOutcome> {
        let mut write_stop: Option<DateTime<Utc>> = None;
        let mut pending: Option<TransferJob> = None;

        loop {
            if self.stop_requested() {
                tracing::info!("Stop requested; halting at a window boundary");
                return Ok(MigrationOutcome::Aborted(AbortReason::OperatorStop));
            }

            match write_stop {
                None => {
                    let lag = self.current_lag(state).await?;
                    if lag <= self.migration.cutover_threshold() {
                        match self.cutover_gate(state, lag).await? {
                            CutoverDecision::Wait => {
                                return Ok(MigrationOutcome::AwaitingCutoverConfirmation);
                            }
                            CutoverDecision::Done => return Ok(MigrationOutcome::Completed),
                            CutoverDecision::Drain(stop) => {
                                write_stop = Some(stop);
                                continue;
                            }
                        }
                    }
                }
                Some(stop) if state.resume_timestamp >= stop => {
                    tracing::info!(
                        rows = state.total_rows_migrated,
                        "Final pass complete; clusters are in sync"
                    );
                    return Ok(MigrationOutcome::Completed);
                }
                Some(_) => {}
            }

            // Re-run the window that just failed, or plan a fresh one
            let job = match pending.take() {
                Some(job) => job,
                None => match self.plan_window(state.resume_timestamp, write_stop).await {
                    Ok(job) => job,
                    Err(e) => {
                        log_error_with_context!(e, "window planning failed");
                        if let Some(outcome) = self.register_failure(state, tracker).await? {
                            return Ok(outcome);
                        }
                        self.pause().await;
                        continue;
                    }
                },
            };

            let started = std::time::Instant::now();
            let (result, attempts) =
                execute_transfer(&self.transfer_policy, self.driver.as_ref(), &job).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            // The journal is advisory; a full disk should not kill the run
            if let Err(e) = self
                .journal
                .record(&result, job.estimated_rows, attempts, duration_ms)
            {
                tracing::warn!(error = %e, "Could not append to the window journal");
            }

            if result.succeeded {
                state.advance(&result.window, result.rows_transferred);
                self.store.save(state).await?;
                tracker.window_succeeded(result.rows_transferred);
                log_window_complete!(result.window, result.rows_transferred, duration_ms);
            } else {
                pending = Some(job);
                if let Some(outcome) = self.register_failure(state, tracker).await? {
                    return Ok(outcome);
                }
            }

            self.pause().await;
        }
    }

    /// Probe both clusters before touching anything
    async fn preflight(&self) -> Result<()> {
        for (label, cluster) in [("source", &self.source), ("target", &self.target)] {
            let health = execute_with_policy(&self.query_policy, "cluster health", || {
                let cluster = Arc::clone(cluster);
                async move { cluster.health().await }
            })
            .await?;
            tracing::info!(
                cluster = label,
                name = %health.cluster_name,
                status = %health.status,
                "Cluster reachable"
            );
        }
        Ok(())
    }

    async fn confirm_baseline(&self, candidate: &BaselineCandidate) -> Result<bool> {
        if let Some(target_max) = candidate.conflicting_target_max {
            tracing::warn!(
                snapshot = %candidate.timestamp.to_rfc3339(),
                target_max = %target_max.to_rfc3339(),
                "Snapshot predates data already on the target; accepting will re-copy overlapping rows"
            );
        }
        self.prompt
            .confirm(&format!("Start migrating from {candidate}?"))
            .await
    }

    /// Measure how far the source high watermark is past the resume point
    async fn current_lag(&self, state: &MigrationState) -> Result<Duration> {
        let lag = match self.source_max().await? {
            Some(max) if max > state.resume_timestamp => max - state.resume_timestamp,
            _ => Duration::zero(),
        };
        tracing::debug!(lag_minutes = lag.num_minutes(), "Source lag measured");
        Ok(lag)
    }

    /// Ask for a write stop and decide how the run ends
    async fn cutover_gate(
        &self,
        state: &MigrationState,
        lag: Duration,
    ) -> Result<CutoverDecision> {
        tracing::info!(
            lag_minutes = lag.num_minutes(),
            threshold_minutes = self.migration.cutover_threshold_minutes,
            "Source lag is inside the cutover threshold"
        );

        let question = format!(
            "Lag is down to {} minute(s). Have writes to the source cluster been stopped?",
            lag.num_minutes()
        );
        if !self.prompt.confirm(&question).await? {
            tracing::info!(
                "Writes still flowing; checkpoint kept. Stop source writes and re-run to finish."
            );
            return Ok(CutoverDecision::Wait);
        }

        // Re-read the high watermark after the write stop; stragglers may
        // have landed since the lag was measured
        let Some(source_max) = self.source_max().await? else {
            return Ok(CutoverDecision::Done);
        };

        if source_max < state.resume_timestamp {
            return Ok(CutoverDecision::Done);
        }

        // Window bounds are exclusive at the end, so nudge the bound just
        // past the newest document to include it
        Ok(CutoverDecision::Drain(
            source_max + Duration::milliseconds(1),
        ))
    }

    /// Plan the next window, clipping it to the write stop during a drain
    async fn plan_window(
        &mut self,
        resume: DateTime<Utc>,
        write_stop: Option<DateTime<Utc>>,
    ) -> Result<TransferJob> {
        let mut job = self.controller.next_window(resume).await?;

        if let Some(stop) = write_stop {
            if stop < job.window.end() {
                let clipped =
                    TimeWindow::new(job.window.start(), stop).map_err(CaravelError::Validation)?;
                job = TransferJob::new(clipped, job.estimated_rows);
            }
        }

        Ok(job)
    }

    /// Bookkeeping for a failed window; returns the abort outcome once the
    /// ceiling is reached
    async fn register_failure(
        &self,
        state: &mut MigrationState,
        tracker: &mut RunTracker,
    ) -> Result<Option<MigrationOutcome>> {
        state.record_failure();
        tracker.window_failed();
        self.store.save(state).await?;
        tracing::warn!(
            consecutive_failures = state.consecutive_failures,
            resume = %state.resume_timestamp.to_rfc3339(),
            "Window failed; resume point unchanged"
        );

        if state.at_failure_ceiling(self.migration.failure_ceiling) {
            tracing::error!(
                ceiling = self.migration.failure_ceiling,
                "Too many consecutive failures; aborting. Fix the cause and re-run to resume."
            );
            return Ok(Some(MigrationOutcome::Aborted(
                AbortReason::CeilingExceeded {
                    consecutive_failures: state.consecutive_failures,
                },
            )));
        }

        Ok(None)
    }

    async fn source_max(&self) -> Result<Option<DateTime<Utc>>> {
        let source = Arc::clone(&self.source);
        let field = self.migration.timestamp_field.clone();

        execute_with_policy(&self.query_policy, "source max timestamp", || {
            let source = Arc::clone(&source);
            let field = field.clone();
            async move { source.max_timestamp(&field).await }
        })
        .await
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Breathe between windows so the source cluster is not hammered
    async fn pause(&mut self) {
        let secs = self.migration.pause_between_windows_secs;
        if secs == 0 {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(secs)) => {}
            _ = self.shutdown.changed() => {}
        }
    }
}
