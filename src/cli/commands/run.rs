//! Run command implementation
//!
//! This module implements the `run` command, the primary entry point. One
//! invocation drives one migration run: baseline, windowed transfers, and
//! the cutover sequence once the clusters are nearly in sync.

use crate::adapters::cluster::HttpClusterQuery;
use crate::adapters::operator::{ConsolePrompt, OperatorPrompt};
use crate::adapters::transfer::LogstashDriver;
use crate::config::load_config;
use crate::core::engine::MigrationEngine;
use crate::core::state::FileCheckpointStore;
use crate::domain::{AbortReason, MigrationOutcome, Result};
use async_trait::async_trait;
use clap::Args;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Accept the proposed baseline without prompting
    #[arg(short, long)]
    pub yes: bool,

    /// Override the index pattern to migrate
    #[arg(long)]
    pub index_pattern: Option<String>,

    /// Override the cutover threshold in minutes
    #[arg(long)]
    pub cutover_threshold_minutes: Option<u64>,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting migration run");

        // Load configuration
        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2);
            }
        };

        // Apply CLI overrides
        if let Some(pattern) = &self.index_pattern {
            tracing::info!(index_pattern = %pattern, "Overriding index pattern from CLI");
            config.migration.index_pattern = pattern.clone();
        }

        if let Some(minutes) = self.cutover_threshold_minutes {
            tracing::info!(minutes, "Overriding cutover threshold from CLI");
            config.migration.cutover_threshold_minutes = minutes;
        }

        // Validate configuration after overrides
        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2);
        }

        println!("Migration Configuration:");
        println!("  Source: {}", config.source.url);
        println!("  Target: {}", config.target.url);
        println!("  Index pattern: {}", config.migration.index_pattern);
        println!("  Timestamp field: {}", config.migration.timestamp_field);
        println!(
            "  Cutover threshold: {} minute(s)",
            config.migration.cutover_threshold_minutes
        );
        println!("  Checkpoint: {}", config.checkpoint.path);
        println!();

        // One run per checkpoint at a time; the lock guard lives until exit
        let store = FileCheckpointStore::new(&config.checkpoint.path);
        let _lock = match store.acquire_lock() {
            Ok(lock) => lock,
            Err(e) => {
                tracing::error!(error = %e, "Could not acquire the checkpoint lock");
                eprintln!("Another migration appears to be running: {e}");
                eprintln!("If that process is gone, remove the stale lock with 'caravel reset'.");
                return Ok(4);
            }
        };

        let source = match HttpClusterQuery::new(
            "source",
            &config.source,
            &config.migration.index_pattern,
        ) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "Failed to set up the source cluster client");
                eprintln!("Failed to set up the source cluster client: {e}");
                return Ok(2);
            }
        };

        let target = match HttpClusterQuery::new(
            "target",
            &config.target,
            &config.migration.index_pattern,
        ) {
            Ok(c) => Arc::new(c),
            Err(e) => {
                tracing::error!(error = %e, "Failed to set up the target cluster client");
                eprintln!("Failed to set up the target cluster client: {e}");
                return Ok(2);
            }
        };

        let driver = match LogstashDriver::new(&config) {
            Ok(d) => Arc::new(d),
            Err(e) => {
                tracing::error!(error = %e, "Failed to set up the transfer driver");
                eprintln!("Failed to set up the transfer driver: {e}");
                return Ok(2);
            }
        };

        let prompt: Arc<dyn OperatorPrompt> = if self.yes {
            Arc::new(BaselinePreconfirmed::new())
        } else {
            Arc::new(ConsolePrompt)
        };

        let mut engine = MigrationEngine::new(
            &config,
            source,
            target,
            driver,
            Arc::new(store),
            prompt,
            shutdown_signal,
        );

        tracing::info!("Executing migration");
        println!("🚀 Starting migration...");
        println!();

        let summary = match engine.run().await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, "Migration run failed");
                eprintln!("Migration failed: {e}");
                return Ok(5);
            }
        };

        // Display summary
        println!();
        println!("📊 Migration Summary:");
        println!("  Outcome: {}", summary.outcome);
        println!(
            "  Windows: {} completed, {} failed",
            summary.windows_completed, summary.windows_failed
        );
        println!(
            "  Rows: {} this run, {} in total",
            summary.rows_this_run, summary.total_rows_migrated
        );
        println!("  Duration: {:.2}s", summary.elapsed.as_secs_f64());
        if let Some(resume) = summary.resume_timestamp {
            println!("  Resume point: {}", resume.to_rfc3339());
        }
        println!();

        // Determine exit code
        let exit_code = match &summary.outcome {
            MigrationOutcome::Completed => {
                println!("✅ Migration completed, clusters are in sync.");
                summary.exit_code()
            }
            MigrationOutcome::AwaitingCutoverConfirmation => {
                println!("⏸️  Source lag is inside the cutover threshold.");
                println!("   Stop writes to the source cluster, then run the same command");
                println!("   again to drain the remainder and finish.");
                summary.exit_code()
            }
            MigrationOutcome::Aborted(AbortReason::OperatorStop) => {
                println!("⚠️  Migration interrupted gracefully. Progress saved.");
                println!("   Run the same command to resume from the checkpoint.");
                tracing::info!("Migration interrupted by operator signal");
                130 // SIGINT exit code (standard Unix convention)
            }
            MigrationOutcome::Aborted(reason) => {
                println!("❌ Migration aborted: {reason}");
                if summary.resume_timestamp.is_some() {
                    println!("   The checkpoint keeps the resume point; re-run to continue.");
                }
                summary.exit_code()
            }
        };

        tracing::info!(exit_code, "Migration run finished");
        Ok(exit_code)
    }
}

/// Prompt that auto-confirms the first question and defers the rest
///
/// `--yes` accepts the baseline unattended. The cutover question still
/// goes to the console, since only the operator knows whether writes to
/// the source have actually been stopped.
struct BaselinePreconfirmed {
    inner: ConsolePrompt,
    asked: AtomicBool,
}

impl BaselinePreconfirmed {
    fn new() -> Self {
        Self {
            inner: ConsolePrompt,
            asked: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl OperatorPrompt for BaselinePreconfirmed {
    async fn confirm(&self, prompt: &str) -> Result<bool> {
        if !self.asked.swap(true, Ordering::SeqCst) {
            println!("{prompt} [confirmed by --yes]");
            return Ok(true);
        }
        self.inner.confirm(prompt).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preconfirmed_prompt_answers_only_once() {
        let prompt = BaselinePreconfirmed::new();

        assert!(prompt.confirm("start from here?").await.unwrap());
        assert!(prompt.asked.load(Ordering::SeqCst));
    }

    #[test]
    fn test_run_args_defaults() {
        let args = RunArgs {
            yes: false,
            index_pattern: None,
            cutover_threshold_minutes: None,
        };

        assert!(!args.yes);
        assert!(args.index_pattern.is_none());
        assert!(args.cutover_threshold_minutes.is_none());
    }
}
