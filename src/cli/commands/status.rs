//! Status command implementation
//!
//! This module implements the `status` command for displaying the saved
//! checkpoint and the tail of the window journal, without touching either
//! cluster.

use crate::config::load_config;
use crate::core::state::journal::read_entries;
use crate::core::state::FileCheckpointStore;
use clap::Args;
use std::path::Path;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Number of recent windows to show from the journal
    #[arg(long, default_value_t = 5)]
    pub recent: usize,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking migration status");

        println!("📊 Migration Status");
        println!();

        // Load configuration
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {}", e);
                return Ok(2); // Configuration error exit code
            }
        };

        println!("Index pattern: {}", config.migration.index_pattern);
        println!("Checkpoint: {}", config.checkpoint.path);
        println!();

        let store = FileCheckpointStore::new(&config.checkpoint.path);
        let record = match store.load_record() {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Failed to read the checkpoint");
                println!("   Error: {}", e);
                return Ok(5); // Fatal error exit code
            }
        };

        match record {
            None => {
                println!("No checkpoint found.");
                println!("Run 'caravel run' to start a migration from a fresh baseline.");
            }
            Some(record) => {
                println!(
                    "Resume point: {}",
                    record.state.resume_timestamp.to_rfc3339()
                );
                match record.state.last_completed_window_end {
                    Some(end) => println!("Last completed window end: {}", end.to_rfc3339()),
                    None => println!("Last completed window end: (no window finished yet)"),
                }
                println!("Rows migrated: {}", record.state.total_rows_migrated);
                println!(
                    "Consecutive failures: {}",
                    record.state.consecutive_failures
                );
                println!("Checkpoint saved at: {}", record.saved_at.to_rfc3339());
            }
        }

        // The journal is advisory; show it when it is there, shrug when not
        let journal_path = config.checkpoint.journal_path();
        match read_entries(Path::new(&journal_path)) {
            Ok(entries) if entries.is_empty() => {}
            Ok(entries) => {
                println!();
                println!("Recent windows (newest first):");
                for entry in entries.iter().rev().take(self.recent) {
                    let mark = if entry.succeeded { "✅" } else { "❌" };
                    println!(
                        "  {} {}  {} rows, {} attempt(s), {} ms",
                        mark,
                        entry.window,
                        entry.rows_transferred,
                        entry.attempts,
                        entry.duration_ms
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read the window journal");
                println!();
                println!("⚠️  Window journal could not be read: {}", e);
            }
        }

        println!();
        Ok(0)
    }
}
