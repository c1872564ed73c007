//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Caravel configuration file.

use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Load configuration (validation happens as part of loading)
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Source Cluster: {}", config.source.url);
        println!("  Target Cluster: {}", config.target.url);
        println!("  Index Pattern: {}", config.migration.index_pattern);
        println!("  Timestamp Field: {}", config.migration.timestamp_field);
        match &config.migration.snapshot_repository {
            Some(repo) => println!("  Snapshot Repository: {repo}"),
            None => println!("  Snapshot Repository: (none, snapshot baselines disabled)"),
        }
        println!(
            "  Cutover Threshold: {} minute(s)",
            config.migration.cutover_threshold_minutes
        );
        println!("  Failure Ceiling: {}", config.migration.failure_ceiling);
        println!(
            "  Window Sizing: target {} rows, {}..{} minutes (initial {})",
            config.window.target_rows,
            config.window.min_minutes,
            config.window.max_minutes,
            config.window.initial_minutes
        );
        println!(
            "  Retry Policy: {} attempt(s), {} ms initial delay",
            config.retry.max_attempts, config.retry.initial_delay_ms
        );
        println!("  Checkpoint: {}", config.checkpoint.path);
        println!("  Journal: {}", config.checkpoint.journal_path());
        println!("  Transfer Executable: {}", config.transfer.executable);
        println!("  Transfer Workdir: {}", config.transfer.workdir);
        println!(
            "  Transfer Timeout: {} second(s)",
            config.transfer.timeout_secs
        );
        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_args_creation() {
        let args = ValidateArgs {};
        // Just ensure it compiles and can be created
        let _ = format!("{args:?}");
    }
}
