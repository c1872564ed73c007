//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "caravel.toml")]
    pub output: String,

    /// Include example values and comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Caravel configuration");
        println!();

        // Check if file already exists
        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(2); // Configuration error exit code
        }

        // Generate configuration content
        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        // Write to file
        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your cluster endpoints", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set CARAVEL_SOURCE_USERNAME and CARAVEL_SOURCE_PASSWORD");
                println!("     - Set CARAVEL_TARGET_USERNAME and CARAVEL_TARGET_PASSWORD");
                println!("  3. Point transfer.executable at your Logstash install");
                println!("  4. Validate configuration: caravel validate-config");
                println!("  5. Start the migration: caravel run");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {}", e);
                Ok(5) // Fatal error exit code
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Caravel Configuration File
# Incremental cluster-to-cluster migration

# Runtime environment (development, staging, production)
environment = "development"

[application]
log_level = "info"

[source]
url = "https://old-cluster.example.com:9200"
username = "${CARAVEL_SOURCE_USERNAME}"
password = "${CARAVEL_SOURCE_PASSWORD}"
tls_verify = true

[target]
url = "https://new-cluster.example.com:9200"
username = "${CARAVEL_TARGET_USERNAME}"
password = "${CARAVEL_TARGET_PASSWORD}"
tls_verify = true

[migration]
index_pattern = "events-*"
timestamp_field = "@timestamp"
# snapshot_repository = "nightly-backups"
cutover_threshold_minutes = 5
failure_ceiling = 3

[window]
target_rows = 50000
min_minutes = 1
initial_minutes = 60
max_minutes = 720

[retry]
max_attempts = 3
initial_delay_ms = 1000
max_delay_ms = 30000

[checkpoint]
path = "./state/checkpoint.json"

[transfer]
executable = "/usr/share/logstash/bin/logstash"
workdir = "./state/pipelines"
timeout_secs = 3600

[logging]
local_enabled = true
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Caravel Configuration File
# Incremental cluster-to-cluster migration
#
# This file contains all configuration options with examples and explanations.
#
# Caravel moves time-series documents from an old cluster to a new one in
# contiguous time windows, checkpointing after every window so a run can be
# interrupted and resumed at any point.

# ============================================================================
# Runtime Environment
# ============================================================================
# One of: development, staging, production.
# In production, TLS verification cannot be disabled.
environment = "development"

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Source Cluster (being migrated FROM)
# ============================================================================
[source]
# Base URL of the cluster
url = "https://old-cluster.example.com:9200"

# Basic auth credentials (use environment variables)
username = "${CARAVEL_SOURCE_USERNAME}"
password = "${CARAVEL_SOURCE_PASSWORD}"

# TLS/SSL verification
tls_verify = true

# Per-request timeout in seconds
timeout_seconds = 60

# ============================================================================
# Target Cluster (being migrated TO)
# ============================================================================
[target]
url = "https://new-cluster.example.com:9200"
username = "${CARAVEL_TARGET_USERNAME}"
password = "${CARAVEL_TARGET_PASSWORD}"
tls_verify = true
timeout_seconds = 60

# ============================================================================
# Migration Workflow
# ============================================================================
[migration]
# Index name or pattern to migrate (required)
index_pattern = "events-*"

# Document field holding the event timestamp
timestamp_field = "@timestamp"

# Snapshot repository to consult when picking a starting point.
# Leave commented out if the target was not restored from a snapshot.
# snapshot_repository = "nightly-backups"

# When the source is at most this far ahead of the resume point, the run
# offers cutover instead of planning another window.
cutover_threshold_minutes = 5

# Consecutive window failures tolerated before the run aborts
failure_ceiling = 3

# Pause between successful windows in seconds
pause_between_windows_secs = 5

# ============================================================================
# Adaptive Window Sizing
# ============================================================================
[window]
# Row count each window is sized toward
target_rows = 50000

# Window duration bounds in minutes (min <= initial <= max)
min_minutes = 1
initial_minutes = 60
max_minutes = 720

# ============================================================================
# Retry Policy
# ============================================================================
[retry]
# Attempts per cluster query or transfer (1-10)
max_attempts = 3

# Exponential backoff delays in milliseconds
initial_delay_ms = 1000
max_delay_ms = 30000
backoff_multiplier = 2.0

# Per-attempt deadline for cluster queries in seconds
attempt_timeout_secs = 120

# ============================================================================
# Checkpoint Persistence
# ============================================================================
[checkpoint]
# Where the resume point is saved after every successful window
path = "./state/checkpoint.json"

# Append-only journal of window attempts (defaults next to the checkpoint)
# journal_path = "./state/journal.ndjson"

# ============================================================================
# Transfer Tool
# ============================================================================
[transfer]
# Logstash executable to spawn for each window
executable = "/usr/share/logstash/bin/logstash"

# Optional pipeline template; a built-in template is used when unset
# template_path = "./pipeline.conf.tmpl"

# Directory where rendered pipeline files are written
workdir = "./state/pipelines"

# Overall timeout for one transfer run in seconds
timeout_secs = 3600

# Optional JAVA_HOME override for the Logstash process
# java_home = "/usr/lib/jvm/java-17"

# ============================================================================
# Logging Configuration
# ============================================================================
[logging]
# Enable local file logging
local_enabled = true

# Local log directory
local_path = "./logs"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_args_defaults() {
        let args = InitArgs {
            output: "caravel.toml".to_string(),
            with_examples: false,
            force: false,
        };

        assert_eq!(args.output, "caravel.toml");
        assert!(!args.with_examples);
        assert!(!args.force);
    }

    #[test]
    fn test_generate_minimal_config() {
        let config = InitArgs::generate_minimal_config();
        assert!(config.contains("[source]"));
        assert!(config.contains("[target]"));
        assert!(config.contains("[migration]"));
        assert!(config.contains("index_pattern"));
    }

    #[test]
    fn test_generate_config_with_examples() {
        let config = InitArgs::generate_config_with_examples();
        assert!(config.contains("# Caravel Configuration File"));
        assert!(config.contains("cutover_threshold_minutes"));
        assert!(config.contains("target_rows"));
    }

    #[test]
    fn test_generated_configs_parse_as_toml() {
        for content in [
            InitArgs::generate_minimal_config(),
            InitArgs::generate_config_with_examples(),
        ] {
            let parsed: Result<toml::Value, _> = toml::from_str(&content);
            assert!(parsed.is_ok());
        }
    }
}
