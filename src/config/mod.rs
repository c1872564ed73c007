//! Configuration management for Caravel.
//!
//! This module provides TOML-based configuration loading, parsing, and
//! validation.
//!
//! # Overview
//!
//! Caravel uses TOML configuration files with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for optional settings
//! - Comprehensive validation
//! - Type-safe configuration structs
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use caravel::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration from file
//! let config = load_config("caravel.toml")?;
//!
//! // Access configuration sections
//! println!("Source cluster: {}", config.source.url);
//! println!("Index pattern: {}", config.migration.index_pattern);
//! println!("Target rows per window: {}", config.window.target_rows);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! The configuration is organized into sections:
//!
//! - [`ApplicationConfig`] - Application settings (log level)
//! - [`ClusterConfig`] - Source/target cluster connection and credentials
//! - [`MigrationConfig`] - Index pattern, timestamp field, cutover policy
//! - [`WindowConfig`] - Adaptive window sizing bounds
//! - [`RetryConfig`] - Retry/backoff policy
//! - [`CheckpointConfig`] - Checkpoint and journal locations
//! - [`TransferConfig`] - External transfer tool settings
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [source]
//! url = "https://old-cluster.internal:9200"
//! username = "migrator"
//! password = "${CARAVEL_SOURCE_PASSWORD}"
//!
//! [target]
//! url = "https://new-cluster.internal:9200"
//!
//! [migration]
//! index_pattern = "events-*"
//! timestamp_field = "@timestamp"
//! snapshot_repository = "migration_repo"
//! cutover_threshold_minutes = 5
//!
//! [window]
//! target_rows = 50000
//! max_minutes = 720
//! ```
//!
//! # Environment Variables
//!
//! Use `${VAR_NAME}` syntax for environment variable substitution:
//!
//! ```bash
//! export CARAVEL_SOURCE_PASSWORD="secret-password"
//! ```
//!
//! Any setting can also be overridden with a `CARAVEL_<SECTION>_<KEY>`
//! variable, e.g. `CARAVEL_TARGET_URL`.

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::load_config;
pub use schema::{
    ApplicationConfig, CaravelConfig, CheckpointConfig, ClusterConfig, Environment, LoggingConfig,
    MigrationConfig, RetryConfig, TransferConfig, WindowConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
