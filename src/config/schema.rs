//! Configuration schema types
//!
//! This module defines the configuration structure for Caravel.

use crate::config::SecretString;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main Caravel configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaravelConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Source cluster connection
    pub source: ClusterConfig,

    /// Target cluster connection
    pub target: ClusterConfig,

    /// Migration workflow settings
    pub migration: MigrationConfig,

    /// Adaptive window sizing
    #[serde(default)]
    pub window: WindowConfig,

    /// Retry/backoff policy
    #[serde(default)]
    pub retry: RetryConfig,

    /// Checkpoint persistence
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// External transfer tool
    #[serde(default)]
    pub transfer: TransferConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CaravelConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.source.validate("source", &self.environment)?;
        self.target.validate("target", &self.environment)?;
        self.migration.validate()?;
        self.window.validate()?;
        self.retry.validate()?;
        self.checkpoint.validate()?;
        self.transfer.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Cluster connection configuration
///
/// Used for both the source and target clusters. Credentials are optional;
/// when a username is set the password must be too.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Base URL of the cluster, e.g. `https://search.example.com:9200`
    pub url: String,

    /// Username for basic authentication (optional)
    #[serde(default)]
    pub username: Option<String>,

    /// Password for basic authentication (optional)
    /// Stored securely in memory and automatically zeroized on drop
    #[serde(default)]
    pub password: Option<SecretString>,

    /// TLS certificate verification enabled
    ///
    /// **SECURITY WARNING**: Disabling TLS verification (setting to `false`)
    /// exposes the application to man-in-the-middle attacks and should ONLY be
    /// used in development/testing environments. In **production** this MUST be
    /// `true` (enforced by validation).
    #[serde(default = "default_true")]
    pub tls_verify: bool,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl ClusterConfig {
    fn validate(&self, section: &str, environment: &Environment) -> Result<(), String> {
        use secrecy::ExposeSecret;

        if self.url.is_empty() {
            return Err(format!("{section}.url cannot be empty"));
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(format!("{section}.url must start with http:// or https://"));
        }

        // Basic auth needs both halves
        if self.username.is_some() {
            if self
                .password
                .as_ref()
                .map(|s| s.expose_secret().is_empty())
                .unwrap_or(true)
            {
                return Err(format!(
                    "{section}.password cannot be empty when {section}.username is set"
                ));
            }
        }

        // Security: enforce TLS verification in production environments
        if *environment == Environment::Production && !self.tls_verify {
            return Err(format!(
                "TLS certificate verification cannot be disabled in production environments \
                ({section}.tls_verify = false). For development/testing, set \
                'environment = \"development\"' or 'environment = \"staging\"'."
            ));
        }

        if self.timeout_seconds == 0 {
            return Err(format!("{section}.timeout_seconds must be > 0"));
        }

        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9200".to_string(),
            username: None,
            password: None,
            tls_verify: true,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

/// Migration workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Index name or pattern to migrate
    pub index_pattern: String,

    /// Document field holding the event timestamp
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: String,

    /// Snapshot repository to consult for a baseline (optional)
    #[serde(default)]
    pub snapshot_repository: Option<String>,

    /// Lag below which the run transitions to cutover, in minutes
    #[serde(default = "default_cutover_threshold_minutes")]
    pub cutover_threshold_minutes: u64,

    /// Consecutive window failures tolerated before aborting
    #[serde(default = "default_failure_ceiling")]
    pub failure_ceiling: u32,

    /// Pause between successful windows in seconds
    #[serde(default = "default_pause_between_windows_secs")]
    pub pause_between_windows_secs: u64,
}

impl MigrationConfig {
    fn validate(&self) -> Result<(), String> {
        if self.index_pattern.is_empty() {
            return Err("migration.index_pattern cannot be empty".to_string());
        }

        if self.timestamp_field.is_empty() {
            return Err("migration.timestamp_field cannot be empty".to_string());
        }

        if let Some(repo) = &self.snapshot_repository {
            if repo.is_empty() {
                return Err(
                    "migration.snapshot_repository cannot be empty when set; omit it to skip \
                    snapshot baselines"
                        .to_string(),
                );
            }
        }

        if self.cutover_threshold_minutes == 0 {
            return Err("migration.cutover_threshold_minutes must be > 0".to_string());
        }

        if self.failure_ceiling == 0 {
            return Err("migration.failure_ceiling must be > 0".to_string());
        }

        Ok(())
    }

    /// Cutover threshold as a duration
    pub fn cutover_threshold(&self) -> Duration {
        Duration::minutes(self.cutover_threshold_minutes as i64)
    }
}

/// Adaptive window sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Row count each window is sized toward
    #[serde(default = "default_target_rows")]
    pub target_rows: u64,

    /// Smallest window duration in minutes
    #[serde(default = "default_min_minutes")]
    pub min_minutes: u64,

    /// Duration of the first window in minutes
    #[serde(default = "default_initial_minutes")]
    pub initial_minutes: u64,

    /// Largest window duration in minutes
    #[serde(default = "default_max_minutes")]
    pub max_minutes: u64,
}

impl WindowConfig {
    fn validate(&self) -> Result<(), String> {
        if self.target_rows == 0 {
            return Err("window.target_rows must be > 0".to_string());
        }

        if self.min_minutes == 0 {
            return Err("window.min_minutes must be > 0".to_string());
        }

        if self.min_minutes > self.initial_minutes || self.initial_minutes > self.max_minutes {
            return Err(format!(
                "window durations must satisfy min <= initial <= max, got {}/{}/{}",
                self.min_minutes, self.initial_minutes, self.max_minutes
            ));
        }

        Ok(())
    }

    pub fn min_duration(&self) -> Duration {
        Duration::minutes(self.min_minutes as i64)
    }

    pub fn initial_duration(&self) -> Duration {
        Duration::minutes(self.initial_minutes as i64)
    }

    pub fn max_duration(&self) -> Duration {
        Duration::minutes(self.max_minutes as i64)
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            target_rows: default_target_rows(),
            min_minutes: default_min_minutes(),
            initial_minutes: default_initial_minutes(),
            max_minutes: default_max_minutes(),
        }
    }
}

/// Retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts per operation (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Backoff multiplier
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Per-attempt timeout in seconds for cluster queries
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl RetryConfig {
    fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 || self.max_attempts > 10 {
            return Err(format!(
                "retry.max_attempts must be between 1 and 10, got {}",
                self.max_attempts
            ));
        }

        if self.initial_delay_ms > self.max_delay_ms {
            return Err(format!(
                "retry.initial_delay_ms ({}) must be <= retry.max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            ));
        }

        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }

        if self.attempt_timeout_secs == 0 {
            return Err("retry.attempt_timeout_secs must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

/// Checkpoint persistence configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointConfig {
    /// Path of the checkpoint record
    #[serde(default = "default_checkpoint_path")]
    pub path: String,

    /// Path of the append-only window journal (defaults to a sibling of `path`)
    #[serde(default)]
    pub journal_path: Option<String>,
}

impl CheckpointConfig {
    fn validate(&self) -> Result<(), String> {
        if self.path.is_empty() {
            return Err("checkpoint.path cannot be empty".to_string());
        }

        if let Some(journal) = &self.journal_path {
            if journal.is_empty() {
                return Err("checkpoint.journal_path cannot be empty when set".to_string());
            }
        }

        Ok(())
    }

    /// Journal location, derived next to the checkpoint when not configured
    pub fn journal_path(&self) -> String {
        match &self.journal_path {
            Some(path) => path.clone(),
            None => {
                let path = std::path::Path::new(&self.path);
                path.with_file_name("journal.ndjson")
                    .to_string_lossy()
                    .into_owned()
            }
        }
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            path: default_checkpoint_path(),
            journal_path: None,
        }
    }
}

/// External transfer tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Transfer executable to spawn
    #[serde(default = "default_transfer_executable")]
    pub executable: String,

    /// Pipeline template file (optional; a built-in template is used otherwise)
    #[serde(default)]
    pub template_path: Option<String>,

    /// Directory where rendered pipeline files are written
    #[serde(default = "default_transfer_workdir")]
    pub workdir: String,

    /// Overall timeout for one transfer run in seconds
    #[serde(default = "default_transfer_timeout_secs")]
    pub timeout_secs: u64,

    /// JAVA_HOME-style override for the transfer process (optional)
    #[serde(default)]
    pub java_home: Option<String>,
}

impl TransferConfig {
    fn validate(&self) -> Result<(), String> {
        if self.executable.is_empty() {
            return Err("transfer.executable cannot be empty".to_string());
        }

        if self.workdir.is_empty() {
            return Err("transfer.workdir cannot be empty".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("transfer.timeout_secs must be > 0".to_string());
        }

        Ok(())
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            executable: default_transfer_executable(),
            template_path: None,
            workdir: default_transfer_workdir(),
            timeout_secs: default_transfer_timeout_secs(),
            java_home: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }

        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_timestamp_field() -> String {
    "@timestamp".to_string()
}

fn default_cutover_threshold_minutes() -> u64 {
    5
}

fn default_failure_ceiling() -> u32 {
    3
}

fn default_pause_between_windows_secs() -> u64 {
    5
}

fn default_target_rows() -> u64 {
    50_000
}

fn default_min_minutes() -> u64 {
    1
}

fn default_initial_minutes() -> u64 {
    60
}

fn default_max_minutes() -> u64 {
    720
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_attempt_timeout_secs() -> u64 {
    120
}

fn default_checkpoint_path() -> String {
    "./state/checkpoint.json".to_string()
}

fn default_transfer_executable() -> String {
    "logstash".to_string()
}

fn default_transfer_workdir() -> String {
    "./state/pipelines".to_string()
}

fn default_transfer_timeout_secs() -> u64 {
    3600
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
