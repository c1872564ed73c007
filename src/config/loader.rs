//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::CaravelConfig;
use super::secret::secret_string;
use crate::domain::errors::CaravelError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into CaravelConfig
/// 4. Applies environment variable overrides (CARAVEL_* prefix)
/// 5. Validates the configuration
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - Environment variable substitution fails
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use caravel::config::loader::load_config;
///
/// let config = load_config("caravel.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<CaravelConfig> {
    let path = path.as_ref();

    // Check if file exists
    if !path.exists() {
        return Err(CaravelError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    // Read file contents
    let contents = fs::read_to_string(path).map_err(|e| {
        CaravelError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    // Perform environment variable substitution
    let contents = substitute_env_vars(&contents)?;

    // Parse TOML
    let mut config: CaravelConfig = toml::from_str(&contents)
        .map_err(|e| CaravelError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    // Apply environment variable overrides
    apply_env_overrides(&mut config);

    // Validate configuration
    config.validate().map_err(|e| {
        CaravelError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// # Arguments
///
/// * `input` - String containing ${VAR} placeholders
///
/// # Errors
///
/// Returns an error if a referenced environment variable is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is valid");
    let mut result = String::new();
    let mut missing_vars = Vec::new();

    // Process line by line to skip comments
    for line in input.lines() {
        let trimmed = line.trim_start();

        // Skip comment lines - don't process env vars in comments
        if trimmed.starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        // Process non-comment lines for env var substitution
        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.contains(&var_name.to_string()) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(CaravelError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

/// Applies environment variable overrides using CARAVEL_* prefix
///
/// Environment variables follow the pattern: CARAVEL_<SECTION>_<KEY>
/// For example: CARAVEL_SOURCE_URL, CARAVEL_MIGRATION_INDEX_PATTERN
///
/// # Arguments
///
/// * `config` - Mutable reference to the configuration to update
fn apply_env_overrides(config: &mut CaravelConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("CARAVEL_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Source cluster overrides
    if let Ok(val) = std::env::var("CARAVEL_SOURCE_URL") {
        config.source.url = val;
    }
    if let Ok(val) = std::env::var("CARAVEL_SOURCE_USERNAME") {
        config.source.username = Some(val);
    }
    if let Ok(val) = std::env::var("CARAVEL_SOURCE_PASSWORD") {
        config.source.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("CARAVEL_SOURCE_TLS_VERIFY") {
        config.source.tls_verify = val.parse().unwrap_or(true);
    }

    // Target cluster overrides
    if let Ok(val) = std::env::var("CARAVEL_TARGET_URL") {
        config.target.url = val;
    }
    if let Ok(val) = std::env::var("CARAVEL_TARGET_USERNAME") {
        config.target.username = Some(val);
    }
    if let Ok(val) = std::env::var("CARAVEL_TARGET_PASSWORD") {
        config.target.password = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("CARAVEL_TARGET_TLS_VERIFY") {
        config.target.tls_verify = val.parse().unwrap_or(true);
    }

    // Migration overrides
    if let Ok(val) = std::env::var("CARAVEL_MIGRATION_INDEX_PATTERN") {
        config.migration.index_pattern = val;
    }
    if let Ok(val) = std::env::var("CARAVEL_MIGRATION_TIMESTAMP_FIELD") {
        config.migration.timestamp_field = val;
    }
    if let Ok(val) = std::env::var("CARAVEL_MIGRATION_SNAPSHOT_REPOSITORY") {
        config.migration.snapshot_repository = Some(val);
    }
    if let Ok(val) = std::env::var("CARAVEL_MIGRATION_CUTOVER_THRESHOLD_MINUTES") {
        if let Ok(minutes) = val.parse() {
            config.migration.cutover_threshold_minutes = minutes;
        }
    }
    if let Ok(val) = std::env::var("CARAVEL_MIGRATION_FAILURE_CEILING") {
        if let Ok(ceiling) = val.parse() {
            config.migration.failure_ceiling = ceiling;
        }
    }

    // Window overrides
    if let Ok(val) = std::env::var("CARAVEL_WINDOW_TARGET_ROWS") {
        if let Ok(rows) = val.parse() {
            config.window.target_rows = rows;
        }
    }
    if let Ok(val) = std::env::var("CARAVEL_WINDOW_MAX_MINUTES") {
        if let Ok(minutes) = val.parse() {
            config.window.max_minutes = minutes;
        }
    }

    // Retry overrides
    if let Ok(val) = std::env::var("CARAVEL_RETRY_MAX_ATTEMPTS") {
        if let Ok(attempts) = val.parse() {
            config.retry.max_attempts = attempts;
        }
    }

    // Checkpoint overrides
    if let Ok(val) = std::env::var("CARAVEL_CHECKPOINT_PATH") {
        config.checkpoint.path = val;
    }
    if let Ok(val) = std::env::var("CARAVEL_CHECKPOINT_JOURNAL_PATH") {
        config.checkpoint.journal_path = Some(val);
    }

    // Transfer overrides
    if let Ok(val) = std::env::var("CARAVEL_TRANSFER_EXECUTABLE") {
        config.transfer.executable = val;
    }
    if let Ok(val) = std::env::var("CARAVEL_TRANSFER_TIMEOUT_SECS") {
        if let Ok(secs) = val.parse() {
            config.transfer.timeout_secs = secs;
        }
    }
    if let Ok(val) = std::env::var("CARAVEL_TRANSFER_JAVA_HOME") {
        config.transfer.java_home = Some(val);
    }

    // Logging overrides
    if let Ok(val) = std::env::var("CARAVEL_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("CARAVEL_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
