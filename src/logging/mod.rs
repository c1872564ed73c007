//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output for interactive runs
//! - JSON-formatted log files with rotation
//! - Configurable log levels
//!
//! # Example
//!
//! ```no_run
//! use caravel::logging::init_logging;
//! use caravel::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log a completed transfer window
///
/// # Example
///
/// ```no_run
/// use caravel::log_window_complete;
/// use caravel::domain::TimeWindow;
/// use chrono::{Duration, Utc};
///
/// let window = TimeWindow::starting_at(Utc::now(), Duration::hours(1)).unwrap();
/// log_window_complete!(&window, 42_000u64, 120_000u128);
/// ```
#[macro_export]
macro_rules! log_window_complete {
    ($window:expr, $rows:expr, $duration_ms:expr) => {
        tracing::info!(
            window = %$window,
            rows = $rows,
            duration_ms = $duration_ms,
            "Window transferred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use caravel::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use caravel::log_error_with_context;
/// use caravel::domain::CaravelError;
///
/// let error = CaravelError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_macros_compile() {
        // These tests just verify that the macros compile correctly
        // Actual logging output is not tested in unit tests
    }
}
