//! Retry policy and transfer resilience
//!
//! Bounded retries with exponential backoff and full jitter for cluster
//! queries and batch transfers. Failures are classified before retrying:
//! transient ones (connection drops, timeouts, server errors, transfer
//! process exits) get another attempt, while rejected ones (bad
//! credentials, malformed queries, broken templates) surface immediately
//! because repeating them cannot help.

use crate::adapters::transfer::TransferDriver;
use crate::domain::{
    BatchResult, CaravelError, ClusterError, FailureKind, Result, TransferError, TransferJob,
};
use crate::{log_error_with_context, log_retry_attempt};
use rand::Rng;
use std::time::Duration;

/// Retry behavior derived from [`RetryConfig`](crate::config::RetryConfig)
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first
    pub max_attempts: u32,
    /// Base delay before the first retry
    pub initial_delay_ms: u64,
    /// Upper bound on any single backoff delay
    pub max_delay_ms: u64,
    /// Growth factor applied per retry
    pub backoff_multiplier: f64,
    /// Deadline for a single attempt; None when the operation bounds itself
    pub attempt_timeout: Option<Duration>,
}

impl RetryPolicy {
    /// Build a policy from the retry section of the configuration
    pub fn from_config(config: &crate::config::RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_delay_ms: config.initial_delay_ms,
            max_delay_ms: config.max_delay_ms,
            backoff_multiplier: config.backoff_multiplier,
            attempt_timeout: Some(Duration::from_secs(config.attempt_timeout_secs)),
        }
    }

    /// Copy of this policy with the per-attempt deadline removed
    ///
    /// Used for transfers, where the driver already enforces its own
    /// process timeout and a second outer deadline would fight it.
    pub fn without_attempt_timeout(&self) -> Self {
        Self {
            attempt_timeout: None,
            ..self.clone()
        }
    }

    /// Deterministic backoff delay for the given attempt number (1-based)
    ///
    /// Grows as `initial * multiplier^(attempt - 1)`, capped at the
    /// configured maximum. Jitter is applied separately.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powf(f64::from(exponent));
        let capped = raw.min(self.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Apply full jitter to a backoff delay
///
/// Picks a uniformly random delay in (0, base], with a 1ms floor so the
/// sleep is never skipped entirely.
fn jittered(base: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let factor: f64 = rng.gen();
    let millis = (base.as_millis() as f64 * factor) as u64;
    Duration::from_millis(millis.max(1))
}

/// Run a fallible operation under the given retry policy
///
/// Transient failures are retried with jittered exponential backoff until
/// the attempt budget is spent; rejected or unclassified failures are
/// returned immediately. When the policy carries a per-attempt deadline,
/// an attempt that outlives it is treated as a transient cluster timeout.
///
/// # Errors
///
/// Returns the final error once attempts are exhausted or a
/// non-retryable failure occurs.
pub async fn execute_with_policy<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    operation: F,
) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, operation()).await {
                Ok(result) => result,
                Err(_) => Err(CaravelError::Cluster(ClusterError::Timeout(format!(
                    "{operation_name} exceeded {}s",
                    limit.as_secs()
                )))),
            },
            None => operation().await,
        };

        match outcome {
            Ok(result) => return Ok(result),
            Err(e) => {
                let transient = matches!(e.failure_kind(), Some(FailureKind::Transient));
                if !transient || attempt >= policy.max_attempts {
                    return Err(e);
                }

                let delay = jittered(policy.backoff_delay(attempt));
                log_retry_attempt!(attempt, policy.max_attempts, e);
                tracing::debug!(
                    operation = operation_name,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before next attempt"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Run one window's transfer under the retry policy
///
/// Never returns an error: when every attempt fails, the exhaustion is
/// folded into a failed [`BatchResult`] carrying the classification of the
/// last failure, so the engine can count it against the failure ceiling
/// instead of aborting the whole run. Returns the result together with the
/// number of attempts made.
pub async fn execute_transfer(
    policy: &RetryPolicy,
    driver: &dyn TransferDriver,
    job: &TransferJob,
) -> (BatchResult, u32) {
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match policy.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, driver.transfer(job)).await {
                Ok(result) => result,
                Err(_) => Err(CaravelError::Transfer(TransferError::Timeout(
                    limit.as_secs(),
                ))),
            },
            None => driver.transfer(job).await,
        };

        match outcome {
            Ok(result) => return (result, attempt),
            Err(e) => {
                let kind = e.failure_kind().unwrap_or(FailureKind::Rejected);
                let retryable = kind == FailureKind::Transient && attempt < policy.max_attempts;

                if !retryable {
                    log_error_with_context!(e, "window transfer gave up");
                    return (BatchResult::failure(job.window, kind), attempt);
                }

                let delay = jittered(policy.backoff_delay(attempt));
                log_retry_attempt!(attempt, policy.max_attempts, e);
                tokio::time::sleep(delay).await;
            }
        }
    }
}
