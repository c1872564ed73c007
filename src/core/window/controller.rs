//! Adaptive window sizing
//!
//! This module decides how wide the next transfer window should be. The
//! controller probes document density on the source cluster and converges
//! the window duration toward a roughly constant row count per batch:
//! sparse time ranges get wide windows, dense ranges get narrow ones.

use crate::adapters::cluster::ClusterQuery;
use crate::config::WindowConfig;
use crate::core::retry::{execute_with_policy, RetryPolicy};
use crate::domain::{CaravelError, Result, TimeWindow, TransferJob};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Relative deviation from the row target tolerated without resizing
const DENSITY_TOLERANCE: f64 = 0.5;

/// Chooses contiguous transfer windows sized to the observed data density
///
/// Windows always start exactly at the resume point handed in, so
/// consecutive calls with each window's end produce a gapless sequence.
/// Sizing is deterministic for a given sequence of probed counts.
pub struct WindowController {
    source: Arc<dyn ClusterQuery>,
    config: WindowConfig,
    timestamp_field: String,
    policy: RetryPolicy,
    previous_duration: Option<Duration>,
}

impl WindowController {
    /// Create a controller probing the given source cluster
    pub fn new(
        source: Arc<dyn ClusterQuery>,
        config: WindowConfig,
        timestamp_field: impl Into<String>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            config,
            timestamp_field: timestamp_field.into(),
            policy,
            previous_duration: None,
        }
    }

    /// Plan the next window starting at the resume point
    ///
    /// Starts from the previous window's duration (or the configured
    /// initial duration on the first call), probes density, and resizes
    /// once when the probed count falls outside the tolerance band around
    /// the row target. An empty probe widens straight to the maximum
    /// duration so the run makes progress through empty periods.
    ///
    /// # Errors
    ///
    /// Returns an error when the density probes fail even after retries.
    pub async fn next_window(&mut self, resume: DateTime<Utc>) -> Result<TransferJob> {
        let duration = self
            .previous_duration
            .unwrap_or_else(|| self.config.initial_duration());

        let trial = window_from(resume, duration)?;
        let count = self.probe(&trial).await?;

        if count == 0 {
            let widened = window_from(resume, self.config.max_duration())?;
            let estimated = self.probe(&widened).await?;
            self.previous_duration = Some(self.config.max_duration());
            tracing::debug!(
                window = %widened,
                estimated_rows = estimated,
                "Probe found no rows, widened to maximum duration"
            );
            return Ok(TransferJob::new(widened, estimated));
        }

        if self.within_tolerance(count) {
            self.previous_duration = Some(duration);
            return Ok(TransferJob::new(trial, count));
        }

        let adjusted = self.scaled(duration, count);
        let window = window_from(resume, adjusted)?;
        let estimated = self.probe(&window).await?;
        self.previous_duration = Some(adjusted);

        tracing::debug!(
            probed_rows = count,
            target_rows = self.config.target_rows,
            from_minutes = duration.num_minutes(),
            to_minutes = adjusted.num_minutes(),
            "Window resized toward target density"
        );

        Ok(TransferJob::new(window, estimated))
    }

    async fn probe(&self, window: &TimeWindow) -> Result<u64> {
        let source = Arc::clone(&self.source);
        let field = self.timestamp_field.clone();
        let window = *window;

        execute_with_policy(&self.policy, "density probe", || {
            let source = Arc::clone(&source);
            let field = field.clone();
            async move { source.count_in_range(&field, &window).await }
        })
        .await
    }

    fn within_tolerance(&self, count: u64) -> bool {
        let target = self.config.target_rows as f64;
        let count = count as f64;
        count >= target * (1.0 - DENSITY_TOLERANCE) && count <= target * (1.0 + DENSITY_TOLERANCE)
    }

    /// Scale the duration by target/observed rows, clamped to the
    /// configured bounds
    fn scaled(&self, duration: Duration, count: u64) -> Duration {
        let ratio = self.config.target_rows as f64 / count.max(1) as f64;
        let millis = (duration.num_milliseconds() as f64 * ratio) as i64;
        let scaled = Duration::milliseconds(millis.max(1));

        if scaled < self.config.min_duration() {
            self.config.min_duration()
        } else if scaled > self.config.max_duration() {
            self.config.max_duration()
        } else {
            scaled
        }
    }
}

/// Window durations are validated positive, so construction only fails on
/// arithmetic surprises worth surfacing
fn window_from(resume: DateTime<Utc>, duration: Duration) -> Result<TimeWindow> {
    TimeWindow::starting_at(resume, duration).map_err(CaravelError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::cluster::{ClusterHealth, SnapshotInfo};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use test_case::test_case;

    struct FakeCluster {
        counts: Mutex<VecDeque<u64>>,
        probes: Mutex<Vec<TimeWindow>>,
    }

    impl FakeCluster {
        fn with_counts(counts: impl IntoIterator<Item = u64>) -> Arc<Self> {
            Arc::new(Self {
                counts: Mutex::new(counts.into_iter().collect()),
                probes: Mutex::new(Vec::new()),
            })
        }

        fn probes(&self) -> Vec<TimeWindow> {
            self.probes.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterQuery for FakeCluster {
        async fn max_timestamp(&self, _field: &str) -> Result<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn min_timestamp(&self, _field: &str) -> Result<Option<DateTime<Utc>>> {
            Ok(None)
        }

        async fn count_in_range(&self, _field: &str, window: &TimeWindow) -> Result<u64> {
            self.probes.lock().unwrap().push(*window);
            Ok(self.counts.lock().unwrap().pop_front().unwrap_or(0))
        }

        async fn latest_snapshot(&self, _repository: &str) -> Result<Option<SnapshotInfo>> {
            Ok(None)
        }

        async fn health(&self) -> Result<ClusterHealth> {
            Ok(ClusterHealth {
                cluster_name: "fake".to_string(),
                status: "green".to_string(),
            })
        }
    }

    fn test_config() -> WindowConfig {
        WindowConfig {
            target_rows: 50_000,
            min_minutes: 1,
            initial_minutes: 60,
            max_minutes: 720,
        }
    }

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 1,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            backoff_multiplier: 1.0,
            attempt_timeout: None,
        }
    }

    fn controller(source: Arc<FakeCluster>) -> WindowController {
        WindowController::new(source, test_config(), "@timestamp", test_policy())
    }

    fn resume() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_in_band_density_keeps_duration() {
        let source = FakeCluster::with_counts([50_000]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        assert_eq!(job.window.start(), resume());
        assert_eq!(job.window.duration(), Duration::minutes(60));
        assert_eq!(job.estimated_rows, 50_000);
        assert_eq!(source.probes().len(), 1);
    }

    #[test_case(25_000 ; "lower band edge")]
    #[test_case(75_000 ; "upper band edge")]
    #[tokio::test]
    async fn test_band_edges_are_inclusive(count: u64) {
        let source = FakeCluster::with_counts([count]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        assert_eq!(job.window.duration(), Duration::minutes(60));
        assert_eq!(job.estimated_rows, count);
        assert_eq!(source.probes().len(), 1);
    }

    #[tokio::test]
    async fn test_dense_range_narrows_window() {
        let source = FakeCluster::with_counts([200_000, 48_000]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        // 60 min scaled by 50k/200k
        assert_eq!(job.window.duration(), Duration::minutes(15));
        assert_eq!(job.estimated_rows, 48_000);
        assert_eq!(source.probes().len(), 2);
        assert_eq!(source.probes()[1].duration(), Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_sparse_range_widens_window() {
        let source = FakeCluster::with_counts([10_000, 52_000]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        // 60 min scaled by 50k/10k
        assert_eq!(job.window.duration(), Duration::minutes(300));
        assert_eq!(job.estimated_rows, 52_000);
    }

    #[tokio::test]
    async fn test_widening_clamps_to_max_duration() {
        let source = FakeCluster::with_counts([100, 9]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        assert_eq!(job.window.duration(), Duration::minutes(720));
    }

    #[tokio::test]
    async fn test_narrowing_clamps_to_min_duration() {
        let source = FakeCluster::with_counts([10_000_000, 80_000]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        assert_eq!(job.window.duration(), Duration::minutes(1));
    }

    #[tokio::test]
    async fn test_zero_density_jumps_to_max_duration() {
        let source = FakeCluster::with_counts([0, 1_200]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        assert_eq!(job.window.duration(), Duration::minutes(720));
        assert_eq!(job.estimated_rows, 1_200);
        assert_eq!(source.probes().len(), 2);
    }

    #[tokio::test]
    async fn test_zero_density_still_zero_after_widening_proceeds() {
        let source = FakeCluster::with_counts([0, 0]);
        let mut controller = controller(Arc::clone(&source));

        let job = controller.next_window(resume()).await.unwrap();

        // An empty maximum-width window is still returned so the run
        // advances through the empty period
        assert_eq!(job.window.duration(), Duration::minutes(720));
        assert_eq!(job.estimated_rows, 0);
    }

    #[tokio::test]
    async fn test_duration_carries_over_between_calls() {
        let source = FakeCluster::with_counts([200_000, 48_000, 47_000]);
        let mut controller = controller(Arc::clone(&source));

        let first = controller.next_window(resume()).await.unwrap();
        assert_eq!(first.window.duration(), Duration::minutes(15));

        let second = controller.next_window(first.window.end()).await.unwrap();

        // Second trial reuses the adapted 15 minute duration and is in band
        assert_eq!(second.window.duration(), Duration::minutes(15));
        assert_eq!(second.window.start(), first.window.end());
        assert_eq!(source.probes().len(), 3);
    }

    #[tokio::test]
    async fn test_sizing_is_deterministic_for_same_density() {
        let job_a = {
            let source = FakeCluster::with_counts([120_000, 49_000]);
            let mut controller = controller(source);
            controller.next_window(resume()).await.unwrap()
        };
        let job_b = {
            let source = FakeCluster::with_counts([120_000, 49_000]);
            let mut controller = controller(source);
            controller.next_window(resume()).await.unwrap()
        };

        assert_eq!(job_a.window, job_b.window);
        assert_eq!(job_a.estimated_rows, job_b.estimated_rows);
    }
}
