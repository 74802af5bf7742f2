//! Periodic progress reporting
//!
//! The reporter runs on its own task and never touches the submission loop.
//! Each tick is synchronous from start to finish, so cancellation can only
//! land between ticks.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::{CompletionTracker, PipelineError, ProgressSnapshot, PublishError};
use crate::ports::InFlightAgeProbe;

/// Counters returned when a reporter stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStats {
    /// Ticks that produced a status line
    pub ticks_emitted: u64,
    /// Ticks skipped because the metric query failed
    pub ticks_skipped: u64,
}

/// Spawns the periodic status task
pub struct ProgressReporter {
    tracker: Arc<CompletionTracker>,
    probe: Arc<dyn InFlightAgeProbe>,
    period: Duration,
    expected_total: u64,
}

impl ProgressReporter {
    pub fn new(
        tracker: Arc<CompletionTracker>,
        probe: Arc<dyn InFlightAgeProbe>,
        period: Duration,
        expected_total: u64,
    ) -> Self {
        Self {
            tracker,
            probe,
            period,
            expected_total,
        }
    }

    /// Start ticking; the first tick fires one period from now
    pub fn start(self) -> ReporterHandle {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(cancel_rx));
        ReporterHandle { cancel_tx, task }
    }

    async fn run(self, mut cancel_rx: watch::Receiver<bool>) -> ReporterStats {
        let mut stats = ReporterStats::default();
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = cancel_rx.changed() => {
                    // Sender dropped counts as cancellation too
                    if changed.is_err() || *cancel_rx.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    match self.tick() {
                        Ok(snapshot) => {
                            stats.ticks_emitted += 1;
                            emit(&snapshot);
                        }
                        Err(err) => {
                            stats.ticks_skipped += 1;
                            warn!(error = %err, "Skipping progress tick");
                        }
                    }
                }
            }
        }

        info!(
            ticks_emitted = stats.ticks_emitted,
            ticks_skipped = stats.ticks_skipped,
            "Progress reporter stopped"
        );
        stats
    }

    fn tick(&self) -> Result<ProgressSnapshot, PipelineError> {
        let snapshot = self.tracker.snapshot(self.expected_total);
        let age = self
            .probe
            .oldest_in_flight_age_millis()
            .map_err(|err| match err {
                PublishError::MetricQuery(msg) => PipelineError::MetricQueryFailed(msg),
                other => PipelineError::MetricQueryFailed(other.to_string()),
            })?;
        Ok(snapshot.with_oldest_in_flight_age(age))
    }
}

fn emit(snapshot: &ProgressSnapshot) {
    info!(
        submitted = snapshot.submitted,
        completed = snapshot.completed,
        expected_total = snapshot.expected_total,
        oldest_in_flight_age_ms = ?snapshot.oldest_in_flight_age_millis,
        "Put {} of {} so far ({:.2} %), {} have completed ({:.2} %)",
        snapshot.submitted,
        snapshot.expected_total,
        snapshot.submitted_percent,
        snapshot.completed,
        snapshot.completed_percent,
    );
}

/// Handle to a running reporter
pub struct ReporterHandle {
    cancel_tx: watch::Sender<bool>,
    task: JoinHandle<ReporterStats>,
}

impl ReporterHandle {
    /// Cancel cooperatively and wait for the in-progress tick to finish
    pub async fn stop(self) -> ReporterStats {
        let _ = self.cancel_tx.send(true);
        match self.task.await {
            Ok(stats) => stats,
            Err(err) => {
                warn!(error = %err, "Progress reporter task ended abnormally");
                ReporterStats::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::MockInFlightAgeProbe;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_failed_query_skips_only_that_tick() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut probe = MockInFlightAgeProbe::new();
        {
            let calls = Arc::clone(&calls);
            probe.expect_oldest_in_flight_age_millis().returning(move || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 4 {
                    Err(PublishError::metric_query("stats endpoint unavailable"))
                } else {
                    Ok(Some(n * 10))
                }
            });
        }

        let tracker = Arc::new(CompletionTracker::new());
        let handle = ProgressReporter::new(
            tracker,
            Arc::new(probe),
            Duration::from_secs(1),
            5,
        )
        .start();

        // Ticks at 1s..=10s; stop halfway to the eleventh
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        let stats = handle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 10);
        assert_eq!(stats.ticks_emitted, 9);
        assert_eq!(stats.ticks_skipped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_first_period() {
        let mut probe = MockInFlightAgeProbe::new();
        probe.expect_oldest_in_flight_age_millis().never();

        let handle = ProgressReporter::new(
            Arc::new(CompletionTracker::new()),
            Arc::new(probe),
            Duration::from_secs(1),
            0,
        )
        .start();

        tokio::time::sleep(Duration::from_millis(500)).await;
        let stats = handle.stop().await;

        assert_eq!(stats, ReporterStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let calls = Arc::new(AtomicU64::new(0));
        let mut probe = MockInFlightAgeProbe::new();
        {
            let calls = Arc::clone(&calls);
            probe.expect_oldest_in_flight_age_millis().returning(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            });
        }

        let handle = ProgressReporter::new(
            Arc::new(CompletionTracker::new()),
            Arc::new(probe),
            Duration::from_millis(100),
            0,
        )
        .start();

        tokio::time::sleep(Duration::from_millis(350)).await;
        let stats = handle.stop().await;
        let calls_at_stop = calls.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(stats.ticks_emitted, 3);
        assert_eq!(calls.load(Ordering::SeqCst), calls_at_stop);
    }
}
