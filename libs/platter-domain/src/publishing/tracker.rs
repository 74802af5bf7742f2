//! Completion tracking
//!
//! The tracker is the only state mutated concurrently by the pipeline: the
//! submission loop bumps `submitted`, completion handlers on arbitrary worker
//! threads bump `succeeded` or `failed`. All are plain atomics, and
//! `completed` is always their sum.
//!
//! `completed <= submitted` holds for every capture because a record's
//! completion is only recorded after its submission, and captures read the
//! outcome counters before `submitted`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info};

use super::Outcome;

/// Point-in-time view of pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub submitted: u64,
    pub completed: u64,
    pub expected_total: u64,
    pub submitted_percent: f64,
    pub completed_percent: f64,
    pub oldest_in_flight_age_millis: Option<u64>,
}

impl ProgressSnapshot {
    /// Records submitted but not yet resolved
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.completed)
    }

    /// Attach the publish service's oldest in-flight age
    pub fn with_oldest_in_flight_age(mut self, age_millis: Option<u64>) -> Self {
        self.oldest_in_flight_age_millis = age_millis;
        self
    }
}

fn percent(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

/// Every tracker counter, read together
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrackerCounts {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
}

impl TrackerCounts {
    pub fn completed(&self) -> u64 {
        self.succeeded + self.failed
    }

    /// Records submitted but not yet resolved
    pub fn in_flight(&self) -> u64 {
        self.submitted.saturating_sub(self.completed())
    }
}

/// Result of waiting for in-flight records to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub submitted: u64,
    pub completed: u64,
    /// Records still unresolved when the wait ended
    pub shortfall: u64,
    pub waited: Duration,
    pub timed_out: bool,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.shortfall == 0
    }
}

/// Thread-safe submission and outcome counters
#[derive(Debug, Default)]
pub struct CompletionTracker {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    progress: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a record handed to the publish client
    ///
    /// Must be called before the record's completion handler is attached.
    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    /// Retract a submission the publish service refused synchronously
    pub fn record_rejected(&self) {
        self.submitted.fetch_sub(1, Ordering::SeqCst);
        self.rejected.fetch_add(1, Ordering::SeqCst);
        self.progress.notify_waiters();
    }

    /// Count a resolved record, whatever its outcome
    pub fn record_completed(&self, sequence: u64, outcome: &Outcome) {
        match outcome {
            Outcome::Success(ack) => {
                self.succeeded.fetch_add(1, Ordering::SeqCst);
                info!(
                    sequence,
                    shard_id = %ack.shard_id,
                    service_sequence = %ack.service_sequence,
                    "Record delivered"
                );
            }
            Outcome::Failure { reason } => {
                self.failed.fetch_add(1, Ordering::SeqCst);
                error!(sequence, reason = %reason, "Record delivery failed");
            }
        }
        self.progress.notify_waiters();
    }

    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> u64 {
        self.succeeded() + self.failed()
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::SeqCst)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::SeqCst)
    }

    /// Records submitted but not yet completed
    pub fn in_flight(&self) -> u64 {
        self.counts().in_flight()
    }

    /// Read every counter once
    pub fn counts(&self) -> TrackerCounts {
        // outcomes first: any completion we see has its submission visible too
        let succeeded = self.succeeded();
        let failed = self.failed();
        let rejected = self.rejected();
        let submitted = self.submitted();

        TrackerCounts {
            submitted,
            succeeded,
            failed,
            rejected,
        }
    }

    /// Progress against an expected total
    pub fn snapshot(&self, expected_total: u64) -> ProgressSnapshot {
        let counts = self.counts();
        let completed = counts.completed();

        ProgressSnapshot {
            submitted: counts.submitted,
            completed,
            expected_total,
            submitted_percent: percent(counts.submitted, expected_total),
            completed_percent: percent(completed, expected_total),
            oldest_in_flight_age_millis: None,
        }
    }

    /// Wait until every submitted record has completed, or the timeout elapses
    pub async fn wait_for_drain(&self, timeout: Duration) -> DrainReport {
        let started = tokio::time::Instant::now();

        let drained = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.progress.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.in_flight() == 0 {
                    return;
                }
                notified.await;
            }
        })
        .await;

        let counts = self.counts();
        DrainReport {
            submitted: counts.submitted,
            completed: counts.completed(),
            shortfall: counts.in_flight(),
            waited: started.elapsed(),
            timed_out: drained.is_err(),
        }
    }
}
