//! Orchestrator - Drives one publishing run
//!
//! A run moves through `Idle → Submitting → Draining → Terminated`:
//! 1. Builds the publish client and the progress reporter over the tracker
//! 2. Pulls every payload from the source and submits it without waiting
//! 3. Waits, bounded by the drain timeout, for in-flight records to resolve
//! 4. Stops the reporter, shuts the service down and returns a summary built
//!    from a single read of the tracker

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use super::{
    CompletionTracker, DrainReport, PipelineError, ProgressReporter, PublishClient, Record,
    ReporterStats, RunId, SequenceAllocator,
};
use crate::ports::{PublishService, RecordSource, ServiceProbe};

/// Configuration for a publishing run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Stream (or topic) every record is sent to
    pub destination: String,
    /// Partition key attached to every record (default: run start time in millis)
    pub partition_key: String,
    /// Upper bound on the drain wait (default: 60s)
    pub drain_timeout: Duration,
    /// Progress reporter period (default: 1s)
    pub report_interval: Duration,
    /// Total used for progress percentages; falls back to the source's size hint
    pub expected_total: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            destination: "aws-kinesis-iot-turntable-stream".to_string(),
            partition_key: chrono::Utc::now().timestamp_millis().to_string(),
            drain_timeout: Duration::from_secs(60),
            report_interval: Duration::from_secs(1),
            expected_total: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_destination(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            ..Self::default()
        }
    }

    /// Check business rules on the configuration
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` for an empty destination or
    /// partition key, or a zero report interval
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.destination.trim().is_empty() {
            return Err(PipelineError::config_error("destination cannot be empty"));
        }
        if self.partition_key.is_empty() {
            return Err(PipelineError::config_error("partition key cannot be empty"));
        }
        if self.report_interval.is_zero() {
            return Err(PipelineError::config_error(
                "report interval must be greater than zero",
            ));
        }
        Ok(())
    }
}

/// Lifecycle phase of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting,
    Draining,
    Terminated,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Submitting => "submitting",
            Phase::Draining => "draining",
            Phase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What a finished run reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub run_id: RunId,
    pub submitted: u64,
    pub completed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rejected: u64,
    pub shortfall: u64,
    pub drain_timeout: Duration,
    pub elapsed: Duration,
    pub reporter: ReporterStats,
}

impl RunSummary {
    /// True when every submitted record resolved before the drain timeout
    pub fn is_fully_drained(&self) -> bool {
        self.shortfall == 0
    }

    /// Turn a shortfall into an error
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::DrainTimeout` if records were still in flight
    pub fn ensure_drained(&self) -> Result<(), PipelineError> {
        if self.is_fully_drained() {
            Ok(())
        } else {
            Err(PipelineError::drain_timeout(
                self.drain_timeout.as_millis() as u64,
                self.shortfall,
            ))
        }
    }
}

/// Coordinates one publishing run over a publish service
///
/// Generic over any `PublishService`; the service is created by the caller
/// and owned by the run from [`run`](Self::run) until it returns.
pub struct Orchestrator<S> {
    service: Arc<S>,
    tracker: Arc<CompletionTracker>,
    config: PipelineConfig,
    run_id: RunId,
    phase: watch::Sender<Phase>,
}

impl<S> Orchestrator<S>
where
    S: PublishService,
{
    /// Create a new Orchestrator with the given service and configuration
    pub fn new(service: S, config: PipelineConfig) -> Self {
        Self::with_shared_service(Arc::new(service), config)
    }

    /// Create an Orchestrator over a service the caller keeps a handle to
    pub fn with_shared_service(service: Arc<S>, config: PipelineConfig) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        Self {
            service,
            tracker: Arc::new(CompletionTracker::new()),
            config,
            run_id: RunId::new(),
            phase,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Counters of this run, live while it executes
    pub fn tracker(&self) -> Arc<CompletionTracker> {
        Arc::clone(&self.tracker)
    }

    /// Follow phase transitions
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    fn enter(&self, phase: Phase) {
        info!(run_id = %self.run_id, phase = %phase, "Pipeline phase changed");
        self.phase.send_replace(phase);
    }

    /// Publish every record from `source` and wait for them to drain
    ///
    /// Submission rejections and delivery failures are logged and counted, a
    /// drain timeout is reported as a shortfall; none of them abort the run.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::ConfigError` if the configuration is invalid
    #[instrument(skip(self, source), fields(run_id = %self.run_id, destination = %self.config.destination))]
    pub async fn run<R>(self, mut source: R) -> Result<RunSummary, PipelineError>
    where
        R: RecordSource,
    {
        self.config.validate()?;
        let started = tokio::time::Instant::now();

        let expected_total = self
            .config
            .expected_total
            .or_else(|| source.size_hint())
            .unwrap_or(0);

        let tracker = Arc::clone(&self.tracker);
        let allocator = SequenceAllocator::new();
        let client = PublishClient::new(Arc::clone(&self.service), Arc::clone(&tracker));
        let reporter = ProgressReporter::new(
            Arc::clone(&tracker),
            Arc::new(ServiceProbe::new(Arc::clone(&self.service))),
            self.config.report_interval,
            expected_total,
        )
        .start();

        self.enter(Phase::Submitting);
        while let Some(payload) = source.next_payload() {
            let sequence = allocator.next();
            let record = Record::new(
                self.config.destination.as_str(),
                self.config.partition_key.as_str(),
                sequence,
                payload,
            );
            if let Err(err) = client.submit(record) {
                warn!(error = %err, "Record dropped from this run");
            }
        }
        info!(
            submitted = tracker.submitted(),
            rejected = tracker.rejected(),
            "Waiting for puts to finish..."
        );

        self.enter(Phase::Draining);
        let drain: DrainReport = tracker.wait_for_drain(self.config.drain_timeout).await;

        let reporter_stats = reporter.stop().await;
        client.shutdown();
        self.enter(Phase::Terminated);

        // completions may still land after the drain ends; read them all at once
        let counts = tracker.counts();
        let summary = RunSummary {
            run_id: self.run_id,
            submitted: counts.submitted,
            completed: counts.completed(),
            succeeded: counts.succeeded,
            failed: counts.failed,
            rejected: counts.rejected,
            shortfall: counts.in_flight(),
            drain_timeout: self.config.drain_timeout,
            elapsed: started.elapsed(),
            reporter: reporter_stats,
        };

        if !summary.is_fully_drained() {
            warn!(
                shortfall = summary.shortfall,
                timeout_ms = self.config.drain_timeout.as_millis() as u64,
                waited_ms = drain.waited.as_millis() as u64,
                "Drain timed out; terminating with records still in flight"
            );
        }

        info!(
            submitted = summary.submitted,
            completed = summary.completed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            rejected = summary.rejected,
            shortfall = summary.shortfall,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "Publishing run finished"
        );

        Ok(summary)
    }
}
