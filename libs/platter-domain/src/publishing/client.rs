//! Publish client
//!
//! Wraps a [`PublishService`] so each submission becomes a detached async
//! operation whose completion handler feeds the [`CompletionTracker`].

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{AckMetadata, CompletionTracker, Outcome, PipelineError, PublishError, Record};
use crate::ports::PublishService;

/// Handle to one submitted record
///
/// Dropping the handle does not cancel anything: the completion handler keeps
/// running and the record is still counted when it resolves.
#[derive(Debug)]
pub struct SubmitHandle {
    sequence: u64,
    completion: JoinHandle<Outcome>,
}

impl SubmitHandle {
    /// Sequence number of the submitted record
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Whether the completion handler has already run
    pub fn is_resolved(&self) -> bool {
        self.completion.is_finished()
    }

    /// Wait for this record's outcome
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::DeliveryFailed` if the service reported a failure
    /// or the completion handler was lost
    pub async fn wait(self) -> Result<AckMetadata, PipelineError> {
        match self.completion.await {
            Ok(Outcome::Success(ack)) => Ok(ack),
            Ok(Outcome::Failure { reason }) => {
                Err(PipelineError::delivery_failed(self.sequence, reason))
            }
            Err(err) => Err(PipelineError::delivery_failed(
                self.sequence,
                format!("completion handler aborted: {}", err),
            )),
        }
    }
}

/// Non-blocking submission front-end over a publish service
pub struct PublishClient<S> {
    service: Arc<S>,
    tracker: Arc<CompletionTracker>,
}

impl<S> Clone for PublishClient<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            tracker: Arc::clone(&self.tracker),
        }
    }
}

impl<S> PublishClient<S>
where
    S: PublishService,
{
    pub fn new(service: Arc<S>, tracker: Arc<CompletionTracker>) -> Self {
        Self { service, tracker }
    }

    /// Submit a record without waiting for the network
    ///
    /// Counts the record as submitted, hands it to the service and spawns the
    /// completion handler on the current tokio runtime. Returns as soon as the
    /// service has taken ownership of the record.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::SubmissionRejected` if the service refused the
    /// record synchronously; the record is then not counted as submitted
    #[instrument(skip(self, record), fields(sequence = record.sequence(), size = record.size()))]
    pub fn submit(&self, record: Record) -> Result<SubmitHandle, PipelineError> {
        let sequence = record.sequence();
        info!(
            destination = %record.destination(),
            partition_key = %record.partition_key(),
            "Sending record"
        );

        self.tracker.record_submitted();

        let (destination, partition_key, payload) = record.into_parts();
        let pending = match self.service.publish(&destination, &partition_key, payload) {
            Ok(pending) => pending,
            Err(err) => {
                self.tracker.record_rejected();
                let reason = match err {
                    PublishError::Rejected(reason) => reason,
                    other => other.to_string(),
                };
                warn!(reason = %reason, "Publish service rejected record");
                return Err(PipelineError::submission_rejected(sequence, reason));
            }
        };

        let tracker = Arc::clone(&self.tracker);
        let completion = tokio::spawn(async move {
            let outcome = pending.await;
            tracker.record_completed(sequence, &outcome);
            outcome
        });

        debug!("Completion handler attached");
        Ok(SubmitHandle {
            sequence,
            completion,
        })
    }

    /// Shared completion tracker
    pub fn tracker(&self) -> &Arc<CompletionTracker> {
        &self.tracker
    }

    /// Underlying publish service
    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// Release the publish service
    pub fn shutdown(&self) {
        info!("Shutting down publish client");
        self.service.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::PendingPublish;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Service that resolves each record according to a script
    #[derive(Default)]
    struct ScriptedService {
        published: AtomicUsize,
        reject_all: AtomicBool,
        fail_with: Mutex<Option<String>>,
        held: Mutex<Vec<crate::ports::OutcomeResolver>>,
        hold: AtomicBool,
        shut_down: AtomicBool,
    }

    impl PublishService for ScriptedService {
        fn publish(
            &self,
            _destination: &str,
            _partition_key: &str,
            payload: Bytes,
        ) -> Result<PendingPublish, PublishError> {
            if self.reject_all.load(Ordering::SeqCst) {
                return Err(PublishError::rejected("queue full"));
            }
            let n = self.published.fetch_add(1, Ordering::SeqCst);
            if self.hold.load(Ordering::SeqCst) {
                let (resolver, pending) = PendingPublish::channel();
                self.held.lock().unwrap().push(resolver);
                return Ok(pending);
            }
            let outcome = match self.fail_with.lock().unwrap().clone() {
                Some(reason) => Outcome::failure(reason),
                None => Outcome::success(AckMetadata::new(
                    "shardId-000000000000",
                    format!("{}-{}", n, payload.len()),
                )),
            };
            Ok(PendingPublish::ready(outcome))
        }

        fn oldest_in_flight_age_millis(&self) -> Result<Option<u64>, PublishError> {
            Ok(None)
        }

        fn shutdown(&self) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    fn record(sequence: u64) -> Record {
        Record::new("stream", "1700000000000", sequence, Bytes::from_static(b"payload"))
    }

    #[tokio::test]
    async fn test_submit_success() {
        let service = Arc::new(ScriptedService::default());
        let tracker = Arc::new(CompletionTracker::new());
        let client = PublishClient::new(service, Arc::clone(&tracker));

        let handle = client.submit(record(0)).unwrap();
        assert_eq!(handle.sequence(), 0);
        assert_eq!(tracker.submitted(), 1);

        let ack = handle.wait().await.unwrap();
        assert_eq!(ack.service_sequence, "0-7");
        assert_eq!(tracker.completed(), 1);
        assert_eq!(tracker.succeeded(), 1);
    }

    #[tokio::test]
    async fn test_submit_delivery_failure_is_completed() {
        let service = Arc::new(ScriptedService::default());
        *service.fail_with.lock().unwrap() = Some("ProvisionedThroughputExceeded".to_string());
        let tracker = Arc::new(CompletionTracker::new());
        let client = PublishClient::new(service, Arc::clone(&tracker));

        let err = client.submit(record(3)).unwrap().wait().await.unwrap_err();

        assert!(matches!(err, PipelineError::DeliveryFailed { sequence: 3, .. }));
        assert_eq!(tracker.completed(), 1);
        assert_eq!(tracker.failed(), 1);
        assert_eq!(tracker.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_submit_rejection_is_synchronous_and_not_submitted() {
        let service = Arc::new(ScriptedService::default());
        service.reject_all.store(true, Ordering::SeqCst);
        let tracker = Arc::new(CompletionTracker::new());
        let client = PublishClient::new(service, Arc::clone(&tracker));

        let err = client.submit(record(9)).unwrap_err();

        assert!(matches!(
            err,
            PipelineError::SubmissionRejected { sequence: 9, .. }
        ));
        assert_eq!(tracker.submitted(), 0);
        assert_eq!(tracker.rejected(), 1);
        assert_eq!(tracker.completed(), 0);
    }

    #[tokio::test]
    async fn test_submit_does_not_wait_for_resolution() {
        let service = Arc::new(ScriptedService::default());
        service.hold.store(true, Ordering::SeqCst);
        let tracker = Arc::new(CompletionTracker::new());
        let client = PublishClient::new(Arc::clone(&service), Arc::clone(&tracker));

        let handles: Vec<_> = (0..3).map(|seq| client.submit(record(seq)).unwrap()).collect();
        tokio::task::yield_now().await;

        assert_eq!(tracker.submitted(), 3);
        assert_eq!(tracker.completed(), 0);
        assert!(handles.iter().all(|h| !h.is_resolved()));

        // Resolve out of order
        let mut held = std::mem::take(&mut *service.held.lock().unwrap());
        while let Some(resolver) = held.pop() {
            resolver.resolve(Outcome::success(AckMetadata::new("shard", "x")));
        }
        for handle in handles {
            handle.wait().await.unwrap();
        }
        assert_eq!(tracker.completed(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_reaches_service() {
        let service = Arc::new(ScriptedService::default());
        let client = PublishClient::new(Arc::clone(&service), Arc::new(CompletionTracker::new()));

        client.shutdown();
        assert!(service.shut_down.load(Ordering::SeqCst));
    }
}
