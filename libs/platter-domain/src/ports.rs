//! Ports (trait definitions) for external collaborators
//!
//! The domain defines what it needs from the outside world and adapters
//! provide it:
//!
//! - [`PublishService`]: the transport that actually delivers records
//! - [`RecordSource`]: whatever produces the payloads
//! - [`InFlightAgeProbe`]: the health query the progress reporter polls
//!
//! ## Static Dispatch
//!
//! The pipeline is generic over `PublishService` and `RecordSource` so each
//! adapter gets its own monomorphized pipeline. Only the probe is used as a
//! trait object, since the reporter task outlives any borrow of the service.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

use crate::publishing::{Outcome, PublishError};

/// Port for the external publish service
///
/// Implementations must:
/// - Return from [`publish`](Self::publish) without waiting for the network
/// - Resolve every returned [`PendingPublish`] exactly once
/// - Refuse synchronously (with [`PublishError::Rejected`]) when they cannot
///   take ownership of a record, e.g. a local capacity limit
/// - Apply their own retry policy, if any; the pipeline never retries
pub trait PublishService: Send + Sync + 'static {
    /// Hand a record to the service
    ///
    /// # Arguments
    ///
    /// * `destination` - Stream or topic identifier
    /// * `partition_key` - Key used by the service to pick a shard
    /// * `payload` - Opaque record bytes
    ///
    /// # Errors
    ///
    /// Returns `PublishError::Rejected` if the record was not accepted
    fn publish(
        &self,
        destination: &str,
        partition_key: &str,
        payload: Bytes,
    ) -> Result<PendingPublish, PublishError>;

    /// Age in milliseconds of the oldest record still in flight
    ///
    /// `Ok(None)` means nothing is in flight.
    fn oldest_in_flight_age_millis(&self) -> Result<Option<u64>, PublishError>;

    /// Release service resources; called once when the pipeline terminates
    fn shutdown(&self) {}
}

/// Handle to one in-flight publish operation
///
/// Resolves to the record's [`Outcome`]. If the service drops its side without
/// resolving, the handle resolves to a failure instead of hanging, so every
/// handle still produces exactly one outcome.
#[derive(Debug)]
pub struct PendingPublish {
    rx: oneshot::Receiver<Outcome>,
}

impl PendingPublish {
    /// Create a handle and the resolver the service keeps
    pub fn channel() -> (OutcomeResolver, Self) {
        let (tx, rx) = oneshot::channel();
        (OutcomeResolver { tx }, Self { rx })
    }

    /// A handle that is already resolved
    pub fn ready(outcome: Outcome) -> Self {
        let (resolver, pending) = Self::channel();
        resolver.resolve(outcome);
        pending
    }
}

impl Future for PendingPublish {
    type Output = Outcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or_else(|_| Outcome::failure("publish operation abandoned")))
    }
}

/// Service-side half of a [`PendingPublish`]
#[derive(Debug)]
pub struct OutcomeResolver {
    tx: oneshot::Sender<Outcome>,
}

impl OutcomeResolver {
    /// Resolve the paired handle; consumes the resolver so it happens once
    pub fn resolve(self, outcome: Outcome) {
        // The pipeline may have stopped listening after a drain timeout.
        let _ = self.tx.send(outcome);
    }
}

/// Port for the record-generation collaborator
pub trait RecordSource: Send {
    /// Next payload, or `None` once the source is exhausted
    fn next_payload(&mut self) -> Option<Bytes>;

    /// Number of payloads remaining, when known up front
    fn size_hint(&self) -> Option<u64> {
        None
    }
}

/// Source backed by any iterator of payloads
pub struct IterSource<I> {
    inner: I,
}

impl<I> IterSource<I>
where
    I: Iterator<Item = Bytes> + Send,
{
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

impl<I> RecordSource for IterSource<I>
where
    I: Iterator<Item = Bytes> + Send,
{
    fn next_payload(&mut self) -> Option<Bytes> {
        self.inner.next()
    }

    fn size_hint(&self) -> Option<u64> {
        match self.inner.size_hint() {
            (lower, Some(upper)) if lower == upper => Some(lower as u64),
            _ => None,
        }
    }
}

/// Health query polled by the progress reporter
#[cfg_attr(test, mockall::automock)]
pub trait InFlightAgeProbe: Send + Sync {
    fn oldest_in_flight_age_millis(&self) -> Result<Option<u64>, PublishError>;
}

/// Exposes a publish service's in-flight age query as a probe
pub struct ServiceProbe<S> {
    service: Arc<S>,
}

impl<S: PublishService> ServiceProbe<S> {
    pub fn new(service: Arc<S>) -> Self {
        Self { service }
    }
}

impl<S: PublishService> InFlightAgeProbe for ServiceProbe<S> {
    fn oldest_in_flight_age_millis(&self) -> Result<Option<u64>, PublishError> {
        self.service.oldest_in_flight_age_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publishing::AckMetadata;

    #[tokio::test]
    async fn test_pending_publish_resolves_once() {
        let (resolver, pending) = PendingPublish::channel();
        resolver.resolve(Outcome::success(AckMetadata::new("shard-0", "1")));

        assert!(pending.await.is_success());
    }

    #[tokio::test]
    async fn test_dropped_resolver_becomes_failure() {
        let (resolver, pending) = PendingPublish::channel();
        drop(resolver);

        assert_eq!(
            pending.await,
            Outcome::failure("publish operation abandoned")
        );
    }

    #[tokio::test]
    async fn test_ready_handle() {
        let pending = PendingPublish::ready(Outcome::failure("boom"));
        assert!(!pending.await.is_success());
    }

    #[test]
    fn test_iter_source_drains_and_hints() {
        let payloads = vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")];
        let mut source = IterSource::new(payloads.into_iter());

        assert_eq!(source.size_hint(), Some(2));
        assert_eq!(source.next_payload(), Some(Bytes::from_static(b"a")));
        assert_eq!(source.size_hint(), Some(1));
        assert_eq!(source.next_payload(), Some(Bytes::from_static(b"b")));
        assert_eq!(source.next_payload(), None);
    }
}
