//! Kinesis Publish Service Implementation
//!
//! This module implements the `PublishService` port using Amazon Kinesis Data
//! Streams. It converts SDK results into domain outcomes and never retries on
//! its own; retries are left to the SDK's configured retry policy.

use aws_sdk_kinesis::{error::DisplayErrorContext, primitives::Blob, Client};
use bytes::Bytes;
use platter_domain::{
    ports::{PendingPublish, PublishService},
    publishing::{AckMetadata, Outcome, PublishError},
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Semaphore, TryAcquireError};
use tracing::{debug, info, instrument, warn};

use super::in_flight::InFlightTable;

/// Settings for the Kinesis adapter
#[derive(Debug, Clone)]
pub struct KinesisPublisherConfig {
    /// Records allowed in flight before `publish` starts rejecting (default: 10 000)
    pub max_in_flight: usize,
    /// How long one `PutRecord` call may take before the record fails (default: 30s)
    pub record_ttl: Duration,
}

impl Default for KinesisPublisherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 10_000,
            record_ttl: Duration::from_secs(30),
        }
    }
}

/// Kinesis-based implementation of the PublishService port
///
/// Each accepted record holds one in-flight permit until its `PutRecord` call
/// resolves. When no permit is left the record is rejected synchronously
/// rather than queued.
///
/// ## Error Handling
///
/// SDK errors and TTL expiry become `Outcome::Failure` with a descriptive
/// reason; local capacity and shutdown become `PublishError::Rejected`.
pub struct KinesisPublisher {
    client: Client,
    config: KinesisPublisherConfig,
    permits: Arc<Semaphore>,
    in_flight: InFlightTable,
    next_ticket: AtomicU64,
}

impl KinesisPublisher {
    /// Create a new Kinesis publisher
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use aws_sdk_kinesis::Client;
    /// use platter_kinesis::{KinesisPublisher, KinesisPublisherConfig};
    ///
    /// # async fn example() {
    /// let config = aws_config::load_from_env().await;
    /// let kinesis = Client::new(&config);
    /// let publisher = KinesisPublisher::new(kinesis, KinesisPublisherConfig::default());
    /// # }
    /// ```
    pub fn new(client: Client, config: KinesisPublisherConfig) -> Self {
        info!(
            max_in_flight = config.max_in_flight,
            record_ttl_ms = config.record_ttl.as_millis() as u64,
            "Initializing KinesisPublisher"
        );
        Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_in_flight)),
            config,
            in_flight: InFlightTable::new(),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Get the adapter configuration
    pub fn config(&self) -> &KinesisPublisherConfig {
        &self.config
    }

    /// Number of `PutRecord` calls currently outstanding
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}

impl PublishService for KinesisPublisher {
    #[instrument(skip(self, payload), fields(data_size = payload.len()))]
    fn publish(
        &self,
        destination: &str,
        partition_key: &str,
        payload: Bytes,
    ) -> Result<PendingPublish, PublishError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| PublishError::rejected("no tokio runtime to run the put"))?;

        let permit = Arc::clone(&self.permits)
            .try_acquire_owned()
            .map_err(|err| match err {
                TryAcquireError::NoPermits => PublishError::rejected(format!(
                    "in-flight limit of {} records reached",
                    self.config.max_in_flight
                )),
                TryAcquireError::Closed => PublishError::rejected("publisher is shut down"),
            })?;

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.in_flight
            .insert(ticket, Instant::now())
            .map_err(PublishError::rejected)?;

        let request = self
            .client
            .put_record()
            .stream_name(destination)
            .partition_key(partition_key)
            .data(Blob::new(payload.to_vec()));
        let (resolver, pending) = PendingPublish::channel();
        let in_flight = self.in_flight.clone();
        let ttl = self.config.record_ttl;

        runtime.spawn(async move {
            debug!(ticket, "Putting record to Kinesis");

            let outcome = match tokio::time::timeout(ttl, request.send()).await {
                Ok(Ok(output)) => Outcome::success(AckMetadata::new(
                    output.shard_id(),
                    output.sequence_number(),
                )),
                Ok(Err(err)) => {
                    warn!(ticket, error = %DisplayErrorContext(&err), "PutRecord failed");
                    Outcome::failure(format!("put_record failed: {}", DisplayErrorContext(&err)))
                }
                Err(_) => {
                    warn!(ticket, ttl_ms = ttl.as_millis() as u64, "PutRecord expired");
                    Outcome::failure(format!("record expired after {}ms", ttl.as_millis()))
                }
            };

            in_flight.remove(ticket);
            drop(permit);
            resolver.resolve(outcome);
        });

        Ok(pending)
    }

    fn oldest_in_flight_age_millis(&self) -> Result<Option<u64>, PublishError> {
        self.in_flight
            .oldest_age(Instant::now())
            .map(|age| age.map(|d| d.as_millis() as u64))
            .map_err(PublishError::metric_query)
    }

    fn shutdown(&self) {
        info!(
            in_flight = self.in_flight.len(),
            "Shutting down KinesisPublisher"
        );
        self.permits.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_kinesis::config::{retry::RetryConfig, BehaviorVersion, Credentials, Region};

    /// Client pointed at a closed local port so every put fails fast
    fn offline_client() -> Client {
        let config = aws_sdk_kinesis::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .endpoint_url("http://127.0.0.1:1")
            .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .build();
        Client::from_conf(config)
    }

    fn publisher(max_in_flight: usize, record_ttl: Duration) -> KinesisPublisher {
        KinesisPublisher::new(
            offline_client(),
            KinesisPublisherConfig {
                max_in_flight,
                record_ttl,
            },
        )
    }

    #[test]
    fn test_default_config() {
        let config = KinesisPublisherConfig::default();
        assert_eq!(config.max_in_flight, 10_000);
        assert_eq!(config.record_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_publish_outside_runtime_is_rejected() {
        let publisher = publisher(1, Duration::from_secs(5));
        let err = publisher
            .publish("stream", "key", Bytes::from_static(b"data"))
            .unwrap_err();
        assert!(matches!(err, PublishError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_capacity_limit_rejects_synchronously() {
        let publisher = publisher(1, Duration::from_secs(5));

        let first = publisher
            .publish("stream", "key", Bytes::from_static(b"one"))
            .unwrap();
        let second = publisher.publish("stream", "key", Bytes::from_static(b"two"));

        assert_eq!(
            second.unwrap_err(),
            PublishError::rejected("in-flight limit of 1 records reached")
        );
        assert_eq!(publisher.in_flight(), 1);
        assert!(publisher.oldest_in_flight_age_millis().unwrap().is_some());

        // Nothing listens on the endpoint, so the put resolves to a failure
        assert!(!first.await.is_success());
        assert_eq!(publisher.in_flight(), 0);
        assert_eq!(publisher.oldest_in_flight_age_millis().unwrap(), None);
    }

    #[tokio::test]
    async fn test_expired_put_becomes_failure() {
        let publisher = publisher(4, Duration::ZERO);

        let outcome = publisher
            .publish("stream", "key", Bytes::from_static(b"late"))
            .unwrap()
            .await;

        match outcome {
            Outcome::Failure { reason } => assert!(reason.contains("expired"), "{}", reason),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_records() {
        let publisher = publisher(4, Duration::from_secs(5));
        publisher.shutdown();

        let err = publisher
            .publish("stream", "key", Bytes::from_static(b"data"))
            .unwrap_err();
        assert_eq!(err, PublishError::rejected("publisher is shut down"));
    }
}
