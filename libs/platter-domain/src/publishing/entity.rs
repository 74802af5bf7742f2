//! Domain entities for record publishing
//!
//! A Record is the immutable unit handed to the publish service. An Outcome is
//! the single terminal result the service reports back for it.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One application payload on its way to a destination stream
///
/// Records are:
/// - **Immutable**: built once at submission time, never mutated
/// - **Owned by the publish operation**: moved into the in-flight call and
///   released when that call resolves
/// - **Ordered**: the sequence number is assigned synchronously at submission
///
/// # Example
///
/// ```rust
/// use bytes::Bytes;
/// use platter_domain::publishing::Record;
///
/// let record = Record::new("turntable-stream", "1700000000000", 0, Bytes::from_static(b"hello"));
/// assert_eq!(record.sequence(), 0);
/// assert_eq!(record.size(), 5);
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    destination: String,
    partition_key: String,
    sequence: u64,
    payload: Bytes,
    created_at: DateTime<Utc>,
}

impl Record {
    /// Create a new Record stamped with the current time
    pub fn new(
        destination: impl Into<String>,
        partition_key: impl Into<String>,
        sequence: u64,
        payload: Bytes,
    ) -> Self {
        Self {
            destination: destination.into(),
            partition_key: partition_key.into(),
            sequence,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Destination identifier (stream name)
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Partition/group key
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Sequence number assigned by the allocator
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Opaque payload bytes
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// When the record was built
    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    /// Split the record into the parts the publish service consumes
    pub fn into_parts(self) -> (String, String, Bytes) {
        (self.destination, self.partition_key, self.payload)
    }
}

/// Acknowledgment returned by the publish service on success
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMetadata {
    /// Shard (or partition) the record landed on
    pub shard_id: String,
    /// Sequence number assigned by the service, unrelated to ours
    pub service_sequence: String,
}

impl AckMetadata {
    pub fn new(shard_id: impl Into<String>, service_sequence: impl Into<String>) -> Self {
        Self {
            shard_id: shard_id.into(),
            service_sequence: service_sequence.into(),
        }
    }
}

impl fmt::Display for AckMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "shard={} sequence={}", self.shard_id, self.service_sequence)
    }
}

/// Terminal result of one publish attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The service accepted and stored the record
    Success(AckMetadata),
    /// The service gave up on the record
    Failure { reason: String },
}

impl Outcome {
    pub fn success(metadata: AckMetadata) -> Self {
        Self::Success(metadata)
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}
