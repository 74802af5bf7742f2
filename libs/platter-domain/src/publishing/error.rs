//! Domain errors for publishing operations
//!
//! `PublishError` is what a publish service adapter reports at its boundary.
//! `PipelineError` is what the pipeline itself surfaces. Neither carries any
//! transport-specific error type.

use thiserror::Error;

/// Errors reported synchronously by a publish service adapter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The service refused the record before taking ownership of it
    #[error("Publish rejected: {0}")]
    Rejected(String),

    /// A health/metric query against the service failed
    #[error("Metric query failed: {0}")]
    MetricQuery(String),
}

impl PublishError {
    /// Create a rejection with a message
    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    /// Create a metric query failure with a message
    pub fn metric_query(msg: impl Into<String>) -> Self {
        Self::MetricQuery(msg.into())
    }
}

/// Errors that can occur while running the publishing pipeline
///
/// Only `SubmissionRejected` ever reaches the submission loop as a `Result`;
/// the other kinds are absorbed into counters and logs.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The publish service refused a record synchronously
    #[error("Record {sequence} rejected by publish service: {reason}")]
    SubmissionRejected { sequence: u64, reason: String },

    /// An in-flight record resolved to a failure
    #[error("Record {sequence} delivery failed: {cause}")]
    DeliveryFailed { sequence: u64, cause: String },

    /// The drain phase ended with records still in flight
    #[error("Drain timed out after {timeout_ms}ms with {shortfall} records in flight")]
    DrainTimeout { timeout_ms: u64, shortfall: u64 },

    /// The progress reporter could not query the service
    #[error("Metric query failed: {0}")]
    MetricQueryFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Create a submission rejection for a record
    pub fn submission_rejected(sequence: u64, reason: impl Into<String>) -> Self {
        Self::SubmissionRejected {
            sequence,
            reason: reason.into(),
        }
    }

    /// Create a delivery failure for a record
    pub fn delivery_failed(sequence: u64, cause: impl Into<String>) -> Self {
        Self::DeliveryFailed {
            sequence,
            cause: cause.into(),
        }
    }

    /// Create a drain timeout error
    pub fn drain_timeout(timeout_ms: u64, shortfall: u64) -> Self {
        Self::DrainTimeout {
            timeout_ms,
            shortfall,
        }
    }

    /// Create a config error with a message
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
