//! # Platter Kinesis Adapter
//!
//! Implements the domain's `PublishService` port on top of Amazon Kinesis
//! Data Streams. Every record becomes one `PutRecord` call on its own task.

pub mod infrastructure;

pub use infrastructure::{KinesisPublisher, KinesisPublisherConfig};
