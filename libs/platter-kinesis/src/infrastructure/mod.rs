//! Infrastructure adapters

mod in_flight;
mod kinesis_publisher;

pub use kinesis_publisher::{KinesisPublisher, KinesisPublisherConfig};
