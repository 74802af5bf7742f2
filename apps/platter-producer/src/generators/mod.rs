//! Payload generators
//!
//! Both generators are bounded `RecordSource`s: they yield a fixed number of
//! payloads and then report exhaustion.

mod padded;
mod turntable;

pub use padded::PaddedSequenceSource;
pub use turntable::{TurntableEvent, TurntableEventSource};
