//! Publishing domain module
//!
//! This module contains the pipeline that turns a stream of payloads into
//! in-flight publish operations and tracks each of them to a single outcome.

mod client;
mod entity;
mod error;
mod ids;
mod reporter;
mod sequence;
mod service;
mod tracker;

pub use client::{PublishClient, SubmitHandle};
pub use entity::{AckMetadata, Outcome, Record};
pub use error::{PipelineError, PublishError, Result};
pub use ids::RunId;
pub use reporter::{ProgressReporter, ReporterHandle, ReporterStats};
pub use sequence::SequenceAllocator;
pub use service::{Orchestrator, Phase, PipelineConfig, RunSummary};
pub use tracker::{CompletionTracker, DrainReport, ProgressSnapshot, TrackerCounts};
