//! # Platter Domain Layer
//!
//! This crate contains the record-publishing pipeline of Platter. It follows
//! hexagonal architecture principles:
//!
//! - **Entities**: Records and their Outcomes
//! - **Ports**: Trait definitions for external collaborators (PublishService,
//!   RecordSource, InFlightAgeProbe)
//! - **Services**: The Orchestrator and the components it owns
//!
//! ## Architecture
//!
//! This layer has NO dependencies on infrastructure concerns (AWS, Kinesis,
//! HTTP, etc.). Transports are adapters implementing [`PublishService`].
//!
//! ## Example
//!
//! ```rust
//! use platter_domain::ports::{IterSource, PublishService};
//! use platter_domain::publishing::{Orchestrator, PipelineConfig};
//!
//! // The orchestrator is generic over any PublishService implementation
//! async fn example<S: PublishService>(service: S) {
//!     let source = IterSource::new(vec![bytes::Bytes::from_static(b"hello")].into_iter());
//!     let orchestrator = Orchestrator::new(service, PipelineConfig::default());
//!     let summary = orchestrator.run(source).await.unwrap();
//!     println!("Completed {} of {}", summary.completed, summary.submitted);
//! }
//! ```

pub mod ports;
pub mod publishing;

// Re-export commonly used types
pub use ports::{PublishService, RecordSource};
pub use publishing::{Orchestrator, Outcome, PipelineConfig, Record, RunSummary};
