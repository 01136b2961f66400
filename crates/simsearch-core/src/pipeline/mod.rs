//! Plot file preparation pipeline.
//!
//! `PipelineOrchestrator` drives the per-year stages; each stage is usable on
//! its own.

pub mod aggregate;
pub mod export;
pub mod index;
pub mod normalize;
pub mod orchestrator;
pub mod poller;

pub use aggregate::EmbeddingAggregator;
pub use export::TableExporter;
pub use index::IndexBuilder;
pub use normalize::SchemaNormalizer;
pub use orchestrator::{PipelineOrchestrator, predicted_names};
pub use poller::TaskPoller;
