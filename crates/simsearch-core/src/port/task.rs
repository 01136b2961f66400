//! RemoteTask trait definition.

use simsearch_types::error::PipelineError;
use simsearch_types::task::TaskState;

/// A submitted (or not yet submitted) asynchronous remote job.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations live in simsearch-infra (Earth Engine operations,
/// BigQuery jobs).
pub trait RemoteTask: Send + Sync {
    /// Stable identifier reported by the remote service.
    fn id(&self) -> &str;

    /// Fetch the task's current state from the remote service.
    fn state(&self) -> impl std::future::Future<Output = Result<TaskState, PipelineError>> + Send;
}
