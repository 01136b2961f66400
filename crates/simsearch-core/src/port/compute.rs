//! Remote-sensing compute backend.

use simsearch_types::embedding::{AnnualMeanRecipe, YearEmbeddingHandle};
use simsearch_types::error::PipelineError;
use simsearch_types::plot::PlotDataset;
use simsearch_types::table::DatasetRef;

use super::task::RemoteTask;

/// Trait for the backend that computes per-plot embeddings and exports them.
///
/// Implementations live in simsearch-infra (e.g., `EarthEngineClient`).
pub trait EmbeddingCompute: Send + Sync {
    /// Task type returned by [`EmbeddingCompute::export_table`].
    type Export: RemoteTask;

    /// Build the remote computation described by `recipe` over `plots`.
    ///
    /// Produces a handle only; nothing is written anywhere.
    fn aggregate(
        &self,
        plots: &PlotDataset,
        recipe: &AnnualMeanRecipe,
    ) -> impl std::future::Future<Output = Result<YearEmbeddingHandle, PipelineError>> + Send;

    /// Start an export of `handle` into `target.table`, returning the
    /// submitted task.
    ///
    /// With `overwrite`, an existing table of the same name is replaced.
    fn export_table(
        &self,
        handle: YearEmbeddingHandle,
        target: &DatasetRef,
        table: &str,
        overwrite: bool,
    ) -> impl std::future::Future<Output = Result<Self::Export, PipelineError>> + Send;
}
