//! Plot file reader port.

use simsearch_types::error::PipelineError;
use simsearch_types::plot::PlotDataset;

/// Trait for loading a plot dataset from a file identity (path or URI).
///
/// Implementations live in simsearch-infra (e.g., `GeoJsonPlotReader`).
pub trait PlotReader: Send + Sync {
    fn read(
        &self,
        source: &str,
    ) -> impl std::future::Future<Output = Result<PlotDataset, PipelineError>> + Send;
}
