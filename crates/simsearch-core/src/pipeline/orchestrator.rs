//! End-to-end preparation of a plot file for similarity search.
//!
//! For every requested year: export the aggregated embeddings, normalize the
//! export into a canonical table, and index it when the plot count warrants.
//! Years are processed one after another.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use simsearch_types::embedding::{EMBEDDING_COLUMN, YearEmbeddingHandle};
use simsearch_types::error::PipelineError;
use simsearch_types::pipeline::{ExportOptions, IndexOutcome, YearStage};
use simsearch_types::table::{
    DatasetRef, ExportTableName, base_name_from_source, predicted_canonical_name, year_tag,
};

use crate::port::compute::EmbeddingCompute;
use crate::port::plots::PlotReader;
use crate::port::warehouse::Warehouse;

use super::aggregate::{EmbeddingAggregator, validate_years};
use super::export::TableExporter;
use super::index::IndexBuilder;
use super::normalize::SchemaNormalizer;
use super::poller::TaskPoller;

pub struct PipelineOrchestrator<R, C, W>
where
    R: PlotReader,
    C: EmbeddingCompute,
    W: Warehouse,
{
    reader: Arc<R>,
    aggregator: EmbeddingAggregator<C>,
    exporter: TableExporter<C>,
    normalizer: SchemaNormalizer<W>,
    indexer: IndexBuilder<W>,
}

impl<R, C, W> PipelineOrchestrator<R, C, W>
where
    R: PlotReader,
    C: EmbeddingCompute,
    W: Warehouse,
{
    pub fn new(reader: Arc<R>, compute: Arc<C>, warehouse: Arc<W>, poller: TaskPoller) -> Self {
        Self {
            reader,
            aggregator: EmbeddingAggregator::new(compute.clone()),
            exporter: TableExporter::new(compute, poller.clone()),
            normalizer: SchemaNormalizer::new(warehouse.clone(), poller.clone()),
            indexer: IndexBuilder::new(warehouse, poller),
        }
    }

    /// Prepare `source` for every year in `years`.
    ///
    /// Returns the canonical table of each year that went all the way
    /// through. A year whose normalize or index step fails is logged and
    /// left out of the result; the remaining years still run.
    ///
    /// # Errors
    ///
    /// Input validation, plot loading, aggregation and export errors abort
    /// the whole run, as does cancellation.
    pub async fn prepare(
        &self,
        source: &str,
        target: &DatasetRef,
        years: &[i32],
        cancel: &CancellationToken,
    ) -> Result<BTreeMap<i32, String>, PipelineError> {
        validate_years(years)?;
        let base_name = base_name_from_source(source)?;

        let plots = self.reader.read(source).await?;
        let row_count = plots.row_count();
        tracing::info!(source, plots = row_count, scale_m = plots.scale_m(), ?years, "preparing plot file");

        let handles = self.aggregator.aggregate(&plots, years).await?;

        let mut tables = BTreeMap::new();
        for handle in handles {
            let year = handle.year();
            if cancel.is_cancelled() {
                return Err(PipelineError::Cancelled {
                    id: format!("prepare {base_name} {year}"),
                });
            }
            if let Some(table) = self
                .prepare_year(handle, target, &base_name, row_count, cancel)
                .await?
            {
                tables.insert(year, table);
            }
        }

        tracing::info!(source, prepared = tables.len(), requested = years.len(), "preparation finished");
        Ok(tables)
    }

    /// Run one year. `Ok(None)` means the year failed after export and was
    /// skipped.
    async fn prepare_year(
        &self,
        handle: YearEmbeddingHandle,
        target: &DatasetRef,
        base_name: &str,
        row_count: usize,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, PipelineError> {
        let year = handle.year();
        let tag = year_tag(year)?;
        let options = ExportOptions {
            wait: true,
            dry_run: false,
        };

        let raw: ExportTableName = self
            .exporter
            .export(handle, target, base_name, &tag, options, cancel)
            .await?;
        tracing::info!(year, stage = %YearStage::Exported, table = %raw.raw(), "year advanced");

        let canonical = match self.normalizer.normalize(target, &raw, true, cancel).await {
            Ok(canonical) => canonical,
            Err(e) => return skip_year(year, YearStage::Exported, e),
        };
        tracing::info!(year, stage = %YearStage::Normalized, table = %canonical, "year advanced");

        let outcome = match self
            .indexer
            .maybe_index(target, &canonical, EMBEDDING_COLUMN, row_count, true, cancel)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => return skip_year(year, YearStage::Normalized, e),
        };
        let stage = match outcome {
            IndexOutcome::Skipped => YearStage::IndexSkipped,
            IndexOutcome::Submitted | IndexOutcome::Built => YearStage::Indexed,
        };
        tracing::info!(year, %stage, table = %canonical, "year advanced");
        tracing::info!(year, stage = %YearStage::Done, table = %canonical, "year prepared");

        Ok(Some(canonical))
    }
}

/// Log a post-export failure and drop the year; cancellation still aborts.
fn skip_year(
    year: i32,
    reached: YearStage,
    error: PipelineError,
) -> Result<Option<String>, PipelineError> {
    if let PipelineError::Cancelled { .. } = error {
        return Err(error);
    }
    tracing::error!(year, reached = %reached, stage = %YearStage::Failed, error = %error, "year left out");
    Ok(None)
}

/// Canonical tables `prepare` would produce, computed without remote calls.
pub fn predicted_names(
    source: &str,
    target: &DatasetRef,
    years: &[i32],
) -> Result<BTreeMap<i32, String>, PipelineError> {
    validate_years(years)?;
    let mut names = BTreeMap::new();
    for &year in years {
        names.insert(year, predicted_canonical_name(target, source, year)?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use crate::testing::{MockCompute, MockReader, MockWarehouse, target};

    type Orchestrator = PipelineOrchestrator<MockReader, MockCompute, MockWarehouse>;

    fn orchestrator(
        rows: usize,
        compute: MockCompute,
        warehouse: MockWarehouse,
    ) -> (Orchestrator, Arc<MockCompute>, Arc<MockWarehouse>) {
        let compute = Arc::new(compute);
        let warehouse = Arc::new(warehouse);
        let orchestrator = PipelineOrchestrator::new(
            Arc::new(MockReader::with_rows(rows)),
            compute.clone(),
            warehouse.clone(),
            TaskPoller::new(Duration::from_secs(15), None),
        );
        (orchestrator, compute, warehouse)
    }

    #[tokio::test(start_paused = true)]
    async fn test_small_file_two_years_without_index() {
        let (orchestrator, compute, warehouse) =
            orchestrator(100, MockCompute::new(), MockWarehouse::new());

        let tables = orchestrator
            .prepare("plots.geojson", &target(), &[2020, 2021], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            tables,
            BTreeMap::from([
                (2020, "plots_2020_pp".to_string()),
                (2021, "plots_2021_pp".to_string()),
            ])
        );
        assert!(warehouse.index_queries().is_empty());
        assert_eq!(compute.exported().len(), 2);
        assert_eq!(orchestrator.reader.reads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_file_indexed_once() {
        let (orchestrator, _, warehouse) =
            orchestrator(6000, MockCompute::new(), MockWarehouse::new());

        let tables = orchestrator
            .prepare("gs://ceo-bucket/plots.geojson", &target(), &[2022], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(tables, BTreeMap::from([(2022, "plots_2022_pp".to_string())]));
        let index = warehouse.index_queries();
        assert_eq!(index.len(), 1);
        assert!(index[0].contains("`test_dataset.plots_2022_pp`(embedding)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_predicted_names_match_prepare() {
        let years = [2018, 2019, 2023];
        let source = "gs://ceo-bucket/exports/ceo-project-1234-plots.geojson";
        let (orchestrator, _, _) = orchestrator(10, MockCompute::new(), MockWarehouse::new());

        let predicted = predicted_names(source, &target(), &years).unwrap();
        let actual = orchestrator
            .prepare(source, &target(), &years, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(predicted, actual);
    }

    #[tokio::test(start_paused = true)]
    async fn test_normalize_failure_skips_only_that_year() {
        let (orchestrator, compute, warehouse) = orchestrator(
            50,
            MockCompute::new(),
            MockWarehouse::new().failing_on("plots_2021_pp"),
        );

        let tables = orchestrator
            .prepare("plots.geojson", &target(), &[2020, 2021, 2022], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(tables.keys().copied().collect::<Vec<_>>(), vec![2020, 2022]);
        assert_eq!(compute.exported().len(), 3);
        // the failed year's raw table is never deleted
        let deletes: Vec<String> = warehouse
            .events()
            .into_iter()
            .filter(|e| e.starts_with("delete:"))
            .collect();
        assert_eq!(deletes.len(), 2);
        assert!(deletes.iter().all(|d| !d.contains("_2021_")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_large_file_indexes_each_normalized_year_once() {
        let (orchestrator, _, warehouse) = orchestrator(
            6000,
            MockCompute::new(),
            MockWarehouse::new().failing_on("plots_2021_pp"),
        );

        let tables = orchestrator
            .prepare("plots.geojson", &target(), &[2020, 2021, 2022], &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            tables,
            BTreeMap::from([
                (2020, "plots_2020_pp".to_string()),
                (2022, "plots_2022_pp".to_string()),
            ])
        );
        let index = warehouse.index_queries();
        assert_eq!(index.len(), 2);
        assert!(index[0].contains("`test_dataset.plots_2020_pp`(embedding)"));
        assert!(index[1].contains("`test_dataset.plots_2022_pp`(embedding)"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_index_failure_leaves_year_out() {
        let (orchestrator, _, _) = orchestrator(
            6000,
            MockCompute::new(),
            MockWarehouse::new().failing_on("CREATE VECTOR INDEX"),
        );

        let tables = orchestrator
            .prepare("plots.geojson", &target(), &[2022], &CancellationToken::new())
            .await
            .unwrap();
        assert!(tables.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_failure_aborts_run() {
        let (orchestrator, compute, _) =
            orchestrator(100, MockCompute::new().failing_export(2021), MockWarehouse::new());

        let err = orchestrator
            .prepare("plots.geojson", &target(), &[2020, 2021, 2022], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Compute(_)));
        // 2022 never reached
        assert_eq!(compute.exported().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_years_fail_before_reading() {
        let (orchestrator, compute, _) = orchestrator(10, MockCompute::new(), MockWarehouse::new());

        let err = orchestrator
            .prepare("plots.geojson", &target(), &[20], &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(orchestrator.reader.reads.load(Ordering::SeqCst), 0);
        assert!(compute.exported().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_first_year() {
        let (orchestrator, compute, _) = orchestrator(10, MockCompute::new(), MockWarehouse::new());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orchestrator
            .prepare("plots.geojson", &target(), &[2020], &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled { .. }));
        assert!(compute.exported().is_empty());
    }

    #[test]
    fn test_predicted_names_reject_bad_years() {
        assert!(predicted_names("plots.geojson", &target(), &[]).is_err());
        assert!(predicted_names("plots.geojson", &target(), &[2020, 2020]).is_err());
    }
}
