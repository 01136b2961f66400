//! Export of aggregation results into warehouse tables.

use std::sync::Arc;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use simsearch_types::embedding::YearEmbeddingHandle;
use simsearch_types::error::PipelineError;
use simsearch_types::pipeline::ExportOptions;
use simsearch_types::table::{DatasetRef, ExportTableName, validate_year_tag};

use crate::port::compute::EmbeddingCompute;
use crate::port::task::RemoteTask;

use super::poller::TaskPoller;

/// Lands one year's aggregation in a freshly named raw table.
pub struct TableExporter<C: EmbeddingCompute> {
    compute: Arc<C>,
    poller: TaskPoller,
}

impl<C: EmbeddingCompute> TableExporter<C> {
    pub fn new(compute: Arc<C>, poller: TaskPoller) -> Self {
        Self { compute, poller }
    }

    /// Export `handle` to `{base_name}_{year_tag}_{attempt}` under `target`.
    ///
    /// The attempt token is drawn fresh on every call. Exports overwrite an
    /// existing table of the same name; identical names only recur when an
    /// earlier attempt errored.
    ///
    /// # Errors
    ///
    /// `Validation` if `year_tag` is not four characters, before anything is
    /// submitted. Submission and polling errors propagate.
    pub async fn export(
        &self,
        handle: YearEmbeddingHandle,
        target: &DatasetRef,
        base_name: &str,
        year_tag: &str,
        options: ExportOptions,
        cancel: &CancellationToken,
    ) -> Result<ExportTableName, PipelineError> {
        validate_year_tag(year_tag)?;
        let name = ExportTableName::compose(target, base_name, year_tag, &attempt_token())?;
        let raw = name.raw();
        let qualified = target.qualify(&raw);

        if options.dry_run {
            tracing::info!(table = %qualified, "dry run, would export");
            return Ok(name);
        }

        tracing::info!(table = %qualified, year = handle.year(), "exporting");
        let task = self
            .compute
            .export_table(handle, target, &raw, true)
            .await?;
        tracing::debug!(task_id = task.id(), table = %qualified, "export submitted");

        if options.wait {
            self.poller.wait(&task, cancel).await?;
        }
        Ok(name)
    }
}

/// Fresh three-digit token distinguishing export attempts.
fn attempt_token() -> String {
    rand::thread_rng().gen_range(100..=999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use simsearch_types::table::MAX_QUALIFIED_NAME_LEN;
    use simsearch_types::task::TaskState;

    use crate::testing::{MockCompute, target};

    fn exporter(compute: Arc<MockCompute>) -> TableExporter<MockCompute> {
        TableExporter::new(compute, TaskPoller::new(Duration::from_secs(1), None))
    }

    fn handle(year: i32) -> YearEmbeddingHandle {
        YearEmbeddingHandle::new(year, json!({}))
    }

    fn wait() -> ExportOptions {
        ExportOptions { wait: true, dry_run: false }
    }

    #[tokio::test(start_paused = true)]
    async fn test_export_submits_and_waits() {
        let compute = Arc::new(MockCompute::new());
        let name = exporter(compute.clone())
            .export(handle(2020), &target(), "plots", "2020", wait(), &CancellationToken::new())
            .await
            .unwrap();

        let raw = name.raw();
        assert!(raw.starts_with("plots_2020_"));
        let token = raw.rsplit('_').next().unwrap();
        assert_eq!(token.len(), 3);
        assert!(token.parse::<u16>().is_ok_and(|n| (100..=999).contains(&n)));
        assert_eq!(compute.exported(), vec![format!("test-project.test_dataset.{raw}")]);
    }

    #[tokio::test]
    async fn test_short_year_tag_rejected_without_submission() {
        let compute = Arc::new(MockCompute::new());
        let err = exporter(compute.clone())
            .export(handle(2020), &target(), "plots", "20", wait(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert!(compute.exported().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_submits_nothing() {
        let compute = Arc::new(MockCompute::new());
        let options = ExportOptions { wait: true, dry_run: true };
        let name = exporter(compute.clone())
            .export(handle(2019), &target(), "plots", "2019", options, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(name.canonical(), "plots_2019_pp");
        assert!(compute.exported().is_empty());
    }

    #[tokio::test]
    async fn test_long_base_truncated_keeping_suffix() {
        let compute = Arc::new(MockCompute::new());
        let base = "very_long_plot_collection_name_".repeat(5);
        let options = ExportOptions { wait: false, dry_run: true };
        let name = exporter(compute)
            .export(handle(2023), &target(), &base, "2023", options, &CancellationToken::new())
            .await
            .unwrap();

        let qualified = target().qualify(&name.raw());
        assert_eq!(qualified.len(), MAX_QUALIFIED_NAME_LEN);
        assert!(name.raw().contains("_2023_"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_export_task_propagates() {
        let compute = Arc::new(
            MockCompute::new().with_export_script(&[TaskState::Running, TaskState::Failed]),
        );
        let err = exporter(compute)
            .export(handle(2021), &target(), "plots", "2021", wait(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::TaskFailed { state: TaskState::Failed, .. }));
    }

    #[tokio::test]
    async fn test_no_wait_returns_after_submission() {
        let compute = Arc::new(MockCompute::new().with_export_script(&[TaskState::Running]));
        let options = ExportOptions { wait: false, dry_run: false };
        let name = exporter(compute.clone())
            .export(handle(2022), &target(), "plots", "2022", options, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(compute.exported().len(), 1);
        assert_eq!(name.year_tag(), "2022");
    }
}
