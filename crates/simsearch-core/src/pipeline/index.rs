//! Vector index creation for canonical tables.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use simsearch_types::error::PipelineError;
use simsearch_types::pipeline::IndexOutcome;
use simsearch_types::sql::{VECTOR_INDEX_MIN_ROWS, vector_index_ddl};
use simsearch_types::table::DatasetRef;

use crate::port::task::RemoteTask;
use crate::port::warehouse::Warehouse;

use super::poller::TaskPoller;

/// Builds a cosine IVF index when a table is large enough to benefit.
pub struct IndexBuilder<W: Warehouse> {
    warehouse: Arc<W>,
    poller: TaskPoller,
}

impl<W: Warehouse> IndexBuilder<W> {
    pub fn new(warehouse: Arc<W>, poller: TaskPoller) -> Self {
        Self { warehouse, poller }
    }

    /// Index `embedding_col` of `table` if `row_count` exceeds
    /// [`VECTOR_INDEX_MIN_ROWS`].
    pub async fn maybe_index(
        &self,
        target: &DatasetRef,
        table: &str,
        embedding_col: &str,
        row_count: usize,
        wait: bool,
        cancel: &CancellationToken,
    ) -> Result<IndexOutcome, PipelineError> {
        if row_count <= VECTOR_INDEX_MIN_ROWS {
            tracing::info!(
                table = %target.qualify(table),
                row_count,
                threshold = VECTOR_INDEX_MIN_ROWS,
                "table too small for a vector index"
            );
            return Ok(IndexOutcome::Skipped);
        }

        let sql = vector_index_ddl(target, table, embedding_col);
        tracing::info!(table = %target.qualify(table), column = embedding_col, row_count, "creating vector index");
        let job = self.warehouse.submit_query(&target.project, &sql).await?;

        if !wait {
            tracing::debug!(job_id = job.id(), "index job submitted, not waiting");
            return Ok(IndexOutcome::Submitted);
        }
        self.poller.wait(&job, cancel).await?;
        Ok(IndexOutcome::Built)
    }
}
