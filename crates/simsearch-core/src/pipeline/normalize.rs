//! Rewrite of raw export tables into the canonical single-embedding form.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use simsearch_types::error::PipelineError;
use simsearch_types::sql::normalize_ddl;
use simsearch_types::table::{DatasetRef, ExportTableName};

use crate::port::task::RemoteTask;
use crate::port::warehouse::Warehouse;

use super::poller::TaskPoller;

pub struct SchemaNormalizer<W: Warehouse> {
    warehouse: Arc<W>,
    poller: TaskPoller,
}

impl<W: Warehouse> SchemaNormalizer<W> {
    pub fn new(warehouse: Arc<W>, poller: TaskPoller) -> Self {
        Self { warehouse, poller }
    }

    /// Create the canonical table for `raw` and drop the raw table.
    ///
    /// The returned name is `{base}_{yearTag}_pp` ([`ExportTableName::canonical`]),
    /// not the raw name with `_pp` appended.
    ///
    /// The create job is confirmed complete before the raw table is deleted,
    /// whatever `wait` says; `wait` only documents that callers expect the
    /// canonical table to be queryable on return. A raw table that is
    /// already gone is not an error.
    ///
    /// # Errors
    ///
    /// Submission, polling and deletion errors propagate. On any error before
    /// the delete the raw table is left in place.
    pub async fn normalize(
        &self,
        target: &DatasetRef,
        raw: &ExportTableName,
        wait: bool,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let raw_table = raw.raw();
        let canonical = raw.canonical();
        let sql = normalize_ddl(target, &raw_table, &canonical);

        tracing::info!(
            source = %target.qualify(&raw_table),
            table = %target.qualify(&canonical),
            wait,
            "normalizing export table"
        );
        let job = self.warehouse.submit_query(&target.project, &sql).await?;
        tracing::debug!(job_id = job.id(), "normalize job submitted");
        self.poller.wait(&job, cancel).await?;

        let deleted = self.warehouse.delete_table(target, &raw_table).await?;
        if !deleted {
            tracing::debug!(table = %target.qualify(&raw_table), "raw table already absent");
        }
        Ok(canonical)
    }
}
