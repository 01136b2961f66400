//! Tabular warehouse port.

use simsearch_types::error::PipelineError;
use simsearch_types::table::DatasetRef;

use super::task::RemoteTask;

/// One result row; every cell arrives as an optional string.
pub type Row = Vec<Option<String>>;

/// Trait for warehouse operations used by the pipeline and search.
///
/// Implementations live in simsearch-infra (e.g., `BigQueryClient`).
pub trait Warehouse: Send + Sync {
    /// Task type returned by [`Warehouse::submit_query`].
    type Job: RemoteTask;

    /// Submit a statement (DDL or DML) as an asynchronous job billed to
    /// `project`.
    fn submit_query(
        &self,
        project: &str,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<Self::Job, PipelineError>> + Send;

    /// Whether `target.table` exists.
    fn table_exists(
        &self,
        target: &DatasetRef,
        table: &str,
    ) -> impl std::future::Future<Output = Result<bool, PipelineError>> + Send;

    /// Delete `target.table`. Returns `false` if it was already absent.
    fn delete_table(
        &self,
        target: &DatasetRef,
        table: &str,
    ) -> impl std::future::Future<Output = Result<bool, PipelineError>> + Send;

    /// Run a query to completion and return its rows.
    fn fetch_rows(
        &self,
        project: &str,
        sql: &str,
    ) -> impl std::future::Future<Output = Result<Vec<Row>, PipelineError>> + Send;
}
