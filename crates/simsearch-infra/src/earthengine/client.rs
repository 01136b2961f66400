//! EarthEngineClient -- concrete [`EmbeddingCompute`] over the Earth Engine
//! REST API.
//!
//! Aggregation only builds an expression graph locally; the computation runs
//! when the graph is exported. Exports go through `table:export` with a
//! BigQuery destination and return a long-running operation that is polled
//! through `GET /v1/{operation name}`.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use simsearch_core::port::compute::EmbeddingCompute;
use simsearch_core::port::task::RemoteTask;
use simsearch_types::config::EarthEngineConfig;
use simsearch_types::embedding::{AnnualMeanRecipe, YearEmbeddingHandle};
use simsearch_types::error::PipelineError;
use simsearch_types::plot::PlotDataset;
use simsearch_types::table::DatasetRef;
use simsearch_types::task::TaskState;

use crate::google::{ApiFailure, GoogleApi, join_url};

use super::expression;

pub struct EarthEngineClient {
    api: GoogleApi,
    base_url: String,
    project: String,
    workload_tag: String,
}

impl EarthEngineClient {
    /// `project` is the cloud project exports are billed to.
    pub fn new(api: GoogleApi, config: &EarthEngineConfig, project: impl Into<String>) -> Self {
        Self {
            api,
            base_url: config.base_url.clone(),
            project: project.into(),
            workload_tag: config.workload_tag.clone(),
        }
    }

    fn export_request(
        &self,
        handle: YearEmbeddingHandle,
        target: &DatasetRef,
        table: &str,
        overwrite: bool,
    ) -> ExportTableRequest {
        let qualified = target.qualify(table);
        ExportTableRequest {
            expression: expression::expression(handle.into_payload()),
            description: qualified.clone(),
            bigquery_export_options: BigQueryExportOptions {
                bigquery_destination: BigQueryDestination {
                    table: qualified,
                    overwrite,
                },
            },
            workload_tag: self.workload_tag.clone(),
        }
    }
}

impl EmbeddingCompute for EarthEngineClient {
    type Export = EeOperation;

    async fn aggregate(
        &self,
        plots: &PlotDataset,
        recipe: &AnnualMeanRecipe,
    ) -> Result<YearEmbeddingHandle, PipelineError> {
        Ok(YearEmbeddingHandle::new(
            recipe.year,
            expression::annual_mean(plots, recipe),
        ))
    }

    async fn export_table(
        &self,
        handle: YearEmbeddingHandle,
        target: &DatasetRef,
        table: &str,
        overwrite: bool,
    ) -> Result<EeOperation, PipelineError> {
        let body = self.export_request(handle, target, table, overwrite);
        let url = join_url(
            &self.base_url,
            &format!("v1/projects/{}/table:export", self.project),
        );

        let operation: Operation = self
            .api
            .send_json(self.api.request(Method::POST, &url).json(&body))
            .await
            .map_err(compute_error)?;

        tracing::debug!(operation = %operation.name, table = %body.description, "earth engine export started");
        Ok(EeOperation {
            api: self.api.clone(),
            base_url: self.base_url.clone(),
            name: operation.name,
        })
    }
}

/// Handle on a running Earth Engine export operation.
pub struct EeOperation {
    api: GoogleApi,
    base_url: String,
    name: String,
}

impl RemoteTask for EeOperation {
    fn id(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> Result<TaskState, PipelineError> {
        let url = join_url(&self.base_url, &format!("v1/{}", self.name));
        let operation: Operation = self
            .api
            .send_json(self.api.request(Method::GET, &url))
            .await
            .map_err(compute_error)?;
        Ok(operation.task_state())
    }
}

fn compute_error(failure: ApiFailure) -> PipelineError {
    PipelineError::Compute(failure.to_string())
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportTableRequest {
    expression: Value,
    description: String,
    bigquery_export_options: BigQueryExportOptions,
    workload_tag: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BigQueryExportOptions {
    bigquery_destination: BigQueryDestination,
}

#[derive(Debug, Serialize)]
struct BigQueryDestination {
    table: String,
    overwrite: bool,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    metadata: Option<OperationMetadata>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationMetadata {
    #[serde(default)]
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    message: String,
}

impl Operation {
    fn task_state(&self) -> TaskState {
        if let Some(error) = &self.error {
            tracing::warn!(operation = %self.name, error = %error.message, "earth engine operation failed");
            return TaskState::Failed;
        }
        let state = self.metadata.as_ref().and_then(|m| m.state.as_deref());
        match state {
            Some(state) => map_operation_state(state),
            None if self.done => TaskState::Completed,
            None => TaskState::Ready,
        }
    }
}

/// Earth Engine operation state -> task state.
fn map_operation_state(state: &str) -> TaskState {
    match state {
        "PENDING" => TaskState::Ready,
        "RUNNING" => TaskState::Running,
        "SUCCEEDED" => TaskState::Completed,
        "CANCELLING" => TaskState::CancelRequested,
        "CANCELLED" => TaskState::Cancelled,
        // FAILED and anything unrecognised
        _ => TaskState::Failed,
    }
}
