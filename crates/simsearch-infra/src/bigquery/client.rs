//! BigQueryClient -- concrete [`Warehouse`] over the BigQuery v2 REST API.
//!
//! - Statements are submitted with `jobs.insert` and tracked as [`BqJob`]s.
//! - Table lookups and deletes go through `tables.get` / `tables.delete`.
//! - Row-returning queries use `jobs.query`, following up with
//!   `getQueryResults` while the job is still running.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use simsearch_core::port::task::RemoteTask;
use simsearch_core::port::warehouse::{Row, Warehouse};
use simsearch_types::config::BigQueryConfig;
use simsearch_types::error::PipelineError;
use simsearch_types::table::DatasetRef;
use simsearch_types::task::TaskState;

use crate::google::{ApiFailure, GoogleApi, join_url};

/// Follow-up `getQueryResults` calls before a query is reported as stuck.
const MAX_RESULT_POLLS: usize = 10;

pub struct BigQueryClient {
    api: GoogleApi,
    base_url: String,
    location: Option<String>,
    query_timeout_ms: u64,
}

impl BigQueryClient {
    pub fn new(api: GoogleApi, config: &BigQueryConfig) -> Self {
        Self {
            api,
            base_url: config.base_url.clone(),
            location: config.location.clone(),
            query_timeout_ms: config.query_timeout_ms,
        }
    }

    fn project_url(&self, project: &str, path: &str) -> String {
        join_url(
            &self.base_url,
            &format!("bigquery/v2/projects/{project}/{path}"),
        )
    }

    fn table_url(&self, target: &DatasetRef, table: &str) -> String {
        self.project_url(
            &target.project,
            &format!("datasets/{}/tables/{table}", target.dataset),
        )
    }

    fn insert_body(&self, project: &str, sql: &str) -> InsertJobRequest {
        InsertJobRequest {
            job_reference: JobReferenceRequest {
                project_id: project.to_string(),
                location: self.location.clone(),
            },
            configuration: JobConfiguration {
                query: QueryJobConfig {
                    query: sql.to_string(),
                    use_legacy_sql: false,
                },
            },
        }
    }

    fn query_body(&self, sql: &str) -> QueryRequest {
        QueryRequest {
            query: sql.to_string(),
            use_legacy_sql: false,
            timeout_ms: self.query_timeout_ms,
            location: self.location.clone(),
        }
    }
}

impl Warehouse for BigQueryClient {
    type Job = BqJob;

    async fn submit_query(&self, project: &str, sql: &str) -> Result<BqJob, PipelineError> {
        let url = self.project_url(project, "jobs");
        let job: JobResource = self
            .api
            .send_json(
                self.api
                    .request(Method::POST, &url)
                    .json(&self.insert_body(project, sql)),
            )
            .await
            .map_err(warehouse_error)?;

        let reference = job.job_reference;
        tracing::debug!(job_id = %reference.job_id, project, "bigquery job inserted");
        Ok(BqJob {
            api: self.api.clone(),
            url: self.project_url(&reference.project_id, &format!("jobs/{}", reference.job_id)),
            location: reference.location,
            job_id: reference.job_id,
        })
    }

    async fn table_exists(&self, target: &DatasetRef, table: &str) -> Result<bool, PipelineError> {
        let request = self
            .api
            .request(Method::GET, &self.table_url(target, table))
            .query(&[("selectedFields", "tableReference")]);
        match self.api.send_empty(request).await {
            Ok(()) => Ok(true),
            Err(failure) if failure.is_not_found() => Ok(false),
            Err(failure) => Err(warehouse_error(failure)),
        }
    }

    async fn delete_table(&self, target: &DatasetRef, table: &str) -> Result<bool, PipelineError> {
        let request = self
            .api
            .request(Method::DELETE, &self.table_url(target, table));
        match self.api.send_empty(request).await {
            Ok(()) => {
                tracing::info!(table = %target.qualify(table), "table deleted");
                Ok(true)
            }
            Err(failure) if failure.is_not_found() => Ok(false),
            Err(failure) => Err(warehouse_error(failure)),
        }
    }

    async fn fetch_rows(&self, project: &str, sql: &str) -> Result<Vec<Row>, PipelineError> {
        let url = self.project_url(project, "queries");
        let mut response: QueryResponse = self
            .api
            .send_json(self.api.request(Method::POST, &url).json(&self.query_body(sql)))
            .await
            .map_err(warehouse_error)?;

        let mut polls = 0;
        while !response.job_complete {
            polls += 1;
            let reference = response.job_reference.as_ref().ok_or_else(|| {
                PipelineError::Warehouse("incomplete query returned no job reference".to_string())
            })?;
            if polls > MAX_RESULT_POLLS {
                return Err(PipelineError::Warehouse(format!(
                    "query {} still running after {MAX_RESULT_POLLS} result polls",
                    reference.job_id
                )));
            }

            let url = self.project_url(
                &reference.project_id,
                &format!("queries/{}", reference.job_id),
            );
            let mut params = vec![("timeoutMs", self.query_timeout_ms.to_string())];
            if let Some(location) = &reference.location {
                params.push(("location", location.clone()));
            }
            tracing::debug!(job_id = %reference.job_id, polls, "waiting for query results");
            response = self
                .api
                .send_json(self.api.request(Method::GET, &url).query(&params))
                .await
                .map_err(warehouse_error)?;
        }

        Ok(response.rows.iter().map(TableRow::cells).collect())
    }
}

/// Handle on an inserted BigQuery job.
pub struct BqJob {
    api: GoogleApi,
    url: String,
    job_id: String,
    location: Option<String>,
}

impl RemoteTask for BqJob {
    fn id(&self) -> &str {
        &self.job_id
    }

    async fn state(&self) -> Result<TaskState, PipelineError> {
        let mut request = self.api.request(Method::GET, &self.url);
        if let Some(location) = &self.location {
            request = request.query(&[("location", location)]);
        }
        let job: JobResource = self
            .api
            .send_json(request)
            .await
            .map_err(warehouse_error)?;
        Ok(job.task_state())
    }
}

fn warehouse_error(failure: ApiFailure) -> PipelineError {
    PipelineError::Warehouse(failure.to_string())
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InsertJobRequest {
    job_reference: JobReferenceRequest,
    configuration: JobConfiguration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JobReferenceRequest {
    project_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

#[derive(Debug, Serialize)]
struct JobConfiguration {
    query: QueryJobConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryJobConfig {
    query: String,
    use_legacy_sql: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    query: String,
    use_legacy_sql: bool,
    timeout_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobReference {
    project_id: String,
    job_id: String,
    #[serde(default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobResource {
    job_reference: JobReference,
    #[serde(default)]
    status: Option<JobStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStatus {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorProto {
    #[serde(default)]
    reason: String,
    #[serde(default)]
    message: String,
}

impl JobResource {
    fn task_state(&self) -> TaskState {
        let Some(status) = &self.status else {
            return TaskState::Ready;
        };
        match status.state.as_deref() {
            Some("DONE") => match &status.error_result {
                Some(error) => {
                    tracing::warn!(
                        job_id = %self.job_reference.job_id,
                        reason = %error.reason,
                        error = %error.message,
                        "bigquery job failed"
                    );
                    TaskState::Failed
                }
                None => TaskState::Completed,
            },
            Some("RUNNING") => TaskState::Running,
            Some("PENDING") | None => TaskState::Ready,
            Some(_) => TaskState::Failed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse {
    #[serde(default)]
    job_complete: bool,
    #[serde(default)]
    job_reference: Option<JobReference>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

/// `{"f": [{"v": ...}, ...]}`
#[derive(Debug, Deserialize)]
struct TableRow {
    #[serde(default)]
    f: Vec<TableCell>,
}

#[derive(Debug, Deserialize)]
struct TableCell {
    #[serde(default)]
    v: Value,
}

impl TableRow {
    fn cells(&self) -> Row {
        self.f
            .iter()
            .map(|cell| match &cell.v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            })
            .collect()
    }
}
