//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use simsearch_types::error::PipelineError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors from the pipeline or the search service.
    Pipeline(PipelineError),
    /// Request shape rejected before reaching a service.
    Validation(String),
}

impl From<PipelineError> for AppError {
    fn from(e: PipelineError) -> Self {
        AppError::Pipeline(e)
    }
}

impl AppError {
    /// Envelope error code and message.
    pub fn code_and_message(&self) -> (&'static str, String) {
        match self {
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(e) => {
                let code = match e {
                    PipelineError::Validation(_) => "VALIDATION_ERROR",
                    PipelineError::NotFound(_) => "NOT_FOUND",
                    PipelineError::Precondition(_) => "PRECONDITION_FAILED",
                    PipelineError::TaskFailed { .. } => "TASK_FAILED",
                    PipelineError::Timeout { .. } => "TASK_TIMEOUT",
                    PipelineError::Cancelled { .. } => "CANCELLED",
                    PipelineError::Compute(_) => "COMPUTE_ERROR",
                    PipelineError::Warehouse(_) => "WAREHOUSE_ERROR",
                    PipelineError::PlotSource(_) => "PLOT_SOURCE_ERROR",
                };
                (code, e.to_string())
            }
        }
    }

    /// 400 for rejected input, 404 for a missing table, 500 otherwise.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::Pipeline(PipelineError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Pipeline(PipelineError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = self.code_and_message();
        if let AppError::Pipeline(e) = &self {
            if !e.is_client_error() {
                tracing::error!(code, error = %e, "request failed");
            }
        }

        let request_id = uuid::Uuid::now_v7().to_string();
        ApiResponse::error(status, code, message, request_id).into_response()
    }
}
