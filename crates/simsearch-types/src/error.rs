use thiserror::Error;

use crate::task::TaskState;

/// Errors raised by the preparation pipeline and the search service.
///
/// Remote failures that have no finer classification keep the upstream
/// message and are propagated unchanged.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("remote task {id} ended in state {state}")]
    TaskFailed { id: String, state: TaskState },

    #[error("remote task {id} still pending after {waited_secs}s")]
    Timeout { id: String, waited_secs: u64 },

    #[error("wait on remote task {id} was cancelled")]
    Cancelled { id: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("compute error: {0}")]
    Compute(String),

    #[error("warehouse error: {0}")]
    Warehouse(String),

    #[error("plot source error: {0}")]
    PlotSource(String),
}

impl PipelineError {
    /// Whether the error is a client mistake rather than a remote fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::Validation(_) | PipelineError::NotFound(_))
    }
}

/// Errors raised while loading configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("missing required setting '{0}'")]
    Missing(&'static str),

    #[error("invalid setting '{key}': {message}")]
    Invalid { key: &'static str, message: String },
}
