//! Plot preparation endpoint.
//!
//! POST /api/v1/prep - Accept a plot file and a list of years, answer 202
//! with the canonical table names the run will produce, and run the
//! pipeline in the background.

use std::collections::BTreeMap;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use simsearch_core::pipeline::predicted_names;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PrepRequest {
    /// Plot file: a bare object name in the configured bucket, a `gs://` URI
    /// or a local path.
    pub gcp_file: String,
    pub years: Vec<i32>,
}

#[derive(Debug, Serialize)]
pub struct PrepAccepted {
    pub source: String,
    /// Year -> canonical table name, available once the run finishes.
    pub tables: BTreeMap<i32, String>,
}

/// POST /api/v1/prep
///
/// Names are computed up front so invalid input is rejected with 400 before
/// anything is spawned. The background run observes the server's shutdown
/// token.
pub async fn start_prep(
    State(state): State<AppState>,
    Json(body): Json<PrepRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PrepAccepted>>), AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    if body.gcp_file.trim().is_empty() {
        return Err(AppError::Validation("gcp_file must not be empty".to_string()));
    }

    let source = state.resolve_plot_source(body.gcp_file.trim());
    let tables = predicted_names(&source, &state.target, &body.years)?;

    tracing::info!(%request_id, %source, years = ?body.years, "preparation accepted");
    spawn_prepare(&state, source.clone(), body.years, request_id.clone());

    let elapsed = start.elapsed().as_millis() as u64;
    let resp = ApiResponse::success(PrepAccepted { source, tables }, request_id, elapsed);

    Ok((StatusCode::ACCEPTED, Json(resp)))
}

fn spawn_prepare(state: &AppState, source: String, years: Vec<i32>, request_id: String) {
    let orchestrator = state.orchestrator.clone();
    let target = state.target.clone();
    let cancel = state.shutdown.child_token();

    tokio::spawn(async move {
        match orchestrator.prepare(&source, &target, &years, &cancel).await {
            Ok(tables) => {
                let missing: Vec<i32> = years
                    .iter()
                    .copied()
                    .filter(|year| !tables.contains_key(year))
                    .collect();
                tracing::info!(
                    %request_id,
                    %source,
                    tables = ?tables,
                    failed_years = ?missing,
                    "preparation finished"
                );
            }
            Err(e) => {
                tracing::error!(%request_id, %source, error = %e, "preparation aborted");
            }
        }
    });
}
