//! GET /api/v1/search - Nearest neighbours of a plot in a prepared table.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use simsearch_types::search::SearchMatch;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Plot id to search around.
    pub uniqueid: i64,
    /// Canonical table name within the configured dataset.
    pub table: String,
    #[serde(default = "default_matches")]
    pub matches: u32,
}

fn default_matches() -> u32 {
    5
}

#[derive(Debug, Serialize)]
pub struct SearchResults {
    pub table: String,
    pub plotid: i64,
    pub matches: Vec<SearchMatch>,
}

/// GET /api/v1/search?uniqueid=&table=&matches=
///
/// 404 when the table does not exist, 400 when `matches` is out of range.
pub async fn search_plots(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, AppError> {
    let start = Instant::now();
    let request_id = uuid::Uuid::now_v7().to_string();

    let matches = state
        .search_service
        .search(&state.target, &query.table, query.uniqueid, query.matches)
        .await?;

    tracing::debug!(%request_id, table = %query.table, found = matches.len(), "search complete");

    let elapsed = start.elapsed().as_millis() as u64;
    let data = SearchResults {
        table: query.table,
        plotid: query.uniqueid,
        matches,
    };
    Ok(Json(ApiResponse::success(data, request_id, elapsed)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults_matches() {
        let query: SearchQuery =
            serde_json::from_value(serde_json::json!({"uniqueid": 17, "table": "plots_2020_pp"}))
                .unwrap();
        assert_eq!(query.matches, 5);
        assert_eq!(query.uniqueid, 17);
    }
}
