//! Nearest-neighbour lookup over prepared tables.

use std::sync::Arc;

use simsearch_types::error::PipelineError;
use simsearch_types::search::{MAX_MATCHES, SearchMatch};
use simsearch_types::sql::vector_search_query;
use simsearch_types::table::{DatasetRef, validate_table_name};

use crate::port::warehouse::{Row, Warehouse};

/// Finds the plots whose embeddings are closest to a given plot.
pub struct SearchService<W: Warehouse> {
    warehouse: Arc<W>,
}

impl<W: Warehouse> SearchService<W> {
    pub fn new(warehouse: Arc<W>) -> Self {
        Self { warehouse }
    }

    /// Up to `match_count` neighbours of `plotid` in `table`, nearest first.
    /// The plot itself is never among them.
    ///
    /// # Errors
    ///
    /// - `Validation` if `match_count` is outside `1..=MAX_MATCHES` or
    ///   `table` is not a plain table id.
    /// - `NotFound` if `table` does not exist; no search query is run.
    pub async fn search(
        &self,
        target: &DatasetRef,
        table: &str,
        plotid: i64,
        match_count: u32,
    ) -> Result<Vec<SearchMatch>, PipelineError> {
        if !(1..=MAX_MATCHES).contains(&match_count) {
            return Err(PipelineError::Validation(format!(
                "matches must be between 1 and {MAX_MATCHES}, got {match_count}"
            )));
        }
        validate_table_name(table)?;

        if !self.warehouse.table_exists(target, table).await? {
            return Err(PipelineError::NotFound(format!(
                "table {} does not exist",
                target.qualify(table)
            )));
        }

        let sql = vector_search_query(target, table, plotid, match_count);
        tracing::debug!(table = %target.qualify(table), plotid, match_count, "running vector search");
        let rows = self.warehouse.fetch_rows(&target.project, &sql).await?;

        let matches = rows
            .iter()
            .map(parse_match)
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(table, plotid, found = matches.len(), "vector search finished");
        Ok(matches)
    }
}

fn parse_match(row: &Row) -> Result<SearchMatch, PipelineError> {
    Ok(SearchMatch {
        target_plotid: cell(row, 0, "target_plotid")?,
        base_plotid: cell(row, 1, "base_plotid")?,
        distance: cell(row, 2, "distance")?,
    })
}

fn cell<T: std::str::FromStr>(row: &Row, index: usize, column: &str) -> Result<T, PipelineError> {
    let raw = row
        .get(index)
        .and_then(|v| v.as_deref())
        .ok_or_else(|| PipelineError::Warehouse(format!("search row has no {column}")))?;
    raw.parse()
        .map_err(|_| PipelineError::Warehouse(format!("search row has malformed {column} '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockWarehouse, target};

    fn row(target: &str, base: &str, distance: &str) -> Row {
        vec![
            Some(target.to_string()),
            Some(base.to_string()),
            Some(distance.to_string()),
        ]
    }

    #[tokio::test]
    async fn test_missing_table_is_not_found_without_query() {
        let warehouse = Arc::new(MockWarehouse::new());
        let service = SearchService::new(warehouse.clone());

        let err = service
            .search(&target(), "plots_2020_pp", 7, 5)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::NotFound(_)));
        assert_eq!(
            warehouse.events(),
            vec!["exists:test-project.test_dataset.plots_2020_pp".to_string()]
        );
    }

    #[tokio::test]
    async fn test_returns_parsed_matches() {
        let warehouse = Arc::new(
            MockWarehouse::new()
                .with_table("plots_2020_pp")
                .with_rows(vec![row("7", "12", "0.031"), row("7", "3", "0.118")]),
        );
        let service = SearchService::new(warehouse.clone());

        let matches = service.search(&target(), "plots_2020_pp", 7, 2).await.unwrap();

        assert_eq!(
            matches,
            vec![
                SearchMatch { target_plotid: 7, base_plotid: 12, distance: 0.031 },
                SearchMatch { target_plotid: 7, base_plotid: 3, distance: 0.118 },
            ]
        );
        let queries = warehouse.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].contains("top_k => 3"));
        assert!(queries[0].contains("OFFSET 1"));
    }

    #[tokio::test]
    async fn test_match_count_bounds() {
        let warehouse = Arc::new(MockWarehouse::new().with_table("t"));
        let service = SearchService::new(warehouse.clone());

        for n in [0, 51] {
            let err = service.search(&target(), "t", 1, n).await.unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)), "{n}");
        }
        assert!(warehouse.events().is_empty());
    }

    #[tokio::test]
    async fn test_injected_table_name_rejected_before_any_call() {
        let warehouse = Arc::new(MockWarehouse::new().with_table("plots_2020_pp"));
        let service = SearchService::new(warehouse.clone());

        for table in [
            "plots_2020_pp` WHERE FALSE UNION ALL SELECT 1 --/../plots_2020_pp",
            "../plots_2020_pp",
            "other_dataset.plots_2020_pp",
        ] {
            let err = service.search(&target(), table, 7, 5).await.unwrap_err();
            assert!(matches!(err, PipelineError::Validation(_)), "{table}");
        }
        assert!(warehouse.events().is_empty());
        assert!(warehouse.queries().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_is_warehouse_error() {
        let warehouse = Arc::new(
            MockWarehouse::new()
                .with_table("t")
                .with_rows(vec![vec![Some("7".to_string()), None, Some("0.1".to_string())]]),
        );
        let err = SearchService::new(warehouse)
            .search(&target(), "t", 7, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Warehouse(_)));
    }
}
