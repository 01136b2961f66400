//! GoogleSQL statements issued against the warehouse.

use crate::embedding::feature_bands;
use crate::table::DatasetRef;

/// Row count above which a vector index is built.
pub const VECTOR_INDEX_MIN_ROWS: usize = 5000;

/// IVF list count for vector indexes.
pub const IVF_NUM_LISTS: u32 = 1000;

/// Fraction of IVF lists probed by a search.
pub const SEARCH_FRACTION_LISTS: f64 = 0.005;

/// Rewrite a raw export table into the canonical one-embedding-column form.
///
/// Earth Engine exports are clustered on `geo`; the new table keeps that
/// clustering. Rows whose first band is null are partially populated and
/// dropped.
pub fn normalize_ddl(target: &DatasetRef, raw: &str, canonical: &str) -> String {
    let bands = feature_bands();
    let first = &bands[0];
    format!(
        "CREATE OR REPLACE TABLE `{canonical_ref}`\n\
         CLUSTER BY geo\n\
         AS\n\
         SELECT\n    plotid,\n    geo,\n    ARRAY[{columns}] AS embedding\n\
         FROM\n    `{raw_ref}`\n\
         WHERE\n    {first} IS NOT NULL",
        canonical_ref = target.qualify(canonical),
        raw_ref = target.qualify(raw),
        columns = bands.join(", "),
    )
}

/// Index name used for the embedding column of a canonical table.
pub fn vector_index_name(embedding_col: &str) -> String {
    format!("{embedding_col}_ivf_index")
}

/// Cosine IVF vector index over `embedding_col`.
pub fn vector_index_ddl(target: &DatasetRef, table: &str, embedding_col: &str) -> String {
    format!(
        "CREATE VECTOR INDEX {name} ON `{table_ref}`({embedding_col})\n\
         OPTIONS(distance_type='COSINE', index_type='IVF', ivf_options='{{\"num_lists\": {IVF_NUM_LISTS}}}')",
        name = vector_index_name(embedding_col),
        table_ref = target.dataset_scoped(table),
    )
}

/// Nearest neighbours of `plotid`, excluding the plot itself.
///
/// Asks for `match_count + 1` neighbours and skips the first, which is the
/// query row matching itself at distance zero.
pub fn vector_search_query(
    target: &DatasetRef,
    table: &str,
    plotid: i64,
    match_count: u32,
) -> String {
    let table_ref = target.dataset_scoped(table);
    format!(
        "SELECT\n  {plotid} AS target_plotid,\n  base.plotid AS base_plotid,\n  distance\n\
         FROM\n  VECTOR_SEARCH(\n\
         \x20   TABLE `{table_ref}`,\n\
         \x20   'embedding',\n\
         \x20   (SELECT * FROM `{table_ref}` WHERE plotid = {plotid} LIMIT 1),\n\
         \x20   top_k => {top_k},\n\
         \x20   distance_type => 'COSINE',\n\
         \x20   options => '{{\"fraction_lists_to_search\": {SEARCH_FRACTION_LISTS}}}'\n\
         \x20 )\n\
         ORDER BY distance\n\
         LIMIT {match_count}\n\
         OFFSET 1",
        top_k = match_count + 1,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DatasetRef {
        DatasetRef::new("proj", "ds")
    }

    #[test]
    fn test_normalize_ddl_shape() {
        let sql = normalize_ddl(&target(), "plots_2020_123", "plots_2020_pp");
        assert!(sql.starts_with("CREATE OR REPLACE TABLE `proj.ds.plots_2020_pp`"));
        assert!(sql.contains("CLUSTER BY geo"));
        assert!(sql.contains("ARRAY[A00, A01, "));
        assert!(sql.contains("A62, A63] AS embedding"));
        assert!(sql.contains("FROM\n    `proj.ds.plots_2020_123`"));
        assert!(sql.ends_with("A00 IS NOT NULL"));
    }

    #[test]
    fn test_vector_index_ddl_shape() {
        let sql = vector_index_ddl(&target(), "plots_2022_pp", "embedding");
        assert!(sql.starts_with("CREATE VECTOR INDEX embedding_ivf_index ON `ds.plots_2022_pp`(embedding)"));
        assert!(sql.contains("distance_type='COSINE'"));
        assert!(sql.contains("index_type='IVF'"));
        assert!(sql.contains(r#"ivf_options='{"num_lists": 1000}'"#));
    }

    #[test]
    fn test_search_query_skips_self_match() {
        let sql = vector_search_query(&target(), "plots_2022_pp", 5, 3);
        assert!(sql.contains("top_k => 4"));
        assert!(sql.contains("WHERE plotid = 5 LIMIT 1"));
        assert!(sql.contains("LIMIT 3\nOFFSET 1"));
        assert!(sql.contains(r#""fraction_lists_to_search": 0.005"#));
    }
}
