//! Warehouse table naming.
//!
//! Raw export tables are named `{base}_{yearTag}_{attempt}` where `attempt`
//! is a fresh 3-digit token per export, so retries never write into a table
//! name that was just deleted. The canonical table drops the attempt token:
//! `{base}_{yearTag}_pp`. Because the token has a fixed width, the canonical
//! name can be predicted without any remote call and is never longer than
//! the raw name.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Upper bound on `project.dataset.table`, shared by BigQuery table ids and
/// Earth Engine export descriptions.
pub const MAX_QUALIFIED_NAME_LEN: usize = 100;

pub const YEAR_TAG_LEN: usize = 4;

/// Width of the per-export attempt token.
pub const ATTEMPT_TOKEN_LEN: usize = 3;

/// Suffix that replaces the attempt token on canonical tables.
pub const CANONICAL_SUFFIX: &str = "pp";

/// A BigQuery dataset that tables are written into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetRef {
    pub project: String,
    pub dataset: String,
}

impl DatasetRef {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
        }
    }

    /// `project.dataset.table`
    pub fn qualify(&self, table: &str) -> String {
        format!("{}.{}.{table}", self.project, self.dataset)
    }

    /// `dataset.table`, the form accepted inside DDL run in `project`.
    pub fn dataset_scoped(&self, table: &str) -> String {
        format!("{}.{table}", self.dataset)
    }
}

/// Name of one export attempt, from which the canonical name derives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTableName {
    base: String,
    year_tag: String,
    attempt: String,
}

impl ExportTableName {
    /// Compose a name that fits [`MAX_QUALIFIED_NAME_LEN`] once qualified
    /// under `target`.
    ///
    /// When too long, `base` is cut to exactly the number of characters that
    /// fit; the `_{yearTag}_{attempt}` suffix is always kept whole.
    pub fn compose(
        target: &DatasetRef,
        base: &str,
        year_tag: &str,
        attempt: &str,
    ) -> Result<Self, PipelineError> {
        validate_year_tag(year_tag)?;
        if attempt.chars().count() != ATTEMPT_TOKEN_LEN {
            return Err(PipelineError::Validation(format!(
                "attempt token must be {ATTEMPT_TOKEN_LEN} characters, got '{attempt}'"
            )));
        }
        if base.is_empty() {
            return Err(PipelineError::Validation(
                "table base name is empty".to_string(),
            ));
        }

        // "{project}.{dataset}." + "_{yearTag}_{attempt}"
        let fixed = target.project.chars().count()
            + target.dataset.chars().count()
            + 2
            + 1
            + YEAR_TAG_LEN
            + 1
            + ATTEMPT_TOKEN_LEN;
        if fixed >= MAX_QUALIFIED_NAME_LEN {
            return Err(PipelineError::Validation(format!(
                "'{}.{}' leaves no room for a table name within {MAX_QUALIFIED_NAME_LEN} characters",
                target.project, target.dataset
            )));
        }
        let room = MAX_QUALIFIED_NAME_LEN - fixed;
        let base: String = base.chars().take(room).collect();

        Ok(Self {
            base,
            year_tag: year_tag.to_string(),
            attempt: attempt.to_string(),
        })
    }

    /// The (possibly truncated) base name.
    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn year_tag(&self) -> &str {
        &self.year_tag
    }

    /// Unqualified raw export table name.
    pub fn raw(&self) -> String {
        format!("{}_{}_{}", self.base, self.year_tag, self.attempt)
    }

    /// Unqualified canonical table name.
    pub fn canonical(&self) -> String {
        format!("{}_{}_{CANONICAL_SUFFIX}", self.base, self.year_tag)
    }
}

/// A year tag is exactly four characters.
pub fn validate_year_tag(year_tag: &str) -> Result<(), PipelineError> {
    let len = year_tag.chars().count();
    if len != YEAR_TAG_LEN {
        return Err(PipelineError::Validation(format!(
            "year tag expects {YEAR_TAG_LEN} characters (e.g. '2023'), got '{year_tag}' ({len})"
        )));
    }
    Ok(())
}

/// Render a year as its tag, rejecting years that are not four digits.
pub fn year_tag(year: i32) -> Result<String, PipelineError> {
    if !(1000..=9999).contains(&year) {
        return Err(PipelineError::Validation(format!(
            "year {year} is not a four-digit calendar year"
        )));
    }
    Ok(year.to_string())
}

/// Table base name for a plot source: the file name up to its first `.`.
///
/// `gs://bucket/dir/ceo-100-plots.geojson` -> `ceo-100-plots`
pub fn base_name_from_source(source: &str) -> Result<String, PipelineError> {
    let file_name = source
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(source);
    let base = file_name.split('.').next().unwrap_or_default();
    if base.is_empty() {
        return Err(PipelineError::Validation(format!(
            "cannot derive a table name from source '{source}'"
        )));
    }
    validate_table_name(base)?;
    Ok(base.to_string())
}

/// Longest table id BigQuery accepts.
pub const MAX_TABLE_ID_LEN: usize = 1024;

/// A table id may only hold letters, digits, `_` and `-`.
///
/// Table names are interpolated into REST paths and backtick-quoted SQL, so
/// anything that could end a quote or a path segment is rejected here.
pub fn validate_table_name(table: &str) -> Result<(), PipelineError> {
    if table.is_empty() {
        return Err(PipelineError::Validation("table name is empty".to_string()));
    }
    if table.chars().count() > MAX_TABLE_ID_LEN {
        return Err(PipelineError::Validation(format!(
            "table name exceeds {MAX_TABLE_ID_LEN} characters"
        )));
    }
    if let Some(bad) = table
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(PipelineError::Validation(format!(
            "table name '{table}' contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

/// Canonical table name a run of the pipeline will produce, without
/// contacting any remote service.
pub fn predicted_canonical_name(
    target: &DatasetRef,
    source: &str,
    year: i32,
) -> Result<String, PipelineError> {
    let base = base_name_from_source(source)?;
    let tag = year_tag(year)?;
    let placeholder = "0".repeat(ATTEMPT_TOKEN_LEN);
    Ok(ExportTableName::compose(target, &base, &tag, &placeholder)?.canonical())
}
