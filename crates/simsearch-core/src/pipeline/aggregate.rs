//! Per-year embedding aggregation.

use std::collections::HashSet;
use std::sync::Arc;

use simsearch_types::embedding::{AnnualMeanRecipe, YearEmbeddingHandle};
use simsearch_types::error::PipelineError;
use simsearch_types::plot::PlotDataset;
use simsearch_types::table::year_tag;

use crate::port::compute::EmbeddingCompute;

/// Submits one annual mean aggregation per requested year.
pub struct EmbeddingAggregator<C: EmbeddingCompute> {
    compute: Arc<C>,
}

impl<C: EmbeddingCompute> EmbeddingAggregator<C> {
    pub fn new(compute: Arc<C>) -> Self {
        Self { compute }
    }

    /// One handle per year, in input order.
    ///
    /// Each year filters the annual collection to that calendar year,
    /// mosaics overlapping scenes, and averages every band per plot at the
    /// dataset's plot scale.
    pub async fn aggregate(
        &self,
        plots: &PlotDataset,
        years: &[i32],
    ) -> Result<Vec<YearEmbeddingHandle>, PipelineError> {
        validate_years(years)?;

        let mut handles = Vec::with_capacity(years.len());
        for &year in years {
            let recipe = AnnualMeanRecipe::new(year, plots.scale_m());
            tracing::debug!(year, scale_m = recipe.scale_m, plots = plots.row_count(), "aggregating embeddings");
            handles.push(self.compute.aggregate(plots, &recipe).await?);
        }
        Ok(handles)
    }
}

/// Years must be a non-empty list of distinct four-digit years.
pub fn validate_years(years: &[i32]) -> Result<(), PipelineError> {
    if years.is_empty() {
        return Err(PipelineError::Validation(
            "at least one year is required".to_string(),
        ));
    }
    let mut seen = HashSet::with_capacity(years.len());
    for &year in years {
        year_tag(year)?;
        if !seen.insert(year) {
            return Err(PipelineError::Validation(format!(
                "year {year} is listed more than once"
            )));
        }
    }
    Ok(())
}
