//! Plot records and datasets.

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Property names a plot source must provide.
pub const PLOT_SCHEMA: [&str; 4] = ["plotid", "center_lon", "center_lat", "size_m"];

/// A single sample location with its footprint size in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotRecord {
    pub plotid: i64,
    pub center_lon: f64,
    pub center_lat: f64,
    pub size_m: u32,
}

/// An ordered, non-empty set of plots sharing one footprint size.
///
/// The shared `size_m` is the aggregation scale; the row count drives the
/// vector index gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotDataset {
    records: Vec<PlotRecord>,
    scale_m: u32,
}

impl PlotDataset {
    pub fn new(records: Vec<PlotRecord>) -> Result<Self, PipelineError> {
        let Some(first) = records.first() else {
            return Err(PipelineError::Validation(
                "plot dataset contains no records".to_string(),
            ));
        };
        let scale_m = first.size_m;
        if let Some(odd) = records.iter().find(|r| r.size_m != scale_m) {
            return Err(PipelineError::Validation(format!(
                "plots must share one size_m: plot {} has {} but the dataset uses {scale_m}",
                odd.plotid, odd.size_m
            )));
        }
        Ok(Self { records, scale_m })
    }

    pub fn records(&self) -> &[PlotRecord] {
        &self.records
    }

    /// Aggregation scale in metres.
    pub fn scale_m(&self) -> u32 {
        self.scale_m
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plot(plotid: i64, size_m: u32) -> PlotRecord {
        PlotRecord {
            plotid,
            center_lon: 10.0,
            center_lat: 45.0,
            size_m,
        }
    }

    #[test]
    fn test_dataset_uses_shared_scale() {
        let ds = PlotDataset::new(vec![plot(1, 30), plot(2, 30)]).unwrap();
        assert_eq!(ds.scale_m(), 30);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn test_empty_dataset_rejected() {
        let err = PlotDataset::new(Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_mixed_sizes_rejected() {
        let err = PlotDataset::new(vec![plot(1, 30), plot(2, 10)]).unwrap_err();
        assert!(err.to_string().contains("plot 2"));
    }
}
