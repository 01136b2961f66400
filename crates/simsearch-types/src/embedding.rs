//! Annual embedding aggregation: recipe, feature bands, result handles.

use serde::{Deserialize, Serialize};

/// Source image collection with one 64-band embedding mosaic per year.
pub const EMBEDDING_COLLECTION: &str = "GOOGLE/SATELLITE_EMBEDDING/V1/ANNUAL";

/// Number of scalar feature bands in the source collection.
pub const FEATURE_BAND_COUNT: usize = 64;

/// Name of the array column holding the collapsed feature bands.
pub const EMBEDDING_COLUMN: &str = "embedding";

/// Feature band names in column order: `A00` .. `A63`.
pub fn feature_bands() -> Vec<String> {
    (0..FEATURE_BAND_COUNT).map(|i| format!("A{i:02}")).collect()
}

/// Everything needed to compute one year's per-plot band means.
///
/// The source collection is filtered to `year`, overlapping scenes are
/// mosaicked, and each plot receives the mean of every band at `scale_m`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualMeanRecipe {
    pub collection: String,
    pub year: i32,
    pub scale_m: u32,
    pub crs: String,
    pub tile_scale: u32,
    pub max_pixels_per_region: f64,
    pub bands: Vec<String>,
}

impl AnnualMeanRecipe {
    pub fn new(year: i32, scale_m: u32) -> Self {
        Self {
            collection: EMBEDDING_COLLECTION.to_string(),
            year,
            scale_m,
            crs: "EPSG:4326".to_string(),
            tile_scale: 16,
            max_pixels_per_region: 1e12,
            bands: feature_bands(),
        }
    }
}

/// Opaque reference to one year's remote aggregation result.
///
/// Not `Clone`: a handle is moved into exactly one export.
#[derive(Debug)]
pub struct YearEmbeddingHandle {
    year: i32,
    payload: serde_json::Value,
}

impl YearEmbeddingHandle {
    pub fn new(year: i32, payload: serde_json::Value) -> Self {
        Self { year, payload }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// The backend-specific representation of the computation.
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    pub fn into_payload(self) -> serde_json::Value {
        self.payload
    }
}
