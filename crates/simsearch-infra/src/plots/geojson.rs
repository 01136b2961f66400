//! GeoJSON plot reader.
//!
//! Reads a FeatureCollection exported from a plot collection tool, either
//! from the local filesystem or from Cloud Storage (`gs://bucket/object`).
//! Only feature properties are used; the plot geometry is rebuilt from
//! `center_lon` / `center_lat`.

use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{Map, Value};

use simsearch_core::port::plots::PlotReader;
use simsearch_types::config::StorageConfig;
use simsearch_types::error::PipelineError;
use simsearch_types::plot::{PLOT_SCHEMA, PlotDataset, PlotRecord};

use crate::google::GoogleApi;

pub struct GeoJsonPlotReader {
    api: GoogleApi,
    storage_base_url: String,
}

impl GeoJsonPlotReader {
    pub fn new(api: GoogleApi, config: &StorageConfig) -> Self {
        Self {
            api,
            storage_base_url: config.base_url.clone(),
        }
    }

    async fn fetch(&self, source: &str) -> Result<Vec<u8>, PipelineError> {
        match parse_gcs_uri(source) {
            Some((bucket, object)) => {
                let url = media_url(&self.storage_base_url, bucket, object)?;
                tracing::debug!(bucket, object, "downloading plot file");
                self.api
                    .send_bytes(self.api.request(Method::GET, url.as_str()))
                    .await
                    .map_err(|e| PipelineError::PlotSource(format!("{source}: {e}")))
            }
            None => tokio::fs::read(source)
                .await
                .map_err(|e| PipelineError::PlotSource(format!("{source}: {e}"))),
        }
    }
}

impl PlotReader for GeoJsonPlotReader {
    async fn read(&self, source: &str) -> Result<PlotDataset, PipelineError> {
        let bytes = self.fetch(source).await?;
        let dataset = parse_feature_collection(&bytes, source)?;
        tracing::info!(source, plots = dataset.row_count(), size_m = dataset.scale_m(), "plot file loaded");
        Ok(dataset)
    }
}

/// Split `gs://bucket/path/to/object` into bucket and object name.
fn parse_gcs_uri(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix("gs://")?;
    let (bucket, object) = rest.split_once('/')?;
    if bucket.is_empty() || object.is_empty() {
        return None;
    }
    Some((bucket, object))
}

/// JSON API media download URL; the object name is a single encoded segment.
fn media_url(base_url: &str, bucket: &str, object: &str) -> Result<Url, PipelineError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| PipelineError::PlotSource(format!("invalid storage url '{base_url}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| PipelineError::PlotSource(format!("invalid storage url '{base_url}'")))?
        .pop_if_empty()
        .extend(["storage", "v1", "b", bucket, "o", object]);
    url.query_pairs_mut().append_pair("alt", "media");
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
}

/// Parse a FeatureCollection into plots.
///
/// # Errors
///
/// `Validation` if a feature lacks one of the plot schema properties or a
/// value cannot be read, or if the collection breaks a `PlotDataset`
/// invariant. `PlotSource` if the bytes are not a FeatureCollection.
pub fn parse_feature_collection(bytes: &[u8], source: &str) -> Result<PlotDataset, PipelineError> {
    let collection: FeatureCollection = serde_json::from_slice(bytes)
        .map_err(|e| PipelineError::PlotSource(format!("{source} is not GeoJSON: {e}")))?;

    let empty = Map::new();
    let mut records = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.iter().enumerate() {
        let properties = feature.properties.as_ref().unwrap_or(&empty);
        if let Some(missing) = PLOT_SCHEMA.iter().find(|key| !properties.contains_key(**key)) {
            return Err(PipelineError::Validation(format!(
                "{source} does not contain required schema columns {PLOT_SCHEMA:?} (feature {index} has no '{missing}')"
            )));
        }

        let size = number(properties, "size_m", index)?;
        if !(size >= 1.0 && size < f64::from(u32::MAX)) {
            return Err(PipelineError::Validation(format!(
                "feature {index}: size_m must be a positive number of metres, got {size}"
            )));
        }
        records.push(PlotRecord {
            plotid: integer(properties, "plotid", index)?,
            center_lon: number(properties, "center_lon", index)?,
            center_lat: number(properties, "center_lat", index)?,
            // integer part, as written by spreadsheet exports ("30.0")
            size_m: size.trunc() as u32,
        });
    }

    PlotDataset::new(records)
}

fn number(properties: &Map<String, Value>, key: &str, index: usize) -> Result<f64, PipelineError> {
    let parsed = match properties.get(key) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|v| v.is_finite())
        .ok_or_else(|| invalid_value(properties, key, index))
}

fn integer(properties: &Map<String, Value>, key: &str, index: usize) -> Result<i64, PipelineError> {
    let parsed = match properties.get(key) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| invalid_value(properties, key, index))
}

fn invalid_value(properties: &Map<String, Value>, key: &str, index: usize) -> PipelineError {
    let shown = properties
        .get(key)
        .map(Value::to_string)
        .unwrap_or_else(|| "null".to_string());
    PipelineError::Validation(format!("feature {index}: invalid {key} {shown}"))
}
