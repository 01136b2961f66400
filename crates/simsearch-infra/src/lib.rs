//! Infrastructure layer for simsearch.
//!
//! Contains implementations of the port traits defined in `simsearch-core`:
//! the Earth Engine export client, the BigQuery warehouse client, the
//! GeoJSON plot reader (local or Cloud Storage), and the configuration
//! loader.

pub mod bigquery;
pub mod config;
pub mod earthengine;
pub mod google;
pub mod plots;
