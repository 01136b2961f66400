//! Plot file readers.

pub mod geojson;

pub use geojson::GeoJsonPlotReader;
