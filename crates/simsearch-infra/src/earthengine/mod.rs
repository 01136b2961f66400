//! Earth Engine adapter: expression graphs and the export client.

pub mod client;
pub mod expression;

pub use client::{EarthEngineClient, EeOperation};
