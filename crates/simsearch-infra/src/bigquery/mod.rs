//! BigQuery adapter implementing the warehouse port.

pub mod client;

pub use client::{BigQueryClient, BqJob};
