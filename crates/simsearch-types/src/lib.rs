//! Shared domain types for the plot similarity-search pipeline.
//!
//! Plots, remote task states, table naming, the SQL statements the pipeline
//! issues, configuration, and error types. No IO lives here -- only serde,
//! thiserror and secrecy.

pub mod config;
pub mod embedding;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod search;
pub mod sql;
pub mod table;
pub mod task;
