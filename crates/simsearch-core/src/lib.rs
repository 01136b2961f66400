//! Preparation pipeline, similarity search and port trait definitions for
//! simsearch.
//!
//! This crate defines the "ports" (remote compute, warehouse and plot reader
//! traits) that the infrastructure layer implements. It depends only on
//! `simsearch-types` -- never on `simsearch-infra` or any HTTP client.

pub mod pipeline;
pub mod port;
pub mod search;

#[cfg(test)]
mod testing;
