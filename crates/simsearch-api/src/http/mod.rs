//! HTTP/REST API layer.
//!
//! Axum-based REST API at `/api/v1/` with the envelope response format and
//! CORS support. Preparation runs are accepted and executed in the
//! background; searches answer synchronously.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
