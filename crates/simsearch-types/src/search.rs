//! Similarity search results.

use serde::{Deserialize, Serialize};

/// Upper bound on matches a single search may request.
pub const MAX_MATCHES: u32 = 50;

/// One neighbour of the target plot, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub target_plotid: i64,
    pub base_plotid: i64,
    pub distance: f64,
}
