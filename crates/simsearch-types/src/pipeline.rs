//! Per-year pipeline bookkeeping.

use serde::{Deserialize, Serialize};

use std::fmt;

/// Where a year's processing currently stands.
///
/// Exported -> Normalized -> Indexed | IndexSkipped -> Done, or any
/// stage -> Failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearStage {
    Exported,
    Normalized,
    Indexed,
    IndexSkipped,
    Done,
    Failed,
}

impl fmt::Display for YearStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            YearStage::Exported => write!(f, "exported"),
            YearStage::Normalized => write!(f, "normalized"),
            YearStage::Indexed => write!(f, "indexed"),
            YearStage::IndexSkipped => write!(f, "index_skipped"),
            YearStage::Done => write!(f, "done"),
            YearStage::Failed => write!(f, "failed"),
        }
    }
}

/// What the index step did for a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexOutcome {
    /// Row count at or below the gate; nothing submitted.
    Skipped,
    /// Index job submitted, completion not awaited.
    Submitted,
    /// Index job submitted and confirmed complete.
    Built,
}

/// Flags for a single table export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExportOptions {
    /// Block until the export task completes.
    pub wait: bool,
    /// Compute and return the table name without submitting anything.
    pub dry_run: bool,
}
