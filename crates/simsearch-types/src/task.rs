//! Remote task lifecycle.
//!
//! Every asynchronous remote job the pipeline waits on (Earth Engine table
//! exports, BigQuery DDL jobs) reports one of these states. States only move
//! forward; the last four variants are terminal.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// State of a remote task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Unsubmitted,
    Ready,
    Running,
    Completed,
    Failed,
    Cancelled,
    CancelRequested,
}

impl TaskState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::Failed
                | TaskState::Cancelled
                | TaskState::CancelRequested
        )
    }

    /// Whether the task is queued or executing.
    pub fn is_pending(self) -> bool {
        matches!(self, TaskState::Ready | TaskState::Running)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskState::Unsubmitted => "UNSUBMITTED",
            TaskState::Ready => "READY",
            TaskState::Running => "RUNNING",
            TaskState::Completed => "COMPLETED",
            TaskState::Failed => "FAILED",
            TaskState::Cancelled => "CANCELLED",
            TaskState::CancelRequested => "CANCEL_REQUESTED",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "UNSUBMITTED" => Ok(TaskState::Unsubmitted),
            "READY" => Ok(TaskState::Ready),
            "RUNNING" => Ok(TaskState::Running),
            "COMPLETED" => Ok(TaskState::Completed),
            "FAILED" => Ok(TaskState::Failed),
            "CANCELLED" => Ok(TaskState::Cancelled),
            "CANCEL_REQUESTED" => Ok(TaskState::CancelRequested),
            other => Err(format!("invalid task state: '{other}'")),
        }
    }
}

/// Point-in-time view of a remote task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub id: String,
    pub state: TaskState,
}
