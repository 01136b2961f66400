//! Remote task polling.
//!
//! `TaskPoller` waits for a submitted remote job to reach a terminal state by
//! re-checking its status on a fixed interval. Remote jobs run for minutes,
//! so coarse sleep-and-recheck is enough. Waits are bounded by an optional
//! deadline and can be aborted through a `CancellationToken`.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use simsearch_types::config::PollingConfig;
use simsearch_types::error::PipelineError;
use simsearch_types::task::TaskState;

use crate::port::task::RemoteTask;

/// Blocking-wait primitive over a remote task's lifecycle.
#[derive(Debug, Clone)]
pub struct TaskPoller {
    interval: Duration,
    timeout: Option<Duration>,
}

impl TaskPoller {
    pub fn new(interval: Duration, timeout: Option<Duration>) -> Self {
        Self { interval, timeout }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(config.interval(), config.timeout())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until `task` completes.
    ///
    /// # Errors
    ///
    /// - `Precondition` if the task was never submitted (checked before any
    ///   sleep).
    /// - `TaskFailed` if it ends FAILED, CANCELLED or CANCEL_REQUESTED.
    /// - `Timeout` if it is still pending when the deadline passes.
    /// - `Cancelled` if `cancel` fires while waiting.
    /// - Any error from fetching the task state.
    pub async fn wait<T: RemoteTask>(
        &self,
        task: &T,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let id = task.id().to_string();
        let mut state = task.state().await?;

        if state == TaskState::Unsubmitted {
            return Err(PipelineError::Precondition(format!(
                "start task {id} before polling it (state {state})"
            )));
        }

        let started = Instant::now();
        tracing::info!(task_id = %id, %state, "polling remote task");

        loop {
            match state {
                TaskState::Completed => {
                    tracing::info!(
                        task_id = %id,
                        elapsed_secs = started.elapsed().as_secs(),
                        "remote task completed"
                    );
                    return Ok(());
                }
                TaskState::Failed | TaskState::Cancelled | TaskState::CancelRequested => {
                    tracing::warn!(task_id = %id, %state, "remote task did not complete");
                    return Err(PipelineError::TaskFailed { id, state });
                }
                TaskState::Unsubmitted => {
                    return Err(PipelineError::Precondition(format!(
                        "task {id} went back to {state} after submission"
                    )));
                }
                TaskState::Ready | TaskState::Running => {
                    let nap = match self.timeout {
                        Some(timeout) => {
                            let elapsed = started.elapsed();
                            if elapsed >= timeout {
                                return Err(PipelineError::Timeout {
                                    id,
                                    waited_secs: elapsed.as_secs(),
                                });
                            }
                            self.interval.min(timeout - elapsed)
                        }
                        None => self.interval,
                    };

                    tracing::debug!(task_id = %id, %state, sleep_secs = nap.as_secs_f64(), "remote task pending");
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::warn!(task_id = %id, "stopped waiting on remote task");
                            return Err(PipelineError::Cancelled { id });
                        }
                        _ = tokio::time::sleep(nap) => {}
                    }
                }
            }

            let next = task.state().await?;
            if next != state {
                tracing::info!(task_id = %id, from = %state, to = %next, "remote task state changed");
            }
            state = next;
        }
    }
}
