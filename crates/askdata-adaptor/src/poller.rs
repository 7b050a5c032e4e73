use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

use crate::error::AdaptorError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(60);

/// Lifecycle of a remote task, independent of the task kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Succeeded | TaskPhase::Failed)
    }
}

/// Anything a poll can return: it must say which phase the task is in
pub trait TaskState {
    fn phase(&self) -> TaskPhase;
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("Task id is missing")]
    MissingTaskId,

    /// Deadline passed before the task reached a terminal phase
    #[error("Timed out after {elapsed:?} waiting for task")]
    Timeout { elapsed: Duration },

    #[error("Failed to fetch task status: {0}")]
    Fetch(#[from] AdaptorError),
}

/// Fixed-interval poller with a hard deadline
#[derive(Debug, Clone, Copy)]
pub struct TaskPoller {
    interval: Duration,
    max_wait: Duration,
}

impl TaskPoller {
    pub fn new(interval: Duration, max_wait: Duration) -> Self {
        Self { interval, max_wait }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Poll `fetch` until the task is terminal or the deadline passes.
    ///
    /// A terminal result is returned as-is whether it succeeded or failed;
    /// the caller inspects the task's own error. Fetch errors end polling
    /// immediately. Total time spent is bounded by `max_wait` plus one
    /// interval (plus the duration of the last fetch).
    pub async fn poll<T, F, Fut>(&self, query_id: &str, mut fetch: F) -> Result<T, PollError>
    where
        T: TaskState,
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, AdaptorError>>,
    {
        if query_id.trim().is_empty() {
            return Err(PollError::MissingTaskId);
        }

        let start = Instant::now();
        let deadline = start + self.max_wait;
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            let result = fetch(query_id.to_string()).await?;
            let phase = result.phase();

            if phase.is_terminal() {
                tracing::debug!(
                    query_id = %query_id,
                    attempts = attempts,
                    phase = ?phase,
                    "Task reached terminal phase"
                );
                return Ok(result);
            }

            if Instant::now() >= deadline {
                let elapsed = start.elapsed();
                tracing::warn!(
                    query_id = %query_id,
                    attempts = attempts,
                    elapsed_ms = %elapsed.as_millis(),
                    "Task polling timed out"
                );
                return Err(PollError::Timeout { elapsed });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

impl Default for TaskPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_WAIT)
    }
}
