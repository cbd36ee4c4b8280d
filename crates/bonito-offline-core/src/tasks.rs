//! Detached background work.
//!
//! Cache writes after a network response are not awaited by the request that
//! triggered them. They run as detached Tokio tasks; a failure is logged and
//! kept as a `TaskReport` instead of being lost.

use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Outcome of one detached task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    pub task: String,
    pub error: Option<String>,
}

impl TaskReport {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Set of detached tasks owned by one worker.
///
/// Dropping the set aborts whatever is still running; call `settle` first
/// when pending writes must land.
#[derive(Default)]
pub struct BackgroundTasks {
    running: Mutex<JoinSet<TaskReport>>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `work` without waiting for it. Must be called within a Tokio runtime.
    pub fn spawn<F>(&self, task: impl Into<String>, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let task = task.into();
        self.lock().spawn(async move {
            match work.await {
                Ok(()) => {
                    debug!(task = %task, "Background task finished");
                    TaskReport { task, error: None }
                }
                Err(e) => {
                    warn!(task = %task, error = %format!("{:#}", e), "Background task failed");
                    TaskReport {
                        task,
                        error: Some(format!("{:#}", e)),
                    }
                }
            }
        });
    }

    /// Number of tasks spawned and not yet collected by `settle`.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every outstanding task, including tasks spawned while
    /// waiting, and return their reports in completion order.
    pub async fn settle(&self) -> Vec<TaskReport> {
        let mut reports = Vec::new();
        loop {
            let mut running = std::mem::take(&mut *self.lock());
            if running.is_empty() {
                break;
            }
            while let Some(joined) = running.join_next().await {
                match joined {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        warn!(error = %e, "Background task panicked or was cancelled");
                        reports.push(TaskReport {
                            task: "unknown".to_string(),
                            error: Some(e.to_string()),
                        });
                    }
                }
            }
        }
        reports
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<TaskReport>> {
        // A poisoned lock only means a spawn panicked; the set itself is intact
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
