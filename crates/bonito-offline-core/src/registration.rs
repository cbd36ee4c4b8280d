//! Version upgrades.
//!
//! A `Registration` holds the worker currently serving fetches. Updating it
//! installs the new version first; only a successful install replaces the
//! active worker (skip-waiting), and the new worker finishes activation,
//! including partition cleanup, before it serves any request.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::network::{FetchError, Request};
use crate::strategy::Served;
use crate::worker::{Event, Outcome, ServiceWorker};

#[derive(Default)]
pub struct Registration {
    active: Option<Arc<ServiceWorker>>,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Arc<ServiceWorker>> {
        self.active.as_ref()
    }

    /// Install `worker` and make it the active one.
    ///
    /// If the install fails the previous worker, if any, stays active and the
    /// error is returned. Returns the partitions deleted by activation.
    pub async fn update(&mut self, worker: ServiceWorker) -> Result<Vec<String>> {
        let worker = Arc::new(worker);
        if let Err(e) = worker.install().await {
            if let Some(active) = &self.active {
                warn!(
                    active = active.version(),
                    rejected = worker.version(),
                    "Update aborted, keeping active worker"
                );
            }
            return Err(e.context(format!("Failed to install version {}", worker.version())));
        }

        if let Some(previous) = self.active.take() {
            // Pending writes of the old worker must land before its
            // partitions are deleted, or they would be recreated
            for report in previous.settle().await.iter().filter(|r| !r.succeeded()) {
                warn!(task = %report.task, "Write from previous worker failed");
            }
            previous.retire();
            info!(version = previous.version(), "Previous worker is redundant");
        }

        let deleted = match worker.activate().await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Activate failed");
                Vec::new()
            }
        };

        self.active = Some(worker);
        Ok(deleted)
    }

    /// Route an event to the active worker.
    pub async fn handle(&self, event: Event) -> Result<Outcome> {
        match &self.active {
            Some(worker) => worker.handle(event).await,
            None => bail!("No active worker"),
        }
    }

    /// Serve a request through the active worker; without one, the request
    /// cannot be served from any cache.
    pub async fn fetch(&self, request: &Request) -> Result<Served, FetchError> {
        match &self.active {
            Some(worker) => worker.fetch(request).await,
            None => Err(FetchError::Offline(format!("no active worker for {}", request.url))),
        }
    }
}
