//! The offline cache worker.
//!
//! A `ServiceWorker` is one version of the cache layer. It reacts to the
//! platform's events through a single entry point, [`ServiceWorker::handle`]:
//!
//! - `Install`: precache the core files into the static partition, all or nothing
//! - `Activate`: delete every partition not named for this version
//! - `Fetch`: classify the request and serve it through its strategy
//! - `Sync`: refresh the attractions endpoint in the API partition
//! - `Push` / `NotificationClick`: notification glue
//!
//! Decisions (`plan`, `classify`, `ClickResponse::for_action`) are pure; the
//! side effects live in the store and the fetcher handed to `new`.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use futures::future::try_join_all;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheStore, PartitionNames};
use crate::classify::{classify, RequestClass};
use crate::config::CacheConfig;
use crate::fallback;
use crate::network::{FetchError, Fetcher, Request, Response, Url};
use crate::notification::{ClickResponse, Notification};
use crate::strategy::{Served, Strategy, StrategyRunner};
use crate::tasks::{BackgroundTasks, TaskReport};

/// Lifecycle of one worker version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// Events delivered by the platform.
#[derive(Debug, Clone)]
pub enum Event {
    Install,
    Activate,
    Fetch(Request),
    Sync { tag: String },
    /// Raw push payload, if the push carried data.
    Push(Option<Vec<u8>>),
    NotificationClick { action: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Refreshed,
    /// Response fetched but not cached (error status or non-JSON body).
    Skipped(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Installed { precached: usize },
    Activated { deleted: Vec<String> },
    Response(Served),
    Synced(SyncOutcome),
    Notify(Notification),
    Click(ClickResponse),
    Ignored,
}

/// How a request will be handled, decided before any I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// Non-read requests go straight to the network.
    Passthrough,
    Intercept {
        class: RequestClass,
        strategy: Strategy,
        partition: String,
    },
}

pub struct ServiceWorker {
    config: CacheConfig,
    partitions: PartitionNames,
    root: Url,
    runner: StrategyRunner,
    state: Mutex<WorkerState>,
}

impl ServiceWorker {
    pub fn new(config: CacheConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        let root = config.resolve("/")?;
        let partitions = config.partitions();
        let runner = StrategyRunner::new(store, fetcher, Arc::new(BackgroundTasks::new()));

        Ok(Self {
            config,
            partitions,
            root,
            runner,
            state: Mutex::new(WorkerState::Parsed),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn partitions(&self) -> &PartitionNames {
        &self.partitions
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        self.runner.store()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, next: WorkerState) {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = *state;
        if previous != next {
            debug!(version = %self.config.version, from = ?previous, to = ?next, "Worker state change");
            *state = next;
        }
    }

    /// Wait for all detached cache writes started by this worker.
    pub async fn settle(&self) -> Vec<TaskReport> {
        self.runner.tasks().settle().await
    }

    /// Dispatch one platform event.
    pub async fn handle(&self, event: Event) -> Result<Outcome> {
        match event {
            Event::Install => {
                let precached = self.install().await?;
                Ok(Outcome::Installed { precached })
            }
            Event::Activate => {
                let deleted = self.activate().await?;
                Ok(Outcome::Activated { deleted })
            }
            Event::Fetch(request) => Ok(Outcome::Response(self.fetch(&request).await?)),
            Event::Sync { tag } => Ok(self.sync(&tag).await),
            Event::Push(payload) => Ok(self.push(payload.as_deref())),
            Event::NotificationClick { action } => {
                Ok(Outcome::Click(ClickResponse::for_action(action.as_deref())))
            }
        }
    }

    // ===== Install =====

    /// Precache the core files. On failure nothing is committed and the
    /// worker becomes redundant; the failure is not retried.
    pub async fn install(&self) -> Result<usize> {
        if self.state() != WorkerState::Parsed {
            bail!("Worker {} cannot install from state {:?}", self.config.version, self.state());
        }

        info!(version = %self.config.version, "Install");
        self.set_state(WorkerState::Installing);

        match self.precache().await {
            Ok(count) => {
                self.set_state(WorkerState::Installed);
                info!(version = %self.config.version, files = count, "Cached core files");
                Ok(count)
            }
            Err(e) => {
                error!(version = %self.config.version, error = %format!("{:#}", e), "Install failed");
                self.set_state(WorkerState::Redundant);
                Err(e)
            }
        }
    }

    async fn precache(&self) -> Result<usize> {
        let requests = self
            .config
            .core_files
            .iter()
            .map(|path| self.config.resolve(path).map(Request::get))
            .collect::<Result<Vec<_>>>()?;

        let responses = try_join_all(requests.iter().map(|request| self.fetch_required(request)))
            .await
            .context("Failed to fetch core files")?;

        let entries: Vec<_> = requests.iter().map(Request::id).zip(responses).collect();
        let count = entries.len();

        self.store()
            .put_all(&self.partitions.static_assets, entries)
            .await
            .context("Failed to store core files")?;

        Ok(count)
    }

    /// Fetch that treats an error status as a failure, like `Cache.addAll`.
    async fn fetch_required(&self, request: &Request) -> Result<Response, FetchError> {
        let response = self.runner.fetcher().fetch(request).await?;
        if !response.is_ok() {
            return Err(FetchError::from_status(request.url.as_str(), response.status, &response.body));
        }
        Ok(response)
    }

    // ===== Activate =====

    /// Delete every partition that is not part of this version, then take
    /// control of all clients. Returns the deleted partition names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        match self.state() {
            WorkerState::Redundant => bail!("Redundant worker {} cannot activate", self.config.version),
            WorkerState::Installing | WorkerState::Activating => {
                bail!("Worker {} is busy ({:?})", self.config.version, self.state())
            }
            _ => {}
        }

        info!(version = %self.config.version, "Activate");
        self.set_state(WorkerState::Activating);

        let result = self
            .store()
            .delete_not_in(&self.partitions.valid_set())
            .await
            .context("Failed to delete old caches");

        // Activation completes even when cleanup fails; stale partitions are
        // retried on the next activation.
        self.set_state(WorkerState::Activated);
        info!(version = %self.config.version, "Claiming clients");

        result
    }

    /// Mark a superseded worker as no longer in use.
    pub fn retire(&self) {
        self.set_state(WorkerState::Redundant);
    }

    // ===== Fetch =====

    /// Decide how a request will be served.
    pub fn plan(&self, request: &Request) -> FetchPlan {
        if !request.is_read() {
            return FetchPlan::Passthrough;
        }
        let class = classify(request, &self.config.api_prefix);
        FetchPlan::Intercept {
            class,
            strategy: class.strategy(),
            partition: self.partitions.for_class(class).to_string(),
        }
    }

    /// Serve a request. Only static assets with neither a network response
    /// nor a cached copy return an error; every other class always yields a
    /// response.
    pub async fn fetch(&self, request: &Request) -> Result<Served, FetchError> {
        let (class, strategy) = match self.plan(request) {
            FetchPlan::Passthrough => {
                debug!(method = %request.method, url = %request.url, "Not intercepted");
                return self.runner.fetcher().fetch(request).await.map(Served::network);
            }
            FetchPlan::Intercept { class, strategy, .. } => (class, strategy),
        };

        debug!(url = %request.url, class = class.as_str(), ?strategy, "Intercepted");

        // The planned partition leads; a hit in another partition of this
        // version still counts (core icons are precached as static files)
        let partitions = self.partitions.lookup_order(class);

        match (self.runner.run(strategy, &partitions, request).await, class) {
            (Ok(served), _) => Ok(served),
            (Err(_), RequestClass::Api) => Ok(Served::fallback(fallback::offline_api())),
            (Err(_), RequestClass::Image) => Ok(Served::fallback(fallback::image_placeholder())),
            (Err(err), RequestClass::StaticAsset) => Err(err),
            (Err(_), RequestClass::Navigation) => Ok(self.app_shell().await),
        }
    }

    /// Offline navigation fallback: the cached root document, whatever path
    /// was requested.
    async fn app_shell(&self) -> Served {
        let root = Request::get(self.root.clone()).id();
        match self.runner.cached(&self.partitions.static_assets, &root).await {
            Some(response) => Served::cache(response),
            None => {
                warn!("App shell not cached, serving offline page");
                Served::fallback(fallback::offline_page())
            }
        }
    }

    // ===== Background sync =====

    async fn sync(&self, tag: &str) -> Outcome {
        if tag != self.config.sync_tag {
            debug!(tag, "Ignoring unknown sync tag");
            return Outcome::Ignored;
        }

        info!(tag, "Background sync: attractions");
        let outcome = match self.refresh_sync_endpoint().await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("{:#}", e);
                error!(error = %message, "Background sync failed");
                SyncOutcome::Failed(message)
            }
        };
        Outcome::Synced(outcome)
    }

    async fn refresh_sync_endpoint(&self) -> Result<SyncOutcome> {
        let request = Request::get(self.config.resolve(&self.config.sync_endpoint)?);
        let response = self.runner.fetcher().fetch(&request).await?;

        if !response.is_ok() {
            let reason = format!("status {}", response.status);
            warn!(url = %request.url, %reason, "Not caching sync response");
            return Ok(SyncOutcome::Skipped(reason));
        }
        if let Err(e) = serde_json::from_slice::<serde_json::Value>(&response.body) {
            let reason = format!("invalid JSON: {}", e);
            warn!(url = %request.url, %reason, "Not caching sync response");
            return Ok(SyncOutcome::Skipped(reason));
        }

        self.store()
            .put(&self.partitions.api, request.id(), response)
            .await
            .context("Failed to store synced attractions")?;

        info!("Attractions synced in background");
        Ok(SyncOutcome::Refreshed)
    }

    // ===== Push =====

    fn push(&self, payload: Option<&[u8]>) -> Outcome {
        let Some(payload) = payload.filter(|data| !data.is_empty()) else {
            return Outcome::Ignored;
        };

        match Notification::from_push(payload) {
            Ok(notification) => Outcome::Notify(notification),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed push payload");
                Outcome::Ignored
            }
        }
    }
}
