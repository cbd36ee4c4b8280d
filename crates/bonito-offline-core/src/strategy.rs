//! Network-first and cache-first strategies.
//!
//! Both strategies take the partitions to search, the request's own
//! partition first. Reads go through all of them in order; copies are only
//! ever written to the first. A strategy returns `Err` only when neither the
//! network nor any partition produced a response; the caller then applies the
//! fallback of the request's class.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::cache::{CacheStore, RequestId};
use crate::network::{FetchError, Fetcher, Request, Response};
use crate::tasks::BackgroundTasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NetworkFirst,
    CacheFirst,
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    Cache,
    Fallback,
}

impl ResponseSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ResponseSource::Network => "network",
            ResponseSource::Cache => "cache",
            ResponseSource::Fallback => "fallback",
        }
    }
}

/// A response handed back to the application shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub response: Response,
    pub source: ResponseSource,
}

impl Served {
    pub fn network(response: Response) -> Self {
        Self {
            response,
            source: ResponseSource::Network,
        }
    }

    pub fn cache(response: Response) -> Self {
        Self {
            response,
            source: ResponseSource::Cache,
        }
    }

    pub fn fallback(response: Response) -> Self {
        Self {
            response,
            source: ResponseSource::Fallback,
        }
    }
}

/// Runs strategies against a shared store and network.
#[derive(Clone)]
pub struct StrategyRunner {
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    tasks: Arc<BackgroundTasks>,
}

impl StrategyRunner {
    pub fn new(store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, tasks: Arc<BackgroundTasks>) -> Self {
        Self {
            store,
            fetcher,
            tasks,
        }
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn tasks(&self) -> &Arc<BackgroundTasks> {
        &self.tasks
    }

    pub async fn run(&self, strategy: Strategy, partitions: &[&str], request: &Request) -> Result<Served, FetchError> {
        match strategy {
            Strategy::NetworkFirst => self.network_first(partitions, request).await,
            Strategy::CacheFirst => self.cache_first(partitions, request).await,
        }
    }

    /// Try the network; on a transport failure serve the cached copy.
    pub async fn network_first(&self, partitions: &[&str], request: &Request) -> Result<Served, FetchError> {
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_copy(partitions, request.id(), &response);
                }
                Ok(Served::network(response))
            }
            Err(err) => {
                debug!(url = %request.url, error = %err, "Network failed, trying cache");
                match self.lookup(partitions, &request.id()).await {
                    Some(response) => Ok(Served::cache(response)),
                    None => Err(err),
                }
            }
        }
    }

    /// Serve the cached copy; only a miss touches the network.
    pub async fn cache_first(&self, partitions: &[&str], request: &Request) -> Result<Served, FetchError> {
        let id = request.id();
        if let Some(response) = self.lookup(partitions, &id).await {
            return Ok(Served::cache(response));
        }

        let response = self.fetcher.fetch(request).await.map_err(|err| {
            warn!(url = %request.url, error = %err, "Cache and network failed");
            err
        })?;

        if response.is_ok() {
            self.store_copy(partitions, id, &response);
        }
        Ok(Served::network(response))
    }

    /// First hit across `partitions`, in order.
    pub async fn lookup(&self, partitions: &[&str], id: &RequestId) -> Option<Response> {
        for partition in partitions {
            if let Some(response) = self.cached(partition, id).await {
                return Some(response);
            }
        }
        None
    }

    /// Read a partition entry. Store failures count as misses.
    pub async fn cached(&self, partition: &str, id: &RequestId) -> Option<Response> {
        match self.store.get(partition, id).await {
            Ok(Some(response)) => {
                debug!(partition, request = %id, "Cache hit");
                Some(response)
            }
            Ok(None) => {
                debug!(partition, request = %id, "Cache miss");
                None
            }
            Err(e) => {
                warn!(partition, request = %id, error = %format!("{:#}", e), "Cache read failed");
                None
            }
        }
    }

    /// Store a copy of `response` in the first partition without making the
    /// caller wait for it.
    fn store_copy(&self, partitions: &[&str], id: RequestId, response: &Response) {
        let Some(partition) = partitions.first() else {
            return;
        };
        let store = Arc::clone(&self.store);
        let partition = partition.to_string();
        let response = response.clone();
        self.tasks.spawn(format!("cache-put {} {}", partition, id), async move {
            store.put(&partition, id, response).await
        });
    }
}
