#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bonito_offline_core::{
    CacheConfig, FetchError, Fetcher, MemoryCacheStore, Request, Response, ServiceWorker, Url,
};

pub const ORIGIN: &str = "http://bonito.test";

/// Scripted network: fixed routes, unknown URLs answer 404, and the whole
/// network or single URLs can be taken down.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Response>>,
    down: Mutex<HashSet<String>>,
    offline: AtomicBool,
    calls: AtomicUsize,
}

impl FakeNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, path: &str, response: Response) {
        self.routes.lock().unwrap().insert(url(path).to_string(), response);
    }

    pub fn take_down(&self, path: &str) {
        self.down.lock().unwrap().insert(url(path).to_string());
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Serve every core file of the default manifest.
    pub fn route_core_files(&self) {
        for path in bonito_offline_core::config::CORE_FILES {
            self.route(path, Response::new(200, format!("core:{}", path)));
        }
    }
}

#[async_trait]
impl Fetcher for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let key = request.url.to_string();

        if self.offline.load(Ordering::SeqCst) || self.down.lock().unwrap().contains(&key) {
            return Err(FetchError::Offline(key));
        }

        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "not found")))
    }
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

pub fn get(path: &str) -> Request {
    Request::get(url(path))
}

pub fn config(version: &str) -> CacheConfig {
    CacheConfig {
        origin: ORIGIN.to_string(),
        version: version.to_string(),
        ..CacheConfig::default()
    }
}

pub fn worker(
    version: &str,
    store: &Arc<MemoryCacheStore>,
    network: &Arc<FakeNetwork>,
) -> ServiceWorker {
    ServiceWorker::new(config(version), store.clone(), network.clone()).unwrap()
}
