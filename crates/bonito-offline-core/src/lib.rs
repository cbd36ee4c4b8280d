//! Offline cache manager for the Bonito guide.
//!
//! This crate implements the caching network layer that sits between the
//! guide's application shell and the network: every outgoing read request is
//! classified, served through a network-first or cache-first strategy, and
//! backed by versioned cache partitions that are populated on install and
//! pruned on activation.
//!
//! The main entry points are:
//! - [`ServiceWorker`]: one cache version, driven through [`ServiceWorker::handle`]
//! - [`Registration`]: owns the active worker and performs version upgrades
//! - [`CacheStore`]: partition storage, in memory or on disk
//! - [`Fetcher`]: the network, backed by `reqwest` in production

pub mod cache;
pub mod classify;
pub mod config;
pub mod fallback;
pub mod network;
pub mod notification;
pub mod registration;
pub mod strategy;
pub mod tasks;
pub mod worker;

pub use cache::{CacheStore, CachedData, CachedEntry, DiskCacheStore, MemoryCacheStore, PartitionNames, RequestId};
pub use classify::{classify, RequestClass};
pub use config::CacheConfig;
pub use network::{Destination, FetchError, Fetcher, HttpFetcher, Method, Request, Response, Url};
pub use notification::{ClickResponse, Notification, NotificationAction};
pub use registration::Registration;
pub use strategy::{ResponseSource, Served, Strategy};
pub use tasks::{BackgroundTasks, TaskReport};
pub use worker::{Event, FetchPlan, Outcome, ServiceWorker, SyncOutcome, WorkerState};
