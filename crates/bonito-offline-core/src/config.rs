//! Cache configuration.
//!
//! Holds everything that identifies one cache version: product name, version
//! string, the origin the app shell is served from and the core-file
//! manifest precached on install.
//!
//! Configuration is stored at `~/.config/bonito-offline/config.json`; a
//! missing file yields the production defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::cache::PartitionNames;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "bonito-offline";

/// Config file name
const CONFIG_FILE: &str = "config.json";

pub const DEFAULT_PRODUCT: &str = "ecoexpedicoes";
pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_ORIGIN: &str = "http://localhost:3000";

/// Files precached on install, in order. Install fails unless all succeed.
pub const CORE_FILES: &[&str] = &[
    "/",
    "/index.html",
    "/manifest.json",
    "/static/css/main.css",
    "/static/js/main.js",
    "/icon-192x192.png",
    "/icon-512x512.png",
];

pub const API_PREFIX: &str = "/api/";

/// Sync tag registered by the app when attraction data should be refreshed
pub const BACKGROUND_SYNC_TAG: &str = "background-sync-attractions";

/// Endpoint re-fetched by the background sync
pub const SYNC_ENDPOINT: &str = "/api/attractions";

/// Network attempts fail over to the cache after this long.
/// Short enough that a dead connection in the field does not stall the page.
const DEFAULT_NETWORK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub product: String,
    pub version: String,
    pub origin: String,
    pub core_files: Vec<String>,
    pub api_prefix: String,
    pub sync_tag: String,
    pub sync_endpoint: String,
    pub network_timeout_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            product: DEFAULT_PRODUCT.to_string(),
            version: DEFAULT_VERSION.to_string(),
            origin: DEFAULT_ORIGIN.to_string(),
            core_files: CORE_FILES.iter().map(|path| path.to_string()).collect(),
            api_prefix: API_PREFIX.to_string(),
            sync_tag: BACKGROUND_SYNC_TAG.to_string(),
            sync_endpoint: SYNC_ENDPOINT.to_string(),
            network_timeout_secs: DEFAULT_NETWORK_TIMEOUT_SECS,
        }
    }
}

impl CacheConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding this product's partition files.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(&self.product))
    }

    pub fn partitions(&self) -> PartitionNames {
        PartitionNames::new(&self.product, &self.version)
    }

    pub fn network_timeout(&self) -> Duration {
        Duration::from_secs(self.network_timeout_secs)
    }

    pub fn origin_url(&self) -> Result<Url> {
        Url::parse(&self.origin).with_context(|| format!("Invalid origin: {}", self.origin))
    }

    /// Resolve a root-relative path against the origin.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        self.origin_url()?
            .join(path)
            .with_context(|| format!("Invalid path: {}", path))
    }
}
