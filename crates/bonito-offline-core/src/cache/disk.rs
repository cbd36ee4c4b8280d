use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::{CacheStore, CachedData, CachedEntry, RequestId};
use crate::network::Response;

/// Extension of partition files in the cache directory
const PARTITION_EXT: &str = "json";

/// Partition storage backed by one JSON file per partition.
///
/// Files are replaced by writing a sibling temp file and renaming it, so a
/// reader always sees either the previous or the next complete partition.
pub struct DiskCacheStore {
    cache_dir: PathBuf,
    // Serializes read-modify-write cycles on partition files
    write_lock: Mutex<()>,
}

impl DiskCacheStore {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory: {}", cache_dir.display()))?;
        Ok(Self {
            cache_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn partition_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            bail!("Invalid partition name: {:?}", name);
        }
        Ok(self.cache_dir.join(format!("{}.{}", name, PARTITION_EXT)))
    }

    /// Read a partition file on the blocking pool.
    async fn load(&self, name: &str) -> Result<Option<Vec<CachedData<CachedEntry>>>> {
        let path = self.partition_path(name)?;
        let name = name.to_string();
        tokio::task::spawn_blocking(move || read_partition(&path, &name))
            .await
            .context("Cache read task panicked")?
    }

    /// Replace a partition file on the blocking pool.
    async fn save(&self, name: &str, entries: Vec<CachedData<CachedEntry>>) -> Result<()> {
        let path = self.partition_path(name)?;
        let name = name.to_string();
        tokio::task::spawn_blocking(move || write_partition(&path, &name, &entries))
            .await
            .context("Cache write task panicked")?
    }

    fn upsert(entries: &mut Vec<CachedData<CachedEntry>>, request: RequestId, response: Response) {
        let fresh = CachedData::new(CachedEntry { request, response });
        match entries
            .iter_mut()
            .find(|existing| existing.data.request == fresh.data.request)
        {
            Some(existing) => *existing = fresh,
            None => entries.push(fresh),
        }
    }
}

fn read_partition(path: &Path, name: &str) -> Result<Option<Vec<CachedData<CachedEntry>>>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read cache partition: {}", name))?;

    let entries: Vec<CachedData<CachedEntry>> = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse cache partition: {}", name))?;

    Ok(Some(entries))
}

fn write_partition(path: &Path, name: &str, entries: &[CachedData<CachedEntry>]) -> Result<()> {
    let tmp_path = path.with_extension(format!("{}.tmp", PARTITION_EXT));
    let contents = serde_json::to_string_pretty(entries)?;

    std::fs::write(&tmp_path, contents).with_context(|| format!("Failed to write cache partition: {}", name))?;
    std::fs::rename(&tmp_path, path).with_context(|| format!("Failed to commit cache partition: {}", name))?;

    debug!(partition = name, entries = entries.len(), "Saved cache partition");
    Ok(())
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn get(&self, partition: &str, request: &RequestId) -> Result<Option<Response>> {
        Ok(self.load(partition).await?.and_then(|entries| {
            entries
                .into_iter()
                .find(|cached| &cached.data.request == request)
                .map(|cached| cached.data.response)
        }))
    }

    async fn put(&self, partition: &str, request: RequestId, response: Response) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(partition).await?.unwrap_or_default();
        Self::upsert(&mut entries, request, response);
        self.save(partition, entries).await
    }

    async fn put_all(&self, partition: &str, batch: Vec<(RequestId, Response)>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load(partition).await?.unwrap_or_default();
        for (request, response) in batch {
            Self::upsert(&mut entries, request, response);
        }
        // One rename commits the whole batch
        self.save(partition, entries).await
    }

    async fn partitions(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let dir = std::fs::read_dir(&self.cache_dir).with_context(|| {
            format!("Failed to list cache directory: {}", self.cache_dir.display())
        })?;

        for dir_entry in dir {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PARTITION_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn entries(&self, partition: &str) -> Result<Vec<CachedData<CachedEntry>>> {
        Ok(self.load(partition).await?.unwrap_or_default())
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let path = self.partition_path(partition)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)
            .with_context(|| format!("Failed to delete cache partition: {}", partition))?;
        Ok(true)
    }
}
