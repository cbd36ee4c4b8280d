use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStore, CachedData, CachedEntry, RequestId};
use crate::network::Response;

type Partition = HashMap<RequestId, CachedData<Response>>;

/// Process-local partition storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    partitions: RwLock<BTreeMap<String, Partition>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, partition: &str, request: &RequestId) -> Result<Option<Response>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(partition)
            .and_then(|entries| entries.get(request))
            .map(|cached| cached.data.clone()))
    }

    async fn put(&self, partition: &str, request: RequestId, response: Response) -> Result<()> {
        let mut partitions = self.partitions.write().await;
        partitions
            .entry(partition.to_string())
            .or_default()
            .insert(request, CachedData::new(response));
        Ok(())
    }

    async fn put_all(&self, partition: &str, entries: Vec<(RequestId, Response)>) -> Result<()> {
        // Single write guard, so readers never observe half of the batch
        let mut partitions = self.partitions.write().await;
        let target = partitions.entry(partition.to_string()).or_default();
        for (request, response) in entries {
            target.insert(request, CachedData::new(response));
        }
        Ok(())
    }

    async fn partitions(&self) -> Result<Vec<String>> {
        Ok(self.partitions.read().await.keys().cloned().collect())
    }

    async fn entries(&self, partition: &str) -> Result<Vec<CachedData<CachedEntry>>> {
        let partitions = self.partitions.read().await;
        let mut entries: Vec<CachedData<CachedEntry>> = partitions
            .get(partition)
            .map(|stored| {
                stored
                    .iter()
                    .map(|(request, cached)| CachedData {
                        data: CachedEntry {
                            request: request.clone(),
                            response: cached.data.clone(),
                        },
                        cached_at: cached.cached_at,
                    })
                    .collect()
            })
            .unwrap_or_default();
        entries.sort_by(|a, b| a.data.request.cmp(&b.data.request));
        Ok(entries)
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool> {
        Ok(self.partitions.write().await.remove(partition).is_some())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use reqwest::Url;

    use super::*;

    fn id(path: &str) -> RequestId {
        RequestId::get(&Url::parse("http://localhost:3000").unwrap().join(path).unwrap())
    }

    #[tokio::test]
    async fn test_put_overwrites_same_identity() {
        let store = MemoryCacheStore::new();
        store.put("api", id("/api/attractions"), Response::new(200, "old")).await.unwrap();
        store.put("api", id("/api/attractions"), Response::new(200, "new")).await.unwrap();

        let entries = store.entries("api").await.unwrap();
        assert_eq!(entries.len(), 1);
        let cached = store.get("api", &id("/api/attractions")).await.unwrap().unwrap();
        assert_eq!(cached.body, b"new");
    }

    #[tokio::test]
    async fn test_partitions_are_isolated() {
        let store = MemoryCacheStore::new();
        store.put("static", id("/"), Response::new(200, "<html>")).await.unwrap();

        assert!(store.get("api", &id("/")).await.unwrap().is_none());
        assert!(store.get("static", &id("/")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_missing_partition_has_no_entries() {
        let store = MemoryCacheStore::new();
        assert!(store.entries("nope").await.unwrap().is_empty());
        assert!(store.partitions().await.unwrap().is_empty());
        assert!(!store.delete_partition("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_not_in_keeps_valid_names() {
        let store = MemoryCacheStore::new();
        for name in ["app-static-v1", "app-api-v1", "app-static-v2"] {
            store.put(name, id("/"), Response::new(200, "x")).await.unwrap();
        }

        let valid: HashSet<String> = ["app-static-v2".to_string()].into_iter().collect();
        let mut deleted = store.delete_not_in(&valid).await.unwrap();
        deleted.sort();

        assert_eq!(deleted, vec!["app-api-v1", "app-static-v1"]);
        assert_eq!(store.partitions().await.unwrap(), vec!["app-static-v2"]);
    }
}
