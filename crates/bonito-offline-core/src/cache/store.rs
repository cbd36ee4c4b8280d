use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use super::{CachedData, CachedEntry, RequestId};
use crate::network::Response;

/// Storage for named cache partitions.
///
/// Writes to distinct request identities are independent, so implementations
/// only need to make each call atomic; no cross-request locking is expected
/// from callers.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up the response stored for `request` in `partition`.
    async fn get(&self, partition: &str, request: &RequestId) -> Result<Option<Response>>;

    /// Store `response`, replacing any previous entry for the same identity.
    /// Creates the partition if it does not exist yet.
    async fn put(&self, partition: &str, request: RequestId, response: Response) -> Result<()>;

    /// Store a batch of entries all-or-nothing: either every entry becomes
    /// visible or, on error, the partition is left untouched.
    async fn put_all(&self, partition: &str, entries: Vec<(RequestId, Response)>) -> Result<()>;

    /// Names of all live partitions.
    async fn partitions(&self) -> Result<Vec<String>>;

    /// Every entry of a partition; empty when the partition does not exist.
    async fn entries(&self, partition: &str) -> Result<Vec<CachedData<CachedEntry>>>;

    /// Delete a partition. Returns whether it existed.
    async fn delete_partition(&self, partition: &str) -> Result<bool>;

    /// Delete every live partition whose name is not in `valid`.
    /// Returns the deleted names.
    async fn delete_not_in(&self, valid: &HashSet<String>) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for name in self.partitions().await? {
            if valid.contains(&name) {
                continue;
            }
            info!(partition = %name, "Deleting old cache");
            if self.delete_partition(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
