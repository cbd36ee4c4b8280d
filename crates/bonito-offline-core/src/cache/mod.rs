//! Versioned cache partitions.
//!
//! A partition maps a request identity (method + URL) to the last response
//! stored for it. Three partitions are live per cache version (static assets,
//! API responses, images); their names embed the version so an upgrade
//! starts from empty partitions and the old ones can be pruned on activation.
//!
//! Storage backends:
//! - `MemoryCacheStore` for tests and embedding
//! - `DiskCacheStore`, one JSON file per partition

pub mod disk;
pub mod entry;
pub mod memory;
pub mod partition;
pub mod store;

pub use disk::DiskCacheStore;
pub use entry::{CachedData, CachedEntry, RequestId};
pub use memory::MemoryCacheStore;
pub use partition::PartitionNames;
pub use store::CacheStore;
