//! Backing stores for the registry.
//!
//! The four collaborator seams ([`RecordStore`], [`CacheStore`],
//! [`SearchIndex`], [`EventPublisher`](traits::EventPublisher)) live in
//! [`traits`]; [`memory`] provides in-process implementations, [`redis`] and
//! [`sql`] the networked ones.

pub mod envelope;
pub mod memory;
pub mod redis;
pub mod retry;
pub mod sql;
pub mod traits;

pub use memory::{MemoryCache, MemoryIndex, MemoryRecordStore};
pub use redis::RedisCache;
pub use sql::SqlRecordStore;
pub use traits::{CacheStore, EventPublisher, RecordStore, SearchIndex, StoreError};
