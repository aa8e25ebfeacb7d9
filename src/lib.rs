//! # Customer Registry
//!
//! A customer-record service that keeps three backing stores consistent and
//! optionally publishes change events:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      CustomerRegistry                       │
//! │  • Orders every write: record store first, then cache,      │
//! │    then search index, then event                            │
//! │  • Reads cache-aside: cache → record store → repopulate     │
//! └─────────────────────────────────────────────────────────────┘
//!        │               │                │              │
//!        ▼               ▼                ▼              ▼
//! ┌────────────┐  ┌────────────┐  ┌─────────────┐  ┌───────────┐
//! │ RecordStore│  │ CacheStore │  │ SearchIndex │  │ Publisher │
//! │ (source of │  │ (TTL'd     │  │ (find by    │  │ (best-    │
//! │  truth)    │  │  entries)  │  │  name)      │  │  effort)  │
//! └────────────┘  └────────────┘  └─────────────┘  └───────────┘
//! ```
//!
//! ## Consistency contract
//!
//! - Writes hit the record store first; that commit is the durability point.
//!   Downstream failures (cache, index, strict-mode publish) surface as
//!   [`RegistryError::OutOfSync`] without reverting the record write.
//! - Reads never fail because of the cache: lookup failures and undecodable
//!   payloads degrade to a record store read, and repopulation is
//!   best-effort.
//! - Deletes remove the cache entry first and the record row last, so a
//!   reader can never be served stale cached data after the row is gone.
//!
//! ## Quick Start
//!
//! ```
//! use customer_registry::{CustomerRegistry, NewCustomer, RegistryConfig};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let registry = CustomerRegistry::in_memory(RegistryConfig::default());
//!
//! let ada = registry
//!     .create(NewCustomer::new("Ada", "ada@x.com"))
//!     .await
//!     .expect("create failed");
//!
//! // Served from the cache, no record store read
//! let found = registry.get(ada.id).await.expect("read failed");
//! assert!(found.is_some());
//!
//! let matches = registry.search_by_name("Ada").await.expect("search failed");
//! assert_eq!(matches.len(), 1);
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: the [`CustomerRegistry`] orchestrator
//! - [`stores`]: store traits plus memory/Redis/SQL implementations
//! - [`events`]: change events and the bounded in-process event log
//! - [`locks`]: optional per-id write serialization
//! - [`config`]: [`RegistryConfig`]
//! - [`metrics`]: `metrics`-crate instrumentation helpers

pub mod config;
pub mod customer;
pub mod events;
pub mod locks;
pub mod metrics;
pub mod registry;
pub mod stores;

pub use config::{PublishFailurePolicy, RegistryConfig};
pub use customer::{Customer, CustomerId, NewCustomer};
pub use events::{ChangeEvent, EventLog, LogPublisher};
pub use locks::IdLockTable;
pub use registry::{CustomerRegistry, RegistryError};
pub use stores::{
    CacheStore, EventPublisher, MemoryCache, MemoryIndex, MemoryRecordStore, RecordStore,
    RedisCache, SearchIndex, SqlRecordStore, StoreError,
};
