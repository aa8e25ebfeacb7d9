//! Registry orchestrator.
//!
//! The [`CustomerRegistry`] coordinates the four backing stores on every
//! operation:
//!
//! ```text
//! write:  record store (durability point) → cache → search index → event
//! read:   cache → record store → best-effort cache repopulation
//! delete: cache → search index → event → record store (last)
//! ```
//!
//! The record store is the source of truth. A write that commits there but
//! fails downstream is reported as an error without reverting the record
//! write — there is no distributed transaction here, only a defined order
//! and a defined failure surface.
//!
//! # Example
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
//! let found = registry.get(ada.id).await.expect("read failed");
//! assert_eq!(found.as_ref().map(|c| c.name.as_str()), Some("Ada"));
//! # }
//! ```

mod types;

pub use types::RegistryError;

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::{PublishFailurePolicy, RegistryConfig};
use crate::customer::{Customer, CustomerId, NewCustomer};
use crate::events::{ChangeEvent, EventLog, LogPublisher};
use crate::locks::IdLockTable;
use crate::stores::envelope;
use crate::stores::traits::{CacheStore, EventPublisher, RecordStore, SearchIndex, StoreError};
use crate::stores::{MemoryCache, MemoryIndex, MemoryRecordStore, RedisCache, SqlRecordStore};

/// Orchestrator for the customer record service.
///
/// Holds no mutable state of its own; all shared mutable state lives in the
/// backing stores, which provide their own concurrency control. `Send + Sync`
/// and designed to be shared behind an `Arc` across request workers.
pub struct CustomerRegistry {
    config: RegistryConfig,
    records: Arc<dyn RecordStore>,
    cache: Arc<dyn CacheStore>,
    index: Arc<dyn SearchIndex>,
    publisher: Option<Arc<dyn EventPublisher>>,
    /// Present only when `serialize_writes_per_id` is set
    id_locks: Option<IdLockTable>,
    /// Present when wired with the in-process log publisher
    event_log: Option<Arc<EventLog>>,
}

impl CustomerRegistry {
    /// Create a registry over explicit store implementations.
    ///
    /// No event publisher is attached; add one with
    /// [`with_publisher`](Self::with_publisher).
    pub fn new(
        config: RegistryConfig,
        records: Arc<dyn RecordStore>,
        cache: Arc<dyn CacheStore>,
        index: Arc<dyn SearchIndex>,
    ) -> Self {
        let id_locks = config.serialize_writes_per_id.then(IdLockTable::new);
        Self {
            config,
            records,
            cache,
            index,
            publisher: None,
            id_locks,
            event_log: None,
        }
    }

    /// Attach an event publisher.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Registry wired entirely with in-memory stores and the in-process
    /// event log. The default for tests and single-process use.
    #[must_use]
    pub fn in_memory(config: RegistryConfig) -> Self {
        let log = Arc::new(EventLog::new(config.event_log_capacity));
        let publisher = Arc::new(LogPublisher::new(log.clone()));
        let mut registry = Self::new(
            config,
            Arc::new(MemoryRecordStore::new()),
            Arc::new(MemoryCache::new()),
            Arc::new(MemoryIndex::new()),
        )
        .with_publisher(publisher);
        registry.event_log = Some(log);
        registry
    }

    /// Connect backends according to the config: SQL record store and Redis
    /// cache when their URLs are set, in-memory stores otherwise. The search
    /// index and event log are in-process.
    pub async fn connect(config: RegistryConfig) -> Result<Self, StoreError> {
        let records: Arc<dyn RecordStore> = match config.record_url.as_deref() {
            Some(url) => Arc::new(SqlRecordStore::connect(url).await?),
            None => Arc::new(MemoryRecordStore::new()),
        };
        let cache: Arc<dyn CacheStore> = match config.redis_url.as_deref() {
            Some(url) => Arc::new(RedisCache::connect(url).await?),
            None => Arc::new(MemoryCache::new()),
        };

        let log = Arc::new(EventLog::new(config.event_log_capacity));
        let publisher = Arc::new(LogPublisher::new(log.clone()));
        let mut registry = Self::new(config, records, cache, Arc::new(MemoryIndex::new()))
            .with_publisher(publisher);
        registry.event_log = Some(log);
        Ok(registry)
    }

    /// The in-process event log, when wired with one.
    #[must_use]
    pub fn event_log(&self) -> Option<&Arc<EventLog>> {
        self.event_log.as_ref()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // --- Operations ---

    /// Create a new customer.
    ///
    /// The record store write is the durability point: if it fails, nothing
    /// else was touched. After it commits, the cache is written through, the
    /// index upserted, and a `Created` event published; any of those failing
    /// surfaces as [`RegistryError::OutOfSync`] while the record remains.
    #[tracing::instrument(skip(self, customer), fields(id))]
    pub async fn create(&self, customer: NewCustomer) -> Result<Customer, RegistryError> {
        let start = Instant::now();

        let created = self.records.create(customer).await.map_err(|e| {
            crate::metrics::record_operation("record", "create", "error");
            RegistryError::Record {
                op: "create",
                source: e,
            }
        })?;
        tracing::Span::current().record("id", created.id);
        crate::metrics::record_operation("record", "create", "success");
        debug!("record store assigned id");

        self.write_through("create", &created).await?;
        self.publish("create", created.id, ChangeEvent::Created(created.clone()))
            .await?;

        info!(id = created.id, "customer created");
        crate::metrics::record_latency("create", start.elapsed());
        Ok(created)
    }

    /// Look up a customer by id.
    ///
    /// Cache first; a hit never touches the record store. On a miss (or a
    /// cache failure, which degrades rather than failing the read) the
    /// record store is consulted and a found record is written back into the
    /// cache best-effort. An absent id is `Ok(None)`, never an error.
    ///
    /// When `serialize_writes_per_id` is enabled the miss path holds the
    /// per-id lock across lookup and repopulation, so a concurrent delete
    /// cannot complete between them and leave a stale cache entry behind.
    #[tracing::instrument(skip(self), fields(source))]
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RegistryError> {
        let start = Instant::now();
        let key = self.config.cache_key(id);

        match self.cache.get(&key).await {
            Ok(Some(payload)) => match envelope::decode(&key, &payload) {
                Ok(customer) => {
                    tracing::Span::current().record("source", "cache");
                    debug!("cache hit");
                    crate::metrics::record_cache_lookup("hit");
                    crate::metrics::record_latency("get", start.elapsed());
                    return Ok(Some(customer));
                }
                Err(e) => {
                    // A payload we can't vouch for is a miss, not a value
                    warn!(error = %e, "cache payload rejected, falling back to record store");
                    crate::metrics::record_cache_lookup("degraded");
                }
            },
            Ok(None) => {
                debug!("cache miss");
                crate::metrics::record_cache_lookup("miss");
            }
            Err(e) => {
                warn!(error = %e, "cache lookup failed, falling back to record store");
                crate::metrics::record_cache_lookup("degraded");
            }
        }

        // Miss path. The lock (when configured) spans lookup and
        // repopulation so a delete cannot interleave between them.
        let _guard = match &self.id_locks {
            Some(table) => Some(table.acquire(id).await),
            None => None,
        };

        let found = self.records.find_by_id(id).await.map_err(|e| {
            crate::metrics::record_operation("record", "get", "error");
            RegistryError::Record {
                op: "get",
                source: e,
            }
        })?;
        crate::metrics::record_operation("record", "get", "success");

        if let Some(customer) = found {
            tracing::Span::current().record("source", "record");
            self.repopulate(&key, &customer).await;
            crate::metrics::record_latency("get", start.elapsed());
            return Ok(Some(customer));
        }

        tracing::Span::current().record("source", "absent");
        debug!("customer not found");
        crate::metrics::record_latency("get", start.elapsed());
        Ok(None)
    }

    /// Fetch every customer from the record store. No caching involved.
    pub async fn get_all(&self) -> Result<Vec<Customer>, RegistryError> {
        let all = self.records.find_all().await.map_err(|e| {
            crate::metrics::record_operation("record", "get_all", "error");
            RegistryError::Record {
                op: "get_all",
                source: e,
            }
        })?;
        crate::metrics::record_operation("record", "get_all", "success");
        Ok(all)
    }

    /// Replace the record stored under `id` with `payload`.
    ///
    /// The path id always wins: whatever id the payload carries is
    /// overwritten before any store is touched. An absent id is inserted
    /// (upsert semantics). Failure policy matches [`create`](Self::create).
    #[tracing::instrument(skip(self, payload))]
    pub async fn update(
        &self,
        id: CustomerId,
        payload: Customer,
    ) -> Result<Customer, RegistryError> {
        let start = Instant::now();
        let customer = payload.with_id(id);

        let _guard = match &self.id_locks {
            Some(table) => Some(table.acquire(id).await),
            None => None,
        };

        let updated = self.records.replace(customer).await.map_err(|e| {
            crate::metrics::record_operation("record", "update", "error");
            RegistryError::Record {
                op: "update",
                source: e,
            }
        })?;
        crate::metrics::record_operation("record", "update", "success");

        self.write_through("update", &updated).await?;
        self.publish("update", id, ChangeEvent::Updated(updated.clone()))
            .await?;

        info!(id, "customer updated");
        crate::metrics::record_latency("update", start.elapsed());
        Ok(updated)
    }

    /// Delete a customer from every store.
    ///
    /// Order matters: the cache entry goes first so no reader can be served
    /// stale cached data after the record row is gone, then the index, then
    /// the delete marker event, and the record store last. The residual
    /// window — a concurrent read repopulating the cache from the
    /// still-present record row — is closed only when
    /// `serialize_writes_per_id` is enabled.
    ///
    /// Returns whether the record existed; deleting an absent id is a no-op,
    /// not an error.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: CustomerId) -> Result<bool, RegistryError> {
        let start = Instant::now();
        let key = self.config.cache_key(id);

        let _guard = match &self.id_locks {
            Some(table) => Some(table.acquire(id).await),
            None => None,
        };

        self.cache.delete(&key).await.map_err(|e| {
            crate::metrics::record_operation("cache", "delete", "error");
            RegistryError::OutOfSync {
                op: "delete",
                id,
                store: "cache",
                source: e,
            }
        })?;
        crate::metrics::record_operation("cache", "delete", "success");

        self.index.delete_by_id(id).await.map_err(|e| {
            crate::metrics::record_operation("index", "delete", "error");
            RegistryError::OutOfSync {
                op: "delete",
                id,
                store: "search index",
                source: e,
            }
        })?;
        crate::metrics::record_operation("index", "delete", "success");

        self.publish("delete", id, ChangeEvent::Deleted { id }).await?;

        let found = self.records.delete_by_id(id).await.map_err(|e| {
            error!(error = %e, "record store delete failed after cache/index removal");
            crate::metrics::record_operation("record", "delete", "error");
            RegistryError::OutOfSync {
                op: "delete",
                id,
                store: "record store",
                source: e,
            }
        })?;
        crate::metrics::record_operation("record", "delete", "success");

        info!(id, found, "delete completed");
        crate::metrics::record_latency("delete", start.elapsed());
        Ok(found)
    }

    /// Exact-match name search, delegated straight to the search index.
    /// No cache involved; result order is the index's own.
    #[tracing::instrument(skip(self))]
    pub async fn search_by_name(&self, name: &str) -> Result<Vec<Customer>, RegistryError> {
        let matches = self.index.find_by_name(name).await.map_err(|e| {
            crate::metrics::record_operation("index", "search", "error");
            RegistryError::Index(e)
        })?;
        crate::metrics::record_operation("index", "search", "success");
        debug!(matches = matches.len(), "search completed");
        Ok(matches)
    }

    // --- Internal helpers ---

    /// Write-through after a committed record write: cache entry under the
    /// derived key with the configured TTL, then index upsert. Any failure
    /// here is an out-of-sync error; the record write stays.
    async fn write_through(
        &self,
        op: &'static str,
        customer: &Customer,
    ) -> Result<(), RegistryError> {
        let key = self.config.cache_key(customer.id);
        let payload = envelope::encode(customer).map_err(|e| RegistryError::OutOfSync {
            op,
            id: customer.id,
            store: "cache",
            source: e,
        })?;

        if let Err(e) = self.cache.set(&key, &payload, self.config.cache_ttl()).await {
            error!(error = %e, id = customer.id, "cache write-through failed after record commit");
            crate::metrics::record_operation("cache", op, "error");
            return Err(RegistryError::OutOfSync {
                op,
                id: customer.id,
                store: "cache",
                source: e,
            });
        }
        crate::metrics::record_operation("cache", op, "success");

        if let Err(e) = self.index.upsert(customer).await {
            error!(error = %e, id = customer.id, "index upsert failed after record commit");
            crate::metrics::record_operation("index", op, "error");
            return Err(RegistryError::OutOfSync {
                op,
                id: customer.id,
                store: "search index",
                source: e,
            });
        }
        crate::metrics::record_operation("index", op, "success");

        Ok(())
    }

    /// Best-effort cache repopulation on the read path. A failure is logged
    /// and counted but never fails the read.
    async fn repopulate(&self, key: &str, customer: &Customer) {
        let payload = match envelope::encode(customer) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "skipping cache repopulation, envelope encode failed");
                crate::metrics::record_repopulation_failure();
                return;
            }
        };

        match self.cache.set(key, &payload, self.config.cache_ttl()).await {
            Ok(()) => {
                debug!("cache repopulated from record store");
                crate::metrics::record_operation("cache", "repopulate", "success");
            }
            Err(e) => {
                warn!(error = %e, "cache repopulation failed");
                crate::metrics::record_repopulation_failure();
                crate::metrics::record_operation("cache", "repopulate", "error");
            }
        }
    }

    /// Publish a change event according to the configured failure policy.
    async fn publish(
        &self,
        op: &'static str,
        id: CustomerId,
        event: ChangeEvent,
    ) -> Result<(), RegistryError> {
        let Some(publisher) = &self.publisher else {
            return Ok(());
        };

        match publisher.publish(&event).await {
            Ok(()) => {
                crate::metrics::record_operation("publisher", op, "success");
                Ok(())
            }
            Err(e) => match self.config.publish_failure_policy {
                PublishFailurePolicy::Swallow => {
                    warn!(error = %e, id, "event publish failed (best-effort, swallowed)");
                    crate::metrics::record_publish_swallowed();
                    crate::metrics::record_operation("publisher", op, "swallowed");
                    Ok(())
                }
                PublishFailurePolicy::Propagate => {
                    error!(error = %e, id, "event publish failed (strict policy, propagating)");
                    crate::metrics::record_operation("publisher", op, "error");
                    Err(RegistryError::OutOfSync {
                        op,
                        id,
                        store: "event publisher",
                        source: e,
                    })
                }
            },
        }
    }
}
