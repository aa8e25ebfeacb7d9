use async_trait::async_trait;
use thiserror::Error;

use crate::customer::{Customer, CustomerId, NewCustomer};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("cache entry '{key}' carries schema tag '{found}', expected '{expected}'")]
    SchemaMismatch {
        key: String,
        found: String,
        expected: &'static str,
    },
}

/// Durable source of truth for customer records.
///
/// Every write operation in the registry hits this store first; the other
/// stores only ever reflect a record that has already committed here.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new customer, assigning a fresh id. This is the durability
    /// point of the create path.
    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError>;

    /// Replace the full record stored under `customer.id` (upsert).
    async fn replace(&self, customer: Customer) -> Result<Customer, StoreError>;

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError>;

    async fn find_all(&self) -> Result<Vec<Customer>, StoreError>;

    /// Remove the record. Returns `false` if the id was already absent,
    /// which is not an error.
    async fn delete_by_id(&self, id: CustomerId) -> Result<bool, StoreError>;
}

/// Expiring key-value accelerator in front of record store reads.
///
/// Values are opaque serialized payloads (the registry passes envelope
/// strings, see [`crate::stores::envelope`]). An expired or absent entry is
/// equivalent to "not cached", never an error.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn set(
        &self,
        key: &str,
        payload: &str,
        ttl: std::time::Duration,
    ) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Secondary store for attribute-based lookup, eventually consistent with
/// the record store. Never the sole source of an id's existence.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn upsert(&self, customer: &Customer) -> Result<(), StoreError>;

    async fn delete_by_id(&self, id: CustomerId) -> Result<(), StoreError>;

    /// Exact-match name lookup. Case sensitivity and result order are the
    /// index's native behavior, not normalized here.
    async fn find_by_name(&self, name: &str) -> Result<Vec<Customer>, StoreError>;
}

/// Best-effort append-only change notification channel.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &crate::events::ChangeEvent) -> Result<(), StoreError>;
}
