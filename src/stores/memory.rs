//! In-memory store implementations.
//!
//! Used as the default wiring in tests and for single-process deployments.
//! All three honor the same contracts as their networked counterparts:
//! the record store assigns monotonically increasing ids that are never
//! reused, the cache treats expired entries as absent, and the index keeps
//! whole records keyed by id.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::traits::{CacheStore, RecordStore, SearchIndex, StoreError};
use crate::customer::{Customer, CustomerId, NewCustomer};

/// In-memory record store with an atomic id sequence.
pub struct MemoryRecordStore {
    rows: DashMap<CustomerId, Customer>,
    next_id: AtomicI64,
}

impl MemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advance the id sequence so it stays strictly above `id`.
    ///
    /// Keeps externally-supplied ids (via `replace`) from colliding with
    /// future assignments; deleted ids are never handed out again.
    fn reserve_through(&self, id: CustomerId) {
        let mut current = self.next_id.load(Ordering::Acquire);
        while current <= id {
            match self.next_id.compare_exchange_weak(
                current,
                id + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let customer = customer.into_customer(id);
        self.rows.insert(id, customer.clone());
        Ok(customer)
    }

    async fn replace(&self, customer: Customer) -> Result<Customer, StoreError> {
        self.reserve_through(customer.id);
        self.rows.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn find_by_id(&self, id: CustomerId) -> Result<Option<Customer>, StoreError> {
        Ok(self.rows.get(&id).map(|r| r.value().clone()))
    }

    async fn find_all(&self) -> Result<Vec<Customer>, StoreError> {
        let mut all: Vec<Customer> = self.rows.iter().map(|r| r.value().clone()).collect();
        all.sort_by_key(|c| c.id);
        Ok(all)
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<bool, StoreError> {
        Ok(self.rows.remove(&id).is_some())
    }
}

/// In-memory expiring cache.
///
/// Expiry is evaluated lazily on `get`; an expired entry is removed and
/// reported as absent, indistinguishable from one that was never set.
pub struct MemoryCache {
    entries: DashMap<String, (String, Instant)>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Number of entries, counting not-yet-collected expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a live (unexpired) entry exists for `key`.
    #[must_use]
    pub fn contains_live(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|e| e.value().1 > Instant::now())
            .unwrap_or(false)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn set(&self, key: &str, payload: &str, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .insert(key.to_string(), (payload.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if let Some(entry) = self.entries.get(key) {
            let (payload, expires_at) = entry.value().clone();
            drop(entry);
            if expires_at > Instant::now() {
                return Ok(Some(payload));
            }
            // Expired == absent
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// In-memory search index with exact-match name lookup.
///
/// Results come back ordered by id; a real index makes no such promise, so
/// callers must not rely on it.
pub struct MemoryIndex {
    docs: DashMap<CustomerId, Customer>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: DashMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: CustomerId) -> bool {
        self.docs.contains_key(&id)
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchIndex for MemoryIndex {
    async fn upsert(&self, customer: &Customer) -> Result<(), StoreError> {
        self.docs.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: CustomerId) -> Result<(), StoreError> {
        self.docs.remove(&id);
        Ok(())
    }

    async fn find_by_name(&self, name: &str) -> Result<Vec<Customer>, StoreError> {
        let mut matches: Vec<Customer> = self
            .docs
            .iter()
            .filter(|r| r.value().name == name)
            .map(|r| r.value().clone())
            .collect();
        matches.sort_by_key(|c| c.id);
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(name: &str) -> NewCustomer {
        NewCustomer::new(name, format!("{}@example.com", name.to_lowercase()))
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let store = MemoryRecordStore::new();

        let a = store.create(new_customer("Ada")).await.unwrap();
        let b = store.create(new_customer("Brendan")).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let store = MemoryRecordStore::new();

        let a = store.create(new_customer("Ada")).await.unwrap();
        assert!(store.delete_by_id(a.id).await.unwrap());

        let b = store.create(new_customer("Brendan")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn test_replace_reserves_sequence() {
        let store = MemoryRecordStore::new();

        store
            .replace(Customer {
                id: 50,
                name: "Ada".to_string(),
                email: "ada@x.com".to_string(),
            })
            .await
            .unwrap();

        // The next assigned id must not collide with the replaced one.
        let next = store.create(new_customer("Brendan")).await.unwrap();
        assert!(next.id > 50);
    }

    #[tokio::test]
    async fn test_find_by_id_absent() {
        let store = MemoryRecordStore::new();
        assert!(store.find_by_id(404).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_absent_returns_false() {
        let store = MemoryRecordStore::new();
        assert!(!store.delete_by_id(404).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_all_sorted() {
        let store = MemoryRecordStore::new();
        for name in ["Ada", "Brendan", "Grace"] {
            store.create(new_customer(name)).await.unwrap();
        }

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_cache_set_get_delete() {
        let cache = MemoryCache::new();

        cache
            .set("customers::1", "payload", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            cache.get("customers::1").await.unwrap().as_deref(),
            Some("payload")
        );

        cache.delete("customers::1").await.unwrap();
        assert!(cache.get("customers::1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_expired_entry_is_absent() {
        let cache = MemoryCache::new();

        cache
            .set("customers::1", "payload", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("customers::1").await.unwrap().is_none());
        // Lazy removal actually dropped the entry
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_cache_overwrite_refreshes_ttl() {
        let cache = MemoryCache::new();

        cache
            .set("k", "old", Duration::from_millis(10))
            .await
            .unwrap();
        cache.set("k", "new", Duration::from_secs(60)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_index_find_by_name_exact() {
        let index = MemoryIndex::new();

        for (id, name) in [(1, "Ada"), (2, "ada"), (3, "Ada")] {
            index
                .upsert(&Customer {
                    id,
                    name: name.to_string(),
                    email: "x@x.com".to_string(),
                })
                .await
                .unwrap();
        }

        // Exact match: case-sensitive, no substring matching
        let matches = index.find_by_name("Ada").await.unwrap();
        assert_eq!(matches.len(), 2);
        assert!(matches.iter().all(|c| c.name == "Ada"));

        assert!(index.find_by_name("Ad").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_index_upsert_replaces() {
        let index = MemoryIndex::new();

        let mut customer = Customer {
            id: 1,
            name: "Ada".to_string(),
            email: "ada@x.com".to_string(),
        };
        index.upsert(&customer).await.unwrap();

        customer.name = "Ada K.".to_string();
        index.upsert(&customer).await.unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.find_by_name("Ada").await.unwrap().is_empty());
        assert_eq!(index.find_by_name("Ada K.").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_index_delete() {
        let index = MemoryIndex::new();
        index
            .upsert(&Customer {
                id: 1,
                name: "Ada".to_string(),
                email: "ada@x.com".to_string(),
            })
            .await
            .unwrap();

        index.delete_by_id(1).await.unwrap();
        assert!(index.is_empty());

        // Deleting an absent id is not an error
        index.delete_by_id(1).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_creates_unique_ids() {
        use std::sync::Arc;

        let store = Arc::new(MemoryRecordStore::new());
        let mut handles = vec![];

        for i in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut ids = vec![];
                for j in 0..10 {
                    let c = store
                        .create(NewCustomer::new(format!("c-{i}-{j}"), "c@x.com"))
                        .await
                        .unwrap();
                    ids.push(c.id);
                }
                ids
            }));
        }

        let mut all_ids = vec![];
        for handle in handles {
            all_ids.extend(handle.await.unwrap());
        }
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), 100);
    }
}
