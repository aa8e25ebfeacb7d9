//! Redis backend for the cache layer.
//!
//! Entries are plain string payloads (serialized envelopes, see
//! [`crate::stores::envelope`]) written with a per-key TTL via `SET ... EX`.
//! Redis expires entries server-side, so an expired key simply reads back as
//! absent — the same contract the in-memory cache implements with lazy
//! expiry.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use super::retry::{connect_with_backoff, ConnectRetry};
use super::traits::{CacheStore, StoreError};

pub struct RedisCache {
    connection: ConnectionManager,
}

impl RedisCache {
    /// Connect to Redis, retrying with backoff during startup.
    pub async fn connect(connection_string: &str) -> Result<Self, StoreError> {
        let client = Client::open(connection_string)
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let connection = connect_with_backoff("redis", &ConnectRetry::default(), || async {
            ConnectionManager::new(client.clone()).await
        })
        .await
        .map_err(|e: redis::RedisError| StoreError::Backend(e.to_string()))?;

        Ok(Self { connection })
    }

    /// Get a clone of the connection manager (for health probes).
    #[must_use]
    pub fn connection(&self) -> ConnectionManager {
        self.connection.clone()
    }
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn set(
        &self,
        key: &str,
        payload: &str,
        ttl: std::time::Duration,
    ) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        // SET key value EX seconds; sub-second TTLs round up to 1s
        let ttl_secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, payload, ttl_secs)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        conn.get(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}
