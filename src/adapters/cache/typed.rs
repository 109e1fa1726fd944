//! Typed, fail-open cache
//!
//! Encodes values as JSON on the way into a [`CacheStore`] and decodes them on
//! the way out. Store outages and undecodable entries are logged and treated
//! as a miss / no-op, so callers never see a cache error.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::memory::{DisabledCacheStore, MemoryCacheStore};
use crate::ports::cache::{CacheError, CacheStore};

/// Default TTL when a caller does not pass one
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// JSON codec used at the cache boundary
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode<T: Serialize>(value: &T) -> Result<String, CacheError> {
        serde_json::to_string(value).map_err(|e| CacheError::Codec(e.to_string()))
    }

    pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, CacheError> {
        serde_json::from_str(raw).map_err(|e| CacheError::Codec(e.to_string()))
    }
}

#[derive(Clone)]
pub struct TokenCache {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl TokenCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            default_ttl: DEFAULT_TTL,
        }
    }

    /// Process-local store
    pub fn in_memory(max_entries: usize) -> Self {
        Self::new(Arc::new(MemoryCacheStore::with_max_entries(max_entries)))
    }

    /// Always-miss cache
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledCacheStore))
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Cached value, or None on miss, store failure or decode failure
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache get failed, treating as miss");
                return None;
            }
        };

        match JsonCodec::decode(&raw) {
            Ok(value) => {
                tracing::debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping undecodable cache entry");
                if let Err(e) = self.store.delete(key).await {
                    tracing::debug!(key, error = %e, "Cache delete failed");
                }
                None
            }
        }
    }

    /// Store a value; failures are logged and swallowed
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let raw = match JsonCodec::encode(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "Cache encode failed");
                return;
            }
        };

        if let Err(e) = self.store.set(key, raw, ttl).await {
            tracing::warn!(key, error = %e, "Cache set failed, continuing without cache");
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Err(e) = self.store.delete(key).await {
            tracing::warn!(key, error = %e, "Cache delete failed");
        }
    }

    pub async fn clear(&self) {
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "Cache clear failed");
        }
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
