//! Cache Port
//!
//! Raw key/value store with per-entry TTL. Callers go through the typed,
//! fail-open `TokenCache` wrapper; a store error never reaches the aggregator.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Key for the trending token list
pub const TRENDING_KEY: &str = "tokens:trending";

/// Key for a single token snapshot
pub fn token_key(mint: &str) -> String {
    format!("token:{}", mint)
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache codec error: {0}")]
    Codec(String),
}

/// Raw string store
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_scheme() {
        assert_eq!(token_key("So11111111111111111111111111111111111111112"), "token:So11111111111111111111111111111111111111112");
        assert_eq!(TRENDING_KEY, "tokens:trending");
    }
}
