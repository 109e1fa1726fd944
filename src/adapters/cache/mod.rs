//! Cache Adapter
//!
//! Implementations of the `CacheStore` port plus the typed, fail-open
//! `TokenCache` the aggregator talks to.

mod memory;
mod typed;

pub use memory::{CacheEntry, CacheStats, DisabledCacheStore, MemoryCacheStore};
pub use typed::{JsonCodec, TokenCache, DEFAULT_TTL};
