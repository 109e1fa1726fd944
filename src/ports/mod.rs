//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Market data sources (primary, on-chain, fallback)
//! - The short-lived key/value cache
//!
//! `mocks` provides in-memory fakes of the data sources for tests.

pub mod sources;
pub mod cache;
pub mod models;
pub mod mocks;

pub use sources::{
    FallbackMarketSource, OnchainSource, PrimaryMarketSource, SourceError, SourceResult,
};
pub use cache::{token_key, CacheError, CacheStore, TRENDING_KEY};
pub use models::{
    FallbackOverview, MarketData, PoolDetail, PoolRef, TokenInfo, TrendingPool, TrendingWindow,
};
