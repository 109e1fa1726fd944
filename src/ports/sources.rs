//! Data Source Ports
//!
//! Async traits for the three upstream data sources. Every operation returns
//! `Ok(None)` (or an empty list) when the source has no record, and an
//! `Err(SourceError)` for transient or malformed upstream responses. None of
//! them panic on expected upstream failures.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{FallbackOverview, MarketData, PoolDetail, TokenInfo, TrendingPool, TrendingWindow};
use crate::domain::{Candle, OhlcvTimeframe, TokenAuthorities, TokenHolder, Trade};

/// Data source error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Rate limited by {0}")]
    RateLimited(String),

    #[error("{provider} returned HTTP {status}")]
    Upstream { provider: String, status: u16 },

    #[error("Request timed out")]
    Timeout,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid mint address: {0}")]
    InvalidMint(String),
}

impl SourceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, SourceError::RateLimited(_))
    }

    /// Worth retrying after a pause
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::RateLimited(_) | SourceError::Timeout | SourceError::Transport(_) => true,
            SourceError::Upstream { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;

/// Primary market source: metadata, holders, pools, trades, OHLCV, trending
#[async_trait]
pub trait PrimaryMarketSource: Send + Sync {
    /// Metadata, holder stats, authorities and security flags
    async fn fetch_token_info(&self, mint: &str) -> SourceResult<Option<TokenInfo>>;

    /// Price and market data with the representative pool
    async fn fetch_token_market_data(&self, mint: &str) -> SourceResult<Option<MarketData>>;

    /// Batched market data; mints without a record are simply absent
    async fn fetch_multiple_market_data(&self, mints: &[String]) -> SourceResult<Vec<MarketData>>;

    async fn fetch_pool_detail(&self, pool_address: &str) -> SourceResult<Option<PoolDetail>>;

    async fn fetch_top_holders(&self, mint: &str, count: usize) -> SourceResult<Vec<TokenHolder>>;

    /// Recent trades at or above `min_volume_usd`, newest first
    async fn fetch_recent_trades(&self, mint: &str, min_volume_usd: f64) -> SourceResult<Vec<Trade>>;

    /// Candles oldest first
    async fn fetch_ohlcv(
        &self,
        mint: &str,
        timeframe: OhlcvTimeframe,
        limit: usize,
    ) -> SourceResult<Vec<Candle>>;

    /// Paged ranking; implementations bound each page request and keep the
    /// pages already fetched when a later page fails
    async fn fetch_trending_pools(
        &self,
        limit: usize,
        window: TrendingWindow,
    ) -> SourceResult<Vec<TrendingPool>>;
}

/// On-chain source: exact supply and authorities read from the mint account
#[async_trait]
pub trait OnchainSource: Send + Sync {
    /// Raw supply in base units
    async fn fetch_onchain_supply(&self, mint: &str) -> SourceResult<Option<u128>>;

    async fn fetch_onchain_authorities(&self, mint: &str) -> SourceResult<Option<TokenAuthorities>>;
}

/// Secondary market source used when the primary has no identity/market data
#[async_trait]
pub trait FallbackMarketSource: Send + Sync {
    async fn fetch_token_overview(&self, mint: &str) -> SourceResult<Option<FallbackOverview>>;

    async fn fetch_price(&self, mint: &str) -> SourceResult<Option<f64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::RateLimited("primary".into()).is_transient());
        assert!(SourceError::Timeout.is_transient());
        assert!(SourceError::Upstream { provider: "primary".into(), status: 503 }.is_transient());
        assert!(!SourceError::Upstream { provider: "primary".into(), status: 400 }.is_transient());
        assert!(!SourceError::Malformed("bad json".into()).is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::Upstream { provider: "birdeye".into(), status: 502 };
        assert_eq!(err.to_string(), "birdeye returned HTTP 502");
    }
}
