//! Normalized data-source DTOs
//!
//! Fixed-shape values returned by every data-source adapter. Upstream JSON is
//! parsed and defaulted inside the adapters; nothing untyped crosses this
//! boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HoneypotFlag, TimeframeValues, TokenAuthorities, TransactionWindows};

/// Token metadata, holder stats and security info from the primary source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    pub image_url: Option<String>,
    pub websites: Vec<String>,
    pub twitter_handle: Option<String>,
    pub telegram_handle: Option<String>,
    pub holder_count: u64,
    pub top10_percentage: f64,
    pub authorities: Option<TokenAuthorities>,
    pub gt_score: f64,
    pub is_honeypot: HoneypotFlag,
}

/// Basic pool reference, as embedded in token and trending responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolRef {
    pub address: String,
    pub dex: Option<String>,
    pub reserve_usd: f64,
    pub volume_24h: f64,
    pub created_at: Option<DateTime<Utc>>,
    pub locked_liquidity_pct: f64,
    pub transactions: Option<TransactionWindows>,
    pub volume_usd: Option<TimeframeValues>,
    pub price_change: Option<TimeframeValues>,
}

/// Price and market metrics for one mint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketData {
    pub mint: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub image_url: Option<String>,
    pub price_usd: f64,
    pub fdv_usd: f64,
    pub market_cap_usd: f64,
    pub volume_24h: f64,
    pub price_change_24h: Option<f64>,
    pub top_pool: Option<PoolRef>,
}

impl MarketData {
    /// Market cap, falling back to fully diluted valuation
    pub fn effective_market_cap(&self) -> f64 {
        if self.market_cap_usd > 0.0 {
            self.market_cap_usd
        } else {
            self.fdv_usd
        }
    }
}

/// Enhanced pool detail: per-window transactions, volume and price change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolDetail {
    pub address: String,
    pub reserve_usd: Option<f64>,
    pub price_usd: Option<f64>,
    pub price_change: TimeframeValues,
    pub transactions: TransactionWindows,
    pub volume_usd: TimeframeValues,
    pub created_at: Option<DateTime<Utc>>,
    pub locked_liquidity_pct: Option<f64>,
}

/// Window for the trending-pools ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendingWindow {
    M5,
    H1,
    H6,
    #[default]
    H24,
}

impl TrendingWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendingWindow::M5 => "5m",
            TrendingWindow::H1 => "1h",
            TrendingWindow::H6 => "6h",
            TrendingWindow::H24 => "24h",
        }
    }
}

/// One entry of the trending-pools ranking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPool {
    /// Mint of the pool's base token
    pub base_token_mint: String,
    pub pool_name: Option<String>,
    pub price_usd: Option<f64>,
    pub market_cap_usd: Option<f64>,
    pub fdv_usd: Option<f64>,
    pub price_change_24h: Option<f64>,
    pub pool: PoolRef,
}

/// Market overview from the fallback source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FallbackOverview {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub logo_uri: Option<String>,
    pub holder_count: u64,
    pub volume_24h: f64,
    pub price_change_24h: f64,
    pub market_cap: f64,
    pub liquidity: f64,
}
