//! Birdeye Client
//!
//! Fallback market source used when the primary has no identity or market
//! data for a mint. Without an API key every call reports "no record".

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::adapters::http::{self, flex, RateLimiter, RetryPolicy};
use crate::ports::models::FallbackOverview;
use crate::ports::sources::{FallbackMarketSource, SourceResult};

const PROVIDER: &str = "birdeye";

pub const DEFAULT_BASE_URL: &str = "https://public-api.birdeye.so";

/// Configuration for the Birdeye client
#[derive(Debug, Clone)]
pub struct BirdeyeConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Value of the `x-chain` header
    pub chain: String,
    pub timeout: Duration,
    pub requests_per_minute: u32,
    pub min_request_interval: Duration,
    pub max_retries: u32,
}

impl Default for BirdeyeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            chain: "solana".to_string(),
            timeout: Duration::from_millis(10_000),
            requests_per_minute: 100,
            min_request_interval: Duration::from_millis(100),
            max_retries: 2,
        }
    }
}

impl BirdeyeConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// `{ success, data }` envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: Option<bool>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OverviewWire {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_u64")]
    holder: Option<u64>,
    #[serde(default, rename = "v24hUSD", deserialize_with = "flex::opt_f64")]
    v24h_usd: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    price_change24h_percent: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    price_change24h: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    mc: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    market_cap: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    liquidity: Option<f64>,
}

impl From<OverviewWire> for FallbackOverview {
    fn from(wire: OverviewWire) -> Self {
        Self {
            name: wire.name.filter(|s| !s.trim().is_empty()),
            symbol: wire.symbol.filter(|s| !s.trim().is_empty()),
            decimals: wire.decimals,
            logo_uri: wire.logo_uri.filter(|s| !s.trim().is_empty()),
            holder_count: wire.holder.unwrap_or(0),
            volume_24h: wire.v24h_usd.unwrap_or(0.0),
            price_change_24h: wire
                .price_change24h_percent
                .or(wire.price_change24h)
                .unwrap_or(0.0),
            market_cap: wire.mc.or(wire.market_cap).unwrap_or(0.0),
            liquidity: wire.liquidity.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PriceWire {
    #[serde(default, deserialize_with = "flex::opt_f64")]
    value: Option<f64>,
}

/// HTTP client for the Birdeye public API
#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    config: BirdeyeConfig,
    http: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl BirdeyeClient {
    pub fn new(config: BirdeyeConfig) -> SourceResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(http::transport_error)?;
        let rate_limiter = Arc::new(Mutex::new(RateLimiter::new(
            config.requests_per_minute,
            config.min_request_interval,
        )));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str, mint: &str) -> SourceResult<Option<T>> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            tracing::trace!(path, "Fallback source has no API key, skipping");
            return Ok(None);
        };

        self.rate_limiter.lock().await.wait_if_needed().await;

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let policy = RetryPolicy::new(self.config.max_retries, 250);
        let response = http::execute_with_retry(PROVIDER, policy, || {
            self.http
                .get(&url)
                .header("accept", "application/json")
                .header("x-api-key", api_key)
                .header("x-chain", &self.config.chain)
                .query(&[("address", mint)])
                .send()
        })
        .await?;

        let Some(response) = response else {
            return Ok(None);
        };
        let envelope: Envelope<T> = http::read_json(response).await?;
        if envelope.success == Some(false) {
            tracing::debug!(path, mint, "Fallback source reported failure");
            return Ok(None);
        }
        Ok(envelope.data)
    }
}

#[async_trait]
impl FallbackMarketSource for BirdeyeClient {
    async fn fetch_token_overview(&self, mint: &str) -> SourceResult<Option<FallbackOverview>> {
        let wire: Option<OverviewWire> = self.get_data("/defi/token_overview", mint).await?;
        Ok(wire.map(Into::into))
    }

    async fn fetch_price(&self, mint: &str) -> SourceResult<Option<f64>> {
        let wire: Option<PriceWire> = self.get_data("/defi/price", mint).await?;
        Ok(wire.and_then(|p| p.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_parsing() {
        let envelope: Envelope<OverviewWire> = serde_json::from_str(
            r#"{
                "success": true,
                "data": {
                    "address": "Mint111",
                    "name": "Fallback Token",
                    "symbol": "FBT",
                    "decimals": 6,
                    "logoURI": "https://img.example.com/fbt.png",
                    "holder": 812,
                    "v24hUSD": 15432.75,
                    "priceChange24hPercent": -4.2,
                    "mc": 987654.0,
                    "liquidity": "45000.5"
                }
            }"#,
        )
        .unwrap();
        let overview = FallbackOverview::from(envelope.data.unwrap());

        assert_eq!(overview.symbol.as_deref(), Some("FBT"));
        assert_eq!(overview.decimals, Some(6));
        assert_eq!(overview.holder_count, 812);
        assert_eq!(overview.volume_24h, 15432.75);
        assert_eq!(overview.price_change_24h, -4.2);
        assert_eq!(overview.market_cap, 987654.0);
        assert_eq!(overview.liquidity, 45000.5);
    }

    #[test]
    fn test_overview_defaults_to_zero() {
        let envelope: Envelope<OverviewWire> =
            serde_json::from_str(r#"{ "success": true, "data": {} }"#).unwrap();
        let overview = FallbackOverview::from(envelope.data.unwrap());
        assert!(overview.name.is_none());
        assert_eq!(overview.holder_count, 0);
        assert_eq!(overview.liquidity, 0.0);
    }

    #[test]
    fn test_price_parsing() {
        let envelope: Envelope<PriceWire> =
            serde_json::from_str(r#"{ "success": true, "data": { "value": 0.00123, "updateUnixTime": 1 } }"#)
                .unwrap();
        assert_eq!(envelope.data.unwrap().value, Some(0.00123));
    }

    #[tokio::test]
    async fn test_without_api_key_reports_absence() {
        let client = BirdeyeClient::new(BirdeyeConfig::default()).unwrap();
        assert!(!client.is_configured());
        assert!(client.fetch_token_overview("Mint111").await.unwrap().is_none());
        assert!(client.fetch_price("Mint111").await.unwrap().is_none());
    }
}
