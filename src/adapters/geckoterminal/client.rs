//! GeckoTerminal Client
//!
//! Primary market source backed by the CoinGecko on-chain (GeckoTerminal)
//! REST API. All requests share one rate limiter; 404 maps to "no record",
//! 429 is surfaced as `RateLimited`, 5xx and transport errors are retried.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use super::types::{
    Document, OhlcvAttributes, PoolAttributes, Resource, TokenAttributes, TokenInfoAttributes,
    TopHoldersAttributes, TradeAttributes,
};
use crate::adapters::http::{self, RateLimiter, RetryPolicy};
use crate::domain::{Candle, OhlcvTimeframe, TokenHolder, Trade};
use crate::ports::models::{MarketData, PoolDetail, TokenInfo, TrendingPool, TrendingWindow};
use crate::ports::sources::{PrimaryMarketSource, SourceError, SourceResult};

const PROVIDER: &str = "geckoterminal";

/// Pro API root; the public host works without a key at a lower budget
pub const DEFAULT_BASE_URL: &str = "https://pro-api.coingecko.com/api/v3";
const API_KEY_HEADER: &str = "x-cg-pro-api-key";

/// Upstream limits
pub const MAX_MULTI_ADDRESSES: usize = 50;
pub const MAX_TOP_HOLDERS: usize = 40;
pub const MAX_OHLCV_LIMIT: usize = 1000;
pub const TRENDING_PAGE_SIZE: usize = 20;
const MAX_TRENDING_PAGES: usize = 10;

/// Configuration for the GeckoTerminal client
#[derive(Debug, Clone)]
pub struct GeckoTerminalConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Network slug in resource paths
    pub network: String,
    /// Request timeout
    pub timeout: Duration,
    /// Minimum spacing between requests
    pub min_request_interval: Duration,
    pub requests_per_minute: u32,
    /// Attempts per request including the first
    pub max_retries: u32,
    /// Base delay for backoff (milliseconds)
    pub retry_base_delay_ms: u64,
}

impl Default for GeckoTerminalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            network: "solana".to_string(),
            timeout: Duration::from_millis(10_000),
            min_request_interval: Duration::from_millis(100),
            requests_per_minute: 500,
            max_retries: 3,
            retry_base_delay_ms: 250,
        }
    }
}

impl GeckoTerminalConfig {
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

    pub fn with_rate_limit(mut self, requests_per_minute: u32, min_interval: Duration) -> Self {
        self.requests_per_minute = requests_per_minute;
        self.min_request_interval = min_interval;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// HTTP client for the on-chain market endpoints
#[derive(Debug, Clone)]
pub struct GeckoTerminalClient {
    config: GeckoTerminalConfig,
    http: Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl GeckoTerminalClient {
    pub fn new(config: GeckoTerminalConfig) -> SourceResult<Self> {
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

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Time allowed for one trending page, retries included
    fn page_budget(&self) -> Duration {
        let attempts = self.config.max_retries.max(1);
        self.config.timeout * attempts
            + Duration::from_millis(self.config.retry_base_delay_ms) * attempts
    }

    fn network_path(&self, rest: &str) -> String {
        format!(
            "{}/onchain/networks/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.network,
            rest
        )
    }

    /// Throttled GET returning the decoded body, or None on 404
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> SourceResult<Option<T>> {
        self.rate_limiter.lock().await.wait_if_needed().await;

        let policy = RetryPolicy::new(self.config.max_retries, self.config.retry_base_delay_ms);
        let response = http::execute_with_retry(PROVIDER, policy, || {
            let mut request = self
                .http
                .get(url)
                .header("accept", "application/json")
                .query(query);
            if let Some(key) = &self.config.api_key {
                request = request.header(API_KEY_HEADER, key);
            }
            request.send()
        })
        .await?;

        match response {
            Some(response) => http::read_json(response).await.map(Some),
            None => {
                tracing::debug!(url, "Not found upstream");
                Ok(None)
            }
        }
    }

    async fn fetch_multi_chunk(&self, mints: &[String]) -> SourceResult<Vec<MarketData>> {
        let url = self.network_path(&format!("tokens/multi/{}", mints.join(",")));
        let doc: Option<Document<Vec<Resource<TokenAttributes>>>> = self
            .get_json(&url, &[("include", "top_pools".to_string())])
            .await?;

        let Some(doc) = doc else {
            return Ok(Vec::new());
        };
        Ok(doc
            .data
            .unwrap_or_default()
            .iter()
            .filter_map(|token| token.to_market_data(None, &doc.included))
            .collect())
    }

    async fn fetch_trending_page(
        &self,
        page: usize,
        window: TrendingWindow,
    ) -> SourceResult<Vec<TrendingPool>> {
        let url = self.network_path("trending_pools");
        let doc: Option<Document<Vec<Resource<PoolAttributes>>>> = self
            .get_json(
                &url,
                &[
                    ("include", "base_token,quote_token,dex".to_string()),
                    ("page", page.to_string()),
                    ("duration", window.as_str().to_string()),
                ],
            )
            .await?;

        Ok(doc
            .and_then(|d| d.data)
            .unwrap_or_default()
            .iter()
            .filter_map(|pool| pool.to_trending_pool())
            .collect())
    }
}

/// Page through trending pools until `limit` unique base tokens are collected.
///
/// Each page runs under its own timeout. A failed page ends paging; the pools
/// from earlier pages are kept, and the error is returned only when nothing
/// was collected.
async fn collect_trending_pages<F, Fut>(
    limit: usize,
    page_timeout: Duration,
    mut fetch_page: F,
) -> SourceResult<Vec<TrendingPool>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = SourceResult<Vec<TrendingPool>>>,
{
    let pages = limit.div_ceil(TRENDING_PAGE_SIZE).clamp(1, MAX_TRENDING_PAGES);
    let mut seen = HashSet::new();
    let mut pools = Vec::new();

    for page in 1..=pages {
        let result = tokio::time::timeout(page_timeout, fetch_page(page))
            .await
            .unwrap_or(Err(SourceError::Timeout));
        let batch = match result {
            Ok(batch) => batch,
            Err(e) if pools.is_empty() => return Err(e),
            Err(e) => {
                tracing::warn!(page, error = %e, kept = pools.len(), "Trending page failed, stopping early");
                break;
            }
        };
        if batch.is_empty() {
            break;
        }

        for pool in batch {
            if seen.insert(pool.base_token_mint.clone()) {
                pools.push(pool);
            }
        }
        if pools.len() >= limit {
            break;
        }
    }

    pools.truncate(limit);
    Ok(pools)
}

#[async_trait]
impl PrimaryMarketSource for GeckoTerminalClient {
    async fn fetch_token_info(&self, mint: &str) -> SourceResult<Option<TokenInfo>> {
        let url = self.network_path(&format!("tokens/{}/info", mint));
        let doc: Option<Document<Resource<TokenInfoAttributes>>> = self.get_json(&url, &[]).await?;
        Ok(doc.and_then(|d| d.data).map(|r| r.attributes.into()))
    }

    async fn fetch_token_market_data(&self, mint: &str) -> SourceResult<Option<MarketData>> {
        let url = self.network_path(&format!("tokens/{}", mint));
        let doc: Option<Document<Resource<TokenAttributes>>> = self
            .get_json(&url, &[("include", "top_pools".to_string())])
            .await?;

        Ok(doc.and_then(|doc| {
            doc.data
                .as_ref()
                .and_then(|token| token.to_market_data(Some(mint), &doc.included))
        }))
    }

    async fn fetch_multiple_market_data(&self, mints: &[String]) -> SourceResult<Vec<MarketData>> {
        let mut results = Vec::with_capacity(mints.len());
        for chunk in mints.chunks(MAX_MULTI_ADDRESSES) {
            results.extend(self.fetch_multi_chunk(chunk).await?);
        }
        Ok(results)
    }

    async fn fetch_pool_detail(&self, pool_address: &str) -> SourceResult<Option<PoolDetail>> {
        let url = self.network_path(&format!("pools/{}", pool_address));
        let doc: Option<Document<Resource<PoolAttributes>>> = self.get_json(&url, &[]).await?;
        Ok(doc.and_then(|d| d.data).and_then(|pool| pool.to_pool_detail()))
    }

    async fn fetch_top_holders(&self, mint: &str, count: usize) -> SourceResult<Vec<TokenHolder>> {
        let url = self.network_path(&format!("tokens/{}/top_holders", mint));
        let count = count.clamp(1, MAX_TOP_HOLDERS);
        let doc: Option<Document<Resource<TopHoldersAttributes>>> = self
            .get_json(&url, &[("holders", count.to_string())])
            .await?;

        let mut holders = doc
            .and_then(|d| d.data)
            .map(|r| r.attributes.into_holders())
            .unwrap_or_default();
        holders.truncate(count);
        Ok(holders)
    }

    async fn fetch_recent_trades(&self, mint: &str, min_volume_usd: f64) -> SourceResult<Vec<Trade>> {
        let url = self.network_path(&format!("tokens/{}/trades", mint));
        let doc: Option<Document<Vec<Resource<TradeAttributes>>>> = self
            .get_json(
                &url,
                &[("trade_volume_in_usd_greater_than", min_volume_usd.to_string())],
            )
            .await?;

        Ok(doc
            .and_then(|d| d.data)
            .unwrap_or_default()
            .into_iter()
            .map(|r| Trade::from(r.attributes))
            .collect())
    }

    async fn fetch_ohlcv(
        &self,
        mint: &str,
        timeframe: OhlcvTimeframe,
        limit: usize,
    ) -> SourceResult<Vec<Candle>> {
        let url = self.network_path(&format!("tokens/{}/ohlcv/{}", mint, timeframe.as_str()));
        let doc: Option<Document<Resource<OhlcvAttributes>>> = self
            .get_json(
                &url,
                &[
                    ("aggregate", "1".to_string()),
                    ("limit", limit.clamp(1, MAX_OHLCV_LIMIT).to_string()),
                    ("currency", "usd".to_string()),
                    ("include_empty_intervals", "false".to_string()),
                ],
            )
            .await?;

        Ok(doc
            .and_then(|d| d.data)
            .map(|r| r.attributes.into_candles())
            .unwrap_or_default())
    }

    async fn fetch_trending_pools(
        &self,
        limit: usize,
        window: TrendingWindow,
    ) -> SourceResult<Vec<TrendingPool>> {
        let pools = collect_trending_pages(limit, self.page_budget(), move |page| {
            self.fetch_trending_page(page, window)
        })
        .await?;
        tracing::debug!(count = pools.len(), window = window.as_str(), "Fetched trending pools");
        Ok(pools)
    }
}
