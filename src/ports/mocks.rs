//! In-memory fakes for the data-source ports
//!
//! Each fake records the calls it receives and answers from canned responses
//! configured with builder methods. Used by unit and integration tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::models::{FallbackOverview, MarketData, PoolDetail, TokenInfo, TrendingPool, TrendingWindow};
use super::sources::{
    FallbackMarketSource, OnchainSource, PrimaryMarketSource, SourceError, SourceResult,
};
use crate::domain::{Candle, OhlcvTimeframe, TokenAuthorities, TokenHolder, Trade};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Threshold key: trade thresholds are compared by their cent value
fn threshold_key(min_volume_usd: f64) -> u64 {
    (min_volume_usd * 100.0).round() as u64
}

/// Fake primary market source
#[derive(Debug, Default, Clone)]
pub struct FakePrimarySource {
    calls: Arc<Mutex<Vec<String>>>,
    token_info: Arc<Mutex<HashMap<String, TokenInfo>>>,
    market_data: Arc<Mutex<HashMap<String, MarketData>>>,
    pool_details: Arc<Mutex<HashMap<String, PoolDetail>>>,
    holders: Arc<Mutex<HashMap<String, Vec<TokenHolder>>>>,
    trades: Arc<Mutex<HashMap<(String, u64), Vec<Trade>>>>,
    ohlcv: Arc<Mutex<HashMap<(String, OhlcvTimeframe), Vec<Candle>>>>,
    trending: Arc<Mutex<Vec<TrendingPool>>>,
    trending_error: Arc<Mutex<Option<SourceError>>>,
    info_errors: Arc<Mutex<HashMap<String, SourceError>>>,
    pool_errors: Arc<Mutex<HashSet<String>>>,
    /// Queued errors returned by fetch_recent_trades before real answers
    trade_errors: Arc<Mutex<VecDeque<SourceError>>>,
    /// Queued errors returned by fetch_ohlcv before real answers
    ohlcv_errors: Arc<Mutex<VecDeque<SourceError>>>,
    delay: Arc<Mutex<Option<Duration>>>,
}

impl FakePrimarySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token_info(self, mint: &str, info: TokenInfo) -> Self {
        lock(&self.token_info).insert(mint.to_string(), info);
        self
    }

    pub fn with_market_data(self, data: MarketData) -> Self {
        lock(&self.market_data).insert(data.mint.clone(), data);
        self
    }

    pub fn with_pool_detail(self, detail: PoolDetail) -> Self {
        lock(&self.pool_details).insert(detail.address.clone(), detail);
        self
    }

    pub fn with_holders(self, mint: &str, holders: Vec<TokenHolder>) -> Self {
        lock(&self.holders).insert(mint.to_string(), holders);
        self
    }

    pub fn with_trades(self, mint: &str, min_volume_usd: f64, trades: Vec<Trade>) -> Self {
        lock(&self.trades).insert((mint.to_string(), threshold_key(min_volume_usd)), trades);
        self
    }

    pub fn with_ohlcv(self, mint: &str, timeframe: OhlcvTimeframe, candles: Vec<Candle>) -> Self {
        lock(&self.ohlcv).insert((mint.to_string(), timeframe), candles);
        self
    }

    pub fn with_trending(self, pools: Vec<TrendingPool>) -> Self {
        *lock(&self.trending) = pools;
        self
    }

    pub fn with_trending_error(self, error: SourceError) -> Self {
        *lock(&self.trending_error) = Some(error);
        self
    }

    pub fn with_token_info_error(self, mint: &str, error: SourceError) -> Self {
        lock(&self.info_errors).insert(mint.to_string(), error);
        self
    }

    /// Make pool detail requests for this pool fail with a 503
    pub fn with_pool_detail_failure(self, pool_address: &str) -> Self {
        lock(&self.pool_errors).insert(pool_address.to_string());
        self
    }

    /// Queue an error to be returned by the next trade request
    pub fn with_trade_error(self, error: SourceError) -> Self {
        lock(&self.trade_errors).push_back(error);
        self
    }

    /// Queue an error to be returned by the next OHLCV request
    pub fn with_ohlcv_error(self, error: SourceError) -> Self {
        lock(&self.ohlcv_errors).push_back(error);
        self
    }

    /// Delay every token info response
    pub fn with_delay(self, delay: Duration) -> Self {
        *lock(&self.delay) = Some(delay);
        self
    }

    /// Get all recorded calls ("method:argument")
    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Number of recorded calls for one method
    pub fn call_count(&self, method: &str) -> usize {
        let prefix = format!("{}:", method);
        lock(&self.calls).iter().filter(|c| c.starts_with(&prefix)).count()
    }

    fn record(&self, method: &str, argument: impl std::fmt::Display) {
        lock(&self.calls).push(format!("{}:{}", method, argument));
    }
}

#[async_trait]
impl PrimaryMarketSource for FakePrimarySource {
    async fn fetch_token_info(&self, mint: &str) -> SourceResult<Option<TokenInfo>> {
        self.record("token_info", mint);
        let delay = *lock(&self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = lock(&self.info_errors).get(mint).cloned() {
            return Err(err);
        }
        Ok(lock(&self.token_info).get(mint).cloned())
    }

    async fn fetch_token_market_data(&self, mint: &str) -> SourceResult<Option<MarketData>> {
        self.record("market_data", mint);
        Ok(lock(&self.market_data).get(mint).cloned())
    }

    async fn fetch_multiple_market_data(&self, mints: &[String]) -> SourceResult<Vec<MarketData>> {
        self.record("multi_market_data", mints.len());
        let data = lock(&self.market_data);
        Ok(mints.iter().filter_map(|m| data.get(m).cloned()).collect())
    }

    async fn fetch_pool_detail(&self, pool_address: &str) -> SourceResult<Option<PoolDetail>> {
        self.record("pool_detail", pool_address);
        if lock(&self.pool_errors).contains(pool_address) {
            return Err(SourceError::Upstream {
                provider: "fake".to_string(),
                status: 503,
            });
        }
        Ok(lock(&self.pool_details).get(pool_address).cloned())
    }

    async fn fetch_top_holders(&self, mint: &str, count: usize) -> SourceResult<Vec<TokenHolder>> {
        self.record("top_holders", mint);
        Ok(lock(&self.holders)
            .get(mint)
            .map(|h| h.iter().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn fetch_recent_trades(&self, mint: &str, min_volume_usd: f64) -> SourceResult<Vec<Trade>> {
        self.record("recent_trades", format!("{}@{}", mint, min_volume_usd));
        if let Some(err) = lock(&self.trade_errors).pop_front() {
            return Err(err);
        }
        Ok(lock(&self.trades)
            .get(&(mint.to_string(), threshold_key(min_volume_usd)))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_ohlcv(
        &self,
        mint: &str,
        timeframe: OhlcvTimeframe,
        limit: usize,
    ) -> SourceResult<Vec<Candle>> {
        self.record("ohlcv", format!("{}@{}", mint, timeframe.as_str()));
        if let Some(err) = lock(&self.ohlcv_errors).pop_front() {
            return Err(err);
        }
        Ok(lock(&self.ohlcv)
            .get(&(mint.to_string(), timeframe))
            .map(|c| c.iter().take(limit).copied().collect())
            .unwrap_or_default())
    }

    async fn fetch_trending_pools(
        &self,
        limit: usize,
        window: TrendingWindow,
    ) -> SourceResult<Vec<TrendingPool>> {
        self.record("trending", format!("{}@{}", limit, window.as_str()));
        if let Some(err) = lock(&self.trending_error).clone() {
            return Err(err);
        }
        Ok(lock(&self.trending).iter().take(limit).cloned().collect())
    }
}

/// Fake on-chain source
#[derive(Debug, Default, Clone)]
pub struct FakeOnchainSource {
    calls: Arc<Mutex<Vec<String>>>,
    supply: Arc<Mutex<HashMap<String, u128>>>,
    authorities: Arc<Mutex<HashMap<String, TokenAuthorities>>>,
    failing: Arc<Mutex<bool>>,
}

impl FakeOnchainSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_supply(self, mint: &str, supply: u128) -> Self {
        lock(&self.supply).insert(mint.to_string(), supply);
        self
    }

    pub fn with_authorities(self, mint: &str, authorities: TokenAuthorities) -> Self {
        lock(&self.authorities).insert(mint.to_string(), authorities);
        self
    }

    /// Every request fails with a transport error
    pub fn failing(self) -> Self {
        *lock(&self.failing) = true;
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn check(&self, method: &str, mint: &str) -> SourceResult<()> {
        lock(&self.calls).push(format!("{}:{}", method, mint));
        if *lock(&self.failing) {
            return Err(SourceError::Transport("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl OnchainSource for FakeOnchainSource {
    async fn fetch_onchain_supply(&self, mint: &str) -> SourceResult<Option<u128>> {
        self.check("supply", mint)?;
        Ok(lock(&self.supply).get(mint).copied())
    }

    async fn fetch_onchain_authorities(&self, mint: &str) -> SourceResult<Option<TokenAuthorities>> {
        self.check("authorities", mint)?;
        Ok(lock(&self.authorities).get(mint).cloned())
    }
}

/// Fake fallback market source
#[derive(Debug, Default, Clone)]
pub struct FakeFallbackSource {
    calls: Arc<Mutex<Vec<String>>>,
    overviews: Arc<Mutex<HashMap<String, FallbackOverview>>>,
    prices: Arc<Mutex<HashMap<String, f64>>>,
}

impl FakeFallbackSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(self, mint: &str, overview: FallbackOverview, price: f64) -> Self {
        lock(&self.overviews).insert(mint.to_string(), overview);
        lock(&self.prices).insert(mint.to_string(), price);
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait]
impl FallbackMarketSource for FakeFallbackSource {
    async fn fetch_token_overview(&self, mint: &str) -> SourceResult<Option<FallbackOverview>> {
        lock(&self.calls).push(format!("overview:{}", mint));
        Ok(lock(&self.overviews).get(mint).cloned())
    }

    async fn fetch_price(&self, mint: &str) -> SourceResult<Option<f64>> {
        lock(&self.calls).push(format!("price:{}", mint));
        Ok(lock(&self.prices).get(mint).copied())
    }
}
