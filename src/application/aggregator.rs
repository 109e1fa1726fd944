//! Token Aggregator
//!
//! Fetches from the primary, on-chain and fallback sources, merges the
//! partial results into one snapshot, scores it and writes it through the
//! cache.
//!
//! Only the total absence of identity and market data for a mint is visible
//! to callers (`None`, or the mint dropped from a batch). Every other source
//! failure is logged and leaves its field absent.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use super::merge::{merge_snapshot, FallbackQuote, SourceBundle};
use crate::adapters::cache::TokenCache;
use crate::domain::{
    OhlcvAnalysis, OhlcvTimeframe, RecentTrades, RiskCalculator, RiskScorer, Token,
};
use crate::ports::cache::{token_key, TRENDING_KEY};
use crate::ports::models::{MarketData, PoolDetail, TrendingPool, TrendingWindow};
use crate::ports::sources::{
    FallbackMarketSource, OnchainSource, PrimaryMarketSource, SourceError, SourceResult,
};

/// Mints never reported as trending: wrapped SOL, USDC, USDT
pub const EXCLUDED_MINTS: [&str; 3] = [
    "So11111111111111111111111111111111111111112",
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
];

/// Last-resort trending list: BONK, JUP, WIF
pub const WELL_KNOWN_MINTS: [&str; 3] = [
    "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
    "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
    "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",
];

/// Upper bound on mints accepted by one `get_multiple_tokens` call
pub const MAX_BATCH_MINTS: usize = 100;

/// Aggregator tuning
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorConfig {
    /// Mints per batched market-data call
    pub batch_size: usize,
    /// Mints enriched together on the trending path
    pub trending_batch_size: usize,
    /// Budget for every single source call
    pub call_timeout: Duration,
    /// Pause between tokens of one trending sub-batch
    pub inter_token_delay: Duration,
    /// Pause between the trades and OHLCV requests of one trending token
    pub enrichment_delay: Duration,
    /// Pause between sub-batches
    pub inter_batch_delay: Duration,
    /// Wait before the single retry after a 429 on the trending path
    pub rate_limit_backoff: Duration,
    /// Minimum trade sizes (USD) tried in order
    pub trade_thresholds: Vec<f64>,
    /// Holders fetched for a single lookup
    pub top_holders: usize,
    /// Holders fetched per mint on the batch and trending paths
    pub batch_top_holders: usize,
    pub token_ttl: Duration,
    pub trending_ttl: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            trending_batch_size: 5,
            call_timeout: Duration::from_millis(10_000),
            inter_token_delay: Duration::from_millis(200),
            enrichment_delay: Duration::from_millis(500),
            inter_batch_delay: Duration::from_millis(1_000),
            rate_limit_backoff: Duration::from_millis(5_000),
            trade_thresholds: vec![10.0, 1.0],
            top_holders: 10,
            batch_top_holders: 5,
            token_ttl: Duration::from_secs(60),
            trending_ttl: Duration::from_secs(3_600),
        }
    }
}

impl AggregatorConfig {
    /// Same settings with every self-imposed pause removed
    pub fn without_delays(mut self) -> Self {
        self.inter_token_delay = Duration::ZERO;
        self.enrichment_delay = Duration::ZERO;
        self.inter_batch_delay = Duration::ZERO;
        self.rate_limit_backoff = Duration::ZERO;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_ttls(mut self, token_ttl: Duration, trending_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self.trending_ttl = trending_ttl;
        self
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

/// Log a failed source call and continue with an empty value
fn absorb<T: Default>(source: &'static str, mint: &str, result: SourceResult<T>) -> T {
    result.unwrap_or_else(|e| {
        tracing::warn!(mint = %mint, source, error = %e, "Source call failed, continuing without it");
        T::default()
    })
}

/// Outcome of a cascade in which no step produced data
#[derive(Debug, Default)]
struct CascadeFailures {
    any_answered: bool,
    rate_limited: Option<SourceError>,
    last_error: Option<SourceError>,
}

impl CascadeFailures {
    fn answered(&mut self) {
        self.any_answered = true;
    }

    fn record(&mut self, error: SourceError) {
        if error.is_rate_limited() {
            self.rate_limited = Some(error.clone());
        }
        self.last_error = Some(error);
    }

    /// A rate limit anywhere is reported so callers may back off and retry;
    /// other errors only when no step answered at all
    fn into_result<T>(self) -> SourceResult<Option<T>> {
        if let Some(e) = self.rate_limited {
            return Err(e);
        }
        match self.last_error {
            Some(e) if !self.any_answered => Err(e),
            _ => Ok(None),
        }
    }
}

/// Multi-source token aggregator
pub struct TokenAggregator {
    primary: Arc<dyn PrimaryMarketSource>,
    onchain: Arc<dyn OnchainSource>,
    fallback: Arc<dyn FallbackMarketSource>,
    cache: TokenCache,
    scorer: Arc<dyn RiskScorer>,
    config: AggregatorConfig,
}

impl TokenAggregator {
    pub fn new(
        primary: Arc<dyn PrimaryMarketSource>,
        onchain: Arc<dyn OnchainSource>,
        fallback: Arc<dyn FallbackMarketSource>,
        cache: TokenCache,
    ) -> Self {
        Self {
            primary,
            onchain,
            fallback,
            cache,
            scorer: Arc::new(RiskCalculator::new()),
            config: AggregatorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AggregatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn RiskScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run one source call under the per-call timeout budget
    async fn bounded<T, F>(&self, fut: F) -> SourceResult<T>
    where
        F: Future<Output = SourceResult<T>>,
    {
        tokio::time::timeout(self.config.call_timeout, fut)
            .await
            .unwrap_or(Err(SourceError::Timeout))
    }

    fn score(&self, bundle: SourceBundle, mint: &str) -> Token {
        let snapshot = merge_snapshot(mint, bundle);
        let risk_score = self.scorer.score(&snapshot);
        Token::new(snapshot, risk_score)
    }

    // ========================================================================
    // Single token

    /// Complete, scored snapshot for one mint; None when no source knows it
    pub async fn get_complete_token_data(&self, mint: &str) -> Option<Token> {
        let key = token_key(mint);
        if let Some(token) = self.cache.get::<Token>(&key).await {
            return Some(token);
        }

        tracing::debug!(mint = %mint, "Aggregating token data");

        let (info, market, supply, authorities, holders, trades, ohlcv) = tokio::join!(
            self.bounded(self.primary.fetch_token_info(mint)),
            self.bounded(self.primary.fetch_token_market_data(mint)),
            self.bounded(self.onchain.fetch_onchain_supply(mint)),
            self.bounded(self.onchain.fetch_onchain_authorities(mint)),
            self.bounded(self.primary.fetch_top_holders(mint, self.config.top_holders)),
            self.fetch_trades_cascade(mint),
            self.fetch_ohlcv_cascade(mint),
        );

        let mut bundle = SourceBundle {
            info: absorb("token_info", mint, info),
            market: absorb("market_data", mint, market),
            supply: absorb("onchain_supply", mint, supply),
            onchain_authorities: absorb("onchain_authorities", mint, authorities),
            holders: absorb("top_holders", mint, holders),
            recent_trades: absorb("recent_trades", mint, trades),
            ohlcv: absorb("ohlcv", mint, ohlcv),
            ..Default::default()
        };

        if !bundle.has_primary() {
            tracing::info!(
                mint = %mint,
                has_info = bundle.info.is_some(),
                has_market = bundle.market.is_some(),
                "Primary source incomplete, trying fallback"
            );
            bundle.fallback = self.fetch_fallback(mint).await;
        }

        if !bundle.has_identity() {
            tracing::info!(mint = %mint, "No source has data for token");
            return None;
        }

        bundle.pool_detail = self.fetch_pool_detail(mint, bundle.market.as_ref()).await;

        let token = self.score(bundle, mint);
        tracing::info!(
            mint = %mint,
            symbol = %token.symbol(),
            score = token.risk_score.total_score,
            level = %token.risk_level(),
            "Token aggregated"
        );

        self.cache.set(&key, &token, Some(self.config.token_ttl)).await;
        Some(token)
    }

    /// Fallback overview plus price; both are needed
    async fn fetch_fallback(&self, mint: &str) -> Option<FallbackQuote> {
        let (overview, price) = tokio::join!(
            self.bounded(self.fallback.fetch_token_overview(mint)),
            self.bounded(self.fallback.fetch_price(mint)),
        );
        let overview = absorb("fallback_overview", mint, overview)?;
        let price = absorb("fallback_price", mint, price)?;
        Some(FallbackQuote { overview, price })
    }

    /// Enhanced detail for the representative pool; failure keeps the basic pool
    async fn fetch_pool_detail(&self, mint: &str, market: Option<&MarketData>) -> Option<PoolDetail> {
        let pool = market?.top_pool.as_ref()?;
        let detail = absorb(
            "pool_detail",
            mint,
            self.bounded(self.primary.fetch_pool_detail(&pool.address)).await,
        );
        if detail.is_none() {
            tracing::debug!(mint = %mint, pool = %pool.address, "No pool detail, keeping basic pool");
        }
        detail
    }

    /// Recent trades at each threshold in turn until one returns trades
    async fn fetch_trades_cascade(&self, mint: &str) -> SourceResult<Option<RecentTrades>> {
        let mut failures = CascadeFailures::default();
        for &threshold in &self.config.trade_thresholds {
            match self
                .bounded(self.primary.fetch_recent_trades(mint, threshold))
                .await
            {
                Ok(trades) if !trades.is_empty() => {
                    return Ok(Some(RecentTrades::from_trades(trades, threshold)));
                }
                Ok(_) => {
                    failures.answered();
                    tracing::debug!(mint = %mint, threshold, "No trades above threshold");
                }
                Err(e) => {
                    tracing::warn!(mint = %mint, threshold, error = %e, "Trades request failed, lowering threshold");
                    failures.record(e);
                }
            }
        }
        failures.into_result()
    }

    /// Candles at day, hour, then minute resolution until one has data
    async fn fetch_ohlcv_cascade(&self, mint: &str) -> SourceResult<Option<OhlcvAnalysis>> {
        let mut failures = CascadeFailures::default();
        for timeframe in OhlcvTimeframe::CASCADE {
            match self
                .bounded(self.primary.fetch_ohlcv(mint, timeframe, timeframe.default_limit()))
                .await
            {
                Ok(candles) if !candles.is_empty() => {
                    return Ok(Some(OhlcvAnalysis::from_candles(timeframe, candles)));
                }
                Ok(_) => {
                    failures.answered();
                    tracing::debug!(mint = %mint, timeframe = timeframe.as_str(), "No candles");
                }
                Err(e) => {
                    tracing::warn!(
                        mint = %mint,
                        timeframe = timeframe.as_str(),
                        error = %e,
                        "OHLCV request failed, trying finer timeframe"
                    );
                    failures.record(e);
                }
            }
        }
        failures.into_result()
    }

    // ========================================================================
    // Batch

    /// Scored snapshots for many mints; mints without primary data are dropped
    pub async fn get_multiple_tokens(&self, mints: &[String]) -> Vec<Token> {
        let mut seen = HashSet::new();
        let mut unique: Vec<String> = mints
            .iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && seen.insert(m.clone()))
            .collect();

        if unique.is_empty() {
            return Vec::new();
        }
        if unique.len() > MAX_BATCH_MINTS {
            tracing::warn!(
                requested = unique.len(),
                max = MAX_BATCH_MINTS,
                "Too many mints in one request, truncating"
            );
            unique.truncate(MAX_BATCH_MINTS);
        }

        let batch_size = self.config.batch_size.max(1);
        let batch_count = unique.len().div_ceil(batch_size);
        let mut tokens = Vec::with_capacity(unique.len());

        for (index, batch) in unique.chunks(batch_size).enumerate() {
            tokens.extend(self.process_batch(batch).await);
            if index + 1 < batch_count {
                pause(self.config.inter_batch_delay).await;
            }
        }

        tracing::info!(requested = unique.len(), returned = tokens.len(), "Batch aggregated");
        tokens
    }

    async fn process_batch(&self, mints: &[String]) -> Vec<Token> {
        let market_data = absorb(
            "multi_market_data",
            "batch",
            self.bounded(self.primary.fetch_multiple_market_data(mints)).await,
        );

        let per_mint = join_all(mints.iter().map(|mint| {
            let market = market_data.iter().find(|m| &m.mint == mint).cloned();
            async move {
                let (info, holders, detail) = tokio::join!(
                    self.bounded(self.primary.fetch_token_info(mint)),
                    self.bounded(self.primary.fetch_top_holders(mint, self.config.batch_top_holders)),
                    self.fetch_pool_detail(mint, market.as_ref()),
                );
                SourceBundle {
                    info: absorb("token_info", mint, info),
                    market,
                    holders: absorb("top_holders", mint, holders),
                    pool_detail: detail,
                    ..Default::default()
                }
            }
        }))
        .await;

        mints
            .iter()
            .zip(per_mint)
            .filter_map(|(mint, bundle)| {
                if !bundle.has_primary() {
                    tracing::debug!(mint = %mint, "Dropping mint without primary data from batch");
                    return None;
                }
                Some(self.score(bundle, mint))
            })
            .collect()
    }

    // ========================================================================
    // Trending

    /// Trending tokens: cache, then a live fetch, then the well-known list
    pub async fn get_trending_tokens(&self, limit: usize) -> Vec<Token> {
        if let Some(mut cached) = self.cache.get::<Vec<Token>>(TRENDING_KEY).await {
            cached.truncate(limit);
            return cached;
        }
        self.refresh_trending_tokens(limit).await
    }

    /// Live trending fetch that skips the cache read and writes the result through
    pub async fn refresh_trending_tokens(&self, limit: usize) -> Vec<Token> {
        if limit == 0 {
            return Vec::new();
        }

        // paged upstream; the source bounds each page itself
        let pools = match self
            .primary
            .fetch_trending_pools(limit * 2, TrendingWindow::H24)
            .await
        {
            Ok(pools) => pools,
            Err(e) => {
                tracing::warn!(error = %e, "Trending fetch failed, using well-known tokens");
                return self.well_known_tokens().await;
            }
        };

        let mut seen = HashSet::new();
        let candidates: Vec<TrendingPool> = pools
            .into_iter()
            .filter(|p| !EXCLUDED_MINTS.contains(&p.base_token_mint.as_str()))
            .filter(|p| seen.insert(p.base_token_mint.clone()))
            .take(limit)
            .collect();

        if candidates.is_empty() {
            tracing::warn!("No trending pools, using well-known tokens");
            return self.well_known_tokens().await;
        }

        let batch_size = self.config.trending_batch_size.max(1);
        let batch_count = candidates.len().div_ceil(batch_size);
        let mut tokens = Vec::with_capacity(candidates.len());

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            tokens.extend(self.process_trending_batch(batch).await);
            if index + 1 < batch_count {
                pause(self.config.inter_batch_delay).await;
            }
        }

        if tokens.is_empty() {
            tracing::warn!("Trending enrichment produced no tokens, using well-known tokens");
            return self.well_known_tokens().await;
        }

        tracing::info!(count = tokens.len(), "Trending tokens refreshed");
        self.cache
            .set(TRENDING_KEY, &tokens, Some(self.config.trending_ttl))
            .await;
        tokens
    }

    async fn process_trending_batch(&self, batch: &[TrendingPool]) -> Vec<Token> {
        let mints: Vec<String> = batch.iter().map(|p| p.base_token_mint.clone()).collect();

        let infos = join_all(mints.iter().map(|mint| async move {
            absorb(
                "token_info",
                mint,
                self.bounded(self.primary.fetch_token_info(mint)).await,
            )
        }))
        .await;
        let market_data = absorb(
            "multi_market_data",
            "trending",
            self.bounded(self.primary.fetch_multiple_market_data(&mints)).await,
        );
        let holders = join_all(mints.iter().map(|mint| async move {
            absorb(
                "top_holders",
                mint,
                self.bounded(self.primary.fetch_top_holders(mint, self.config.batch_top_holders))
                    .await,
            )
        }))
        .await;

        let mut tokens = Vec::with_capacity(batch.len());
        let entries = batch.iter().zip(infos).zip(holders);
        for (index, ((trending, info), holders)) in entries.enumerate() {
            let mint = trending.base_token_mint.as_str();
            let market = market_data.iter().find(|m| m.mint == mint).cloned();

            let (Some(info), Some(mut market)) = (info, market) else {
                tracing::warn!(mint = %mint, "Missing primary data for trending token");
                continue;
            };

            let recent_trades = self
                .retry_once_if_rate_limited("recent_trades", mint, || self.fetch_trades_cascade(mint))
                .await;
            pause(self.config.enrichment_delay).await;
            let ohlcv = self
                .retry_once_if_rate_limited("ohlcv", mint, || self.fetch_ohlcv_cascade(mint))
                .await;

            // the trending response already carries the pool with its windows
            market.top_pool = Some(trending.pool.clone());

            let bundle = SourceBundle {
                info: Some(info),
                market: Some(market),
                holders,
                recent_trades,
                ohlcv,
                ..Default::default()
            };
            tokens.push(self.score(bundle, mint));

            if index + 1 < batch.len() {
                pause(self.config.inter_token_delay).await;
            }
        }
        tokens
    }

    /// Best-effort enrichment with one retry after the rate-limit backoff
    async fn retry_once_if_rate_limited<T, F, Fut>(
        &self,
        source: &'static str,
        mint: &str,
        fetch: F,
    ) -> Option<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = SourceResult<Option<T>>>,
    {
        match fetch().await {
            Ok(value) => value,
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(
                    mint = %mint,
                    source,
                    backoff_ms = self.config.rate_limit_backoff.as_millis() as u64,
                    "Rate limited, retrying once"
                );
                pause(self.config.rate_limit_backoff).await;
                absorb(source, mint, fetch().await)
            }
            Err(e) => absorb(source, mint, Err(e)),
        }
    }

    async fn well_known_tokens(&self) -> Vec<Token> {
        let mints: Vec<String> = WELL_KNOWN_MINTS.iter().map(|m| m.to_string()).collect();
        self.get_multiple_tokens(&mints).await
    }
}

impl std::fmt::Debug for TokenAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAggregator")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Candle, HoneypotFlag, Trade, TradeKind};
    use crate::ports::mocks::{FakeFallbackSource, FakeOnchainSource, FakePrimarySource};
    use crate::ports::models::{FallbackOverview, PoolRef, TokenInfo};

    const MINT: &str = "TestMint1111111111111111111111111111111111";

    fn create_info(symbol: &str) -> TokenInfo {
        TokenInfo {
            name: format!("{} Token", symbol),
            symbol: symbol.to_string(),
            holder_count: 500,
            top10_percentage: 30.0,
            gt_score: 70.0,
            is_honeypot: HoneypotFlag::No,
            ..Default::default()
        }
    }

    fn create_market(mint: &str, pool: Option<&str>) -> MarketData {
        MarketData {
            mint: mint.to_string(),
            price_usd: 0.01,
            market_cap_usd: 250_000.0,
            volume_24h: 40_000.0,
            price_change_24h: Some(4.0),
            top_pool: pool.map(|address| PoolRef {
                address: address.to_string(),
                reserve_usd: 30_000.0,
                volume_24h: 40_000.0,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn create_trade(volume_usd: f64) -> Trade {
        Trade {
            kind: TradeKind::Buy,
            volume_usd,
            tx_from_address: "Trader1111111111111111111111111111111111111".to_string(),
            tx_hash: None,
            block_timestamp: None,
        }
    }

    fn create_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle {
                timestamp: 1_700_000_000 + i as i64 * 3_600,
                open: 1.0,
                high: 1.1,
                low: 0.9,
                close: 1.0 + i as f64 * 0.01,
                volume: 1_000.0,
            })
            .collect()
    }

    fn create_aggregator(
        primary: FakePrimarySource,
        onchain: FakeOnchainSource,
        fallback: FakeFallbackSource,
        cache: TokenCache,
    ) -> TokenAggregator {
        TokenAggregator::new(Arc::new(primary), Arc::new(onchain), Arc::new(fallback), cache)
            .with_config(AggregatorConfig::default().without_delays())
    }

    #[tokio::test]
    async fn test_complete_token_from_primary() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, Some("Pool111")));
        let onchain = FakeOnchainSource::new().with_supply(MINT, 1_000_000_000);

        let aggregator = create_aggregator(primary, onchain, FakeFallbackSource::new(), TokenCache::disabled());
        let token = aggregator.get_complete_token_data(MINT).await.unwrap();

        assert_eq!(token.symbol(), "TST");
        assert_eq!(token.snapshot.total_supply, Some(1_000_000_000));
        assert_eq!(token.snapshot.total_liquidity, 30_000.0);
        assert_eq!(token.risk_score.total_score, token.risk_score.breakdown.total());
    }

    #[tokio::test]
    async fn test_cache_hit_skips_sources() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None));
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::in_memory(16),
        );

        assert!(aggregator.get_complete_token_data(MINT).await.is_some());
        let calls = primary.call_count("token_info");
        assert!(aggregator.get_complete_token_data(MINT).await.is_some());
        assert_eq!(primary.call_count("token_info"), calls);
    }

    #[tokio::test]
    async fn test_unknown_mint_is_none() {
        let fallback = FakeFallbackSource::new();
        let aggregator = create_aggregator(
            FakePrimarySource::new(),
            FakeOnchainSource::new(),
            fallback.clone(),
            TokenCache::disabled(),
        );

        assert!(aggregator.get_complete_token_data(MINT).await.is_none());
        assert_eq!(fallback.get_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_used_when_market_missing() {
        let primary = FakePrimarySource::new().with_token_info(MINT, create_info("TST"));
        let fallback = FakeFallbackSource::new().with_token(
            MINT,
            FallbackOverview {
                holder_count: 77,
                volume_24h: 9_000.0,
                ..Default::default()
            },
            0.5,
        );
        let aggregator = create_aggregator(primary, FakeOnchainSource::new(), fallback, TokenCache::disabled());

        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        assert_eq!(token.symbol(), "TST");
        assert_eq!(token.snapshot.price, 0.5);
        assert_eq!(token.snapshot.volume_24h, 9_000.0);
    }

    #[tokio::test]
    async fn test_onchain_failure_is_absorbed() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None));
        let aggregator = create_aggregator(
            primary,
            FakeOnchainSource::new().failing(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        assert!(token.snapshot.total_supply.is_none());
        assert!(token.snapshot.authorities.is_none());
    }

    #[tokio::test]
    async fn test_slow_source_times_out() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None))
            .with_delay(Duration::from_millis(200));
        let aggregator = TokenAggregator::new(
            Arc::new(primary),
            Arc::new(FakeOnchainSource::new()),
            Arc::new(FakeFallbackSource::new()),
            TokenCache::disabled(),
        )
        .with_config(
            AggregatorConfig::default()
                .without_delays()
                .with_call_timeout(Duration::from_millis(20)),
        );

        // info timed out; market data alone still yields a snapshot
        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        assert_eq!(token.symbol(), "UNKNOWN");
        assert_eq!(token.snapshot.price, 0.01);
    }

    #[tokio::test]
    async fn test_trades_cascade_lowers_threshold() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None))
            .with_trades(MINT, 1.0, vec![create_trade(2.5), create_trade(4.0)]);
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        let trades = token.snapshot.recent_trades.unwrap();
        assert_eq!(trades.min_volume_usd, 1.0);
        assert_eq!(trades.total_trades(), 2);
        assert_eq!(primary.call_count("recent_trades"), 2);
    }

    #[tokio::test]
    async fn test_ohlcv_cascade_falls_through_to_hour() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None))
            .with_ohlcv(MINT, OhlcvTimeframe::Hour, create_candles(24));
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        let ohlcv = token.snapshot.ohlcv.unwrap();
        assert_eq!(ohlcv.timeframe, OhlcvTimeframe::Hour);
        assert_eq!(ohlcv.data_points(), 24);
        assert!(!primary.get_calls().iter().any(|c| c.ends_with("@minute")));
    }

    #[tokio::test]
    async fn test_trades_cascade_continues_after_error() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None))
            .with_trade_error(SourceError::Upstream { provider: "primary".to_string(), status: 503 })
            .with_trades(MINT, 1.0, vec![create_trade(3.0)]);
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        let trades = token.snapshot.recent_trades.unwrap();
        assert_eq!(trades.min_volume_usd, 1.0);
        assert_eq!(trades.total_trades(), 1);
        assert_eq!(primary.call_count("recent_trades"), 2);
    }

    #[tokio::test]
    async fn test_ohlcv_cascade_continues_after_error() {
        let primary = FakePrimarySource::new()
            .with_token_info(MINT, create_info("TST"))
            .with_market_data(create_market(MINT, None))
            .with_ohlcv_error(SourceError::Timeout)
            .with_ohlcv(MINT, OhlcvTimeframe::Hour, create_candles(24));
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let token = aggregator.get_complete_token_data(MINT).await.unwrap();
        let ohlcv = token.snapshot.ohlcv.unwrap();
        assert_eq!(ohlcv.timeframe, OhlcvTimeframe::Hour);
        assert_eq!(primary.call_count("ohlcv"), 2);
    }

    #[test]
    fn test_cascade_failures_outcome() {
        let mut all_failed = CascadeFailures::default();
        all_failed.record(SourceError::Timeout);
        all_failed.record(SourceError::Transport("reset".to_string()));
        assert!(matches!(all_failed.into_result::<()>(), Err(SourceError::Transport(_))));

        let mut partly_answered = CascadeFailures::default();
        partly_answered.record(SourceError::Timeout);
        partly_answered.answered();
        assert_eq!(partly_answered.into_result::<()>(), Ok(None));

        let mut rate_limited = CascadeFailures::default();
        rate_limited.record(SourceError::RateLimited("primary".to_string()));
        rate_limited.answered();
        assert!(matches!(rate_limited.into_result::<()>(), Err(SourceError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_batch_drops_incomplete_mints() {
        let complete = "CompleteMint";
        let no_info = "NoInfoMint";
        let primary = FakePrimarySource::new()
            .with_token_info(complete, create_info("CMP"))
            .with_market_data(create_market(complete, Some("PoolA")))
            .with_market_data(create_market(no_info, None));
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let mints = vec![complete.to_string(), no_info.to_string(), complete.to_string()];
        let tokens = aggregator.get_multiple_tokens(&mints).await;

        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].mint(), complete);
        // batch path never reaches the enrichment sources
        assert_eq!(primary.call_count("recent_trades"), 0);
        assert_eq!(primary.call_count("ohlcv"), 0);
    }

    #[tokio::test]
    async fn test_batch_is_chunked() {
        let mints: Vec<String> = (0..7).map(|i| format!("Mint{}", i)).collect();
        let mut primary = FakePrimarySource::new();
        for mint in &mints {
            primary = primary
                .with_token_info(mint, create_info("B"))
                .with_market_data(create_market(mint, None));
        }
        let aggregator = TokenAggregator::new(
            Arc::new(primary.clone()),
            Arc::new(FakeOnchainSource::new()),
            Arc::new(FakeFallbackSource::new()),
            TokenCache::disabled(),
        )
        .with_config(AggregatorConfig::default().without_delays().with_batch_size(3));

        let tokens = aggregator.get_multiple_tokens(&mints).await;
        assert_eq!(tokens.len(), 7);
        assert_eq!(primary.call_count("multi_market_data"), 3);
    }

    #[tokio::test]
    async fn test_trending_error_uses_well_known_list() {
        let primary = FakePrimarySource::new()
            .with_trending_error(SourceError::RateLimited("primary".to_string()));
        let cache = TokenCache::in_memory(16);
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            cache.clone(),
        );

        let tokens = aggregator.get_trending_tokens(10).await;
        assert!(tokens.is_empty());
        assert_eq!(primary.call_count("token_info"), WELL_KNOWN_MINTS.len());
        assert!(cache.get::<Vec<Token>>(TRENDING_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_rate_limited_trades_retry_once() {
        let mint = "TrendMint";
        let primary = FakePrimarySource::new()
            .with_trending(vec![TrendingPool {
                base_token_mint: mint.to_string(),
                pool_name: None,
                price_usd: None,
                market_cap_usd: None,
                fdv_usd: None,
                price_change_24h: None,
                pool: PoolRef {
                    address: "TrendPool".to_string(),
                    reserve_usd: 12_000.0,
                    ..Default::default()
                },
            }])
            .with_token_info(mint, create_info("TRD"))
            .with_market_data(create_market(mint, None))
            .with_trade_error(SourceError::RateLimited("primary".to_string()))
            .with_trades(mint, 10.0, vec![create_trade(50.0)]);
        let aggregator = create_aggregator(
            primary.clone(),
            FakeOnchainSource::new(),
            FakeFallbackSource::new(),
            TokenCache::disabled(),
        );

        let tokens = aggregator.refresh_trending_tokens(5).await;
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].snapshot.recent_trades.is_some());
        assert_eq!(tokens[0].snapshot.total_liquidity, 12_000.0);
        // $10 rate limited, $1 empty, then the retried $10 request
        assert_eq!(primary.call_count("recent_trades"), 3);
    }
}
