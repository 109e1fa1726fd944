//! Aggregation Integration Tests
//!
//! Drive the aggregator end to end with the in-crate fake sources:
//! 1. Scoring scenarios through the full fetch/merge/score path
//! 2. Fallback and not-found behaviour
//! 3. Cache neutrality
//! 4. Batch and trending paths
//! 5. Refresher non-reentrancy
//!
//! All tests are deterministic (no real network calls) and use zero delays.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use rugwatch::adapters::cache::TokenCache;
use rugwatch::application::{
    AggregatorConfig, BackgroundRefresher, RefreshOutcome, RefresherConfig, TokenAggregator,
    EXCLUDED_MINTS, WELL_KNOWN_MINTS,
};
use rugwatch::domain::{
    HoneypotFlag, HoneypotVerdict, RiskLevel, SignalType, TimeframeValues, TokenAuthorities,
    TokenHolder, TransactionWindows, TxCounts,
};
use rugwatch::ports::mocks::{FakeFallbackSource, FakeOnchainSource, FakePrimarySource};
use rugwatch::ports::{
    FallbackOverview, MarketData, PoolDetail, PoolRef, SourceError, TokenInfo, TrendingPool,
    TRENDING_KEY,
};

// ============================================================================
// Test Fixtures
// ============================================================================

const MINT: &str = "RiskMint11111111111111111111111111111111111";
const POOL: &str = "RiskPool11111111111111111111111111111111111";

fn create_info(symbol: &str) -> TokenInfo {
    TokenInfo {
        name: format!("{} Token", symbol),
        symbol: symbol.to_string(),
        holder_count: 2_000,
        top10_percentage: 25.0,
        authorities: Some(TokenAuthorities::renounced()),
        gt_score: 80.0,
        ..Default::default()
    }
}

fn create_pool(reserve_usd: f64, age_days: i64) -> PoolRef {
    PoolRef {
        address: POOL.to_string(),
        dex: Some("raydium".to_string()),
        reserve_usd,
        volume_24h: 0.0,
        created_at: Some(Utc::now() - chrono::Duration::days(age_days)),
        ..Default::default()
    }
}

fn create_market(mint: &str, volume_24h: f64, pool: Option<PoolRef>) -> MarketData {
    MarketData {
        mint: mint.to_string(),
        price_usd: 0.001,
        market_cap_usd: 500_000.0,
        volume_24h,
        price_change_24h: Some(1.0),
        top_pool: pool,
        ..Default::default()
    }
}

fn create_trending(mint: &str) -> TrendingPool {
    TrendingPool {
        base_token_mint: mint.to_string(),
        pool_name: Some(format!("{} / SOL", mint)),
        price_usd: Some(0.5),
        market_cap_usd: None,
        fdv_usd: None,
        price_change_24h: Some(3.0),
        pool: PoolRef {
            address: format!("{}-pool", mint),
            reserve_usd: 80_000.0,
            ..Default::default()
        },
    }
}

fn build_aggregator(
    primary: &FakePrimarySource,
    onchain: &FakeOnchainSource,
    fallback: &FakeFallbackSource,
    cache: TokenCache,
) -> TokenAggregator {
    TokenAggregator::new(
        Arc::new(primary.clone()),
        Arc::new(onchain.clone()),
        Arc::new(fallback.clone()),
        cache,
    )
    .with_config(AggregatorConfig::default().without_delays())
}

// ============================================================================
// Scoring scenarios
// ============================================================================

#[tokio::test]
async fn test_scenario_active_mint_authority_thin_pool() {
    let mut info = create_info("THIN");
    info.top10_percentage = 85.0;
    info.gt_score = 0.0;
    info.authorities = None;

    let primary = FakePrimarySource::new()
        .with_token_info(MINT, info)
        .with_market_data(create_market(MINT, 50.0, Some(create_pool(500.0, 3))));
    let onchain = FakeOnchainSource::new()
        .with_supply(MINT, 1_000_000_000_000_000)
        .with_authorities(
            MINT,
            TokenAuthorities::from_addresses(Some("MintAuthority111".to_string()), None),
        );
    let aggregator = build_aggregator(&primary, &onchain, &FakeFallbackSource::new(), TokenCache::disabled());

    let token = aggregator.get_complete_token_data(MINT).await.unwrap();
    let breakdown = &token.risk_score.breakdown;

    assert_eq!(breakdown.authority_risk.score, 15);
    assert!(breakdown.authority_risk.mint_authority_present);
    assert!(!breakdown.authority_risk.freeze_authority_present);
    assert_eq!(breakdown.concentration_risk.score, 20);
    assert!(breakdown.liquidity_risk.score >= 18);
    assert_eq!(token.risk_score.total_score, breakdown.total());
    assert_eq!(token.risk_level(), RiskLevel::Danger);
    assert!(token.risk_score.has_signal(SignalType::AuthorityControl));
    assert!(token.risk_score.has_signal(SignalType::HighConcentration));
}

#[tokio::test]
async fn test_scenario_sells_blocked_by_pool_detail() {
    let mut info = create_info("TRAP");
    info.is_honeypot = HoneypotFlag::Unknown;

    let detail = PoolDetail {
        address: POOL.to_string(),
        reserve_usd: Some(60_000.0),
        transactions: TransactionWindows {
            h24: Some(TxCounts { buys: 490, sells: 10, buyers: 300, sellers: 8 }),
            ..Default::default()
        },
        volume_usd: TimeframeValues { h24: Some(120_000.0), ..Default::default() },
        ..Default::default()
    };
    let primary = FakePrimarySource::new()
        .with_token_info(MINT, info)
        .with_market_data(create_market(MINT, 120_000.0, Some(create_pool(40_000.0, 20))))
        .with_pool_detail(detail);
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    let token = aggregator.get_complete_token_data(MINT).await.unwrap();
    let honeypot = &token.risk_score.breakdown.honeypot_risk;

    assert_eq!(honeypot.score, 30);
    assert_eq!(honeypot.is_honeypot, HoneypotVerdict::Yes);
    assert_eq!(token.snapshot.total_liquidity, 60_000.0);

    let signal = token.risk_score.signal(SignalType::HoneypotDetected).unwrap();
    assert!(token.risk_score.warnings.contains(&signal.message));
}

#[tokio::test]
async fn test_scenario_new_token_without_pool() {
    let mut info = create_info("NEW");
    info.gt_score = 0.0;

    let primary = FakePrimarySource::new()
        .with_token_info(MINT, info)
        .with_market_data(create_market(MINT, 5_000.0, None));
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    let token = aggregator.get_complete_token_data(MINT).await.unwrap();
    let breakdown = &token.risk_score.breakdown;

    assert!(token.snapshot.pools.is_empty());
    assert_eq!(breakdown.liquidity_risk.score, 20);
    assert_eq!(breakdown.gt_score_risk.score, 5);
    // no pool, so no creation time
    assert_eq!(breakdown.age_risk.score, 0);
    assert!(token.risk_score.has_signal(SignalType::LowLiquidity));
    // primary source pool call skipped without a pool reference
    assert_eq!(primary.call_count("pool_detail"), 0);
}

#[tokio::test]
async fn test_scenario_two_day_old_pool() {
    let mut info = create_info("NEW");
    info.gt_score = 0.0;

    let primary = FakePrimarySource::new()
        .with_token_info(MINT, info)
        .with_market_data(create_market(MINT, 5_000.0, Some(create_pool(0.0, 2))));
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    let token = aggregator.get_complete_token_data(MINT).await.unwrap();
    let breakdown = &token.risk_score.breakdown;

    assert_eq!(breakdown.age_risk.score, 8);
    assert_eq!(breakdown.liquidity_risk.score, 20);
    assert_eq!(breakdown.gt_score_risk.score, 5);
    assert!(token.risk_score.has_signal(SignalType::NewToken));
    assert!(token.risk_score.has_signal(SignalType::LowLiquidity));
}

// ============================================================================
// Fallback and not found
// ============================================================================

#[tokio::test]
async fn test_not_found_anywhere_is_none() {
    let primary = FakePrimarySource::new();
    let fallback = FakeFallbackSource::new();
    let aggregator = build_aggregator(&primary, &FakeOnchainSource::new(), &fallback, TokenCache::in_memory(8));

    assert!(aggregator.get_complete_token_data(MINT).await.is_none());
    assert!(fallback.get_calls().contains(&format!("overview:{}", MINT)));
}

#[tokio::test]
async fn test_primary_outage_served_by_fallback() {
    let primary = FakePrimarySource::new()
        .with_token_info_error(MINT, SourceError::Upstream { provider: "primary".into(), status: 503 });
    let onchain = FakeOnchainSource::new()
        .with_authorities(MINT, TokenAuthorities::from_flags(true, false));
    let fallback = FakeFallbackSource::new().with_token(
        MINT,
        FallbackOverview {
            holder_count: 321,
            volume_24h: 12_000.0,
            price_change_24h: -8.0,
            ..Default::default()
        },
        0.0042,
    );
    let aggregator = build_aggregator(&primary, &onchain, &fallback, TokenCache::disabled());

    let token = aggregator.get_complete_token_data(MINT).await.unwrap();
    assert_eq!(token.snapshot.name, "Unknown");
    assert_eq!(token.snapshot.symbol, "UNKNOWN");
    assert_eq!(token.snapshot.decimals, 9);
    assert_eq!(token.snapshot.price, 0.0042);
    assert_eq!(token.snapshot.holder_count, 321);
    assert_eq!(token.risk_score.breakdown.authority_risk.score, 15);
}

#[tokio::test]
async fn test_pool_detail_failure_keeps_basic_pool() {
    let primary = FakePrimarySource::new()
        .with_token_info(MINT, create_info("KEEP"))
        .with_market_data(create_market(MINT, 20_000.0, Some(create_pool(25_000.0, 40))))
        .with_pool_detail_failure(POOL);
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    let token = aggregator.get_complete_token_data(MINT).await.unwrap();
    let pool = token.snapshot.primary_pool().unwrap();
    assert_eq!(pool.liquidity_usd, 25_000.0);
    assert!(pool.transactions.is_none());
    assert_eq!(primary.call_count("pool_detail"), 1);
}

// ============================================================================
// Cache neutrality
// ============================================================================

#[tokio::test]
async fn test_disabled_cache_gives_same_score() {
    let primary = FakePrimarySource::new()
        .with_token_info(MINT, create_info("SAME"))
        .with_market_data(create_market(MINT, 30_000.0, Some(create_pool(45_000.0, 12))))
        .with_holders(
            MINT,
            vec![TokenHolder {
                address: "Whale111".to_string(),
                amount: 5_000_000_000_000,
                percentage: 12.5,
                rank: 1,
            }],
        );
    let onchain = FakeOnchainSource::new().with_supply(MINT, 40_000_000_000_000);
    let fallback = FakeFallbackSource::new();

    let cached = build_aggregator(&primary, &onchain, &fallback, TokenCache::in_memory(8));
    let uncached = build_aggregator(&primary, &onchain, &fallback, TokenCache::disabled());

    let a = cached.get_complete_token_data(MINT).await.unwrap();
    let a_again = cached.get_complete_token_data(MINT).await.unwrap();
    let b = uncached.get_complete_token_data(MINT).await.unwrap();

    assert_eq!(a.risk_score.total_score, b.risk_score.total_score);
    assert_eq!(a.risk_score.breakdown, b.risk_score.breakdown);
    assert_eq!(a.risk_score.signals, b.risk_score.signals);
    assert_eq!(a_again.risk_score.total_score, a.risk_score.total_score);
    assert_eq!(a_again.risk_score.breakdown.authority_risk.score, a.risk_score.breakdown.authority_risk.score);
    assert_eq!(a_again.snapshot.total_supply, Some(40_000_000_000_000));
}

// ============================================================================
// Batch and trending
// ============================================================================

#[tokio::test]
async fn test_batch_never_returns_partial_tokens() {
    let primary = FakePrimarySource::new()
        .with_token_info("MintA", create_info("AAA"))
        .with_market_data(create_market("MintA", 10_000.0, None))
        .with_token_info("MintB", create_info("BBB"))
        .with_token_info_error("MintC", SourceError::Timeout)
        .with_market_data(create_market("MintC", 10_000.0, None));
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    let mints: Vec<String> = ["MintA", "MintB", "MintC"].iter().map(|m| m.to_string()).collect();
    let tokens = aggregator.get_multiple_tokens(&mints).await;

    let returned: Vec<&str> = tokens.iter().map(|t| t.mint()).collect();
    assert_eq!(returned, vec!["MintA"]);
}

#[tokio::test]
async fn test_trending_excludes_stables_and_caches() {
    let mut pools: Vec<TrendingPool> = EXCLUDED_MINTS.iter().map(|m| create_trending(m)).collect();
    pools.push(create_trending("HotMint"));
    pools.push(create_trending("HotMint"));
    pools.push(create_trending("WarmMint"));

    let mut primary = FakePrimarySource::new().with_trending(pools);
    for mint in EXCLUDED_MINTS.iter().chain(["HotMint", "WarmMint"].iter()) {
        primary = primary
            .with_token_info(mint, create_info("TRD"))
            .with_market_data(create_market(mint, 90_000.0, None));
    }

    let cache = TokenCache::in_memory(8);
    let aggregator = build_aggregator(&primary, &FakeOnchainSource::new(), &FakeFallbackSource::new(), cache.clone());

    let tokens = aggregator.get_trending_tokens(10).await;
    let mints: Vec<&str> = tokens.iter().map(|t| t.mint()).collect();
    assert_eq!(mints, vec!["HotMint", "WarmMint"]);
    // trending pool reserve becomes the token's liquidity
    assert_eq!(tokens[0].snapshot.total_liquidity, 80_000.0);

    let cached: Vec<rugwatch::domain::Token> = cache.get(TRENDING_KEY).await.unwrap();
    assert_eq!(cached.len(), 2);

    // second call is served from cache
    let trending_calls = primary.call_count("trending");
    let again = aggregator.get_trending_tokens(1).await;
    assert_eq!(again.len(), 1);
    assert_eq!(primary.call_count("trending"), trending_calls);
}

#[tokio::test]
async fn test_trending_requests_twice_the_limit() {
    let primary = FakePrimarySource::new().with_trending(vec![create_trending("OnlyMint")]);
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    aggregator.refresh_trending_tokens(15).await;
    assert!(primary.get_calls().contains(&"trending:30@24h".to_string()));
}

#[tokio::test]
async fn test_empty_trending_falls_back_to_well_known() {
    let bonk = WELL_KNOWN_MINTS[0];
    let primary = FakePrimarySource::new()
        .with_token_info(bonk, create_info("BONK"))
        .with_market_data(create_market(bonk, 5_000_000.0, None));
    let cache = TokenCache::in_memory(8);
    let aggregator = build_aggregator(&primary, &FakeOnchainSource::new(), &FakeFallbackSource::new(), cache.clone());

    let tokens = aggregator.get_trending_tokens(10).await;
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].symbol(), "BONK");
    // the well-known list is not a live result and is not cached
    assert!(cache.get::<Vec<rugwatch::domain::Token>>(TRENDING_KEY).await.is_none());
}

#[tokio::test]
async fn test_trending_enrichment_cascades() {
    let primary = FakePrimarySource::new()
        .with_trending(vec![create_trending("HotMint")])
        .with_token_info("HotMint", create_info("HOT"))
        .with_market_data(create_market("HotMint", 90_000.0, None))
        .with_ohlcv(
            "HotMint",
            rugwatch::domain::OhlcvTimeframe::Minute,
            (0..60)
                .map(|i| rugwatch::domain::Candle {
                    timestamp: 1_700_000_000 + i * 60,
                    open: 1.0,
                    high: 1.2,
                    low: 0.8,
                    close: if i % 2 == 0 { 1.0 } else { 1.1 },
                    volume: 500.0,
                })
                .collect(),
        );
    let aggregator = build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::disabled(),
    );

    let tokens = aggregator.refresh_trending_tokens(5).await;
    let ohlcv = tokens[0].snapshot.ohlcv.as_ref().unwrap();
    assert_eq!(ohlcv.timeframe, rugwatch::domain::OhlcvTimeframe::Minute);
    assert!(tokens[0].snapshot.recent_trades.is_none());
    assert_eq!(primary.call_count("ohlcv"), 3);
    assert_eq!(primary.call_count("recent_trades"), 2);
}

// ============================================================================
// Refresher
// ============================================================================

#[tokio::test]
async fn test_refresher_is_not_reentrant() {
    let primary = FakePrimarySource::new()
        .with_trending(vec![create_trending("SlowMint")])
        .with_token_info("SlowMint", create_info("SLOW"))
        .with_market_data(create_market("SlowMint", 1_000.0, None))
        .with_delay(Duration::from_millis(100));
    let aggregator = Arc::new(build_aggregator(
        &primary,
        &FakeOnchainSource::new(),
        &FakeFallbackSource::new(),
        TokenCache::in_memory(8),
    ));
    let refresher = Arc::new(BackgroundRefresher::new(
        aggregator,
        RefresherConfig {
            interval: Duration::from_secs(3_600),
            trending_limit: 5,
        },
    ));

    let outcomes = futures::future::join_all((0..3).map(|i| {
        let refresher = Arc::clone(&refresher);
        async move {
            tokio::time::sleep(Duration::from_millis(i * 10)).await;
            refresher.trigger_manual().await
        }
    }))
    .await;

    let completed = outcomes
        .iter()
        .filter(|o| matches!(o, RefreshOutcome::Completed { tokens: 1 }))
        .count();
    let skipped = outcomes.iter().filter(|o| **o == RefreshOutcome::Skipped).count();
    assert_eq!(completed, 1);
    assert_eq!(skipped, 2);
    assert_eq!(primary.call_count("trending"), 1);

    // guard released: the next trigger runs again
    assert!(matches!(refresher.run_once().await, RefreshOutcome::Completed { .. }));
}
