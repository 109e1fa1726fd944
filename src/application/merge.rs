//! Snapshot merge
//!
//! Folds the partial results of one aggregation pass into a [`TokenSnapshot`].
//! Field precedence lives here; the aggregator only decides what to fetch.
//!
//! - identity: primary info, then primary market data, then the fallback
//! - market metrics: primary market data, else the fallback overview
//! - pool: basic reference, overridden field by field by the pool detail
//! - authorities: on-chain read, else whatever the primary reported

use crate::domain::{
    LiquidityPool, OhlcvAnalysis, RecentTrades, TokenAuthorities, TokenHolder, TokenSnapshot,
};
use crate::ports::models::{FallbackOverview, MarketData, PoolDetail, PoolRef, TokenInfo};

/// Quote side recorded for the representative pool
pub const QUOTE_TOKEN: &str = "SOL";

const UNKNOWN_NAME: &str = "Unknown";
const UNKNOWN_SYMBOL: &str = "UNKNOWN";
const UNKNOWN_DEX: &str = "Unknown";
const DEFAULT_DECIMALS: u8 = 9;

/// Holders summed when the primary reports no top-10 share
const TOP_HOLDER_WINDOW: usize = 10;

const TWITTER_BASE: &str = "https://twitter.com/";
const TELEGRAM_BASE: &str = "https://t.me/";

/// Overview plus spot price from the fallback market source
#[derive(Debug, Clone, PartialEq)]
pub struct FallbackQuote {
    pub overview: FallbackOverview,
    pub price: f64,
}

/// Everything one aggregation pass managed to fetch for a mint
#[derive(Debug, Clone, Default)]
pub struct SourceBundle {
    pub info: Option<TokenInfo>,
    pub market: Option<MarketData>,
    pub pool_detail: Option<PoolDetail>,
    pub fallback: Option<FallbackQuote>,
    pub supply: Option<u128>,
    pub onchain_authorities: Option<TokenAuthorities>,
    pub holders: Vec<TokenHolder>,
    pub recent_trades: Option<RecentTrades>,
    pub ohlcv: Option<OhlcvAnalysis>,
}

impl SourceBundle {
    /// Primary identity and market data both arrived
    pub fn has_primary(&self) -> bool {
        self.info.is_some() && self.market.is_some()
    }

    /// At least one source knows this mint
    pub fn has_identity(&self) -> bool {
        self.info.is_some() || self.market.is_some() || self.fallback.is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Turn a bare handle into a profile URL; full URLs pass through
pub fn social_url(base: &str, handle: Option<&str>) -> Option<String> {
    let handle = non_empty(handle)?;
    if handle.starts_with("http://") || handle.starts_with("https://") {
        return Some(handle.to_string());
    }
    let handle = handle.trim_start_matches('@');
    (!handle.is_empty()).then(|| format!("{}{}", base, handle))
}

/// Representative pool: basic reference with detail fields layered on top
pub fn build_pool(pool: &PoolRef, detail: Option<&PoolDetail>) -> LiquidityPool {
    let mut merged = LiquidityPool {
        address: pool.address.clone(),
        dex: pool.dex.clone().unwrap_or_else(|| UNKNOWN_DEX.to_string()),
        quote_token: QUOTE_TOKEN.to_string(),
        liquidity_usd: pool.reserve_usd,
        volume_24h: pool.volume_24h,
        created_at: pool.created_at,
        locked_liquidity_pct: pool.locked_liquidity_pct,
        transactions: pool.transactions.filter(|t| !t.is_empty()),
        volume_usd: pool.volume_usd,
        price_change: pool.price_change,
    };

    if let Some(detail) = detail {
        if let Some(reserve) = detail.reserve_usd {
            merged.liquidity_usd = reserve;
        }
        if let Some(volume) = detail.volume_usd.h24 {
            merged.volume_24h = volume;
        }
        if detail.created_at.is_some() {
            merged.created_at = detail.created_at;
        }
        if let Some(locked) = detail.locked_liquidity_pct {
            merged.locked_liquidity_pct = locked;
        }
        if !detail.transactions.is_empty() {
            merged.transactions = Some(detail.transactions);
        }
        merged.volume_usd = Some(detail.volume_usd);
        merged.price_change = Some(detail.price_change);
    }

    merged
}

/// Build the unscored snapshot
pub fn merge_snapshot(mint: &str, bundle: SourceBundle) -> TokenSnapshot {
    let SourceBundle {
        info,
        market,
        pool_detail,
        fallback,
        supply,
        onchain_authorities,
        holders,
        recent_trades,
        ohlcv,
    } = bundle;
    let overview = fallback.as_ref().map(|f| &f.overview);

    let name = non_empty(info.as_ref().map(|i| i.name.as_str()))
        .or_else(|| non_empty(market.as_ref().and_then(|m| m.name.as_deref())))
        .or_else(|| non_empty(overview.and_then(|o| o.name.as_deref())))
        .unwrap_or(UNKNOWN_NAME);
    let symbol = non_empty(info.as_ref().map(|i| i.symbol.as_str()))
        .or_else(|| non_empty(market.as_ref().and_then(|m| m.symbol.as_deref())))
        .or_else(|| non_empty(overview.and_then(|o| o.symbol.as_deref())))
        .unwrap_or(UNKNOWN_SYMBOL);

    let mut snapshot = TokenSnapshot::new(mint, symbol, name);
    snapshot.decimals = market
        .as_ref()
        .and_then(|m| m.decimals)
        .or_else(|| overview.and_then(|o| o.decimals))
        .unwrap_or(DEFAULT_DECIMALS);
    snapshot.logo_uri = info
        .as_ref()
        .and_then(|i| i.image_url.clone())
        .or_else(|| market.as_ref().and_then(|m| m.image_url.clone()))
        .or_else(|| overview.and_then(|o| o.logo_uri.clone()));

    let pool = market
        .as_ref()
        .and_then(|m| m.top_pool.as_ref())
        .map(|p| build_pool(p, pool_detail.as_ref()));

    let mut market_change_24h = None;
    match (&market, &fallback) {
        (Some(market), _) => {
            snapshot.price = market.price_usd;
            snapshot.market_cap = market.effective_market_cap();
            snapshot.volume_24h = market.volume_24h;
            market_change_24h = market.price_change_24h;
        }
        (None, Some(quote)) => {
            snapshot.price = quote.price;
            snapshot.market_cap = quote.overview.market_cap;
            snapshot.volume_24h = quote.overview.volume_24h;
            market_change_24h = Some(quote.overview.price_change_24h);
        }
        (None, None) => {}
    }

    let pool_change = pool.as_ref().and_then(|p| p.price_change);
    snapshot.price_change_24h = pool_change
        .and_then(|c| c.h24)
        .or(market_change_24h)
        .unwrap_or(0.0);
    snapshot.price_change_1h = pool_change.and_then(|c| c.h1);
    snapshot.price_change_6h = pool_change.and_then(|c| c.h6);

    snapshot.total_supply = supply;

    snapshot.holder_count = match (&info, overview) {
        (Some(info), _) => info.holder_count,
        (None, Some(overview)) => overview.holder_count,
        (None, None) => 0,
    };
    let reported_top10 = info.as_ref().map(|i| i.top10_percentage).unwrap_or(0.0);
    snapshot.top10_percentage = if reported_top10 > 0.0 {
        reported_top10
    } else {
        holders
            .iter()
            .take(TOP_HOLDER_WINDOW)
            .map(|h| h.percentage)
            .sum()
    };
    snapshot.top_holders = holders;

    snapshot.authorities =
        onchain_authorities.or_else(|| info.as_ref().and_then(|i| i.authorities.clone()));

    snapshot.total_liquidity = match (&pool, overview) {
        (Some(pool), _) => pool.liquidity_usd,
        (None, Some(overview)) => overview.liquidity,
        (None, None) => 0.0,
    };
    snapshot.created_at = pool.as_ref().and_then(|p| p.created_at);
    snapshot.pools = pool.into_iter().collect();

    if let Some(info) = &info {
        snapshot.gt_score = info.gt_score;
        snapshot.is_honeypot = info.is_honeypot;
        snapshot.website = non_empty(info.websites.first().map(String::as_str)).map(String::from);
        snapshot.twitter = social_url(TWITTER_BASE, info.twitter_handle.as_deref());
        snapshot.telegram = social_url(TELEGRAM_BASE, info.telegram_handle.as_deref());
    }

    snapshot.recent_trades = recent_trades;
    snapshot.ohlcv = ohlcv;
    snapshot
}
