//! GeckoTerminal wire types
//!
//! JSON:API documents as returned by the on-chain endpoints, and their
//! conversion into the normalized port DTOs. Every numeric field may arrive as
//! a string, a number, or not at all.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::adapters::http::flex;
use crate::domain::{
    Candle, HoneypotFlag, TimeframeValues, TokenAuthorities, TokenHolder, Trade, TradeKind,
    TransactionWindows, TxCounts,
};
use crate::ports::models::{MarketData, PoolDetail, PoolRef, TokenInfo, TrendingPool};

/// Top-level JSON:API document
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub included: Vec<Resource<PoolAttributes>>,
}

#[derive(Debug, Deserialize)]
pub struct Resource<A> {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub attributes: A,
    #[serde(default)]
    pub relationships: Relationships,
}

#[derive(Debug, Default, Deserialize)]
pub struct Relationships {
    pub top_pools: Option<ToMany>,
    pub base_token: Option<ToOne>,
    pub quote_token: Option<ToOne>,
    pub dex: Option<ToOne>,
}

#[derive(Debug, Deserialize)]
pub struct ToOne {
    pub data: Option<ResourceRef>,
}

#[derive(Debug, Deserialize)]
pub struct ToMany {
    #[serde(default)]
    pub data: Vec<ResourceRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    pub id: String,
}

/// Split a `"<network>_<address>"` resource id into its address
pub fn address_from_id(id: &str) -> Option<&str> {
    id.split_once('_')
        .map(|(_, address)| address)
        .filter(|address| !address.is_empty())
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TimeframeWire {
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub m5: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub h1: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub h6: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub h24: Option<f64>,
}

impl From<TimeframeWire> for TimeframeValues {
    fn from(wire: TimeframeWire) -> Self {
        Self {
            m5: wire.m5,
            h1: wire.h1,
            h6: wire.h6,
            h24: wire.h24,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TxCountsWire {
    #[serde(default, deserialize_with = "flex::opt_u64")]
    pub buys: Option<u64>,
    #[serde(default, deserialize_with = "flex::opt_u64")]
    pub sells: Option<u64>,
    #[serde(default, deserialize_with = "flex::opt_u64")]
    pub buyers: Option<u64>,
    #[serde(default, deserialize_with = "flex::opt_u64")]
    pub sellers: Option<u64>,
}

impl From<TxCountsWire> for TxCounts {
    fn from(wire: TxCountsWire) -> Self {
        Self {
            buys: wire.buys.unwrap_or(0),
            sells: wire.sells.unwrap_or(0),
            buyers: wire.buyers.unwrap_or(0),
            sellers: wire.sellers.unwrap_or(0),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TransactionsWire {
    pub m5: Option<TxCountsWire>,
    pub h1: Option<TxCountsWire>,
    pub h6: Option<TxCountsWire>,
    pub h24: Option<TxCountsWire>,
}

impl From<TransactionsWire> for TransactionWindows {
    fn from(wire: TransactionsWire) -> Self {
        Self {
            m5: wire.m5.map(Into::into),
            h1: wire.h1.map(Into::into),
            h6: wire.h6.map(Into::into),
            h24: wire.h24.map(Into::into),
        }
    }
}

fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ============================================================================
// Token info
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TokenInfoAttributes {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub websites: Vec<String>,
    pub twitter_handle: Option<String>,
    pub telegram_handle: Option<String>,
    pub holders: Option<HoldersSummary>,
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub gt_score: Option<f64>,
    pub is_honeypot: Option<HoneypotWire>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HoldersSummary {
    #[serde(default, deserialize_with = "flex::opt_u64")]
    pub count: Option<u64>,
    pub distribution_percentage: Option<HolderDistribution>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HolderDistribution {
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub top_10: Option<f64>,
}

/// Honeypot flag as a boolean or a `"yes"`/`"no"`/`"unknown"` string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HoneypotWire {
    Flag(bool),
    Text(String),
}

impl From<HoneypotWire> for HoneypotFlag {
    fn from(wire: HoneypotWire) -> Self {
        match wire {
            HoneypotWire::Flag(flag) => HoneypotFlag::from(Some(flag)),
            HoneypotWire::Text(text) => match text.to_ascii_lowercase().as_str() {
                "yes" | "true" => HoneypotFlag::Yes,
                "no" | "false" => HoneypotFlag::No,
                _ => HoneypotFlag::Unknown,
            },
        }
    }
}

/// One authority field: `"no"` means renounced, `"yes"` active without an
/// address, anything else is the authority address itself
fn authority_state(raw: Option<&str>) -> Option<(bool, Option<String>)> {
    let value = raw?.trim();
    match value.to_ascii_lowercase().as_str() {
        "" => None,
        "no" | "none" | "false" => Some((true, None)),
        "yes" | "true" => Some((false, None)),
        _ => Some((false, Some(value.to_string()))),
    }
}

fn authorities_from_wire(mint: Option<&str>, freeze: Option<&str>) -> Option<TokenAuthorities> {
    let mint = authority_state(mint);
    let freeze = authority_state(freeze);
    if mint.is_none() && freeze.is_none() {
        return None;
    }

    // a side the source did not report is treated as renounced
    let (mint_renounced, mint_authority) = mint.unwrap_or((true, None));
    let (freeze_renounced, freeze_authority) = freeze.unwrap_or((true, None));
    Some(TokenAuthorities {
        mint_authority,
        freeze_authority,
        mint_renounced,
        freeze_renounced,
    })
}

impl From<TokenInfoAttributes> for TokenInfo {
    fn from(attrs: TokenInfoAttributes) -> Self {
        let holders = attrs.holders.unwrap_or_default();
        let top10 = holders
            .distribution_percentage
            .and_then(|d| d.top_10)
            .unwrap_or(0.0);

        Self {
            name: non_empty(attrs.name).unwrap_or_else(|| "Unknown".to_string()),
            symbol: non_empty(attrs.symbol).unwrap_or_else(|| "???".to_string()),
            image_url: non_empty(attrs.image_url),
            websites: attrs.websites.into_iter().filter(|w| !w.trim().is_empty()).collect(),
            twitter_handle: non_empty(attrs.twitter_handle),
            telegram_handle: non_empty(attrs.telegram_handle),
            holder_count: holders.count.unwrap_or(0),
            top10_percentage: top10,
            authorities: authorities_from_wire(
                attrs.mint_authority.as_deref(),
                attrs.freeze_authority.as_deref(),
            ),
            gt_score: attrs.gt_score.unwrap_or(0.0),
            is_honeypot: attrs.is_honeypot.map(Into::into).unwrap_or_default(),
        }
    }
}

// ============================================================================
// Token market data and pools
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TokenAttributes {
    pub address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub price_usd: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub fdv_usd: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub market_cap_usd: Option<f64>,
    pub volume_usd: Option<TimeframeWire>,
    pub price_change_percentage: Option<TimeframeWire>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PoolAttributes {
    pub address: Option<String>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub reserve_in_usd: Option<f64>,
    #[serde(default, alias = "token_price_usd", deserialize_with = "flex::opt_f64")]
    pub base_token_price_usd: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub market_cap_usd: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub fdv_usd: Option<f64>,
    pub pool_created_at: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub locked_liquidity_percentage: Option<f64>,
    pub transactions: Option<TransactionsWire>,
    pub volume_usd: Option<TimeframeWire>,
    pub price_change_percentage: Option<TimeframeWire>,
}

impl Resource<PoolAttributes> {
    pub fn pool_address(&self) -> Option<String> {
        non_empty(self.attributes.address.clone())
            .or_else(|| address_from_id(&self.id).map(str::to_string))
    }

    pub fn to_pool_ref(&self) -> Option<PoolRef> {
        let attrs = &self.attributes;
        Some(PoolRef {
            address: self.pool_address()?,
            dex: self
                .relationships
                .dex
                .as_ref()
                .and_then(|d| d.data.as_ref())
                .map(|r| r.id.clone()),
            reserve_usd: attrs.reserve_in_usd.unwrap_or(0.0),
            volume_24h: attrs.volume_usd.and_then(|v| v.h24).unwrap_or(0.0),
            created_at: parse_timestamp(attrs.pool_created_at.as_deref()),
            locked_liquidity_pct: attrs.locked_liquidity_percentage.unwrap_or(0.0),
            transactions: attrs.transactions.map(Into::into),
            volume_usd: attrs.volume_usd.map(Into::into),
            price_change: attrs.price_change_percentage.map(Into::into),
        })
    }

    pub fn to_pool_detail(&self) -> Option<PoolDetail> {
        let attrs = &self.attributes;
        Some(PoolDetail {
            address: self.pool_address()?,
            reserve_usd: attrs.reserve_in_usd,
            price_usd: attrs.base_token_price_usd,
            price_change: attrs.price_change_percentage.map(Into::into).unwrap_or_default(),
            transactions: attrs.transactions.map(Into::into).unwrap_or_default(),
            volume_usd: attrs.volume_usd.map(Into::into).unwrap_or_default(),
            created_at: parse_timestamp(attrs.pool_created_at.as_deref()),
            locked_liquidity_pct: attrs.locked_liquidity_percentage,
        })
    }

    /// Trending entry keyed by the pool's base token
    pub fn to_trending_pool(&self) -> Option<TrendingPool> {
        let base_id = self.relationships.base_token.as_ref()?.data.as_ref()?;
        let base_token_mint = address_from_id(&base_id.id)?.to_string();
        let attrs = &self.attributes;
        Some(TrendingPool {
            base_token_mint,
            pool_name: non_empty(attrs.name.clone()),
            price_usd: attrs.base_token_price_usd,
            market_cap_usd: attrs.market_cap_usd,
            fdv_usd: attrs.fdv_usd,
            price_change_24h: attrs.price_change_percentage.and_then(|p| p.h24),
            pool: self.to_pool_ref()?,
        })
    }
}

impl Resource<TokenAttributes> {
    /// Normalize a token resource, resolving its top pool against `included`
    pub fn to_market_data(
        &self,
        requested_mint: Option<&str>,
        included: &[Resource<PoolAttributes>],
    ) -> Option<MarketData> {
        let attrs = &self.attributes;
        let mint = non_empty(attrs.address.clone())
            .or_else(|| address_from_id(&self.id).map(str::to_string))
            .or_else(|| requested_mint.map(str::to_string))?;

        let top_pool_id = self
            .relationships
            .top_pools
            .as_ref()
            .and_then(|rel| rel.data.first())
            .map(|r| r.id.as_str());
        let top_pool = match top_pool_id {
            Some(id) => included.iter().find(|p| p.id == id),
            // single-token responses sometimes omit the relationship
            None if requested_mint.is_some() => included.iter().find(|p| p.kind == "pool"),
            None => None,
        };

        Some(MarketData {
            mint,
            name: non_empty(attrs.name.clone()),
            symbol: non_empty(attrs.symbol.clone()),
            decimals: attrs.decimals,
            image_url: non_empty(attrs.image_url.clone()),
            price_usd: attrs.price_usd.unwrap_or(0.0),
            fdv_usd: attrs.fdv_usd.unwrap_or(0.0),
            market_cap_usd: attrs.market_cap_usd.unwrap_or(0.0),
            volume_24h: attrs.volume_usd.and_then(|v| v.h24).unwrap_or(0.0),
            price_change_24h: attrs.price_change_percentage.and_then(|p| p.h24),
            top_pool: top_pool.and_then(|p| p.to_pool_ref()),
        })
    }
}

// ============================================================================
// Holders, trades, OHLCV
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TopHoldersAttributes {
    #[serde(default)]
    pub holders: Vec<HolderWire>,
}

#[derive(Debug, Deserialize)]
pub struct HolderWire {
    pub address: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub percentage: Option<f64>,
    #[serde(default, deserialize_with = "flex::opt_u64")]
    pub rank: Option<u64>,
}

impl TopHoldersAttributes {
    pub fn into_holders(self) -> Vec<TokenHolder> {
        self.holders
            .into_iter()
            .enumerate()
            .filter_map(|(index, holder)| {
                Some(TokenHolder {
                    address: non_empty(holder.address)?,
                    // amounts arrive decimal-adjusted with a fraction
                    amount: holder.amount.map(|a| a.max(0.0).floor() as u128).unwrap_or(0),
                    percentage: holder.percentage.unwrap_or(0.0),
                    rank: holder.rank.map(|r| r as u32).unwrap_or(index as u32 + 1),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct TradeAttributes {
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "flex::opt_f64")]
    pub volume_in_usd: Option<f64>,
    pub tx_from_address: Option<String>,
    pub tx_hash: Option<String>,
    pub block_timestamp: Option<String>,
}

impl From<TradeAttributes> for Trade {
    fn from(attrs: TradeAttributes) -> Self {
        let kind = match attrs.kind.as_deref() {
            Some(k) if k.eq_ignore_ascii_case("sell") => TradeKind::Sell,
            _ => TradeKind::Buy,
        };
        Self {
            kind,
            volume_usd: attrs.volume_in_usd.unwrap_or(0.0),
            tx_from_address: attrs.tx_from_address.unwrap_or_default(),
            tx_hash: non_empty(attrs.tx_hash),
            block_timestamp: parse_timestamp(attrs.block_timestamp.as_deref()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OhlcvAttributes {
    #[serde(default)]
    pub ohlcv_list: Vec<Vec<serde_json::Value>>,
}

impl OhlcvAttributes {
    /// Candles oldest first; rows with fewer than six numeric fields are skipped
    pub fn into_candles(self) -> Vec<Candle> {
        let mut candles: Vec<Candle> = self
            .ohlcv_list
            .into_iter()
            .filter_map(|row| {
                let values: Vec<f64> = row.iter().filter_map(|v| v.as_f64()).collect();
                if values.len() < 6 {
                    return None;
                }
                Some(Candle {
                    timestamp: values[0] as i64,
                    open: values[1],
                    high: values[2],
                    low: values[3],
                    close: values[4],
                    volume: values[5],
                })
            })
            .collect();
        candles.sort_by_key(|c| c.timestamp);
        candles
    }
}
