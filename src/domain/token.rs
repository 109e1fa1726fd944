//! Token Snapshot Model
//!
//! Canonical, source-independent view of a token as assembled by the
//! aggregator. A snapshot is built once per fetch and never patched; a newer
//! fetch produces a new value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::market_analysis::{
    analyze_ohlcv, analyze_trading_patterns, Candle, OhlcvTimeframe, Trade, TradeAnalysis,
    VolatilityAnalysis,
};
use super::risk::{RiskLevel, RiskScore};

/// Tri-state honeypot flag as reported by a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoneypotFlag {
    Yes,
    No,
    #[default]
    Unknown,
}

impl From<Option<bool>> for HoneypotFlag {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => HoneypotFlag::Yes,
            Some(false) => HoneypotFlag::No,
            None => HoneypotFlag::Unknown,
        }
    }
}

/// Mint and freeze authority state of an SPL mint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAuthorities {
    /// Mint authority address (None = renounced)
    pub mint_authority: Option<String>,
    /// Freeze authority address (None = renounced)
    pub freeze_authority: Option<String>,
    pub mint_renounced: bool,
    pub freeze_renounced: bool,
}

impl TokenAuthorities {
    /// Build from raw authority addresses; an absent address means renounced
    pub fn from_addresses(mint_authority: Option<String>, freeze_authority: Option<String>) -> Self {
        Self {
            mint_renounced: mint_authority.is_none(),
            freeze_renounced: freeze_authority.is_none(),
            mint_authority,
            freeze_authority,
        }
    }

    /// Build from renounced flags only (sources that do not expose addresses)
    pub fn from_flags(mint_renounced: bool, freeze_renounced: bool) -> Self {
        Self {
            mint_authority: None,
            freeze_authority: None,
            mint_renounced,
            freeze_renounced,
        }
    }

    /// Both authorities renounced
    pub fn renounced() -> Self {
        Self::from_flags(true, true)
    }

    /// Mint authority can still create supply
    pub fn mint_active(&self) -> bool {
        !self.mint_renounced || self.mint_authority.is_some()
    }

    /// Freeze authority can still freeze holder accounts
    pub fn freeze_active(&self) -> bool {
        !self.freeze_renounced || self.freeze_authority.is_some()
    }
}

/// One entry of the top-holder list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolder {
    pub address: String,
    /// Raw amount in base units
    #[serde(with = "amount_string")]
    pub amount: u128,
    pub percentage: f64,
    pub rank: u32,
}

/// Buy/sell counts over one time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxCounts {
    pub buys: u64,
    pub sells: u64,
    pub buyers: u64,
    pub sellers: u64,
}

impl TxCounts {
    pub fn total(&self) -> u64 {
        self.buys + self.sells
    }

    pub fn unique_traders(&self) -> u64 {
        self.buyers + self.sellers
    }

    /// sells / (buys + sells), None without transactions
    pub fn sell_ratio(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.sells as f64 / total as f64)
    }

    /// sellers / (buyers + sellers), None without traders
    pub fn unique_seller_ratio(&self) -> Option<f64> {
        let unique = self.unique_traders();
        (unique > 0).then(|| self.sellers as f64 / unique as f64)
    }
}

/// Transaction counts per window; any window may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionWindows {
    pub m5: Option<TxCounts>,
    pub h1: Option<TxCounts>,
    pub h6: Option<TxCounts>,
    pub h24: Option<TxCounts>,
}

impl TransactionWindows {
    /// Window used by the honeypot heuristic: 24h, then 1h, then 6h
    pub fn preferred(&self) -> Option<&TxCounts> {
        self.h24.as_ref().or(self.h1.as_ref()).or(self.h6.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.m5.is_none() && self.h1.is_none() && self.h6.is_none() && self.h24.is_none()
    }
}

/// A numeric value (USD volume or percent change) per window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeframeValues {
    pub m5: Option<f64>,
    pub h1: Option<f64>,
    pub h6: Option<f64>,
    pub h24: Option<f64>,
}

/// Representative liquidity pool of a token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityPool {
    pub address: String,
    pub dex: String,
    pub quote_token: String,
    pub liquidity_usd: f64,
    pub volume_24h: f64,
    pub created_at: Option<DateTime<Utc>>,
    /// Percentage of LP tokens locked (0 when unknown)
    pub locked_liquidity_pct: f64,
    pub transactions: Option<TransactionWindows>,
    pub volume_usd: Option<TimeframeValues>,
    pub price_change: Option<TimeframeValues>,
}

impl LiquidityPool {
    pub fn is_locked(&self) -> bool {
        self.locked_liquidity_pct > 0.0
    }
}

/// Recent trade enrichment: raw list plus derived indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentTrades {
    pub trades: Vec<Trade>,
    /// Minimum trade size (USD) the list was fetched with
    pub min_volume_usd: f64,
    pub analysis: TradeAnalysis,
}

impl RecentTrades {
    pub fn from_trades(trades: Vec<Trade>, min_volume_usd: f64) -> Self {
        let analysis = analyze_trading_patterns(&trades);
        Self {
            trades,
            min_volume_usd,
            analysis,
        }
    }

    pub fn total_trades(&self) -> usize {
        self.analysis.total_trades
    }
}

/// OHLCV enrichment: candle list plus derived volatility indicators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OhlcvAnalysis {
    pub timeframe: OhlcvTimeframe,
    pub candles: Vec<Candle>,
    pub analysis: VolatilityAnalysis,
}

impl OhlcvAnalysis {
    pub fn from_candles(timeframe: OhlcvTimeframe, candles: Vec<Candle>) -> Self {
        let analysis = analyze_ohlcv(&candles);
        Self {
            timeframe,
            candles,
            analysis,
        }
    }

    pub fn data_points(&self) -> usize {
        self.candles.len()
    }
}

/// Unscored token snapshot, the input of the risk calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
    pub mint: String,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub logo_uri: Option<String>,

    pub price: f64,
    pub price_change_1h: Option<f64>,
    pub price_change_6h: Option<f64>,
    pub price_change_24h: f64,
    pub market_cap: f64,
    pub volume_24h: f64,

    /// Exact on-chain supply in base units, None when not fetched
    #[serde(default, with = "option_amount_string")]
    pub total_supply: Option<u128>,

    pub holder_count: u64,
    pub top10_percentage: f64,
    #[serde(default)]
    pub top_holders: Vec<TokenHolder>,

    pub authorities: Option<TokenAuthorities>,

    pub total_liquidity: f64,
    #[serde(default)]
    pub pools: Vec<LiquidityPool>,
    pub created_at: Option<DateTime<Utc>>,

    pub gt_score: f64,
    #[serde(default)]
    pub is_honeypot: HoneypotFlag,

    pub website: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,

    pub recent_trades: Option<RecentTrades>,
    pub ohlcv: Option<OhlcvAnalysis>,

    pub last_updated: DateTime<Utc>,
}

impl TokenSnapshot {
    /// Empty snapshot for a mint; every metric starts absent or zero
    pub fn new(mint: impl Into<String>, symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            symbol: symbol.into(),
            name: name.into(),
            decimals: 9,
            logo_uri: None,
            price: 0.0,
            price_change_1h: None,
            price_change_6h: None,
            price_change_24h: 0.0,
            market_cap: 0.0,
            volume_24h: 0.0,
            total_supply: None,
            holder_count: 0,
            top10_percentage: 0.0,
            top_holders: Vec::new(),
            authorities: None,
            total_liquidity: 0.0,
            pools: Vec::new(),
            created_at: None,
            gt_score: 0.0,
            is_honeypot: HoneypotFlag::Unknown,
            website: None,
            twitter: None,
            telegram: None,
            recent_trades: None,
            ohlcv: None,
            last_updated: Utc::now(),
        }
    }

    /// The representative pool, if any
    pub fn primary_pool(&self) -> Option<&LiquidityPool> {
        self.pools.first()
    }

    /// Whole days since creation, None when the creation time is unknown
    pub fn age_in_days(&self, now: DateTime<Utc>) -> Option<i64> {
        self.created_at
            .map(|created| (now - created).num_days().max(0))
    }

    /// Supply adjusted for decimals
    pub fn supply_adjusted(&self) -> Option<f64> {
        self.total_supply
            .map(|supply| supply as f64 / 10f64.powi(self.decimals as i32))
    }
}

/// Scored, immutable token snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    #[serde(flatten)]
    pub snapshot: TokenSnapshot,
    pub risk_score: RiskScore,
}

impl Token {
    pub fn new(snapshot: TokenSnapshot, risk_score: RiskScore) -> Self {
        Self {
            snapshot,
            risk_score,
        }
    }

    pub fn mint(&self) -> &str {
        &self.snapshot.mint
    }

    pub fn symbol(&self) -> &str {
        &self.snapshot.symbol
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_score.risk_level
    }
}

/// Serde codec writing exact integer amounts as decimal strings
pub mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => text.trim().parse::<u128>().map_err(de::Error::custom),
            Raw::Number(n) => Ok(n as u128),
        }
    }
}

/// Optional variant of [`amount_string`]
pub mod option_amount_string {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    struct Wrapped(#[serde(with = "super::amount_string")] u128);

    pub fn serialize<S: Serializer>(value: &Option<u128>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(amount) => serializer.serialize_some(&amount.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u128>, D::Error> {
        Ok(Option::<Wrapped>::deserialize(deserializer)?.map(|w| w.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sell_ratio() {
        let counts = TxCounts { buys: 90, sells: 10, buyers: 40, sellers: 5 };
        assert_eq!(counts.total(), 100);
        assert_eq!(counts.sell_ratio(), Some(0.1));
        assert_eq!(counts.unique_traders(), 45);
        assert!(TxCounts::default().sell_ratio().is_none());
    }

    #[test]
    fn test_preferred_window_order() {
        let h1 = TxCounts { buys: 1, ..Default::default() };
        let h6 = TxCounts { buys: 6, ..Default::default() };
        let windows = TransactionWindows { h1: Some(h1), h6: Some(h6), ..Default::default() };
        assert_eq!(windows.preferred(), Some(&h1));

        let h24 = TxCounts { buys: 24, ..Default::default() };
        let windows = TransactionWindows { h24: Some(h24), ..windows };
        assert_eq!(windows.preferred(), Some(&h24));
    }

    #[test]
    fn test_authorities_from_addresses() {
        let auth = TokenAuthorities::from_addresses(Some("MintAuth".to_string()), None);
        assert!(auth.mint_active());
        assert!(!auth.freeze_active());
        assert!(!TokenAuthorities::renounced().mint_active());
    }

    #[test]
    fn test_age_in_days() {
        let now = Utc::now();
        let mut snapshot = TokenSnapshot::new("Mint111", "TST", "Test");
        assert_eq!(snapshot.age_in_days(now), None);

        snapshot.created_at = Some(now - Duration::hours(50));
        assert_eq!(snapshot.age_in_days(now), Some(2));
    }

    #[test]
    fn test_supply_serialized_as_string() {
        let mut snapshot = TokenSnapshot::new("Mint111", "TST", "Test");
        snapshot.total_supply = Some(u128::from(u64::MAX) * 4);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["totalSupply"], "73786976294838206460");

        let back: TokenSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back.total_supply, snapshot.total_supply);
    }
}
