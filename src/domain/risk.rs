//! Risk Score Types
//!
//! Composite score, its nine capped components and the qualitative signals
//! derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::market_analysis::{LiquidityStability, PriceTrend};

/// Score at or above which a token is DANGER
pub const DANGER_THRESHOLD: u32 = 70;

/// Score at or above which a token is MEDIUM
pub const MEDIUM_THRESHOLD: u32 = 35;

/// Overall verdict derived from the total score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Medium,
    Danger,
}

impl RiskLevel {
    /// Total function of the score
    pub fn from_score(total: u32) -> Self {
        if total >= DANGER_THRESHOLD {
            RiskLevel::Danger
        } else if total >= MEDIUM_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Safe
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "SAFE",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::Danger => "DANGER",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Honeypot verdict of the decision table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoneypotVerdict {
    Yes,
    No,
    Suspected,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoneypotRisk {
    pub score: u32,
    pub is_honeypot: HoneypotVerdict,
    /// Which rule produced the verdict, with the numbers it used
    pub detection_method: String,
    pub sell_ratio: Option<f64>,
}

impl HoneypotRisk {
    pub const CAP: u32 = 30;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorityRisk {
    pub score: u32,
    pub mint_authority_present: bool,
    pub freeze_authority_present: bool,
}

impl AuthorityRisk {
    pub const CAP: u32 = 30;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcentrationRisk {
    pub score: u32,
    pub top_holder_percentage: f64,
    pub top10_percentage: f64,
}

impl ConcentrationRisk {
    pub const CAP: u32 = 25;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityRisk {
    pub score: u32,
    pub has_pool: bool,
    pub total_liquidity_usd: f64,
    pub liquidity_locked: bool,
    /// 24h volume / liquidity, None without both values
    pub volume_to_liquidity_ratio: Option<f64>,
}

impl LiquidityRisk {
    pub const CAP: u32 = 20;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRisk {
    pub score: u32,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub bot_trading_suspected: bool,
}

impl MarketRisk {
    pub const CAP: u32 = 15;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeRisk {
    pub score: u32,
    pub age_in_days: Option<i64>,
    pub first_trade_date: Option<DateTime<Utc>>,
}

impl AgeRisk {
    pub const CAP: u32 = 10;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GtScoreRisk {
    pub score: u32,
    pub gt_score: f64,
}

impl GtScoreRisk {
    pub const CAP: u32 = 20;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingPatternRisk {
    pub score: u32,
    pub wash_trading_score: f64,
    pub unusual_trading_detected: bool,
    pub whale_activity_score: f64,
    pub buy_sell_ratio: f64,
    pub suspicious_transactions: usize,
}

impl TradingPatternRisk {
    pub const CAP: u32 = 15;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityRisk {
    pub score: u32,
    pub volatility_score: f64,
    pub price_manipulation_risk: f64,
    pub price_trend: PriceTrend,
    pub liquidity_stability: LiquidityStability,
    pub volume_spikes: usize,
}

impl VolatilityRisk {
    pub const CAP: u32 = 10;
}

/// Per-component breakdown of a risk score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskBreakdown {
    pub honeypot_risk: HoneypotRisk,
    pub authority_risk: AuthorityRisk,
    pub concentration_risk: ConcentrationRisk,
    pub liquidity_risk: LiquidityRisk,
    pub market_risk: MarketRisk,
    pub age_risk: AgeRisk,
    pub gt_score_risk: GtScoreRisk,
    pub trading_pattern_risk: TradingPatternRisk,
    pub volatility_risk: VolatilityRisk,
}

impl RiskBreakdown {
    /// Sum of every component cap
    pub const MAX_TOTAL: u32 = HoneypotRisk::CAP
        + AuthorityRisk::CAP
        + ConcentrationRisk::CAP
        + LiquidityRisk::CAP
        + MarketRisk::CAP
        + AgeRisk::CAP
        + GtScoreRisk::CAP
        + TradingPatternRisk::CAP
        + VolatilityRisk::CAP;

    /// (name, score, cap) for every component, in display order
    pub fn components(&self) -> [(&'static str, u32, u32); 9] {
        [
            ("honeypot", self.honeypot_risk.score, HoneypotRisk::CAP),
            ("authority", self.authority_risk.score, AuthorityRisk::CAP),
            ("concentration", self.concentration_risk.score, ConcentrationRisk::CAP),
            ("liquidity", self.liquidity_risk.score, LiquidityRisk::CAP),
            ("market", self.market_risk.score, MarketRisk::CAP),
            ("age", self.age_risk.score, AgeRisk::CAP),
            ("gt_score", self.gt_score_risk.score, GtScoreRisk::CAP),
            ("trading_pattern", self.trading_pattern_risk.score, TradingPatternRisk::CAP),
            ("volatility", self.volatility_risk.score, VolatilityRisk::CAP),
        ]
    }

    pub fn total(&self) -> u32 {
        self.components().iter().map(|(_, score, _)| score).sum()
    }
}

/// Qualitative warning category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    HoneypotDetected,
    HoneypotSuspected,
    WashTradingDetected,
    UnusualTradingPatterns,
    HighWhaleActivity,
    HighVolatility,
    PriceManipulationRisk,
    LiquidityInstability,
    WashTrading,
    NewToken,
    AuthorityControl,
    LowLiquidity,
    HighConcentration,
    LowGtScore,
    PumpDetected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// High and critical signals surface as warnings
    pub fn is_warning(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSignal {
    #[serde(rename = "type")]
    pub signal_type: SignalType,
    pub severity: Severity,
    pub message: String,
    pub value: Option<String>,
}

impl RiskSignal {
    pub fn new(signal_type: SignalType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            signal_type,
            severity,
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// Composite, explainable risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskScore {
    pub total_score: u32,
    pub risk_level: RiskLevel,
    pub breakdown: RiskBreakdown,
    pub signals: Vec<RiskSignal>,
    pub warnings: Vec<String>,
    /// 0.0 - 1.0, how much of the input was actually available
    pub confidence: f64,
    pub calculated_at: DateTime<Utc>,
}

impl RiskScore {
    pub fn has_signal(&self, signal_type: SignalType) -> bool {
        self.signals.iter().any(|s| s.signal_type == signal_type)
    }

    pub fn signal(&self, signal_type: SignalType) -> Option<&RiskSignal> {
        self.signals.iter().find(|s| s.signal_type == signal_type)
    }
}
