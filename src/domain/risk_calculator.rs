//! Risk Calculator
//!
//! Turns an unscored [`TokenSnapshot`] into a [`RiskScore`]. Scoring is pure:
//! no I/O and no hidden state, and every input field may be absent.
//!
//! Components (cap):
//! - honeypot (30), authority (30), concentration (25), liquidity (20)
//! - market (15), age (10), GT score (20)
//! - trading pattern (15), volatility (10)

use chrono::{DateTime, Utc};

use super::market_analysis::LiquidityStability;
use super::risk::{
    AgeRisk, AuthorityRisk, ConcentrationRisk, GtScoreRisk, HoneypotRisk, HoneypotVerdict,
    LiquidityRisk, MarketRisk, RiskBreakdown, RiskLevel, RiskScore, TradingPatternRisk,
    VolatilityRisk,
};
use super::risk_signals::generate_signals;
use super::token::{HoneypotFlag, TokenSnapshot, TxCounts};

/// Minimum transactions in the chosen window before the heuristic applies
pub const MIN_HEURISTIC_TRANSACTIONS: u64 = 10;

/// Minimum unique traders before the unique-seller check applies
pub const MIN_UNIQUE_TRADERS: u64 = 10;

/// 24h volume above which the sell-volume share check applies
pub const MIN_HEURISTIC_VOLUME_USD: f64 = 10_000.0;

/// (minimum top-10 percentage, points), highest first
const CONCENTRATION_TIERS: &[(f64, u32)] = &[
    (90.0, 25),
    (75.0, 20),
    (60.0, 15),
    (50.0, 10),
    (40.0, 7),
    (30.0, 5),
    (20.0, 3),
    (10.0, 1),
];

/// (liquidity upper bound in USD, points), lowest first
const LIQUIDITY_TIERS: &[(f64, u32)] = &[
    (1_000.0, 18),
    (10_000.0, 15),
    (50_000.0, 10),
    (100_000.0, 5),
    (500_000.0, 3),
    (1_000_000.0, 1),
];

/// (volume upper bound in USD, points), lowest first
const VOLUME_TIERS: &[(f64, u32)] = &[
    (1_000.0, 8),
    (10_000.0, 6),
    (100_000.0, 4),
    (1_000_000.0, 2),
];

/// (market cap upper bound in USD, points), lowest first
const MARKET_CAP_TIERS: &[(f64, u32)] = &[(10_000.0, 5), (100_000.0, 2)];

/// (age upper bound in days, points), lowest first
const AGE_TIERS: &[(i64, u32)] = &[(1, 10), (7, 8), (30, 5), (90, 2)];

/// (GT score upper bound, points), lowest first
const GT_SCORE_TIERS: &[(f64, u32)] = &[(30.0, 20), (50.0, 15), (70.0, 10), (85.0, 5)];

/// Anything that can score a snapshot
pub trait RiskScorer: Send + Sync {
    fn score(&self, snapshot: &TokenSnapshot) -> RiskScore;
}

/// Default nine-component scorer
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskCalculator;

impl RiskCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Score a snapshot against the current wall clock
    pub fn calculate_risk_score(&self, snapshot: &TokenSnapshot) -> RiskScore {
        self.calculate_risk_score_at(snapshot, Utc::now())
    }

    /// Score a snapshot as of `now`; identical inputs give identical output
    pub fn calculate_risk_score_at(&self, snapshot: &TokenSnapshot, now: DateTime<Utc>) -> RiskScore {
        let breakdown = RiskBreakdown {
            honeypot_risk: honeypot_risk(snapshot),
            authority_risk: authority_risk(snapshot),
            concentration_risk: concentration_risk(snapshot),
            liquidity_risk: liquidity_risk(snapshot),
            market_risk: market_risk(snapshot),
            age_risk: age_risk(snapshot, now),
            gt_score_risk: gt_score_risk(snapshot),
            trading_pattern_risk: trading_pattern_risk(snapshot),
            volatility_risk: volatility_risk(snapshot),
        };

        let total_score = breakdown.total();
        let signals = generate_signals(snapshot, &breakdown);
        let warnings = signals
            .iter()
            .filter(|s| s.severity.is_warning())
            .map(|s| s.message.clone())
            .collect();

        RiskScore {
            total_score,
            risk_level: RiskLevel::from_score(total_score),
            breakdown,
            signals,
            warnings,
            confidence: confidence(snapshot),
            calculated_at: now,
        }
    }
}

impl RiskScorer for RiskCalculator {
    fn score(&self, snapshot: &TokenSnapshot) -> RiskScore {
        self.calculate_risk_score(snapshot)
    }
}

/// Score a snapshot with the default calculator
pub fn calculate_risk_score(snapshot: &TokenSnapshot) -> RiskScore {
    RiskCalculator.calculate_risk_score(snapshot)
}

// ============================================================================
// Honeypot decision table
// ============================================================================

/// Facts the honeypot rules look at
#[derive(Debug, Clone, Copy)]
struct HoneypotEvidence<'a> {
    flag: HoneypotFlag,
    window: Option<&'a TxCounts>,
    volume_24h: Option<f64>,
}

impl<'a> HoneypotEvidence<'a> {
    fn from_snapshot(snapshot: &'a TokenSnapshot) -> Self {
        let pool = snapshot.primary_pool();
        let window = pool
            .and_then(|p| p.transactions.as_ref())
            .and_then(|tx| tx.preferred());
        // only the per-window pool volume counts; the basic pool total does not
        let volume_24h = pool.and_then(|p| p.volume_usd).and_then(|v| v.h24);

        Self {
            flag: snapshot.is_honeypot,
            window,
            volume_24h,
        }
    }

    /// The window, only when it holds enough transactions to judge
    fn usable_window(&self) -> Option<&'a TxCounts> {
        self.window
            .filter(|tx| tx.total() > MIN_HEURISTIC_TRANSACTIONS)
    }
}

type HoneypotRule = fn(&HoneypotEvidence<'_>) -> Option<HoneypotRisk>;

/// Evaluated top to bottom; the first rule that matches decides
const HONEYPOT_RULES: &[HoneypotRule] = &[
    confirmed_honeypot,
    confirmed_safe,
    insufficient_transactions,
    sells_blocked,
    sells_scarce,
    unique_sellers_scarce,
    sell_volume_scarce,
    transaction_pattern_clear,
];

fn finding(score: u32, verdict: HoneypotVerdict, method: impl Into<String>, sell_ratio: Option<f64>) -> HoneypotRisk {
    HoneypotRisk {
        score,
        is_honeypot: verdict,
        detection_method: method.into(),
        sell_ratio,
    }
}

fn confirmed_honeypot(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    (ev.flag == HoneypotFlag::Yes)
        .then(|| finding(30, HoneypotVerdict::Yes, "Confirmed by data provider", None))
}

fn confirmed_safe(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    (ev.flag == HoneypotFlag::No)
        .then(|| finding(0, HoneypotVerdict::No, "Verified safe by data provider", None))
}

fn insufficient_transactions(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    ev.usable_window().is_none().then(|| {
        finding(
            0,
            HoneypotVerdict::Unknown,
            "Insufficient transaction data - unable to verify",
            None,
        )
    })
}

fn sells_blocked(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    let ratio = ev.usable_window()?.sell_ratio()?;
    (ratio < 0.05).then(|| {
        finding(30, HoneypotVerdict::Yes, "No one can sell (honeypot pattern)", Some(ratio))
    })
}

fn sells_scarce(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    let ratio = ev.usable_window()?.sell_ratio()?;
    (ratio < 0.15).then(|| {
        finding(25, HoneypotVerdict::Suspected, "Very few sellers (suspicious)", Some(ratio))
    })
}

fn unique_sellers_scarce(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    let tx = ev.usable_window()?;
    if tx.unique_traders() <= MIN_UNIQUE_TRADERS {
        return None;
    }
    let seller_ratio = tx.unique_seller_ratio()?;
    (seller_ratio < 0.10).then(|| {
        finding(28, HoneypotVerdict::Yes, "Few unique sellers can exit", tx.sell_ratio())
    })
}

fn sell_volume_scarce(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    let tx = ev.usable_window()?;
    let volume = ev.volume_24h.filter(|v| *v > MIN_HEURISTIC_VOLUME_USD)?;

    let total = tx.total() as f64;
    let buy_volume = volume * tx.buys as f64 / total;
    let sell_volume = volume * tx.sells as f64 / total;
    if buy_volume <= 0.0 {
        return None;
    }

    (sell_volume / buy_volume < 0.10).then(|| {
        finding(25, HoneypotVerdict::Suspected, "Sell volume suspiciously low", tx.sell_ratio())
    })
}

fn transaction_pattern_clear(ev: &HoneypotEvidence<'_>) -> Option<HoneypotRisk> {
    let tx = ev.usable_window()?;
    let ratio = tx.sell_ratio()?;
    Some(finding(
        0,
        HoneypotVerdict::No,
        format!(
            "Transaction analysis ({:.1}% sells, {} unique sellers)",
            ratio * 100.0,
            tx.sellers
        ),
        Some(ratio),
    ))
}

fn honeypot_risk(snapshot: &TokenSnapshot) -> HoneypotRisk {
    let evidence = HoneypotEvidence::from_snapshot(snapshot);
    HONEYPOT_RULES
        .iter()
        .find_map(|rule| rule(&evidence))
        .unwrap_or_else(|| {
            finding(
                0,
                HoneypotVerdict::Unknown,
                "Insufficient transaction data - unable to verify",
                None,
            )
        })
}

// ============================================================================
// Remaining components
// ============================================================================

fn authority_risk(snapshot: &TokenSnapshot) -> AuthorityRisk {
    let Some(auth) = snapshot.authorities.as_ref() else {
        return AuthorityRisk::default();
    };

    let mint = auth.mint_active();
    let freeze = auth.freeze_active();
    let score = if mint { 15 } else { 0 } + if freeze { 15 } else { 0 };

    AuthorityRisk {
        score: score.min(AuthorityRisk::CAP),
        mint_authority_present: mint,
        freeze_authority_present: freeze,
    }
}

fn concentration_risk(snapshot: &TokenSnapshot) -> ConcentrationRisk {
    let top10 = snapshot.top10_percentage;
    let score = CONCENTRATION_TIERS
        .iter()
        .find(|(min, _)| top10 >= *min)
        .map(|(_, points)| *points)
        .unwrap_or(0);

    let top_holder = snapshot
        .top_holders
        .iter()
        .min_by_key(|h| h.rank)
        .map(|h| h.percentage)
        .unwrap_or(top10 / 10.0);

    ConcentrationRisk {
        score: score.min(ConcentrationRisk::CAP),
        top_holder_percentage: top_holder,
        top10_percentage: top10,
    }
}

fn liquidity_risk(snapshot: &TokenSnapshot) -> LiquidityRisk {
    let liquidity = snapshot.total_liquidity;
    let volume = snapshot.volume_24h;

    let mut score = if liquidity <= 0.0 {
        20
    } else {
        LIQUIDITY_TIERS
            .iter()
            .find(|(bound, _)| liquidity < *bound)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    };

    let ratio = (liquidity > 0.0 && volume > 0.0).then(|| volume / liquidity);
    if let Some(r) = ratio {
        if r > 100.0 {
            score += 10;
        } else if r > 50.0 {
            score += 5;
        }
    }

    LiquidityRisk {
        score: score.min(LiquidityRisk::CAP),
        has_pool: !snapshot.pools.is_empty(),
        total_liquidity_usd: liquidity,
        liquidity_locked: snapshot.pools.iter().any(|p| p.is_locked()),
        volume_to_liquidity_ratio: ratio,
    }
}

fn market_risk(snapshot: &TokenSnapshot) -> MarketRisk {
    let volume = snapshot.volume_24h;
    let market_cap = snapshot.market_cap;

    let mut score = if volume <= 0.0 {
        10
    } else {
        VOLUME_TIERS
            .iter()
            .find(|(bound, _)| volume < *bound)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    };

    if market_cap > 0.0 {
        score += MARKET_CAP_TIERS
            .iter()
            .find(|(bound, _)| market_cap < *bound)
            .map(|(_, points)| *points)
            .unwrap_or(0);
    }

    let bot_trading = snapshot
        .primary_pool()
        .and_then(|p| p.transactions.as_ref())
        .and_then(|tx| tx.h24.as_ref())
        .map(|tx| tx.total() > 50 && tx.unique_traders() < 10)
        .unwrap_or(false);
    if bot_trading {
        score += 3;
    }

    MarketRisk {
        score: score.min(MarketRisk::CAP),
        volume_24h: volume,
        market_cap,
        bot_trading_suspected: bot_trading,
    }
}

fn age_risk(snapshot: &TokenSnapshot, now: DateTime<Utc>) -> AgeRisk {
    let age = snapshot.age_in_days(now);
    let score = age
        .map(|days| {
            AGE_TIERS
                .iter()
                .find(|(bound, _)| days < *bound)
                .map(|(_, points)| *points)
                .unwrap_or(0)
        })
        .unwrap_or(0);

    AgeRisk {
        score: score.min(AgeRisk::CAP),
        age_in_days: age,
        first_trade_date: snapshot.created_at,
    }
}

fn gt_score_risk(snapshot: &TokenSnapshot) -> GtScoreRisk {
    let gt = snapshot.gt_score;
    let score = if gt <= 0.0 {
        5
    } else {
        GT_SCORE_TIERS
            .iter()
            .find(|(bound, _)| gt < *bound)
            .map(|(_, points)| *points)
            .unwrap_or(0)
    };

    GtScoreRisk {
        score: score.min(GtScoreRisk::CAP),
        gt_score: gt,
    }
}

fn trading_pattern_risk(snapshot: &TokenSnapshot) -> TradingPatternRisk {
    let Some(trades) = snapshot.recent_trades.as_ref() else {
        return TradingPatternRisk::default();
    };
    let a = &trades.analysis;

    let mut score = match a.wash_trading_score {
        w if w > 50.0 => 8,
        w if w > 30.0 => 6,
        w if w > 20.0 => 4,
        w if w > 10.0 => 2,
        _ => 0,
    };
    if a.unusual_trading_detected {
        score += 4;
    }
    score += match a.whale_activity_score {
        w if w > 40.0 => 3,
        w if w > 25.0 => 2,
        w if w > 10.0 => 1,
        _ => 0,
    };

    TradingPatternRisk {
        score: score.min(TradingPatternRisk::CAP),
        wash_trading_score: a.wash_trading_score,
        unusual_trading_detected: a.unusual_trading_detected,
        whale_activity_score: a.whale_activity_score,
        buy_sell_ratio: a.buy_sell_ratio,
        suspicious_transactions: a.suspicious_transactions,
    }
}

fn volatility_risk(snapshot: &TokenSnapshot) -> VolatilityRisk {
    let Some(ohlcv) = snapshot.ohlcv.as_ref() else {
        return VolatilityRisk::default();
    };
    let a = &ohlcv.analysis;

    let mut score = match a.volatility_score {
        v if v > 60.0 => 5,
        v if v > 40.0 => 4,
        v if v > 25.0 => 3,
        v if v > 15.0 => 2,
        v if v > 8.0 => 1,
        _ => 0,
    };
    score += match a.price_manipulation_risk {
        m if m > 50.0 => 3,
        m if m > 35.0 => 2,
        m if m > 20.0 => 1,
        _ => 0,
    };
    score += match a.liquidity_stability {
        LiquidityStability::Volatile => 2,
        LiquidityStability::Moderate => 1,
        _ => 0,
    };

    VolatilityRisk {
        score: score.min(VolatilityRisk::CAP),
        volatility_score: a.volatility_score,
        price_manipulation_risk: a.price_manipulation_risk,
        price_trend: a.price_trend,
        liquidity_stability: a.liquidity_stability,
        volume_spikes: a.volume_spikes.len(),
    }
}

/// 0.5 base plus 0.1 per available input class, capped at 1.0
fn confidence(snapshot: &TokenSnapshot) -> f64 {
    let has_pool_transactions = snapshot
        .primary_pool()
        .and_then(|p| p.transactions.as_ref())
        .map(|tx| !tx.is_empty())
        .unwrap_or(false);

    let present = [
        snapshot.holder_count > 0,
        snapshot.total_liquidity > 0.0,
        snapshot.volume_24h > 0.0,
        snapshot.created_at.is_some(),
        snapshot.gt_score > 0.0,
        has_pool_transactions,
        snapshot
            .recent_trades
            .as_ref()
            .map(|t| t.total_trades() > 0)
            .unwrap_or(false),
        snapshot
            .ohlcv
            .as_ref()
            .map(|o| o.data_points() > 0)
            .unwrap_or(false),
    ]
    .iter()
    .filter(|p| **p)
    .count();

    ((5 + present) as f64 / 10.0).min(1.0)
}
