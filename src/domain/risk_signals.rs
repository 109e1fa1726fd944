//! Risk Signal Generation
//!
//! Derives the ordered list of qualitative warnings from a scored breakdown
//! and the snapshot it was computed from.

use super::market_analysis::LiquidityStability;
use super::risk::{HoneypotVerdict, RiskBreakdown, RiskSignal, Severity, SignalType};
use super::token::TokenSnapshot;

pub const WASH_TRADING_SIGNAL_SCORE: f64 = 50.0;
pub const WHALE_SIGNAL_SCORE: f64 = 60.0;
pub const VOLATILITY_SIGNAL_SCORE: f64 = 60.0;
pub const MANIPULATION_SIGNAL_SCORE: f64 = 50.0;
pub const WASH_RATIO_SIGNAL: f64 = 50.0;
pub const NEW_TOKEN_DAYS: i64 = 7;
pub const LOW_LIQUIDITY_USD: f64 = 10_000.0;
pub const HIGH_CONCENTRATION_PCT: f64 = 70.0;
pub const LOW_GT_SCORE: f64 = 50.0;

/// (price-change threshold %, severity, window label) checked shortest first
const PUMP_RULES: &[(f64, Severity, &str, &str)] = &[
    (50.0, Severity::Critical, "Extreme pump", "5 minutes"),
    (100.0, Severity::High, "Major pump", "1 hour"),
    (200.0, Severity::High, "Significant pump", "6 hours"),
];

/// Build signals in a fixed order: honeypot, trading patterns, volatility,
/// legacy wash ratio, age, authorities, liquidity, holders, trust, pumps
pub fn generate_signals(snapshot: &TokenSnapshot, breakdown: &RiskBreakdown) -> Vec<RiskSignal> {
    let mut signals = Vec::new();

    let hp = &breakdown.honeypot_risk;
    match hp.is_honeypot {
        HoneypotVerdict::Yes => signals.push(RiskSignal::new(
            SignalType::HoneypotDetected,
            Severity::Critical,
            format!("HONEYPOT: {}", hp.detection_method),
        )),
        HoneypotVerdict::Suspected => signals.push(RiskSignal::new(
            SignalType::HoneypotSuspected,
            Severity::High,
            format!("Possible honeypot: {}", hp.detection_method),
        )),
        _ => {}
    }

    let tp = &breakdown.trading_pattern_risk;
    if tp.wash_trading_score > WASH_TRADING_SIGNAL_SCORE {
        let severity = if tp.wash_trading_score > 70.0 {
            Severity::Critical
        } else {
            Severity::High
        };
        signals.push(
            RiskSignal::new(
                SignalType::WashTradingDetected,
                severity,
                "Wash trading detected in recent trades",
            )
            .with_value(format!("{:.0}%", tp.wash_trading_score)),
        );
    }
    if tp.unusual_trading_detected {
        signals.push(
            RiskSignal::new(
                SignalType::UnusualTradingPatterns,
                Severity::High,
                "Unusual trading patterns detected",
            )
            .with_value(format!("{} suspicious transactions", tp.suspicious_transactions)),
        );
    }
    if tp.whale_activity_score > WHALE_SIGNAL_SCORE {
        signals.push(
            RiskSignal::new(
                SignalType::HighWhaleActivity,
                Severity::Medium,
                "High whale activity in recent trades",
            )
            .with_value(format!("{:.0}%", tp.whale_activity_score)),
        );
    }

    let vr = &breakdown.volatility_risk;
    if vr.volatility_score > VOLATILITY_SIGNAL_SCORE {
        let severity = if vr.volatility_score > 80.0 {
            Severity::High
        } else {
            Severity::Medium
        };
        signals.push(
            RiskSignal::new(SignalType::HighVolatility, severity, "High price volatility")
                .with_value(format!("{:.0}/100", vr.volatility_score)),
        );
    }
    if vr.price_manipulation_risk > MANIPULATION_SIGNAL_SCORE {
        let severity = if vr.price_manipulation_risk > 70.0 {
            Severity::High
        } else {
            Severity::Medium
        };
        signals.push(
            RiskSignal::new(
                SignalType::PriceManipulationRisk,
                severity,
                "Price action suggests possible manipulation",
            )
            .with_value(format!("{:.0}/100", vr.price_manipulation_risk)),
        );
    }
    if vr.liquidity_stability == LiquidityStability::Volatile {
        signals.push(RiskSignal::new(
            SignalType::LiquidityInstability,
            Severity::Medium,
            "Unstable liquidity conditions",
        ));
    }

    let lr = &breakdown.liquidity_risk;
    if let Some(ratio) = lr.volume_to_liquidity_ratio {
        if ratio > WASH_RATIO_SIGNAL {
            let severity = if ratio > 100.0 {
                Severity::High
            } else {
                Severity::Medium
            };
            signals.push(
                RiskSignal::new(
                    SignalType::WashTrading,
                    severity,
                    "Suspicious volume/liquidity ratio - possible wash trading",
                )
                .with_value(format!("{:.1}", ratio)),
            );
        }
    }

    if let Some(days) = breakdown.age_risk.age_in_days {
        if days < NEW_TOKEN_DAYS {
            signals.push(
                RiskSignal::new(
                    SignalType::NewToken,
                    Severity::High,
                    "Very new token - high risk of pump and dump",
                )
                .with_value(format!("{} days old", days)),
            );
        }
    }

    let ar = &breakdown.authority_risk;
    if ar.score > 0 {
        let active: Vec<&str> = [
            (ar.mint_authority_present, "mint"),
            (ar.freeze_authority_present, "freeze"),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, name)| *name)
        .collect();
        signals.push(
            RiskSignal::new(
                SignalType::AuthorityControl,
                Severity::High,
                "Token authorities not renounced - risk of rug pull",
            )
            .with_value(active.join(", ")),
        );
    }

    if lr.total_liquidity_usd <= 0.0 {
        signals.push(RiskSignal::new(
            SignalType::LowLiquidity,
            Severity::High,
            "No liquidity pool found - token may not be tradable",
        ));
    } else if lr.total_liquidity_usd < LOW_LIQUIDITY_USD {
        signals.push(
            RiskSignal::new(
                SignalType::LowLiquidity,
                Severity::High,
                "Very low liquidity - high slippage risk",
            )
            .with_value(format!("${:.0}", lr.total_liquidity_usd)),
        );
    }

    let cr = &breakdown.concentration_risk;
    if cr.top10_percentage > HIGH_CONCENTRATION_PCT {
        signals.push(
            RiskSignal::new(
                SignalType::HighConcentration,
                Severity::High,
                "Top holders control majority of supply - whale risk",
            )
            .with_value(format!("{:.1}%", cr.top10_percentage)),
        );
    }

    let gt = breakdown.gt_score_risk.gt_score;
    if gt > 0.0 && gt < LOW_GT_SCORE {
        signals.push(
            RiskSignal::new(SignalType::LowGtScore, Severity::Medium, "Low third-party trust score")
                .with_value(format!("{:.0}/100", gt)),
        );
    }

    if let Some(signal) = pump_signal(snapshot) {
        signals.push(signal);
    }

    signals
}

/// At most one pump signal, from the shortest window that trips
fn pump_signal(snapshot: &TokenSnapshot) -> Option<RiskSignal> {
    let change = snapshot.primary_pool()?.price_change?;
    let windows = [change.m5, change.h1, change.h6];

    PUMP_RULES
        .iter()
        .zip(windows)
        .find_map(|((threshold, severity, label, window), value)| {
            let pct = value.filter(|v| v > threshold)?;
            Some(
                RiskSignal::new(
                    SignalType::PumpDetected,
                    *severity,
                    format!("{} detected: +{:.0}% in {}", label, pct, window),
                )
                .with_value(format!("{:.1}%", pct)),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::risk::{AgeRisk, LiquidityRisk};

    #[test]
    fn test_no_pool_reports_low_liquidity() {
        let snapshot = TokenSnapshot::new("Mint", "TST", "Test");
        let breakdown = RiskBreakdown::default();

        let signals = generate_signals(&snapshot, &breakdown);
        let low = signals
            .iter()
            .find(|s| s.signal_type == SignalType::LowLiquidity)
            .unwrap();
        assert!(low.message.starts_with("No liquidity pool"));
    }

    #[test]
    fn test_unknown_age_is_not_new() {
        let snapshot = TokenSnapshot::new("Mint", "TST", "Test");
        let breakdown = RiskBreakdown {
            age_risk: AgeRisk::default(),
            liquidity_risk: LiquidityRisk {
                total_liquidity_usd: 1_000_000.0,
                ..Default::default()
            },
            ..Default::default()
        };

        let signals = generate_signals(&snapshot, &breakdown);
        assert!(signals.iter().all(|s| s.signal_type != SignalType::NewToken));
        assert!(signals.is_empty());
    }

    #[test]
    fn test_signal_order_is_stable() {
        let snapshot = TokenSnapshot::new("Mint", "TST", "Test");
        let mut breakdown = RiskBreakdown::default();
        breakdown.honeypot_risk.is_honeypot = HoneypotVerdict::Yes;
        breakdown.honeypot_risk.detection_method = "test".to_string();
        breakdown.age_risk.age_in_days = Some(1);
        breakdown.concentration_risk.top10_percentage = 95.0;

        let types: Vec<SignalType> = generate_signals(&snapshot, &breakdown)
            .into_iter()
            .map(|s| s.signal_type)
            .collect();
        assert_eq!(
            types,
            vec![
                SignalType::HoneypotDetected,
                SignalType::NewToken,
                SignalType::LowLiquidity,
                SignalType::HighConcentration,
            ]
        );
    }
}
