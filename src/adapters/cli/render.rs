//! Terminal output for scored tokens

use std::fmt::Write;

use serde::Serialize;

use crate::domain::{RiskBreakdown, RiskScore, Severity, Token};

fn severity_tag(severity: Severity) -> &'static str {
    match severity {
        Severity::Low => "LOW",
        Severity::Medium => "MED",
        Severity::High => "HIGH",
        Severity::Critical => "CRIT",
    }
}

/// Compact USD amount: $1.23M, $45.6K, $789.00
pub fn format_usd(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000_000.0 {
        format!("${:.2}B", value / 1_000_000_000.0)
    } else if abs >= 1_000_000.0 {
        format!("${:.2}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("${:.1}K", value / 1_000.0)
    } else {
        format!("${:.2}", value)
    }
}

/// Score, breakdown and signals
pub fn render_risk_score(score: &RiskScore) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Risk: {}/{} {}  (confidence {:.0}%)",
        score.total_score,
        RiskBreakdown::MAX_TOTAL,
        score.risk_level,
        score.confidence * 100.0
    );

    for (name, points, cap) in score.breakdown.components() {
        let _ = writeln!(out, "  {:<16} {:>2}/{}", name, points, cap);
    }

    if !score.signals.is_empty() {
        let _ = writeln!(out, "Signals:");
        for signal in &score.signals {
            let _ = writeln!(out, "  [{}] {}", severity_tag(signal.severity), signal.message);
        }
    }
    out
}

/// Full report for one token
pub fn render_token(token: &Token) -> String {
    let s = &token.snapshot;
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})  {}", s.symbol, s.name, s.mint);
    let _ = writeln!(
        out,
        "Price ${}  24h {:+.2}%  MC {}  Vol {}  Liq {}",
        s.price,
        s.price_change_24h,
        format_usd(s.market_cap),
        format_usd(s.volume_24h),
        format_usd(s.total_liquidity)
    );
    let _ = writeln!(
        out,
        "Holders {}  top10 {:.1}%",
        s.holder_count, s.top10_percentage
    );
    out.push_str(&render_risk_score(&token.risk_score));
    out
}

/// One line per token for list output
pub fn render_token_row(token: &Token) -> String {
    let s = &token.snapshot;
    format!(
        "{:<10} {:>3} {:<6}  liq {:<9} mc {:<9} {}",
        s.symbol,
        token.risk_score.total_score,
        token.risk_level().as_str(),
        format_usd(s.total_liquidity),
        format_usd(s.market_cap),
        s.mint
    )
}

pub fn render_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RiskCalculator, TokenAuthorities, TokenSnapshot};

    fn create_token() -> Token {
        let mut snapshot = TokenSnapshot::new("Mint111", "RUG", "Rug Token");
        snapshot.authorities = Some(TokenAuthorities::from_flags(false, false));
        snapshot.top10_percentage = 92.0;
        snapshot.volume_24h = 1_500.0;
        let score = RiskCalculator::new().calculate_risk_score(&snapshot);
        Token::new(snapshot, score)
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(1_234_567.0), "$1.23M");
        assert_eq!(format_usd(45_600.0), "$45.6K");
        assert_eq!(format_usd(789.0), "$789.00");
        assert_eq!(format_usd(2_500_000_000.0), "$2.50B");
    }

    #[test]
    fn test_render_token_lists_components_and_signals() {
        let token = create_token();
        let text = render_token(&token);

        assert!(text.starts_with("RUG (Rug Token)  Mint111"));
        assert!(text.contains("/175 DANGER"));
        assert!(text.contains("authority        30/30"));
        assert!(text.contains("concentration    25/25"));
        assert!(text.contains("Signals:"));
    }

    #[test]
    fn test_render_row_and_json() {
        let token = create_token();
        let row = render_token_row(&token);
        assert!(row.starts_with("RUG"));
        assert!(row.contains("DANGER"));

        let json = render_json(&token).unwrap();
        assert!(json.contains("\"riskScore\""));
        assert!(json.contains("\"mint\": \"Mint111\""));
    }
}
