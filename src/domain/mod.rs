//! Domain Layer - Token snapshot model and risk scoring
//!
//! Pure types and logic with no I/O. Everything that talks to the outside
//! world goes through the ports layer.
//!
//! - `token`: canonical token snapshot and its parts
//! - `market_analysis`: derived trade and OHLCV indicators
//! - `risk`: risk score, breakdown and signal types
//! - `risk_calculator`: nine-component scorer and honeypot decision table
//! - `risk_signals`: qualitative signal generation

pub mod token;
pub mod market_analysis;
pub mod risk;
pub mod risk_calculator;
pub mod risk_signals;

pub use token::{
    HoneypotFlag, LiquidityPool, OhlcvAnalysis, RecentTrades, TimeframeValues, Token,
    TokenAuthorities, TokenHolder, TokenSnapshot, TransactionWindows, TxCounts,
};
pub use market_analysis::{
    analyze_ohlcv, analyze_trading_patterns, Candle, LiquidityStability, OhlcvTimeframe,
    PriceTrend, Trade, TradeAnalysis, TradeKind, VolatilityAnalysis,
};
pub use risk::{
    HoneypotVerdict, RiskBreakdown, RiskLevel, RiskScore, RiskSignal, Severity, SignalType,
};
pub use risk_calculator::{calculate_risk_score, RiskCalculator, RiskScorer};
pub use risk_signals::generate_signals;
