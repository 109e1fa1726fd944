//! Market Activity Analysis
//!
//! Derives wash-trading, whale and volatility indicators from raw trade lists
//! and OHLCV candles. Both analyses are pure and tolerate empty or degenerate
//! input by returning neutral defaults.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Trades above this USD size count as whale activity
pub const WHALE_TRADE_USD: f64 = 1_000.0;

/// Trades above this USD size are flagged as suspicious
pub const SUSPICIOUS_TRADE_USD: f64 = 10_000.0;

/// Sender addresses shorter than this are treated as malformed/suspicious
pub const MIN_SENDER_ADDRESS_LEN: usize = 10;

/// Candle volume above this multiple of the running average is a spike
pub const VOLUME_SPIKE_MULTIPLIER: f64 = 2.0;

/// First-to-last close move (percent) needed to call a trend
pub const TREND_THRESHOLD_PCT: f64 = 5.0;

/// Side of a single swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

/// A single recent swap against the token's pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub kind: TradeKind,
    pub volume_usd: f64,
    pub tx_from_address: String,
    #[serde(default)]
    pub tx_hash: Option<String>,
    #[serde(default)]
    pub block_timestamp: Option<DateTime<Utc>>,
}

/// Candle resolution requested from the primary source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OhlcvTimeframe {
    Day,
    Hour,
    Minute,
}

impl OhlcvTimeframe {
    /// Coarse to fine order used when earlier timeframes return nothing
    pub const CASCADE: [OhlcvTimeframe; 3] = [
        OhlcvTimeframe::Day,
        OhlcvTimeframe::Hour,
        OhlcvTimeframe::Minute,
    ];

    /// Path segment understood by the upstream API
    pub fn as_str(&self) -> &'static str {
        match self {
            OhlcvTimeframe::Day => "day",
            OhlcvTimeframe::Hour => "hour",
            OhlcvTimeframe::Minute => "minute",
        }
    }

    /// Number of candles requested for this timeframe
    pub fn default_limit(&self) -> usize {
        match self {
            OhlcvTimeframe::Day => 30,
            OhlcvTimeframe::Hour => 24,
            OhlcvTimeframe::Minute => 60,
        }
    }
}

/// One OHLCV candle (timestamp in unix seconds)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Derived indicators over a list of recent trades
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeAnalysis {
    pub total_trades: usize,
    pub buy_count: usize,
    pub sell_count: usize,
    pub total_buy_volume: f64,
    pub total_sell_volume: f64,
    /// buys / sells, 0 when there are no sells
    pub buy_sell_ratio: f64,
    pub average_trade_size: f64,
    /// 0-100
    pub wash_trading_score: f64,
    /// 0-100
    pub whale_activity_score: f64,
    pub unusual_trading_detected: bool,
    pub suspicious_transactions: usize,
    pub last_trade_time: Option<DateTime<Utc>>,
}

/// Analyze a trade list (newest first) for wash trading and whale activity
pub fn analyze_trading_patterns(trades: &[Trade]) -> TradeAnalysis {
    if trades.is_empty() {
        return TradeAnalysis::default();
    }

    let mut analysis = TradeAnalysis {
        total_trades: trades.len(),
        last_trade_time: trades[0].block_timestamp,
        ..Default::default()
    };

    let mut total_volume = 0.0;
    let mut whale_trades = 0usize;

    for trade in trades {
        let volume = trade.volume_usd.max(0.0);
        total_volume += volume;

        match trade.kind {
            TradeKind::Buy => {
                analysis.buy_count += 1;
                analysis.total_buy_volume += volume;
            }
            TradeKind::Sell => {
                analysis.sell_count += 1;
                analysis.total_sell_volume += volume;
            }
        }

        if volume > WHALE_TRADE_USD {
            whale_trades += 1;
        }

        if volume > SUSPICIOUS_TRADE_USD || trade.tx_from_address.len() < MIN_SENDER_ADDRESS_LEN {
            analysis.suspicious_transactions += 1;
        }
    }

    let n = trades.len() as f64;
    let wash = (analysis.suspicious_transactions as f64 / n * 200.0).min(100.0);
    let whale = (whale_trades as f64 / n * 150.0).min(100.0);

    analysis.buy_sell_ratio = if analysis.sell_count > 0 {
        round_to(analysis.buy_count as f64 / analysis.sell_count as f64, 2)
    } else {
        0.0
    };
    analysis.average_trade_size = (total_volume / n).round();
    analysis.wash_trading_score = wash.round();
    analysis.whale_activity_score = whale.round();
    analysis.unusual_trading_detected = wash > 20.0 || whale > 30.0;
    analysis.total_buy_volume = analysis.total_buy_volume.round();
    analysis.total_sell_volume = analysis.total_sell_volume.round();

    analysis
}

/// Direction of the close price over the analyzed window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTrend {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

/// How steady the pool has been, derived from the volatility score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LiquidityStability {
    Stable,
    Moderate,
    Volatile,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSpike {
    pub timestamp: i64,
    pub volume: f64,
    pub avg_volume: f64,
    pub spike_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
    pub range: f64,
}

/// Derived indicators over an OHLCV series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityAnalysis {
    /// 0-100
    pub volatility_score: f64,
    pub price_trend: PriceTrend,
    pub volume_spikes: Vec<VolumeSpike>,
    /// 0-100
    pub price_manipulation_risk: f64,
    pub liquidity_stability: LiquidityStability,
    pub average_volume: f64,
    pub price_range: PriceRange,
}

/// Analyze candles (oldest first) for volatility, trend and volume anomalies
pub fn analyze_ohlcv(candles: &[Candle]) -> VolatilityAnalysis {
    if candles.len() < 2 {
        return VolatilityAnalysis::default();
    }

    let mut total_volume = 0.0;
    let mut max_price = 0.0_f64;
    let mut min_price = f64::INFINITY;
    let mut changes = Vec::with_capacity(candles.len());
    let mut volume_spikes = Vec::new();

    for (index, candle) in candles.iter().enumerate() {
        total_volume += candle.volume;
        max_price = max_price.max(candle.high);
        min_price = min_price.min(candle.low);

        if index > 0 {
            let prev_close = candles[index - 1].close;
            if prev_close > 0.0 {
                changes.push((candle.close - prev_close) / prev_close * 100.0);
            }
        }

        let avg_volume = total_volume / (index + 1) as f64;
        if avg_volume > 0.0 && candle.volume > avg_volume * VOLUME_SPIKE_MULTIPLIER {
            volume_spikes.push(VolumeSpike {
                timestamp: candle.timestamp,
                volume: candle.volume,
                avg_volume,
                spike_ratio: candle.volume / avg_volume,
            });
        }
    }

    let volatility = if changes.is_empty() {
        0.0
    } else {
        changes.iter().population_std_dev()
    };
    let volatility_score = (volatility * 2.0).min(100.0);

    let first_close = candles[0].close;
    let last_close = candles[candles.len() - 1].close;
    let price_trend = if first_close > 0.0 {
        let overall = (last_close - first_close) / first_close * 100.0;
        if overall > TREND_THRESHOLD_PCT {
            PriceTrend::Bullish
        } else if overall < -TREND_THRESHOLD_PCT {
            PriceTrend::Bearish
        } else {
            PriceTrend::Neutral
        }
    } else {
        PriceTrend::Neutral
    };

    let manipulation = (volatility_score * 0.6 + volume_spikes.len() as f64 * 5.0).min(100.0);

    let liquidity_stability = if volatility_score > 50.0 {
        LiquidityStability::Volatile
    } else if volatility_score > 30.0 {
        LiquidityStability::Moderate
    } else {
        LiquidityStability::Stable
    };

    VolatilityAnalysis {
        volatility_score: volatility_score.round(),
        price_trend,
        volume_spikes,
        price_manipulation_risk: manipulation.round(),
        liquidity_stability,
        average_volume: (total_volume / candles.len() as f64).round(),
        price_range: PriceRange {
            high: max_price,
            low: min_price,
            range: max_price - min_price,
        },
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
