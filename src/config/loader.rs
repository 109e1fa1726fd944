//! Configuration Loader
//!
//! Loads and validates configuration from TOML files. Every section is
//! optional and falls back to built-in defaults; API keys and the RPC URL can
//! be overridden from the environment.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::birdeye::BirdeyeConfig;
use crate::adapters::cache::TokenCache;
use crate::adapters::geckoterminal::{GeckoTerminalConfig, MAX_MULTI_ADDRESSES};
use crate::adapters::onchain::SolanaRpcConfig;
use crate::application::{AggregatorConfig, RefresherConfig};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub primary: PrimarySection,
    pub onchain: OnchainSection,
    pub fallback: FallbackSection,
    pub cache: CacheSection,
    pub aggregator: AggregatorSection,
    pub refresher: RefresherSection,
    pub logging: LoggingSection,
}

/// Primary market source (GeckoTerminal) section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PrimarySection {
    pub base_url: String,
    /// Pro API key; overridden by COINGECKO_API_KEY
    pub api_key: Option<String>,
    pub network: String,
    pub timeout_ms: u64,
    pub min_request_interval_ms: u64,
    pub requests_per_minute: u32,
    pub max_retries: u32,
}

impl Default for PrimarySection {
    fn default() -> Self {
        let client = GeckoTerminalConfig::default();
        Self {
            base_url: client.base_url,
            api_key: None,
            network: client.network,
            timeout_ms: client.timeout.as_millis() as u64,
            min_request_interval_ms: client.min_request_interval.as_millis() as u64,
            requests_per_minute: client.requests_per_minute,
            max_retries: client.max_retries,
        }
    }
}

impl PrimarySection {
    pub fn client_config(&self) -> GeckoTerminalConfig {
        GeckoTerminalConfig {
            base_url: self.base_url.clone(),
            network: self.network.clone(),
            timeout: Duration::from_millis(self.timeout_ms),
            min_request_interval: Duration::from_millis(self.min_request_interval_ms),
            requests_per_minute: self.requests_per_minute,
            max_retries: self.max_retries,
            ..Default::default()
        }
        .with_api_key(self.api_key.clone())
    }
}

/// On-chain (Solana RPC) section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OnchainSection {
    /// Explicit RPC endpoint; overridden by RPC_URL
    pub rpc_url: Option<String>,
    /// Used to build a Helius endpoint when no explicit URL is set
    pub helius_api_key: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
}

impl Default for OnchainSection {
    fn default() -> Self {
        Self {
            rpc_url: None,
            helius_api_key: None,
            timeout_ms: 10_000,
            max_retries: 3,
        }
    }
}

impl OnchainSection {
    pub fn client_config(&self) -> SolanaRpcConfig {
        SolanaRpcConfig::resolve(self.rpc_url.as_deref(), self.helius_api_key.as_deref())
            .with_timeout(Duration::from_millis(self.timeout_ms))
            .with_max_retries(self.max_retries)
    }
}

/// Fallback market source (Birdeye) section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackSection {
    pub base_url: String,
    /// Overridden by BIRDEYE_API_KEY; without a key the fallback is inert
    pub api_key: Option<String>,
    pub timeout_ms: u64,
}

impl Default for FallbackSection {
    fn default() -> Self {
        Self {
            base_url: BirdeyeConfig::default().base_url,
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

impl FallbackSection {
    pub fn client_config(&self) -> BirdeyeConfig {
        BirdeyeConfig::default()
            .with_base_url(self.base_url.clone())
            .with_api_key(self.api_key.clone())
            .with_timeout(Duration::from_millis(self.timeout_ms))
    }
}

/// Cache section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    pub enabled: bool,
    pub default_ttl_secs: u64,
    /// TTL for single-token snapshots; overridden by CACHE_TTL_SECONDS
    pub token_ttl_secs: u64,
    pub trending_ttl_secs: u64,
    pub max_entries: usize,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl_secs: 30,
            token_ttl_secs: 60,
            trending_ttl_secs: 3_600,
            max_entries: 10_000,
        }
    }
}

impl CacheSection {
    /// In-memory cache, or an always-miss cache when disabled
    pub fn build_cache(&self) -> TokenCache {
        let cache = if self.enabled {
            TokenCache::in_memory(self.max_entries)
        } else {
            TokenCache::disabled()
        };
        cache.with_default_ttl(Duration::from_secs(self.default_ttl_secs))
    }
}

/// Aggregator pacing section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    pub batch_size: usize,
    pub trending_batch_size: usize,
    pub call_timeout_ms: u64,
    pub inter_token_delay_ms: u64,
    pub enrichment_delay_ms: u64,
    pub inter_batch_delay_ms: u64,
    pub rate_limit_backoff_ms: u64,
    /// Minimum trade sizes (USD) tried in order
    pub trade_thresholds: Vec<f64>,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        let defaults = AggregatorConfig::default();
        Self {
            batch_size: defaults.batch_size,
            trending_batch_size: defaults.trending_batch_size,
            call_timeout_ms: defaults.call_timeout.as_millis() as u64,
            inter_token_delay_ms: defaults.inter_token_delay.as_millis() as u64,
            enrichment_delay_ms: defaults.enrichment_delay.as_millis() as u64,
            inter_batch_delay_ms: defaults.inter_batch_delay.as_millis() as u64,
            rate_limit_backoff_ms: defaults.rate_limit_backoff.as_millis() as u64,
            trade_thresholds: defaults.trade_thresholds,
        }
    }
}

/// Background refresher section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefresherSection {
    pub interval_secs: u64,
    pub trending_limit: usize,
}

impl Default for RefresherSection {
    fn default() -> Self {
        Self {
            interval_secs: 3_600,
            trending_limit: 100,
        }
    }
}

/// Logging section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file, apply env overrides, validate
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut config: Config = toml::from_str(&content)?;
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults
pub fn load_config_or_default<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        return load_config(path);
    }

    tracing::info!(path = %path.display(), "Config file not found, using defaults");
    let mut config = Config::default();
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Config {
    /// Apply COINGECKO_API_KEY, BIRDEYE_API_KEY, HELIUS_API_KEY, RPC_URL and
    /// CACHE_TTL_SECONDS from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).and_then(non_blank);

        if let Some(key) = var("COINGECKO_API_KEY") {
            self.primary.api_key = Some(key);
        }
        if let Some(key) = var("BIRDEYE_API_KEY") {
            self.fallback.api_key = Some(key);
        }
        if let Some(key) = var("HELIUS_API_KEY") {
            self.onchain.helius_api_key = Some(key);
        }
        if let Some(url) = var("RPC_URL") {
            self.onchain.rpc_url = Some(url);
        }
        if let Some(raw) = var("CACHE_TTL_SECONDS") {
            match raw.parse::<u64>() {
                Ok(secs) => self.cache.token_ttl_secs = secs,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring invalid CACHE_TTL_SECONDS"),
            }
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.primary.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "primary.base_url cannot be empty".to_string(),
            ));
        }

        if self.primary.requests_per_minute == 0 {
            return Err(ConfigError::ValidationError(
                "primary.requests_per_minute must be > 0".to_string(),
            ));
        }

        if self.onchain.rpc_url.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "onchain.rpc_url cannot be empty when set".to_string(),
            ));
        }

        if self.fallback.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "fallback.base_url cannot be empty".to_string(),
            ));
        }

        let agg = &self.aggregator;
        if agg.batch_size == 0 || agg.batch_size > MAX_MULTI_ADDRESSES {
            return Err(ConfigError::ValidationError(format!(
                "aggregator.batch_size must be 1-{}, got {}",
                MAX_MULTI_ADDRESSES, agg.batch_size
            )));
        }

        if agg.trending_batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "aggregator.trending_batch_size must be > 0".to_string(),
            ));
        }

        if agg.call_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "aggregator.call_timeout_ms must be > 0".to_string(),
            ));
        }

        if agg.trade_thresholds.is_empty() || agg.trade_thresholds.iter().any(|t| *t < 0.0 || !t.is_finite()) {
            return Err(ConfigError::ValidationError(format!(
                "aggregator.trade_thresholds must be non-empty and non-negative, got {:?}",
                agg.trade_thresholds
            )));
        }

        let cache = &self.cache;
        if cache.default_ttl_secs == 0 || cache.token_ttl_secs == 0 || cache.trending_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "cache TTLs must be > 0".to_string(),
            ));
        }

        if cache.enabled && cache.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_entries must be > 0 when the cache is enabled".to_string(),
            ));
        }

        if self.refresher.interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "refresher.interval_secs must be > 0".to_string(),
            ));
        }

        if self.refresher.trending_limit == 0 {
            return Err(ConfigError::ValidationError(
                "refresher.trending_limit must be > 0".to_string(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "logging.level must be one of {:?}, got '{}'",
                LOG_LEVELS, self.logging.level
            )));
        }

        Ok(())
    }

    /// Aggregator tuning, TTLs included
    pub fn aggregator_config(&self) -> AggregatorConfig {
        let agg = &self.aggregator;
        AggregatorConfig {
            batch_size: agg.batch_size,
            trending_batch_size: agg.trending_batch_size,
            call_timeout: Duration::from_millis(agg.call_timeout_ms),
            inter_token_delay: Duration::from_millis(agg.inter_token_delay_ms),
            enrichment_delay: Duration::from_millis(agg.enrichment_delay_ms),
            inter_batch_delay: Duration::from_millis(agg.inter_batch_delay_ms),
            rate_limit_backoff: Duration::from_millis(agg.rate_limit_backoff_ms),
            trade_thresholds: agg.trade_thresholds.clone(),
            ..Default::default()
        }
        .with_ttls(
            Duration::from_secs(self.cache.token_ttl_secs),
            Duration::from_secs(self.cache.trending_ttl_secs),
        )
    }

    pub fn refresher_config(&self) -> RefresherConfig {
        RefresherConfig {
            interval: Duration::from_secs(self.refresher.interval_secs),
            trending_limit: self.refresher.trending_limit,
        }
    }
}
