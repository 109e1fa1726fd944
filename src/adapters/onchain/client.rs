//! Solana RPC Client
//!
//! On-chain source reading the mint account directly: exact supply via
//! `getTokenSupply`, mint/freeze authorities via `getAccountInfo` with
//! jsonParsed encoding.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;
use solana_sdk::pubkey::Pubkey;

use super::types::{
    AccountData, AccountInfoValue, MintInfo, RpcResponse, RpcValue, TokenAmount,
};
use crate::adapters::http::{self, RetryPolicy};
use crate::domain::TokenAuthorities;
use crate::ports::sources::{OnchainSource, SourceError, SourceResult};

const PROVIDER: &str = "solana-rpc";

pub const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";
const HELIUS_RPC_URL: &str = "https://mainnet.helius-rpc.com";

/// Configuration for the on-chain client
#[derive(Debug, Clone)]
pub struct SolanaRpcConfig {
    /// Solana RPC endpoint URL
    pub rpc_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Attempts per call including the first
    pub max_retries: u32,
    /// Base delay for backoff (milliseconds)
    pub retry_base_delay_ms: u64,
    pub commitment: String,
}

impl Default for SolanaRpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_base_delay_ms: 500,
            commitment: "finalized".to_string(),
        }
    }
}

impl SolanaRpcConfig {
    /// Explicit RPC URL wins; otherwise Helius when a key is present
    pub fn resolve(rpc_url: Option<&str>, helius_api_key: Option<&str>) -> Self {
        let rpc_url = match (rpc_url, helius_api_key) {
            (Some(url), _) if !url.trim().is_empty() => url.to_string(),
            (_, Some(key)) if !key.trim().is_empty() => {
                format!("{}/?api-key={}", HELIUS_RPC_URL, key)
            }
            _ => DEFAULT_RPC_URL.to_string(),
        };
        Self {
            rpc_url,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Validate a base58 mint address
pub fn parse_mint(mint: &str) -> SourceResult<Pubkey> {
    Pubkey::from_str(mint.trim()).map_err(|_| SourceError::InvalidMint(mint.to_string()))
}

/// JSON-RPC client for mint account reads
#[derive(Debug, Clone)]
pub struct SolanaRpcSource {
    config: SolanaRpcConfig,
    http: Client,
}

impl SolanaRpcSource {
    pub fn new(config: SolanaRpcConfig) -> SourceResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(http::transport_error)?;

        Ok(Self { config, http })
    }

    /// RPC URL with any api-key query stripped, for logging
    pub fn endpoint(&self) -> &str {
        self.config
            .rpc_url
            .split_once('?')
            .map(|(base, _)| base)
            .unwrap_or(&self.config.rpc_url)
    }

    /// POST one JSON-RPC call; None when the node says the params are invalid
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> SourceResult<Option<T>> {
        let request_body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let policy = RetryPolicy::new(self.config.max_retries, self.config.retry_base_delay_ms);
        let response = http::execute_with_retry(PROVIDER, policy, || {
            self.http.post(&self.config.rpc_url).json(&request_body).send()
        })
        .await?;

        let Some(response) = response else {
            return Ok(None);
        };
        let body: RpcResponse<T> = http::read_json(response).await?;

        if let Some(error) = body.error {
            if error.is_invalid_params() {
                tracing::debug!(method, message = %error.message, "RPC rejected params");
                return Ok(None);
            }
            return Err(SourceError::Malformed(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }
        Ok(body.result)
    }

    async fn get_mint_info(&self, mint: &str) -> SourceResult<Option<MintInfo>> {
        let pubkey = parse_mint(mint)?;
        let result: Option<RpcValue<AccountInfoValue>> = self
            .call(
                "getAccountInfo",
                json!([
                    pubkey.to_string(),
                    { "encoding": "jsonParsed", "commitment": self.config.commitment }
                ]),
            )
            .await?;

        let Some(value) = result.and_then(|r| r.value) else {
            return Ok(None);
        };
        parse_mint_account(mint, value)
    }
}

/// Extract mint fields from a parsed account; non-mint accounts yield None
pub fn parse_mint_account(mint: &str, value: AccountInfoValue) -> SourceResult<Option<MintInfo>> {
    let parsed = match value.data {
        AccountData::Parsed(parsed) => parsed,
        AccountData::Raw(_) => {
            return Err(SourceError::Malformed(format!(
                "Expected jsonParsed encoding for {}, got raw data",
                mint
            )))
        }
    };

    if parsed.parsed.account_type != "mint" {
        tracing::debug!(
            mint,
            account_type = %parsed.parsed.account_type,
            "Account is not a mint"
        );
        return Ok(None);
    }

    serde_json::from_value(parsed.parsed.info)
        .map(Some)
        .map_err(|e| SourceError::Malformed(format!("Invalid mint account data: {}", e)))
}

fn parse_amount(raw: &str) -> SourceResult<u128> {
    raw.trim()
        .parse::<u128>()
        .map_err(|e| SourceError::Malformed(format!("Failed to parse supply '{}': {}", raw, e)))
}

#[async_trait]
impl OnchainSource for SolanaRpcSource {
    async fn fetch_onchain_supply(&self, mint: &str) -> SourceResult<Option<u128>> {
        let pubkey = parse_mint(mint)?;
        let result: Option<RpcValue<TokenAmount>> = self
            .call(
                "getTokenSupply",
                json!([pubkey.to_string(), { "commitment": self.config.commitment }]),
            )
            .await?;

        result
            .and_then(|r| r.value)
            .map(|amount| parse_amount(&amount.amount))
            .transpose()
    }

    async fn fetch_onchain_authorities(&self, mint: &str) -> SourceResult<Option<TokenAuthorities>> {
        Ok(self.get_mint_info(mint).await?.map(|info| {
            TokenAuthorities::from_addresses(info.mint_authority, info.freeze_authority)
        }))
    }
}
