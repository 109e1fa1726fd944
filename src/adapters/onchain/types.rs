//! Solana JSON-RPC wire types
//!
//! Envelopes for `getAccountInfo` (jsonParsed) and `getTokenSupply`.

use serde::Deserialize;

/// JSON-RPC response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcErrorBody>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

impl RpcErrorBody {
    /// Invalid params: unknown or malformed account for this call
    pub const INVALID_PARAMS: i64 = -32602;

    pub fn is_invalid_params(&self) -> bool {
        self.code == Self::INVALID_PARAMS
    }
}

/// `{ context, value }` wrapper used by most account methods
#[derive(Debug, Clone, Deserialize)]
pub struct RpcValue<T> {
    pub value: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountInfoValue {
    pub data: AccountData,
    #[serde(default)]
    pub owner: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AccountData {
    Parsed(ParsedAccountData),
    Raw(Vec<String>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedAccountData {
    pub parsed: ParsedInfo,
    /// `spl-token` or `spl-token-2022`
    #[serde(default)]
    pub program: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParsedInfo {
    pub info: serde_json::Value,
    #[serde(rename = "type")]
    pub account_type: String,
}

/// Mint account fields we read
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintInfo {
    pub mint_authority: Option<String>,
    pub freeze_authority: Option<String>,
    pub supply: String,
    pub decimals: u8,
    #[serde(default)]
    pub is_initialized: bool,
}

/// `getTokenSupply` value
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub amount: String,
    pub decimals: u8,
}
