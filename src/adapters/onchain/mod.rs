//! On-chain Adapter
//!
//! Reads SPL mint accounts over Solana JSON-RPC (Helius when a key is
//! configured):
//! - Exact total supply in base units, never rounded through a float
//! - Mint authority status (renounced = safe)
//! - Freeze authority status (renounced = safe)

mod client;
mod types;

pub use client::{parse_mint, SolanaRpcConfig, SolanaRpcSource, DEFAULT_RPC_URL};
