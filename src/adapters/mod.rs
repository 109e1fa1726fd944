//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - GeckoTerminal: primary market source
//! - On-chain: Solana JSON-RPC mint reads
//! - Birdeye: fallback market source
//! - Cache: in-memory and disabled stores behind a typed wrapper
//! - CLI: Command-line interface handlers
//!
//! `http` holds the rate limiting and retry plumbing the REST clients share.

pub mod http;
pub mod geckoterminal;
pub mod onchain;
pub mod birdeye;
pub mod cache;
pub mod cli;

pub use geckoterminal::{GeckoTerminalClient, GeckoTerminalConfig};
pub use onchain::{SolanaRpcConfig, SolanaRpcSource};
pub use birdeye::{BirdeyeClient, BirdeyeConfig};
pub use cache::{MemoryCacheStore, TokenCache};
pub use cli::CliApp;
