//! GeckoTerminal Adapter
//!
//! Primary market source: token metadata, holders, authorities, pools,
//! trades, OHLCV and trending pools from the CoinGecko on-chain API.
//!
//! # Example
//! ```ignore
//! let client = GeckoTerminalClient::new(
//!     GeckoTerminalConfig::default().with_api_key(Some(key)),
//! )?;
//! let info = client.fetch_token_info(mint).await?;
//! ```

mod client;
mod types;

pub use client::{
    GeckoTerminalClient, GeckoTerminalConfig, DEFAULT_BASE_URL, MAX_MULTI_ADDRESSES,
    MAX_OHLCV_LIMIT, MAX_TOP_HOLDERS, TRENDING_PAGE_SIZE,
};
pub use types::address_from_id;
