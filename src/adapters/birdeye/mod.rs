//! Birdeye Adapter
//!
//! Fallback market source (`/defi/token_overview`, `/defi/price`).

mod client;

pub use client::{BirdeyeClient, BirdeyeConfig, DEFAULT_BASE_URL};
