#![allow(dead_code, unused_imports, unused_variables)]
//! rugwatch - Solana token rug-pull and honeypot risk scoring
//!
//! Aggregates market, holder and on-chain data for a token from several
//! unreliable sources into one snapshot and scores it.
//!
//! # Modules
//!
//! - `domain`: Token snapshot, derived trade/OHLCV analysis, risk scoring
//! - `ports`: Trait abstractions (data sources, cache store) and test fakes
//! - `adapters`: External implementations (GeckoTerminal, Solana RPC, Birdeye, cache, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Aggregator and background refresher

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod config;
pub mod application;
