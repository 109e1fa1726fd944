//! CLI Commands
//!
//! Argument definitions for the rugwatch command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default config location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/rugwatch.toml";

/// rugwatch - Rug-pull and honeypot risk scoring for Solana tokens
#[derive(Parser, Debug)]
#[command(
    name = "rugwatch",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Rug-pull and honeypot risk scoring for Solana tokens",
    long_about = "rugwatch merges market, holder and on-chain data for a Solana token \
                  into one snapshot and scores it across nine risk components, with \
                  human-readable warnings."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file (missing file = built-in defaults)
    #[arg(short, long, global = true, value_name = "FILE", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Score a single token
    Token(TokenCmd),

    /// Score several tokens in one batch
    Tokens(TokensCmd),

    /// Score the currently trending tokens
    Trending(TrendingCmd),

    /// Score a token snapshot stored as JSON, offline
    Score(ScoreCmd),

    /// Refresh the trending list in the background
    Refresh(RefreshCmd),
}

/// Look up one mint
#[derive(Parser, Debug)]
pub struct TokenCmd {
    /// Token mint address
    #[arg(value_name = "MINT")]
    pub mint: String,

    /// Print the full token as JSON
    #[arg(long)]
    pub json: bool,
}

/// Look up many mints
#[derive(Parser, Debug)]
pub struct TokensCmd {
    /// Token mint addresses (at most 100)
    #[arg(value_name = "MINT", required = true, num_args = 1..)]
    pub mints: Vec<String>,

    /// Print the tokens as JSON
    #[arg(long)]
    pub json: bool,
}

/// Trending tokens
#[derive(Parser, Debug)]
pub struct TrendingCmd {
    /// Number of tokens to return
    #[arg(short, long, value_name = "N", default_value = "20")]
    pub limit: usize,

    /// Print the tokens as JSON
    #[arg(long)]
    pub json: bool,
}

/// Offline scoring
#[derive(Parser, Debug)]
pub struct ScoreCmd {
    /// JSON file holding a token snapshot
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Print the risk score as JSON
    #[arg(long)]
    pub json: bool,
}

/// Background refresh
#[derive(Parser, Debug)]
pub struct RefreshCmd {
    /// Run a single refresh and exit
    #[arg(long)]
    pub once: bool,

    /// Override the refresh interval (seconds)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_command() {
        let app = CliApp::parse_from(["rugwatch", "token", "So11111111111111111111111111111111111111112", "--json"]);
        match app.command {
            Command::Token(cmd) => {
                assert_eq!(cmd.mint, "So11111111111111111111111111111111111111112");
                assert!(cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(app.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_parse_tokens_requires_mints() {
        assert!(CliApp::try_parse_from(["rugwatch", "tokens"]).is_err());

        let app = CliApp::parse_from(["rugwatch", "tokens", "MintA", "MintB"]);
        match app.command {
            Command::Tokens(cmd) => assert_eq!(cmd.mints, vec!["MintA", "MintB"]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_trending_defaults() {
        let app = CliApp::parse_from(["rugwatch", "trending"]);
        match app.command {
            Command::Trending(cmd) => {
                assert_eq!(cmd.limit, 20);
                assert!(!cmd.json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let app = CliApp::parse_from([
            "rugwatch", "refresh", "--once", "--debug", "--config", "~/rugwatch.toml",
        ]);
        assert!(app.debug);
        assert_eq!(app.config, PathBuf::from("~/rugwatch.toml"));
        match app.command {
            Command::Refresh(cmd) => {
                assert!(cmd.once);
                assert!(cmd.interval.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
