//! rugwatch - Solana token rug-pull and honeypot risk scoring
//!
//! Looks up tokens across the configured data sources and prints their risk
//! scores, or keeps the cached trending list fresh in the background.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use rugwatch::adapters::birdeye::BirdeyeClient;
use rugwatch::adapters::cli::render::{render_json, render_risk_score, render_token, render_token_row};
use rugwatch::adapters::cli::{CliApp, Command, RefreshCmd, ScoreCmd, TokenCmd, TokensCmd, TrendingCmd};
use rugwatch::adapters::geckoterminal::GeckoTerminalClient;
use rugwatch::adapters::onchain::{parse_mint, SolanaRpcSource};
use rugwatch::application::{
    BackgroundRefresher, RefreshOutcome, TokenAggregator, MAX_BATCH_MINTS,
};
use rugwatch::config::{load_config_or_default, Config};
use rugwatch::domain::{RiskCalculator, Token, TokenSnapshot};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (API keys go here, not in the config file)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    let config_path = expand_path(&app.config);
    let config = load_config_or_default(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;
    init_logging(app.verbose, app.debug, &config.logging.level)?;

    match app.command {
        Command::Token(cmd) => token_command(cmd, &config).await,
        Command::Tokens(cmd) => tokens_command(cmd, &config).await,
        Command::Trending(cmd) => trending_command(cmd, &config).await,
        Command::Score(cmd) => score_command(cmd),
        Command::Refresh(cmd) => refresh_command(cmd, &config).await,
    }
}

/// Flags win over the config level; RUST_LOG wins over both
fn init_logging(verbose: bool, debug: bool, config_level: &str) -> Result<()> {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        config_level
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt().with_env_filter(filter).with_target(false).init();
    Ok(())
}

/// Expand `~` and environment variables in a path
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).as_ref()),
    }
}

fn build_aggregator(config: &Config) -> Result<Arc<TokenAggregator>> {
    let primary = GeckoTerminalClient::new(config.primary.client_config())
        .context("Failed to create primary market client")?;
    let onchain = SolanaRpcSource::new(config.onchain.client_config())
        .context("Failed to create Solana RPC client")?;
    let fallback = BirdeyeClient::new(config.fallback.client_config())
        .context("Failed to create fallback market client")?;

    if config.primary.api_key.is_none() {
        tracing::warn!("COINGECKO_API_KEY not set, primary source requests may be rejected");
    }
    if !fallback.is_configured() {
        tracing::info!("BIRDEYE_API_KEY not set, fallback source disabled");
    }
    tracing::debug!(rpc = %onchain.endpoint(), "On-chain source ready");

    let aggregator = TokenAggregator::new(
        Arc::new(primary),
        Arc::new(onchain),
        Arc::new(fallback),
        config.cache.build_cache(),
    )
    .with_config(config.aggregator_config());

    Ok(Arc::new(aggregator))
}

fn print_tokens(tokens: &[Token], json: bool) -> Result<()> {
    if json {
        println!("{}", render_json(&tokens)?);
        return Ok(());
    }
    if tokens.is_empty() {
        println!("No tokens found");
        return Ok(());
    }
    for token in tokens {
        println!("{}", render_token_row(token));
    }
    Ok(())
}

async fn token_command(cmd: TokenCmd, config: &Config) -> Result<()> {
    let mint = cmd.mint.trim();
    parse_mint(mint).with_context(|| format!("'{}' is not a valid mint address", mint))?;

    let aggregator = build_aggregator(config)?;
    let Some(token) = aggregator.get_complete_token_data(mint).await else {
        bail!("Token not found or not supported: {}", mint);
    };

    if cmd.json {
        println!("{}", render_json(&token)?);
    } else {
        print!("{}", render_token(&token));
    }
    Ok(())
}

async fn tokens_command(cmd: TokensCmd, config: &Config) -> Result<()> {
    if cmd.mints.len() > MAX_BATCH_MINTS {
        bail!("At most {} mints per request, got {}", MAX_BATCH_MINTS, cmd.mints.len());
    }
    for mint in &cmd.mints {
        parse_mint(mint).with_context(|| format!("'{}' is not a valid mint address", mint))?;
    }

    let aggregator = build_aggregator(config)?;
    let tokens = aggregator.get_multiple_tokens(&cmd.mints).await;
    print_tokens(&tokens, cmd.json)
}

async fn trending_command(cmd: TrendingCmd, config: &Config) -> Result<()> {
    let aggregator = build_aggregator(config)?;
    let tokens = aggregator.get_trending_tokens(cmd.limit).await;
    print_tokens(&tokens, cmd.json)
}

fn score_command(cmd: ScoreCmd) -> Result<()> {
    let path = expand_path(&cmd.file);
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let snapshot: TokenSnapshot = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid token snapshot", path.display()))?;

    let score = RiskCalculator::new().calculate_risk_score(&snapshot);
    if cmd.json {
        println!("{}", render_json(&score)?);
    } else {
        println!("{} ({})  {}", snapshot.symbol, snapshot.name, snapshot.mint);
        print!("{}", render_risk_score(&score));
    }
    Ok(())
}

async fn refresh_command(cmd: RefreshCmd, config: &Config) -> Result<()> {
    let aggregator = build_aggregator(config)?;
    let mut refresher_config = config.refresher_config();
    if let Some(secs) = cmd.interval {
        refresher_config.interval = Duration::from_secs(secs);
    }
    let refresher = Arc::new(BackgroundRefresher::new(aggregator, refresher_config));

    if cmd.once {
        match refresher.run_once().await {
            RefreshOutcome::Completed { tokens } => println!("Refreshed {} trending tokens", tokens),
            RefreshOutcome::Skipped => println!("Refresh already in progress"),
        }
        return Ok(());
    }

    refresher.start().await.context("Failed to start refresher")?;
    tracing::info!("Refreshing in the background, press Ctrl+C to stop");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");
    refresher.stop().await;

    let status = refresher.status().await;
    if let (Some(last_run), Some(count)) = (status.last_run, status.last_count) {
        println!("Last refresh at {}: {} tokens", last_run.to_rfc3339(), count);
    }
    Ok(())
}
