//! CLI Adapter
//!
//! Command-line interface for rugwatch.
//! Uses clap derive macros for argument parsing.

mod commands;
pub mod render;

pub use commands::{
    CliApp, Command, RefreshCmd, ScoreCmd, TokenCmd, TokensCmd, TrendingCmd, DEFAULT_CONFIG_PATH,
};

/// Initialize the CLI application
pub fn init() -> CliApp {
    use clap::Parser;
    CliApp::parse()
}
