//! playerwatch -- operator CLI for the player session tracker.
//!
//! Reads the same `playerwatch.toml` as the daemon. Reports go to stdout,
//! diagnostics to stderr.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let writer = OutputWriter::new(cli.output);
    let result: Result<(), CliError> = match cli.command {
        Commands::Players(args) => commands::players::execute(args, &cli.config, &writer).await,
        Commands::Patterns(args) => commands::patterns::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

/// Diagnostics are quiet by default; `--log-level` or `RUST_LOG` enable them.
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
