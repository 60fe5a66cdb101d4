//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// playerwatch -- active player sessions from game server logs.
///
/// Use `playerwatch <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "playerwatch", version, about, long_about = None)]
pub struct Cli {
    /// Path to the playerwatch.toml configuration file.
    #[arg(short, long, default_value = "playerwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the players listed in the latest snapshot.
    Players(PlayersArgs),

    /// Inspect and try out game log patterns.
    Patterns(PatternsArgs),

    /// Manage configuration.
    Config(ConfigArgs),
}

// ---- players ----

/// Read the active session snapshot written by the daemon.
#[derive(Args, Debug)]
pub struct PlayersArgs {
    /// Snapshot file to read (default: tracker.output_json_path from the config).
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

// ---- patterns ----

/// Inspect the classification rules of a game profile.
#[derive(Args, Debug)]
pub struct PatternsArgs {
    /// Built-in game profile to use instead of the configured one.
    #[arg(long, conflicts_with = "profile")]
    pub game: Option<String>,

    /// Custom profile YAML to use instead of the configured one.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    #[command(subcommand)]
    pub action: PatternsAction,
}

#[derive(Subcommand, Debug)]
pub enum PatternsAction {
    /// List the rules of the profile in priority order.
    List,
    /// Classify a single log line and show the resulting event.
    Test {
        /// The raw log line.
        line: String,
    },
}

// ---- config ----

/// Manage playerwatch configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, tracker, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}
