//! CLI argument definitions for playerwatch-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use playerwatch_core::config::PlayerwatchConfig;

/// Game server player tracking daemon.
///
/// Follows a game server log (file or `docker logs` stream), correlates
/// connection and login lines into player sessions, and keeps a JSON
/// snapshot of the currently connected players up to date.
#[derive(Parser, Debug)]
#[command(name = "playerwatch-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to playerwatch.toml configuration file.
    #[arg(short, long, default_value = "/etc/playerwatch/playerwatch.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Override the game profile (e.g. enshrouded, valheim).
    #[arg(long)]
    pub game: Option<String>,

    /// Override the snapshot output path.
    #[arg(long)]
    pub output: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,

    /// Override PID file path (takes precedence over config file).
    #[arg(long)]
    pub pid_file: Option<String>,
}

impl DaemonCli {
    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut PlayerwatchConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.general.log_format = format.clone();
        }
        if let Some(game) = &self.game {
            config.tracker.game = game.clone();
        }
        if let Some(output) = &self.output {
            config.tracker.output_json_path = output.clone();
        }
        if let Some(pid_file) = &self.pid_file {
            config.general.pid_file = pid_file.clone();
        }
    }
}
