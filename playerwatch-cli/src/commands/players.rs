//! `playerwatch players` command handler

use std::cmp::Reverse;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use tracing::info;

use playerwatch_core::config::PlayerwatchConfig;
use playerwatch_core::types::{ActiveSession, Role};
use playerwatch_tracker::read_snapshot;

use crate::cli::PlayersArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render, format_age};

/// Execute the `players` command.
///
/// The config file is only read when `--snapshot` is not given.
pub async fn execute(
    args: PlayersArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let snapshot_path = match args.snapshot {
        Some(path) => path,
        None => {
            let config = PlayerwatchConfig::load(config_path).await?;
            PathBuf::from(config.tracker.output_json_path)
        }
    };

    info!(path = %snapshot_path.display(), "reading player snapshot");

    let report = players_report(&snapshot_path, SystemTime::now());
    writer.render(&report)?;
    Ok(())
}

/// Read the snapshot and order players by role (highest first), then name.
pub fn players_report(path: &Path, now: SystemTime) -> PlayersReport {
    let found = path.is_file();
    let mut players = read_snapshot(path);
    players.sort_by(|a, b| (Reverse(a.role), &a.name).cmp(&(Reverse(b.role), &b.name)));

    PlayersReport {
        source: path.display().to_string(),
        found,
        total: players.len(),
        players,
        now,
    }
}

/// Active players as recorded in the snapshot file.
///
/// `players` serializes exactly like the snapshot entries.
#[derive(Serialize)]
pub struct PlayersReport {
    pub source: String,
    pub found: bool,
    pub total: usize,
    pub players: Vec<ActiveSession>,
    #[serde(skip)]
    pub now: SystemTime,
}

impl Render for PlayersReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if !self.found {
            writeln!(
                w,
                "{} snapshot {} not found (is the daemon running?)",
                "warning:".yellow().bold(),
                self.source
            )?;
            return Ok(());
        }

        writeln!(
            w,
            "Active Players ({} online, source: {})",
            self.total.to_string().bold(),
            self.source
        )?;
        if self.players.is_empty() {
            return Ok(());
        }

        writeln!(w)?;
        writeln!(
            w,
            "{:<24} {:<20} {:<10} {:<10} Permissions",
            "Name", "ID", "Role", "Last Seen"
        )?;
        writeln!(w, "{}", "-".repeat(80))?;

        for p in &self.players {
            let role = p.role.to_string();
            let role_colored = match p.role {
                Role::Admin => role.red(),
                Role::Community => role.green(),
                Role::Guest => role.normal(),
            };

            writeln!(
                w,
                "{:<24} {:<20} {:<10} {:<10} {}",
                p.name,
                p.id.to_string(),
                role_colored,
                format_age(p.last_seen, self.now),
                p.permissions.join(", ")
            )?;
        }

        Ok(())
    }
}
