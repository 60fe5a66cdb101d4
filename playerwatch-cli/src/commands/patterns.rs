//! `playerwatch patterns` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use playerwatch_core::config::PlayerwatchConfig;
use playerwatch_core::types::IdentifierKind;
use playerwatch_tracker::pattern::RoleSpec;
use playerwatch_tracker::{EventKind, GameProfile, LogEvent, ProfileLoader, TrackerSettings};

use crate::cli::{PatternsAction, PatternsArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `patterns` command.
pub async fn execute(
    args: PatternsArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let profile =
        resolve_profile(args.game.as_deref(), args.profile.as_deref(), config_path).await?;

    match args.action {
        PatternsAction::List => writer.render(&list_report(&profile)),
        PatternsAction::Test { line } => writer.render(&test_report(&profile, &line)),
    }
}

/// Pick the profile: `--game`, then `--profile`, then whatever the config selects.
pub async fn resolve_profile(
    game: Option<&str>,
    profile_path: Option<&Path>,
    config_path: &Path,
) -> Result<GameProfile, CliError> {
    if let Some(game) = game {
        return Ok(GameProfile::builtin(game)?);
    }
    if let Some(path) = profile_path {
        return Ok(ProfileLoader::load_file(path).await?);
    }

    info!(path = %config_path.display(), "resolving profile from configuration");
    let config = PlayerwatchConfig::load(config_path).await?;
    let settings = TrackerSettings::from_core(&config.tracker)?;
    Ok(GameProfile::from_settings(&settings).await?)
}

pub fn list_report(profile: &GameProfile) -> PatternListReport {
    PatternListReport {
        profile: profile.name.clone(),
        identifier: profile.patterns.identifier_kind(),
        correlation_window_secs: profile.correlation_window.as_secs(),
        roles: describe_roles(&profile.roles),
        total: profile.patterns.len(),
        rules: profile
            .patterns
            .rules()
            .iter()
            .enumerate()
            .map(|(i, rule)| PatternEntry {
                priority: i + 1,
                kind: rule.kind(),
                pattern: rule.pattern().to_owned(),
            })
            .collect(),
    }
}

pub fn test_report(profile: &GameProfile, line: &str) -> PatternTestReport {
    let event = profile.patterns.classify(line);
    let value = event.as_ref().map(|event| match event {
        LogEvent::ConnectionOpened(id) | LogEvent::IdentifierDisconnected(id) => id.to_string(),
        LogEvent::IdentityConfirmed(value)
        | LogEvent::AttributeGranted(value)
        | LogEvent::SessionTerminated(value) => value.clone(),
    });

    PatternTestReport {
        profile: profile.name.clone(),
        line: line.to_owned(),
        matched: event.is_some(),
        kind: event.as_ref().map(LogEvent::kind),
        value,
    }
}

fn describe_roles(roles: &RoleSpec) -> String {
    match roles {
        RoleSpec::Tiers {
            tiers,
            default_role,
        } => {
            let mut parts: Vec<String> = tiers
                .iter()
                .map(|tier| format!("{} if any of [{}]", tier.role, tier.any_of.join(", ")))
                .collect();
            parts.push(format!("otherwise {default_role}"));
            format!("permission tiers: {}", parts.join("; "))
        }
        RoleSpec::Roster {
            admin_role,
            default_role,
        } => format!("admin roster: {admin_role} if listed, otherwise {default_role}"),
    }
}

/// Rules of one profile in priority order.
#[derive(Serialize)]
pub struct PatternListReport {
    pub profile: String,
    pub identifier: IdentifierKind,
    pub correlation_window_secs: u64,
    pub roles: String,
    pub total: usize,
    pub rules: Vec<PatternEntry>,
}

#[derive(Serialize)]
pub struct PatternEntry {
    pub priority: usize,
    pub kind: EventKind,
    pub pattern: String,
}

impl Render for PatternListReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Profile {} ({} rules)",
            self.profile.bold(),
            self.total
        )?;
        writeln!(w, "  Identifier: {:?}", self.identifier)?;
        writeln!(w, "  Correlation window: {}s", self.correlation_window_secs)?;
        writeln!(w, "  Roles: {}", self.roles)?;
        writeln!(w)?;
        writeln!(w, "{:<4} {:<25} Pattern", "#", "Kind")?;
        writeln!(w, "{}", "-".repeat(80))?;

        for rule in &self.rules {
            writeln!(
                w,
                "{:<4} {:<25} {}",
                rule.priority,
                rule.kind.as_str().cyan(),
                rule.pattern
            )?;
        }

        Ok(())
    }
}

/// Classification result for one line.
#[derive(Serialize)]
pub struct PatternTestReport {
    pub profile: String,
    pub line: String,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<EventKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Render for PatternTestReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Profile: {}", self.profile.bold())?;
        writeln!(w, "  Line:   {}", self.line)?;

        match (&self.kind, &self.value) {
            (Some(kind), Some(value)) => {
                writeln!(w, "  Result: {}", "MATCH".green().bold())?;
                writeln!(w, "  Event:  {}", kind.as_str())?;
                writeln!(w, "  Value:  {}", value)?;
            }
            _ => writeln!(w, "  Result: {}", "NO MATCH".yellow().bold())?,
        }

        Ok(())
    }
}
