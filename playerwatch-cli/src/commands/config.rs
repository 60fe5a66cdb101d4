//! `playerwatch config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use playerwatch_core::config::PlayerwatchConfig;
use playerwatch_tracker::{GameProfile, TrackerSettings};

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Sections accepted by `config show --section`.
const SECTIONS: [&str; 3] = ["general", "tracker", "metrics"];

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

/// Load the file and resolve the game profile it selects.
///
/// # Errors
///
/// Returns `CliError::Config` after rendering the report if anything failed.
async fn execute_validate(config_path: &Path, writer: &OutputWriter) -> Result<(), CliError> {
    info!(path = %config_path.display(), "validating configuration");

    let report = validate_report(config_path).await;
    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

/// Build the validation report for `config_path`.
///
/// Beyond the TOML checks, the configured profile is compiled so that a
/// broken custom profile YAML is reported here rather than at daemon start.
pub async fn validate_report(config_path: &Path) -> ConfigValidationReport {
    let source = config_path.display().to_string();

    let config = match PlayerwatchConfig::load(config_path).await {
        Ok(config) => config,
        Err(e) => {
            return ConfigValidationReport {
                source,
                valid: false,
                profile: None,
                errors: vec![e.to_string()],
            };
        }
    };

    let profile = match TrackerSettings::from_core(&config.tracker) {
        Ok(settings) => GameProfile::from_settings(&settings).await,
        Err(e) => Err(e),
    };

    match profile {
        Ok(profile) => ConfigValidationReport {
            source,
            valid: true,
            profile: Some(profile.name),
            errors: Vec::new(),
        },
        Err(e) => ConfigValidationReport {
            source,
            valid: false,
            profile: None,
            errors: vec![e.to_string()],
        },
    }
}

/// Display the effective configuration (file + env overrides + defaults).
///
/// # Errors
///
/// Returns `CliError::Core` if loading fails or `CliError::Command` if the
/// section name is unknown.
async fn execute_show(
    config_path: &Path,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(path = %config_path.display(), "loading configuration");

    let config = PlayerwatchConfig::load(config_path).await?;
    let report = show_report(&config, &config_path.display().to_string(), section)?;
    writer.render(&report)?;
    Ok(())
}

/// Serialize the whole config, or one section of it, as TOML.
pub fn show_report(
    config: &PlayerwatchConfig,
    source: &str,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let config_toml = match section.as_deref() {
        None => toml::to_string_pretty(config),
        Some("general") => toml::to_string_pretty(&config.general),
        Some("tracker") => toml::to_string_pretty(&config.tracker),
        Some("metrics") => toml::to_string_pretty(&config.metrics),
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {} (expected: {})",
                other,
                SECTIONS.join(", ")
            )));
        }
    }
    .map_err(|e| CliError::Command(format!("failed to serialize configuration: {e}")))?;

    Ok(ConfigReport {
        source: source.to_owned(),
        section,
        config_toml,
    })
}

/// Configuration display report.
///
/// The `config_toml` field is only used for text rendering.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{}]", section);
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;

        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    /// Name of the resolved game profile, when validation got that far
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub errors: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;

        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
            if let Some(ref profile) = self.profile {
                writeln!(w, "  Profile: {}", profile)?;
            }
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for err in &self.errors {
                writeln!(w, "  Error: {}", err.red())?;
            }
        }

        Ok(())
    }
}
