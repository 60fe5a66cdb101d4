//! Logging initialization for playerwatch-daemon.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `PlayerwatchConfig`. Supports JSON structured logging and
//! human-readable pretty format on stdout, plus an optional copy in `log_file`.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use playerwatch_core::config::GeneralConfig;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG` takes precedence over `log_level` when set. If `log_file`
/// cannot be opened the error is logged and output continues on stdout only.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines (default for production)
/// * `"pretty"` - Human-readable output (for development)
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    if !matches!(config.log_format.as_str(), "json" | "pretty") {
        return Err(anyhow::anyhow!(
            "unknown log format '{}', expected 'json' or 'pretty'",
            config.log_format
        ));
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let (log_file, open_error) = match open_log_file(&config.log_file) {
        Ok(file) => (file, None),
        Err(e) => (None, Some(e)),
    };

    let result = if config.log_format == "json" {
        let file_layer = log_file.map(|file| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        });
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .with(file_layer)
            .try_init()
    } else {
        let file_layer = log_file.map(|file| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
        });
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .with(file_layer)
            .try_init()
    };

    result.map_err(|e| {
        anyhow::anyhow!(
            "failed to initialize {} tracing subscriber: {}",
            config.log_format,
            e
        )
    })?;

    if let Some(e) = open_error {
        tracing::error!(
            log_file = %config.log_file,
            error = %e,
            "failed to open log file, logging to stdout only"
        );
    }
    Ok(())
}

/// Open `log_file` in append mode, creating parent directories.
/// An empty path means no file output.
fn open_log_file(log_file: &str) -> Result<Option<File>> {
    if log_file.is_empty() {
        return Ok(None);
    }

    let path = Path::new(log_file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                anyhow::anyhow!("failed to create log directory {}: {}", parent.display(), e)
            })?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| anyhow::anyhow!("failed to open log file {}: {}", path.display(), e))?;

    Ok(Some(file))
}
