//! Daemon orchestration -- assembly, lifecycle, and shutdown.
//!
//! The [`Orchestrator`] loads configuration, installs the metrics recorder,
//! builds the session tracker, and runs it until a shutdown signal arrives.
//!
//! # Lifecycle
//!
//! 1. Validate config, install metrics recorder (if enabled)
//! 2. Resolve the game profile and line source, build the tracker
//! 3. Write the PID file (if configured)
//! 4. Run the tracker loop until SIGTERM / SIGINT
//! 5. Stop background tasks, remove the PID file

use std::future::Future;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::sync::broadcast;

use playerwatch_core::config::PlayerwatchConfig;
use playerwatch_core::metrics as m;
use playerwatch_tracker::{AnySource, SessionTracker, TrackerSettings, TrackerStats};

use crate::metrics_server;
use crate::pid_file::PidFile;

/// How often the uptime gauge is refreshed.
const UPTIME_UPDATE_INTERVAL: Duration = Duration::from_secs(10);

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: PlayerwatchConfig,
    /// Tracker settings derived from `config.tracker`.
    settings: TrackerSettings,
    /// The session tracker (owns the line source).
    tracker: SessionTracker<AnySource>,
    /// Shutdown broadcast sender (signals background tasks).
    shutdown_tx: broadcast::Sender<()>,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration from `config_path` and build the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated,
    /// or if the tracker cannot be built.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = PlayerwatchConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: PlayerwatchConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let settings = TrackerSettings::from_core(&config.tracker)
            .map_err(|e| anyhow::anyhow!("invalid tracker settings: {}", e))?;
        let tracker = SessionTracker::from_settings(&settings)
            .await
            .map_err(|e| anyhow::anyhow!("failed to build session tracker: {}", e))?;

        if config.metrics.enabled {
            record_daemon_metrics(tracker.profile_name());
        }

        tracing::info!(
            game = tracker.profile_name(),
            source = %settings.source.describe(),
            output = %settings.output_path.display(),
            "orchestrator initialized"
        );

        let (shutdown_tx, _) = broadcast::channel(4);
        Ok(Self {
            config,
            settings,
            tracker,
            shutdown_tx,
            start_time: Instant::now(),
        })
    }

    /// Run until SIGTERM or SIGINT is received.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed, the PID file
    /// cannot be created, or the tracker loop fails.
    pub async fn run(&mut self) -> Result<TrackerStats> {
        let mut signals = ShutdownSignals::install()?;
        self.run_until(async move {
            let signal = signals.recv().await;
            tracing::info!(signal, "shutdown signal received");
        })
        .await
    }

    /// Run until `shutdown` completes.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<TrackerStats>
    where
        F: Future<Output = ()>,
    {
        let _pid_file = if self.config.general.pid_file.is_empty() {
            None
        } else {
            Some(PidFile::create(&self.config.general.pid_file)?)
        };

        let uptime_task = self.config.metrics.enabled.then(|| {
            spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe())
        });

        let result = self.tracker.run(shutdown).await;

        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        let stats = result.map_err(|e| anyhow::anyhow!("session tracker failed: {}", e))?;
        tracing::info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            lines_read = stats.lines_read,
            active_sessions = stats.active_sessions,
            "daemon stopped"
        );
        Ok(stats)
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &PlayerwatchConfig {
        &self.config
    }

    /// Get the resolved tracker settings.
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Get the session tracker.
    pub fn tracker(&self) -> &SessionTracker<AnySource> {
        &self.tracker
    }
}

/// SIGTERM / SIGINT listeners, installed before the loop starts so that
/// installation errors surface immediately.
struct ShutdownSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};

        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for the first signal and return its name.
    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

/// Record build info and the active game profile.
fn record_daemon_metrics(game: &str) {
    metrics::gauge!(
        m::DAEMON_BUILD_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
        m::LABEL_GAME => game.to_owned()
    )
    .set(1.0);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        game,
        "daemon metrics recorded"
    );
}

/// Spawn a background task that periodically updates the uptime metric.
fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_UPDATE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn uptime_updater_stops_on_shutdown() {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let task = spawn_uptime_updater(Instant::now(), shutdown_rx);

        let _ = shutdown_tx.send(());
        let result = tokio::time::timeout(Duration::from_millis(200), task).await;
        assert!(result.is_ok(), "uptime updater should stop within timeout");
    }

    #[test]
    fn signal_handlers_install() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async {
            assert!(ShutdownSignals::install().is_ok());
        });
    }
}
