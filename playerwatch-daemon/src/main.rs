use anyhow::Result;
use clap::Parser;

use playerwatch_core::config::PlayerwatchConfig;
use playerwatch_daemon::cli::DaemonCli;
use playerwatch_daemon::logging;
use playerwatch_daemon::orchestrator::Orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = PlayerwatchConfig::load(&cli.config).await.map_err(|e| {
        anyhow::anyhow!("failed to load config {}: {}", cli.config.display(), e)
    })?;
    cli.apply_overrides(&mut config);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

    if cli.validate {
        println!("configuration is valid: {}", cli.config.display());
        return Ok(());
    }

    logging::init_tracing(&config.general)?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        game = %config.tracker.game,
        mode = %config.tracker.mode,
        "playerwatch-daemon starting"
    );

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "playerwatch-daemon failed");
        return Err(e);
    }
    Ok(())
}

async fn run(config: PlayerwatchConfig) -> Result<()> {
    let mut orchestrator = Orchestrator::build_from_config(config).await?;
    let stats = orchestrator.run().await?;

    tracing::info!(
        events_matched = stats.events_matched,
        evictions = stats.evictions,
        snapshot_writes = stats.snapshot_writes,
        "playerwatch-daemon shut down"
    );
    Ok(())
}
