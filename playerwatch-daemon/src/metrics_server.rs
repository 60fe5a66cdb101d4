//! Prometheus metrics HTTP server.
//!
//! Uses the built-in HTTP listener from `metrics-exporter-prometheus`
//! to expose the tracker counters and gauges for scraping.
//!
//! # Usage
//!
//! ```ignore
//! let config = MetricsConfig { enabled: true, ..Default::default() };
//! install_metrics_recorder(&config)?;
//! // From here on, every metrics::counter!() / gauge!() / histogram!() call is exported
//! ```

use std::net::SocketAddr;

use anyhow::Result;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use playerwatch_core::config::MetricsConfig;
use playerwatch_core::metrics as m;

/// Install the global metrics recorder and start the HTTP listener.
///
/// Must be called at most once per process.
///
/// # Errors
///
/// - The endpoint is not `/metrics` (the exporter serves a fixed path)
/// - The listen address does not parse
/// - Socket binding fails or a global recorder is already installed
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<()> {
    if config.endpoint != "/metrics" {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '/metrics' is currently supported",
            config.endpoint
        ));
    }

    let addr = listen_addr(config)?;

    if addr.ip().is_unspecified() {
        tracing::warn!(
            listen_addr = %addr,
            "metrics endpoint is exposed on all interfaces; restrict listen_addr in untrusted networks"
        );
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full(m::TRACKER_LINE_PROCESSING_DURATION_SECONDS.to_owned()),
            &m::LINE_PROCESSING_BUCKETS,
        )
        .map_err(|e| anyhow::anyhow!("invalid histogram buckets: {}", e))?
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder: {}", e))?;

    m::describe_all();

    tracing::info!(listen_addr = %addr, endpoint = %config.endpoint, "Prometheus metrics endpoint active");
    Ok(())
}

/// Parse `listen_addr:port` into a socket address.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    format!("{}:{}", config.listen_addr, config.port)
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid metrics listen address: {}", e))
}
