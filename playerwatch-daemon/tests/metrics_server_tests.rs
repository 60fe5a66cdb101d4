//! Integration tests for metrics server functionality.
//!
//! The global recorder can be installed only once per process, so only one
//! test here installs it; the others fail before installation.

use playerwatch_core::config::MetricsConfig;
use playerwatch_daemon::metrics_server;
use serial_test::serial;

#[test]
#[serial]
fn test_install_metrics_recorder_succeeds_with_valid_config() {
    // Given: A valid metrics configuration on a non-standard port
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_string(),
        port: 19464,
        endpoint: "/metrics".to_string(),
    };

    // When: Installing the metrics recorder
    let result = metrics_server::install_metrics_recorder(&config);

    // Then: Should succeed
    assert!(
        result.is_ok(),
        "install_metrics_recorder should succeed with valid config: {:?}",
        result.err()
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_fails_with_invalid_address() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_string(),
        port: 9464,
        endpoint: "/metrics".to_string(),
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_err(),
        "install_metrics_recorder should fail with invalid address"
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_rejects_unsupported_endpoint() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_string(),
        port: 19465,
        endpoint: "/custom".to_string(),
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_err(),
        "install_metrics_recorder should reject unsupported endpoint paths"
    );
}
