use std::env;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{info, warn};

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn resolve_port(port_env: &str, default_port: u16) -> u16 {
    env::var(port_env)
        .ok()
        .and_then(|raw| raw.parse::<u16>().ok())
        .unwrap_or(default_port)
}

/// Start a Prometheus exporter on `0.0.0.0:<port>` and install it as the
/// global metrics recorder. The port comes from `port_env` when set,
/// `default_port` otherwise. Counters recorded before this call are lost.
///
/// Idempotent per process: repeated calls return the first exporter. A bind
/// failure is logged and leaves the process running without an exporter.
pub fn init_metrics(port_env: &str, default_port: u16) -> Option<&'static PrometheusHandle> {
    if let Some(existing) = PROMETHEUS_HANDLE.get() {
        return Some(existing);
    }

    let port = resolve_port(port_env, default_port);
    let exporter = PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install_recorder();

    match exporter {
        Ok(handle) => {
            let _ = PROMETHEUS_HANDLE.set(handle);
            info!(metrics_port = port, "started prometheus exporter");
        }
        Err(err) => {
            warn!(error = %err, metrics_port = port, "failed to start prometheus exporter");
        }
    }

    PROMETHEUS_HANDLE.get()
}
