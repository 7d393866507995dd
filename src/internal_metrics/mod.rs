//! # Internal Metrics Module
//!
//! Call sites record through the `metrics` facade macros. Without an installed
//! recorder those calls are no-ops, so metrics cost nothing unless
//! `metrics.enabled` is set.
//!
//! - **`MetricsBuilder`** installs the Prometheus recorder and prepares the
//!   `MetricsServer` that exposes it.
//! - **`MetricsServer`** (in `server.rs`) serves `GET /metrics` with `axum`.

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::error;

pub mod server;

/// Buckets for every `*_duration_seconds` histogram. TLS handshakes against
/// slow hosts can take several seconds, and a refresh cycle much longer.
const DURATION_BUCKETS: &[f64] = &[
    0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0,
];

/// Registers descriptions for every metric sslwatch records.
pub fn describe_metrics() {
    metrics::describe_counter!("dns_lookups_total", Unit::Count, "DNS admission lookups, labeled by outcome (found, empty, failure).");
    metrics::describe_histogram!("dns_resolution_duration_seconds", Unit::Seconds, "Latency of DNS resolutions.");
    metrics::describe_counter!("inspections_total", Unit::Count, "Certificate inspections, labeled by outcome.");
    metrics::describe_histogram!("inspection_duration_seconds", Unit::Seconds, "Time taken to connect, handshake and read a leaf certificate.");
    metrics::describe_counter!("refresh_cycles_total", Unit::Count, "Completed refresh cycles, labeled by status.");
    metrics::describe_histogram!("refresh_cycle_duration_seconds", Unit::Seconds, "Time taken by a full refresh cycle, including the save.");
    metrics::describe_counter!("watchlist_mutations_total", Unit::Count, "Watchlist changes, labeled by operation (add, remove).");
    metrics::describe_gauge!("watchlist_entries", Unit::Count, "Number of entries in the watchlist as of the last save.");
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the global Prometheus recorder and returns a server ready to
    /// be spawned, along with the address it is bound to.
    ///
    /// Returns `None` when metrics are disabled, or when the listener or
    /// recorder could not be set up; the failure is logged and the
    /// application carries on without metrics.
    pub fn build(self, shutdown_rx: watch::Receiver<bool>) -> Option<(MetricsServer, SocketAddr)> {
        if !self.config.enabled {
            return None;
        }

        let builder = match PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), DURATION_BUCKETS)
        {
            Ok(builder) => builder,
            Err(e) => {
                error!(error = %e, "Invalid histogram buckets, metrics disabled");
                return None;
            }
        };
        let recorder = builder.build_recorder();
        let handle = recorder.handle();

        // Bind first so a taken port leaves the no-op recorder in place.
        let listener = match bind(self.config.listen_address) {
            Ok(listener) => listener,
            Err(e) => {
                error!(address = %self.config.listen_address, error = %e, "Failed to bind metrics server");
                return None;
            }
        };
        let addr = match listener.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!(error = %e, "Failed to get local address for metrics server");
                return None;
            }
        };

        if let Err(e) = metrics::set_global_recorder(recorder) {
            error!(error = %e, "Failed to install Prometheus recorder");
            return None;
        }
        describe_metrics();

        Some((MetricsServer::new(listener, handle, shutdown_rx), addr))
    }
}

fn bind(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let listener = std::net::TcpListener::bind(addr)?;
    // Tokio requires a non-blocking socket.
    listener.set_nonblocking(true)?;
    TcpListener::from_std(listener)
}
