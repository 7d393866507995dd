#![allow(dead_code)]
//! Test helpers for running the full application instance.

use anyhow::Result;
use sslwatch::{
    app::{App, AppBuilder},
    config::Config,
    dns::test_utils::FakeDnsResolver,
    inspector::test_utils::FakeInspector,
    service::WatchlistService,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::{sync::watch, task::JoinHandle, time::timeout};

/// A running daemon wired to fakes.
pub struct TestApp {
    pub service: WatchlistService,
    pub shutdown_tx: watch::Sender<bool>,
    pub app_handle: Option<JoinHandle<Result<()>>>,
    metrics_addr: Option<SocketAddr>,
}

impl TestApp {
    pub fn metrics_addr(&self) -> SocketAddr {
        self.metrics_addr
            .expect("Metrics must be enabled to get the address")
    }

    /// Shuts down the application and waits for it to terminate.
    /// Fails if the application does not shut down within the specified timeout.
    pub async fn shutdown(self, timeout_duration: Duration) -> Result<()> {
        self.shutdown_tx
            .send(true)
            .expect("Failed to send shutdown signal");

        if let Some(handle) = self.app_handle {
            match timeout(timeout_duration, handle).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(e.into()),
                Err(_) => Err(anyhow::anyhow!("App failed to shut down within the timeout")),
            }
        } else {
            Ok(())
        }
    }
}

/// Builds an application against a temporary watchlist, fake DNS, a fake
/// inspector and a pinned clock.
pub struct TestAppBuilder {
    pub config: Config,
    pub dir: TempDir,
    pub resolver: FakeDnsResolver,
    pub inspector: FakeInspector,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = super::test_config(dir.path());
        Self {
            config,
            dir,
            resolver: FakeDnsResolver::new(),
            inspector: FakeInspector::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: FakeDnsResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_inspector(mut self, inspector: FakeInspector) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn with_startup_refresh(mut self) -> Self {
        self.config.refresh.run_on_startup = true;
        self
    }

    pub fn with_refresh_disabled(mut self) -> Self {
        self.config.refresh.enabled = false;
        self
    }

    pub fn with_metrics(mut self) -> Self {
        self.config.metrics.enabled = true;
        self.config.metrics.listen_address = "127.0.0.1:0".parse().unwrap();
        self
    }

    fn app_builder(&self) -> AppBuilder {
        App::builder(self.config.clone())
            .dns_resolver_override(Arc::new(self.resolver.clone()))
            .inspector_override(Arc::new(self.inspector.clone()))
            .clock_override(super::fixed_clock())
    }

    /// A service over the same watchlist, without background tasks.
    pub fn service(&self) -> WatchlistService {
        self.app_builder()
            .build_service()
            .expect("service should build with fakes")
    }

    /// Builds the daemon and spawns its `run` future.
    pub async fn start(&self) -> Result<TestApp> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let app = self.app_builder().build(shutdown_rx).await?;
        let service = app.service().clone();
        let metrics_addr = app.metrics_addr();
        let app_handle = tokio::spawn(app.run());
        Ok(TestApp {
            service,
            shutdown_tx,
            app_handle: Some(app_handle),
            metrics_addr,
        })
    }
}
