//! The main application logic, decoupled from the entry point.

use crate::{
    config::Config,
    core::{CertificateInspector, DnsResolver},
    dns::HickoryDnsResolver,
    expiry::{Clock, SystemClock},
    inspector::TlsInspector,
    internal_metrics::MetricsBuilder,
    refresh::RefreshScheduler,
    service::WatchlistService,
    store::WatchlistStore,
    task_manager::TaskManager,
};
use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument};

/// A handle to the running daemon.
pub struct App {
    service: WatchlistService,
    task_manager: TaskManager,
    metrics_addr: Option<SocketAddr>,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn service(&self) -> &WatchlistService {
        &self.service
    }

    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.metrics_addr
    }

    /// Waits for the shutdown signal and then gracefully shuts down all tasks.
    pub async fn run(self) -> Result<()> {
        let mut shutdown_rx = self.task_manager.get_shutdown_rx();
        if !*shutdown_rx.borrow() {
            shutdown_rx.changed().await.ok();
        }
        info!("Shutdown signal received. Waiting for tasks to complete...");

        self.task_manager.shutdown().await;

        info!("All tasks shut down.");
        Ok(())
    }
}

/// Builder for the application.
///
/// Constructs the store, resolver, inspector and scheduler from the
/// configuration. Each collaborator can be overridden for tests.
pub struct AppBuilder {
    config: Config,
    dns_resolver_override: Option<Arc<dyn DnsResolver>>,
    inspector_override: Option<Arc<dyn CertificateInspector>>,
    clock_override: Option<Arc<dyn Clock>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            dns_resolver_override: None,
            inspector_override: None,
            clock_override: None,
        }
    }

    /// Overrides the DNS resolver for testing.
    pub fn dns_resolver_override(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.dns_resolver_override = Some(resolver);
        self
    }

    /// Overrides the certificate inspector for testing.
    pub fn inspector_override(mut self, inspector: Arc<dyn CertificateInspector>) -> Self {
        self.inspector_override = Some(inspector);
        self
    }

    /// Pins "today" for testing.
    pub fn clock_override(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock_override = Some(clock);
        self
    }

    /// Builds the watchlist service alone, for one-shot commands.
    #[instrument(skip_all)]
    pub fn build_service(self) -> Result<WatchlistService> {
        Ok(self.components()?.0)
    }

    /// Builds the daemon: the service plus the background refresh loop and,
    /// when enabled, the metrics server.
    #[instrument(skip_all)]
    pub async fn build(self, shutdown_rx: watch::Receiver<bool>) -> Result<App> {
        let task_manager = TaskManager::new(shutdown_rx);

        let metrics_addr = match MetricsBuilder::new(self.config.metrics.clone())
            .build(task_manager.get_shutdown_rx())
        {
            Some((server, addr)) => {
                info!(%addr, "Serving metrics");
                task_manager.spawn("MetricsServer", server.run());
                Some(addr)
            }
            None => None,
        };

        let refresh_enabled = self.config.refresh.enabled;
        let (service, scheduler) = self.components()?;
        if refresh_enabled {
            scheduler.spawn(&task_manager);
        } else {
            info!("Background refresh is disabled");
        }

        Ok(App {
            service,
            task_manager,
            metrics_addr,
        })
    }

    fn components(self) -> Result<(WatchlistService, Arc<RefreshScheduler>)> {
        let config = self.config;
        debug!(path = %config.store.path.display(), "Opening watchlist");
        let store = Arc::new(WatchlistStore::new(config.store.path.clone()));

        let resolver = match self.dns_resolver_override {
            Some(resolver) => resolver,
            None => {
                let (resolver, nameservers) = HickoryDnsResolver::from_config(&config.dns)?;
                debug!(?nameservers, "Initialized DNS resolver");
                Arc::new(resolver) as Arc<dyn DnsResolver>
            }
        };

        let inspector = match self.inspector_override {
            Some(inspector) => inspector,
            None => Arc::new(TlsInspector::from_config(&config.inspector)?) as Arc<dyn CertificateInspector>,
        };

        let clock = self
            .clock_override
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let scheduler = Arc::new(RefreshScheduler::new(
            store.clone(),
            inspector.clone(),
            clock.clone(),
            config.refresh.clone(),
        ));
        let service = WatchlistService::new(store, resolver, inspector, clock, scheduler.clone());
        Ok((service, scheduler))
    }
}
