//! Periodic re-inspection of the whole watchlist.
//!
//! A refresh cycle holds the store's write lock from load to save, so no
//! add or remove interleaves with it. Endpoints are inspected concurrently
//! up to `refresh.concurrency` at a time; one endpoint failing only marks
//! that entry unavailable.

use crate::config::RefreshConfig;
use crate::core::{CertificateInspector, ExpiryResult};
use crate::expiry::Clock;
use crate::store::{StoreError, WatchlistStore};
use crate::task_manager::TaskManager;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument};

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    /// Entries that now carry a fresh expiry date.
    pub refreshed: usize,
    /// Entries whose inspection failed and were marked unavailable.
    pub failed: usize,
}

impl RefreshReport {
    pub fn total(&self) -> usize {
        self.refreshed + self.failed
    }
}

pub struct RefreshScheduler {
    store: Arc<WatchlistStore>,
    inspector: Arc<dyn CertificateInspector>,
    clock: Arc<dyn Clock>,
    config: RefreshConfig,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<WatchlistStore>,
        inspector: Arc<dyn CertificateInspector>,
        clock: Arc<dyn Clock>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            store,
            inspector,
            clock,
            config,
        }
    }

    /// Re-inspects every entry and persists the results.
    #[instrument(skip_all)]
    pub async fn run_cycle(&self) -> Result<RefreshReport, StoreError> {
        let started = Instant::now();
        let result = self.refresh_all().await;
        metrics::histogram!("refresh_cycle_duration_seconds")
            .record(started.elapsed().as_secs_f64());

        match &result {
            Ok(report) => {
                metrics::counter!("refresh_cycles_total", "status" => "success").increment(1);
                info!(
                    refreshed = report.refreshed,
                    failed = report.failed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Refresh cycle complete"
                );
            }
            Err(_) => {
                metrics::counter!("refresh_cycles_total", "status" => "failure").increment(1);
            }
        }
        result
    }

    async fn refresh_all(&self) -> Result<RefreshReport, StoreError> {
        let writer = self.store.lock().await?;
        let mut entries = writer.load().await?;
        debug!(count = entries.len(), "Refreshing watchlist");

        let hosts: Vec<String> = entries.iter().map(|e| e.host.clone()).collect();
        let inspector = &self.inspector;
        let results: Vec<ExpiryResult> = stream::iter(hosts)
            .map(|host| async move { inspector.inspect(&host).await })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let today = self.clock.today();
        let mut report = RefreshReport::default();
        for (entry, expiry) in entries.iter_mut().zip(results) {
            if expiry.is_unavailable() {
                report.failed += 1;
            } else {
                report.refreshed += 1;
            }
            entry.apply(expiry, today);
        }

        writer.save(&entries).await?;
        Ok(report)
    }

    /// Runs cycles forever, one per interval, until shutdown is signalled.
    ///
    /// The interval is measured from the end of the previous cycle. A failed
    /// cycle is logged and the loop waits for the next one.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        let period = Duration::from_secs(self.config.interval_seconds.max(1));
        info!(
            interval_seconds = period.as_secs(),
            concurrency = self.config.concurrency,
            "Starting watchlist refresh loop"
        );

        if self.config.run_on_startup {
            self.run_logged().await;
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => {
                    info!("Refresh loop received shutdown signal.");
                    break;
                }
                _ = tokio::time::sleep(period) => {
                    self.run_logged().await;
                }
            }
        }
    }

    /// Spawns [`RefreshScheduler::run`] as a managed background task.
    pub fn spawn(self: Arc<Self>, task_manager: &TaskManager) {
        let shutdown_rx = task_manager.get_shutdown_rx();
        task_manager.spawn("Refresh Scheduler", async move {
            self.run(shutdown_rx).await;
        });
    }

    async fn run_logged(&self) {
        if let Err(e) = self.run_cycle().await {
            error!(error = %e, "Refresh cycle failed, will retry next interval");
        }
    }
}
