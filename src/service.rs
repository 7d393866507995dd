//! The watchlist operations offered to callers.

use crate::core::{CertificateInspector, DnsResolver, ExpiryStatus, WatchEntry};
use crate::dns::host_exists;
use crate::expiry::{days_until, Clock};
use crate::refresh::{RefreshReport, RefreshScheduler};
use crate::store::{StoreError, WatchlistStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("host must not be empty")]
    EmptyHost,

    #[error("No A record found for {0}")]
    NoAddressRecord(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Result of a successful [`WatchlistService::add`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The host was inspected and appended to the watchlist.
    Added(WatchEntry),
    /// The host was already on the watchlist; nothing changed.
    Duplicate(String),
}

#[derive(Clone)]
pub struct WatchlistService {
    store: Arc<WatchlistStore>,
    resolver: Arc<dyn DnsResolver>,
    inspector: Arc<dyn CertificateInspector>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<RefreshScheduler>,
}

impl WatchlistService {
    pub fn new(
        store: Arc<WatchlistStore>,
        resolver: Arc<dyn DnsResolver>,
        inspector: Arc<dyn CertificateInspector>,
        clock: Arc<dyn Clock>,
        scheduler: Arc<RefreshScheduler>,
    ) -> Self {
        Self {
            store,
            resolver,
            inspector,
            clock,
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<WatchlistStore> {
        &self.store
    }

    /// Adds `host` (or `host:port`) to the watchlist.
    ///
    /// The host must resolve to at least one address. Its certificate is
    /// inspected once before it is stored; an inspection failure still adds
    /// the entry with the error marker.
    #[instrument(skip(self))]
    pub async fn add(&self, host: &str) -> Result<AddOutcome, ServiceError> {
        let host = self.admit(host).await?;

        if self.store.exists(&host).await {
            debug!(host = %host, "Host already on the watchlist");
            return Ok(AddOutcome::Duplicate(host));
        }

        let expiry = self.inspector.inspect(&host).await;

        let writer = self.store.lock().await?;
        let mut entries = writer.load().await?;
        // A concurrent add may have won while we were inspecting.
        if entries.iter().any(|entry| entry.host == host) {
            debug!(host = %host, "Host was added concurrently");
            return Ok(AddOutcome::Duplicate(host));
        }

        let entry = WatchEntry::checked(host, expiry, self.clock.today());
        entries.push(entry.clone());
        writer.save(&entries).await?;

        metrics::counter!("watchlist_mutations_total", "op" => "add").increment(1);
        info!(host = %entry.host, expiry = %expiry, "Added host to watchlist");
        Ok(AddOutcome::Added(entry))
    }

    /// Removes the entry whose key equals `host` exactly. Removing an absent
    /// host succeeds without touching the file.
    #[instrument(skip(self))]
    pub async fn remove(&self, host: &str) -> Result<(), ServiceError> {
        let writer = self.store.lock().await?;
        let mut entries = writer.load().await?;
        let before = entries.len();
        entries.retain(|entry| entry.host != host);

        if entries.len() == before {
            debug!(host, "Host not on the watchlist, nothing to remove");
            return Ok(());
        }

        writer.save(&entries).await?;
        metrics::counter!("watchlist_mutations_total", "op" => "remove").increment(1);
        info!(host, "Removed host from watchlist");
        Ok(())
    }

    /// Checks `host` live without recording the result.
    #[instrument(skip(self))]
    pub async fn get(&self, host: &str) -> Result<ExpiryStatus, ServiceError> {
        let host = self.admit(host).await?;
        let expiry = self.inspector.inspect(&host).await;
        let days_until_expiry = days_until(&expiry, self.clock.today());
        Ok(ExpiryStatus {
            host,
            expiry,
            days_until_expiry,
        })
    }

    /// The watchlist with day counts recomputed for today.
    pub async fn list(&self) -> Vec<WatchEntry> {
        let today = self.clock.today();
        let mut entries = self.store.snapshot().await;
        for entry in &mut entries {
            entry.recompute_days(today);
        }
        entries
    }

    /// Runs one refresh cycle over the whole watchlist.
    pub async fn refresh(&self) -> Result<RefreshReport, ServiceError> {
        Ok(self.scheduler.run_cycle().await?)
    }

    async fn admit(&self, host: &str) -> Result<String, ServiceError> {
        let host = host.trim();
        if host.is_empty() {
            return Err(ServiceError::EmptyHost);
        }
        if !host_exists(self.resolver.as_ref(), host).await {
            return Err(ServiceError::NoAddressRecord(host.to_string()));
        }
        Ok(host.to_string())
    }
}
