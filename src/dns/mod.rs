pub mod resolver;
#[cfg(feature = "test-utils")]
pub mod test_utils;

use thiserror::Error;
use tracing::debug;

pub use crate::core::DnsResolver;
pub use resolver::HickoryDnsResolver;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("DNS resolution failed: {0}")]
    Resolution(String),

    #[error("no address record found for {0}")]
    NoRecords(String),
}

/// Admission gate for new watchlist entries.
///
/// Strips any `:port` suffix and returns `true` only if the hostname has at
/// least one address record. Every lookup failure counts as non-existence.
pub async fn host_exists(resolver: &dyn DnsResolver, host_with_port: &str) -> bool {
    let host = crate::core::host_part(host_with_port);
    if host.is_empty() {
        return false;
    }

    match resolver.resolve(host).await {
        Ok(addresses) if !addresses.is_empty() => {
            metrics::counter!("dns_lookups_total", "status" => "found").increment(1);
            true
        }
        Ok(_) => {
            metrics::counter!("dns_lookups_total", "status" => "empty").increment(1);
            debug!(host, "DNS lookup returned no address records");
            false
        }
        Err(e) => {
            metrics::counter!("dns_lookups_total", "status" => "failure").increment(1);
            debug!(host, error = %e, "DNS lookup failed, treating host as non-existent");
            false
        }
    }
}
