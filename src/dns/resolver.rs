use crate::{
    config::DnsConfig,
    core::DnsResolver,
    dns::DnsError,
};
use anyhow::Result;
use async_trait::async_trait;
use hickory_resolver::{
    config::{NameServerConfig, ResolverConfig, ResolverOpts},
    proto::{rr::RecordType, xfer::Protocol},
    system_conf, TokioResolver,
};
use std::{
    net::{IpAddr, SocketAddr},
    time::{Duration, Instant},
};
use tracing::{trace, warn};

/// DNS resolver implementation using hickory-resolver
pub struct HickoryDnsResolver {
    resolver: TokioResolver,
}

impl HickoryDnsResolver {
    /// Creates a new DNS resolver from the application's DNS configuration.
    ///
    /// Returns the resolver together with the nameservers it will query, for
    /// startup logging.
    pub fn from_config(config: &DnsConfig) -> Result<(Self, Vec<SocketAddr>)> {
        let resolver_config = if let Some(resolver_addr_str) = &config.resolver {
            // If a specific resolver is provided, use it exclusively.
            let mut custom_config = ResolverConfig::new();
            let socket_addr: SocketAddr = resolver_addr_str.parse()?;
            custom_config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));
            custom_config
        } else {
            let (system_config, _) = system_conf::read_system_conf()?;
            if system_config.name_servers().is_empty() {
                warn!("No system DNS servers found, falling back to Cloudflare DNS.");
                ResolverConfig::cloudflare()
            } else {
                system_config
            }
        };

        // Watchlist hosts are fully qualified; never append local search domains.
        let mut resolver_config_with_no_search = ResolverConfig::new();
        for ns in resolver_config.name_servers() {
            resolver_config_with_no_search.add_name_server(ns.clone());
        }

        let mut nameservers: Vec<_> = resolver_config_with_no_search
            .name_servers()
            .iter()
            .map(|ns| ns.socket_addr)
            .collect();
        nameservers.sort();
        nameservers.dedup();

        let mut resolver_opts = ResolverOpts::default();
        resolver_opts.ndots = 1;
        resolver_opts.timeout = Duration::from_millis(config.timeout_ms);

        let resolver = hickory_resolver::Resolver::builder_with_config(
            resolver_config_with_no_search,
            hickory_resolver::name_server::TokioConnectionProvider::default(),
        )
        .with_options(resolver_opts)
        .build();

        Ok((Self { resolver }, nameservers))
    }
}

#[async_trait]
impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        let start_time = Instant::now();
        let result = self.resolver.lookup(domain, RecordType::A).await;
        metrics::histogram!("dns_resolution_duration_seconds")
            .record(start_time.elapsed().as_secs_f64());

        match result {
            Ok(lookup) => {
                let addresses: Vec<IpAddr> =
                    lookup.into_iter().filter_map(|r| r.ip_addr()).collect();
                trace!(domain, count = addresses.len(), "A record lookup completed");
                if addresses.is_empty() {
                    Err(DnsError::NoRecords(domain.to_string()))
                } else {
                    Ok(addresses)
                }
            }
            Err(e) => {
                let err_string = e.to_string();
                if is_nxdomain_error_str(&err_string) {
                    Err(DnsError::NoRecords(domain.to_string()))
                } else {
                    Err(DnsError::Resolution(err_string))
                }
            }
        }
    }
}

/// Checks if a resolver error message describes a missing name or record.
fn is_nxdomain_error_str(err_str: &str) -> bool {
    let lower = err_str.to_lowercase();
    lower.contains("nxdomain") || lower.contains("no records found")
}
