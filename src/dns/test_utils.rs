use crate::dns::{DnsError, DnsResolver};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};

/// Fake DNS resolver for testing
///
/// Unlike a real resolver, answers are sticky: the last configured response
/// for a domain is returned on every lookup.
#[derive(Debug, Clone, Default)]
pub struct FakeDnsResolver {
    responses: Arc<Mutex<HashMap<String, Result<Vec<IpAddr>, String>>>>,
    call_count: Arc<Mutex<HashMap<String, u32>>>,
}

impl FakeDnsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes each of `domains` resolve to a documentation address.
    pub fn resolving(domains: &[&str]) -> Self {
        let resolver = Self::new();
        for domain in domains {
            resolver.add_success_response(domain, vec![IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))]);
        }
        resolver
    }

    /// Set a successful response for a domain
    pub fn add_success_response(&self, domain: &str, addresses: Vec<IpAddr>) {
        self.responses
            .lock()
            .unwrap()
            .insert(domain.to_string(), Ok(addresses));
    }

    /// Set an error response for a domain
    pub fn add_error_response(&self, domain: &str, error: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(domain.to_string(), Err(error.to_string()));
    }

    /// Get the number of times a domain was queried
    pub fn get_call_count(&self, domain: &str) -> u32 {
        let call_count = self.call_count.lock().unwrap();
        call_count.get(domain).copied().unwrap_or(0)
    }

    /// Total number of lookups across all domains.
    pub fn total_calls(&self) -> u32 {
        self.call_count.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl DnsResolver for FakeDnsResolver {
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError> {
        {
            let mut call_count = self.call_count.lock().unwrap();
            *call_count.entry(domain.to_string()).or_insert(0) += 1;
        }

        let responses = self.responses.lock().unwrap();
        match responses.get(domain) {
            Some(Ok(addresses)) => Ok(addresses.clone()),
            Some(Err(error)) => Err(DnsError::Resolution(error.clone())),
            None => Err(DnsError::NoRecords(domain.to_string())),
        }
    }
}
