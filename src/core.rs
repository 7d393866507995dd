//! Core domain types and service traits for sslwatch
//!
//! This module defines the watchlist data model and the trait contracts
//! between the DNS gate, the certificate inspector and the rest of the
//! engine.

use crate::dns::DnsError;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Port used when an endpoint is given without an explicit `:port` suffix.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// The literal stored in place of an expiry date when inspection fails.
pub const EXPIRY_ERROR_SENTINEL: &str = "Error: Could not retrieve SSL expiry";

/// Day count reported for entries whose expiry could not be determined.
pub const INVALID_DAYS: i64 = -1;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The outcome of inspecting an endpoint's leaf certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryResult {
    /// The certificate's `notAfter`, truncated to a UTC calendar date.
    Valid(NaiveDate),
    /// The endpoint could not be inspected.
    Unavailable,
}

impl ExpiryResult {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ExpiryResult::Unavailable)
    }
}

impl fmt::Display for ExpiryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpiryResult::Valid(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            ExpiryResult::Unavailable => f.write_str(EXPIRY_ERROR_SENTINEL),
        }
    }
}

/// Error returned when a stored expiry value is neither a date nor an error marker.
#[derive(Debug, thiserror::Error)]
#[error("invalid expiry value '{0}', expected YYYY-MM-DD or an 'Error' marker")]
pub struct ParseExpiryError(String);

impl FromStr for ExpiryResult {
    type Err = ParseExpiryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // Any "Error..." text counts, including per-failure messages written by older batch runs.
        if s.starts_with("Error") {
            return Ok(ExpiryResult::Unavailable);
        }
        NaiveDate::parse_from_str(s, DATE_FORMAT)
            .map(ExpiryResult::Valid)
            .map_err(|_| ParseExpiryError(s.to_string()))
    }
}

impl Serialize for ExpiryResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ExpiryResult {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One monitored endpoint in the watchlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEntry {
    /// The trimmed `host` or `host:port` string as entered. Unique key.
    #[serde(rename = "Sub Domains")]
    pub host: String,
    /// Expiry of the leaf certificate, if it has been checked.
    #[serde(rename = "SSL Expiry Date")]
    pub expiry: Option<ExpiryResult>,
    /// Signed days until `expiry`, or `-1` when the expiry is unavailable.
    #[serde(rename = "days_until_expiry", deserialize_with = "lenient_days")]
    pub days_until_expiry: Option<i64>,
}

/// Accepts integer day counts as well as the float form (`30.0`) that
/// spreadsheet tools write into a column that once held an empty cell.
fn lenient_days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        let raw = raw.trim();
        raw.parse::<i64>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(|days| days.trunc() as i64))
    }))
}

impl WatchEntry {
    /// Creates an entry that has not been inspected yet.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            expiry: None,
            days_until_expiry: None,
        }
    }

    /// Creates an entry from a fresh inspection.
    pub fn checked(host: impl Into<String>, expiry: ExpiryResult, today: NaiveDate) -> Self {
        let mut entry = Self::new(host);
        entry.apply(expiry, today);
        entry
    }

    /// Overwrites the expiry fields with a new inspection result.
    pub fn apply(&mut self, expiry: ExpiryResult, today: NaiveDate) {
        self.days_until_expiry = Some(crate::expiry::days_until(&expiry, today));
        self.expiry = Some(expiry);
    }

    /// Recomputes `days_until_expiry` from the stored expiry for display.
    pub fn recompute_days(&mut self, today: NaiveDate) {
        self.days_until_expiry = self
            .expiry
            .as_ref()
            .map(|expiry| crate::expiry::days_until(expiry, today));
    }
}

/// A live, unpersisted expiry reading for an ad-hoc check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryStatus {
    pub host: String,
    pub expiry: ExpiryResult,
    pub days_until_expiry: i64,
}

/// A host and port pair parsed from a watchlist key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

/// Error returned when a `host[:port]` string cannot be split into an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("endpoint host is empty")]
    EmptyHost,
    #[error("invalid port '{0}'")]
    InvalidPort(String),
}

impl Endpoint {
    /// Splits `host:port`, defaulting to port 443 when no port is given.
    pub fn parse(input: &str) -> Result<Self, EndpointError> {
        let input = input.trim();
        let (host, port) = match input.split_once(':') {
            Some((host, port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| EndpointError::InvalidPort(port.to_string()))?;
                (host.trim(), port)
            }
            None => (input, DEFAULT_TLS_PORT),
        };
        if host.is_empty() {
            return Err(EndpointError::EmptyHost);
        }
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Returns the hostname part of a `host[:port]` string.
pub fn host_part(host_with_port: &str) -> &str {
    host_with_port
        .split(':')
        .next()
        .unwrap_or(host_with_port)
        .trim()
}

// =============================================================================
// Service Traits
// =============================================================================

/// Resolves domain names to their address records
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolves a bare hostname to its A records
    ///
    /// # Returns
    /// * `Ok(addresses)`, possibly empty, on a completed lookup
    /// * `Err` for NXDOMAIN, timeouts and server errors
    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, DnsError>;
}

/// Reads the expiry of the leaf certificate presented by a TLS endpoint
#[async_trait]
pub trait CertificateInspector: Send + Sync {
    /// Inspects `host` or `host:port` (default port 443).
    ///
    /// Never fails: any network or parsing error is reported as
    /// `ExpiryResult::Unavailable`.
    async fn inspect(&self, endpoint: &str) -> ExpiryResult;
}
