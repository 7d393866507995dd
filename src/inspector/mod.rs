//! Live TLS inspection of watchlist endpoints.
//!
//! The inspector connects to an endpoint, completes a TLS handshake and reads
//! the `notAfter` field of the leaf certificate. Failures never escape this
//! module as errors: they are logged and reported as
//! [`ExpiryResult::Unavailable`](crate::core::ExpiryResult::Unavailable) so a
//! single bad endpoint cannot abort a batch refresh.

pub mod tls;
#[cfg(feature = "test-utils")]
pub mod test_utils;

use crate::core::EndpointError;
use thiserror::Error;

pub use crate::core::CertificateInspector;
pub use tls::TlsInspector;

/// Reasons an inspection can fail, kept for logging and metrics labels.
#[derive(Error, Debug)]
pub enum InspectError {
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] EndpointError),

    #[error("timed out during {stage} after {timeout_ms}ms")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    #[error("connection failed: {0}")]
    Connect(#[source] std::io::Error),

    #[error("TLS handshake failed: {0}")]
    Handshake(#[source] native_tls::Error),

    #[error("server presented no certificate")]
    NoPeerCertificate,

    #[error("could not parse leaf certificate: {0}")]
    Parse(String),
}

impl InspectError {
    /// A short, stable label used for the `inspections_total` metric.
    pub fn kind(&self) -> &'static str {
        match self {
            InspectError::Endpoint(_) => "invalid_endpoint",
            InspectError::Timeout { .. } => "timeout",
            InspectError::Connect(_) => "connect",
            InspectError::Handshake(_) => "handshake",
            InspectError::NoPeerCertificate => "no_certificate",
            InspectError::Parse(_) => "parse",
        }
    }
}
