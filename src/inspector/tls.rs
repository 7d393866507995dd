use crate::{
    config::InspectorConfig,
    core::{CertificateInspector, Endpoint, ExpiryResult},
    inspector::InspectError,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::time::{Duration, Instant};
use tokio::{net::TcpStream, time::timeout};
use tracing::{debug, trace, warn};

/// Certificate inspector backed by the platform TLS stack (`native-tls`).
pub struct TlsInspector {
    connector: tokio_native_tls::TlsConnector,
    connect_timeout: Duration,
    handshake_timeout: Duration,
}

impl TlsInspector {
    /// Builds an inspector that verifies against the platform trust store.
    pub fn from_config(config: &InspectorConfig) -> Result<Self, InspectError> {
        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(config.allow_invalid_certs)
            .build()
            .map_err(InspectError::Handshake)?;

        Ok(Self {
            connector: tokio_native_tls::TlsConnector::from(connector),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            handshake_timeout: Duration::from_millis(config.handshake_timeout_ms),
        })
    }

    /// Connects, completes the handshake and reads the leaf certificate expiry.
    pub async fn fetch_expiry(&self, endpoint: &Endpoint) -> Result<NaiveDate, InspectError> {
        let stream = timeout(
            self.connect_timeout,
            TcpStream::connect((endpoint.host.as_str(), endpoint.port)),
        )
        .await
        .map_err(|_| InspectError::Timeout {
            stage: "connect",
            timeout_ms: self.connect_timeout.as_millis() as u64,
        })?
        .map_err(InspectError::Connect)?;

        let tls_stream = timeout(
            self.handshake_timeout,
            self.connector.connect(&endpoint.host, stream),
        )
        .await
        .map_err(|_| InspectError::Timeout {
            stage: "handshake",
            timeout_ms: self.handshake_timeout.as_millis() as u64,
        })?
        .map_err(InspectError::Handshake)?;

        let certificate = tls_stream
            .get_ref()
            .peer_certificate()
            .map_err(InspectError::Handshake)?
            .ok_or(InspectError::NoPeerCertificate)?;
        let der = certificate.to_der().map_err(InspectError::Handshake)?;

        not_after_date(&der)
    }
}

#[async_trait]
impl CertificateInspector for TlsInspector {
    async fn inspect(&self, endpoint: &str) -> ExpiryResult {
        let start_time = Instant::now();
        let result = match Endpoint::parse(endpoint) {
            Ok(parsed) => {
                trace!(%parsed, "Inspecting endpoint");
                self.fetch_expiry(&parsed).await
            }
            Err(e) => Err(e.into()),
        };
        metrics::histogram!("inspection_duration_seconds")
            .record(start_time.elapsed().as_secs_f64());

        match result {
            Ok(expiry) => {
                metrics::counter!("inspections_total", "status" => "success").increment(1);
                debug!(endpoint, %expiry, "Read leaf certificate expiry");
                ExpiryResult::Valid(expiry)
            }
            Err(e) => {
                metrics::counter!("inspections_total", "status" => e.kind()).increment(1);
                warn!(endpoint, error = %e, "SSL expiry check failed");
                ExpiryResult::Unavailable
            }
        }
    }
}

/// Extracts the `notAfter` field of a DER certificate as a UTC calendar date.
pub fn not_after_date(der: &[u8]) -> Result<NaiveDate, InspectError> {
    let (_, cert) = x509_parser::parse_x509_certificate(der)
        .map_err(|e| InspectError::Parse(e.to_string()))?;

    let epoch = cert.validity().not_after.timestamp();
    DateTime::<Utc>::from_timestamp(epoch, 0)
        .map(|not_after| not_after.date_naive())
        .ok_or_else(|| InspectError::Parse(format!("notAfter {epoch} is out of range")))
}
