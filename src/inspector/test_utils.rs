use crate::core::{CertificateInspector, ExpiryResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Fake certificate inspector for testing
///
/// Endpoints without a configured expiry report `Unavailable`, as an
/// unreachable host would.
#[derive(Debug, Clone, Default)]
pub struct FakeInspector {
    expiries: Arc<Mutex<HashMap<String, ExpiryResult>>>,
    call_count: Arc<Mutex<HashMap<String, u32>>>,
    delay: Option<Duration>,
}

impl FakeInspector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every inspection, to widen race windows in concurrency tests.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Makes `endpoint` present a certificate valid until `expiry`.
    pub fn set_expiry(&self, endpoint: &str, expiry: NaiveDate) {
        self.expiries
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), ExpiryResult::Valid(expiry));
    }

    /// Makes `endpoint` fail inspection.
    pub fn set_failure(&self, endpoint: &str) {
        self.expiries
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), ExpiryResult::Unavailable);
    }

    /// Get the number of times an endpoint was inspected
    pub fn get_call_count(&self, endpoint: &str) -> u32 {
        self.call_count
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    /// Total number of inspections across all endpoints.
    pub fn total_calls(&self) -> u32 {
        self.call_count.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl CertificateInspector for FakeInspector {
    async fn inspect(&self, endpoint: &str) -> ExpiryResult {
        {
            let mut call_count = self.call_count.lock().unwrap();
            *call_count.entry(endpoint.to_string()).or_insert(0) += 1;
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.expiries
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(ExpiryResult::Unavailable)
    }
}
