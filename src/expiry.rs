//! Expiry countdowns.
//!
//! Day counts are whole calendar days between the expiry date and "today",
//! so a certificate expiring today reports `0` regardless of the time of day.

use crate::core::{ExpiryResult, INVALID_DAYS};
use chrono::{NaiveDate, Utc};

/// Signed number of days from `today` until the certificate expires.
///
/// Returns `-1` for an unavailable expiry. Expired certificates yield a
/// negative count.
pub fn days_until(result: &ExpiryResult, today: NaiveDate) -> i64 {
    match result {
        ExpiryResult::Valid(expiry) => expiry.signed_duration_since(today).num_days(),
        ExpiryResult::Unavailable => INVALID_DAYS,
    }
}

/// Source of the current date, injectable for tests.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to a single date.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
