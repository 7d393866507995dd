#![allow(dead_code)]

pub mod app;
pub mod test_metrics;

use chrono::NaiveDate;
use sslwatch::config::Config;
use sslwatch::expiry::{Clock, FixedClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// The date every test clock is pinned to.
pub fn today() -> NaiveDate {
    date(2029, 12, 2)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(today()))
}

pub fn watchlist_path(dir: &Path) -> PathBuf {
    dir.join("domains.csv")
}

/// A configuration that never touches the network on its own: the watchlist
/// lives in `dir`, no startup refresh, metrics off.
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.store.path = watchlist_path(dir);
    config.refresh.run_on_startup = false;
    config.refresh.interval_seconds = 3600;
    config.metrics.enabled = false;
    config
}

/// Polls `condition` every 10ms until it holds, panicking after `timeout`.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration, what: &str) {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timeout waiting for {what}");
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("sslwatch=debug")
        .try_init();
}
