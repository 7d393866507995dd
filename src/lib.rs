/// sslwatch - TLS certificate expiry watchlist
///
/// This library keeps a durable watchlist of `host[:port]` endpoints, reads
/// the expiry date of the certificate each one presents, and keeps the
/// countdowns current with a periodic refresh.
pub mod app;
pub mod cli;
pub mod config;
pub mod core;
pub mod dns;
pub mod expiry;
pub mod formatting;
pub mod inspector;
pub mod internal_metrics;
pub mod refresh;
pub mod service;
pub mod store;
pub mod task_manager;

// Re-export core types for convenience
pub use core::*;
