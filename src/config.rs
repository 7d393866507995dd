//! Configuration management for sslwatch
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer, in increasing priority: built-in defaults, an
//! optional `sslwatch.toml` file, `SSLWATCH_`-prefixed environment variables,
//! and command-line arguments.

use crate::cli::Cli;
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "sslwatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    pub core: CoreConfig,
    pub store: StoreConfig,
    pub inspector: InspectorConfig,
    pub dns: DnsConfig,
    pub refresh: RefreshConfig,
    pub metrics: MetricsConfig,
}

/// General application settings.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CoreConfig {
    /// The logging level for the application, as an `EnvFilter` directive.
    pub log_level: String,
}

/// Where the watchlist is persisted.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StoreConfig {
    /// Path of the watchlist CSV file.
    pub path: PathBuf,
}

/// Settings for live TLS inspection.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct InspectorConfig {
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// TLS handshake timeout in milliseconds.
    pub handshake_timeout_ms: u64,
    /// Read expiry from certificates the platform trust store rejects
    /// (self-signed, already expired). Off by default.
    pub allow_invalid_certs: bool,
}

/// Configuration for DNS resolution.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DnsConfig {
    /// Optional nameserver (`ip:port`); the system configuration is used otherwise.
    pub resolver: Option<String>,
    /// Lookup timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Configuration for the background refresh loop.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RefreshConfig {
    /// Whether `run` starts the background refresh loop.
    pub enabled: bool,
    /// Seconds between the end of one cycle and the start of the next.
    pub interval_seconds: u64,
    /// Maximum number of endpoints inspected at once within a cycle.
    pub concurrency: usize,
    /// Run a cycle immediately on startup instead of waiting one interval.
    pub run_on_startup: bool,
}

/// Configuration for the Prometheus metrics endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub listen_address: SocketAddr,
}

impl Config {
    /// Loads the application configuration for the given command line.
    ///
    /// A config file named on the command line must exist; the default
    /// `sslwatch.toml` is optional.
    pub fn load(cli: &Cli) -> Result<Self> {
        let toml_path = match &cli.config_file {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found at specified path: {}", path.display());
                }
                path.clone()
            }
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };
        let config: Config = Self::figment(&toml_path, cli).extract()?;
        Ok(config)
    }

    fn figment(toml_path: &Path, cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(toml_path))
            // e.g. SSLWATCH_REFRESH__INTERVAL_SECONDS=3600
            .merge(Env::prefixed("SSLWATCH_").split("__"))
            .merge(cli.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig {
                log_level: "info".to_string(),
            },
            store: StoreConfig {
                path: PathBuf::from("domains.csv"),
            },
            inspector: InspectorConfig {
                connect_timeout_ms: 5000,
                handshake_timeout_ms: 5000,
                allow_invalid_certs: false,
            },
            dns: DnsConfig {
                resolver: None,
                timeout_ms: 5000,
            },
            refresh: RefreshConfig {
                enabled: true,
                interval_seconds: 24 * 60 * 60,
                concurrency: 8,
                run_on_startup: true,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_address: SocketAddr::from(([127, 0, 0, 1], 9090)),
            },
        }
    }
}
