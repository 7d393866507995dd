//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. Global flags are merged into the configuration loaded from
//! `sslwatch.toml` and the environment; the subcommand selects what to do.

use clap::{Parser, Subcommand};
use figment::{
    value::{Dict, Map, Value},
    Error, Metadata, Profile, Provider,
};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Watches TLS endpoints and tracks when their certificates expire.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,

    /// Path to the watchlist CSV file.
    #[arg(short, long, value_name = "FILE", global = true)]
    pub watchlist: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "sslwatch=trace".
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Read expiry dates even from certificates that fail verification.
    #[arg(long, global = true)]
    pub allow_invalid_certs: bool,

    /// Print results as JSON instead of a table.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a host (optionally host:port) to the watchlist.
    Add { host: String },
    /// Remove a host from the watchlist.
    Remove { host: String },
    /// Show the watchlist with current countdowns.
    List,
    /// Check a host's certificate expiry now without saving it.
    Check { host: String },
    /// Re-inspect every watchlist entry once and exit.
    Refresh,
    /// Keep the watchlist refreshed in the background until interrupted.
    Run {
        /// Serve Prometheus metrics on this address.
        #[arg(long, value_name = "ADDR")]
        metrics_listen: Option<SocketAddr>,
    },
}

fn set(dict: &mut Dict, section: &str, key: &str, value: Value) {
    let entry = dict
        .entry(section.to_string())
        .or_insert_with(|| Value::from(Dict::new()));
    if let Value::Dict(_, inner) = entry {
        inner.insert(key.to_string(), value);
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(path) = &self.watchlist {
            set(&mut dict, "store", "path", Value::from(path.display().to_string()));
        }

        if let Some(level) = &self.log_level {
            set(&mut dict, "core", "log_level", Value::from(level.clone()));
        }

        // Only an explicit flag overrides the file; absence leaves it untouched.
        if self.allow_invalid_certs {
            set(&mut dict, "inspector", "allow_invalid_certs", Value::from(true));
        }

        if let Command::Run {
            metrics_listen: Some(addr),
        } = &self.command
        {
            set(&mut dict, "metrics", "enabled", Value::from(true));
            set(&mut dict, "metrics", "listen_address", Value::from(addr.to_string()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
