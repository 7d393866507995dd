//! sslwatch - TLS certificate expiry watchlist
//!
//! One-shot subcommands edit or inspect the watchlist and exit; `run` keeps
//! it refreshed in the background until interrupted.

use anyhow::Result;
use clap::Parser;
use sslwatch::{
    app::App,
    cli::{Cli, Command},
    config::Config,
    formatting::formatter,
    service::AddOutcome,
};
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            init_logging("info");
            error!("Failed to load configuration: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config.core.log_level);
    debug!(?config, "Loaded configuration");

    match execute(cli, config).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn execute(cli: Cli, config: Config) -> Result<ExitCode> {
    let output = formatter(cli.json);
    let service = |config: Config| App::builder(config).build_service();

    match cli.command {
        Command::Add { host } => match service(config)?.add(&host).await? {
            AddOutcome::Added(entry) => println!("{}", output.format_entries(&[entry])),
            AddOutcome::Duplicate(host) => println!("{host} already exists in the watchlist"),
        },
        Command::Remove { host } => {
            service(config)?.remove(&host).await?;
            println!("Removed {host}");
        }
        Command::List => {
            let entries = service(config)?.list().await;
            println!("{}", output.format_entries(&entries));
        }
        Command::Check { host } => {
            let status = service(config)?.get(&host).await?;
            println!("{}", output.format_status(&status));
        }
        Command::Refresh => {
            let service = service(config)?;
            let report = service.refresh().await?;
            info!(
                refreshed = report.refreshed,
                failed = report.failed,
                "Watchlist refreshed"
            );
            println!("{}", output.format_entries(&service.list().await));
        }
        Command::Run { .. } => run_daemon(config).await?,
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_daemon(config: Config) -> Result<()> {
    info!(
        watchlist = %config.store.path.display(),
        refresh_enabled = config.refresh.enabled,
        interval_seconds = config.refresh.interval_seconds,
        concurrency = config.refresh.concurrency,
        metrics_enabled = config.metrics.enabled,
        "sslwatch starting up..."
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = App::builder(config).build(shutdown_rx).await?;

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received. Shutting down gracefully..."),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C, shutting down"),
        }
        let _ = shutdown_tx.send(true);
    });

    app.run().await
}
