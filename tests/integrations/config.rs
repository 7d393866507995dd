use clap::Parser;
use serial_test::serial;
use sslwatch::cli::Cli;
use sslwatch::config::Config;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// A helper function to run a test with a temporary config file.
fn with_config_file<F>(toml_content: &str, test_fn: F)
where
    F: FnOnce(PathBuf),
{
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", toml_content).unwrap();
    let path = file.path().to_path_buf();
    test_fn(path);
}

fn load(args: &[&str]) -> anyhow::Result<Config> {
    let cli = Cli::try_parse_from(args).unwrap();
    Config::load(&cli)
}

#[test]
#[serial]
fn test_defaults_without_file() {
    let config = load(&["sslwatch", "list"]).unwrap();
    assert_eq!(config, Config::default());
    assert_eq!(config.store.path, PathBuf::from("domains.csv"));
    assert_eq!(config.refresh.interval_seconds, 86_400);
    assert!(!config.inspector.allow_invalid_certs);
    assert!(!config.metrics.enabled);
}

#[test]
#[serial]
fn test_load_full_valid_config() {
    let toml_content = r#"
        [core]
        log_level = "debug"
        [store]
        path = "/var/lib/sslwatch/domains.csv"
        [inspector]
        connect_timeout_ms = 1500
        handshake_timeout_ms = 2500
        allow_invalid_certs = true
        [dns]
        resolver = "1.1.1.1:53"
        timeout_ms = 2000
        [refresh]
        enabled = false
        interval_seconds = 3600
        concurrency = 2
        run_on_startup = false
        [metrics]
        enabled = true
        listen_address = "0.0.0.0:9100"
    "#;

    with_config_file(toml_content, |path| {
        let config = load(&["sslwatch", "--config-file", path.to_str().unwrap(), "list"]).unwrap();

        assert_eq!(config.core.log_level, "debug");
        assert_eq!(config.store.path, PathBuf::from("/var/lib/sslwatch/domains.csv"));
        assert_eq!(config.inspector.connect_timeout_ms, 1500);
        assert_eq!(config.inspector.handshake_timeout_ms, 2500);
        assert!(config.inspector.allow_invalid_certs);
        assert_eq!(config.dns.resolver, Some("1.1.1.1:53".to_string()));
        assert_eq!(config.dns.timeout_ms, 2000);
        assert!(!config.refresh.enabled);
        assert_eq!(config.refresh.interval_seconds, 3600);
        assert_eq!(config.refresh.concurrency, 2);
        assert!(!config.refresh.run_on_startup);
        assert!(config.metrics.enabled);
        assert_eq!(
            config.metrics.listen_address,
            "0.0.0.0:9100".parse::<SocketAddr>().unwrap()
        );
    });
}

#[test]
#[serial]
fn test_load_partial_config_uses_defaults() {
    let toml_content = r#"
        [refresh]
        interval_seconds = 600
    "#;

    with_config_file(toml_content, |path| {
        let config = load(&["sslwatch", "--config-file", path.to_str().unwrap(), "list"]).unwrap();

        assert_eq!(config.refresh.interval_seconds, 600);
        assert_eq!(config.refresh.concurrency, 8);
        assert!(config.refresh.run_on_startup);
        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.inspector.connect_timeout_ms, 5000);
    });
}

#[test]
#[serial]
fn test_cli_flags_override_file() {
    let toml_content = r#"
        [core]
        log_level = "warn"
        [store]
        path = "from-file.csv"
    "#;

    with_config_file(toml_content, |path| {
        let config = load(&[
            "sslwatch",
            "--config-file",
            path.to_str().unwrap(),
            "--watchlist",
            "from-cli.csv",
            "--allow-invalid-certs",
            "run",
            "--metrics-listen",
            "127.0.0.1:9999",
        ])
        .unwrap();

        assert_eq!(config.store.path, PathBuf::from("from-cli.csv"));
        assert_eq!(config.core.log_level, "warn");
        assert!(config.inspector.allow_invalid_certs);
        assert!(config.metrics.enabled);
        assert_eq!(
            config.metrics.listen_address,
            "127.0.0.1:9999".parse::<SocketAddr>().unwrap()
        );
    });
}

#[test]
#[serial]
fn test_environment_overrides_file_but_not_cli() {
    let toml_content = r#"
        [refresh]
        concurrency = 3
        [core]
        log_level = "warn"
    "#;

    std::env::set_var("SSLWATCH_REFRESH__CONCURRENCY", "16");
    std::env::set_var("SSLWATCH_CORE__LOG_LEVEL", "trace");
    with_config_file(toml_content, |path| {
        let result = load(&[
            "sslwatch",
            "--config-file",
            path.to_str().unwrap(),
            "--log-level",
            "debug",
            "list",
        ]);
        std::env::remove_var("SSLWATCH_REFRESH__CONCURRENCY");
        std::env::remove_var("SSLWATCH_CORE__LOG_LEVEL");

        let config = result.unwrap();
        assert_eq!(config.refresh.concurrency, 16);
        assert_eq!(config.core.log_level, "debug");
    });
}

#[test]
#[serial]
fn test_invalid_value_type() {
    let toml_content = r#"
        [refresh]
        concurrency = "four"
    "#;

    with_config_file(toml_content, |path| {
        let result = load(&["sslwatch", "--config-file", path.to_str().unwrap(), "list"]);
        let error_string = result.unwrap_err().to_string();
        assert!(error_string.contains("concurrency"), "{error_string}");
    });
}

#[test]
#[serial]
fn test_non_existent_config_file() {
    let result = load(&[
        "sslwatch",
        "--config-file",
        "/path/to/non/existent/sslwatch.toml",
        "list",
    ]);
    let error_string = result.unwrap_err().to_string();
    assert!(error_string.contains("Config file not found at specified path"));
}
