//! Runs the `sslwatch` binary against temporary watchlists.
//!
//! DNS is pointed at a closed local port so nothing here depends on the
//! network: admission lookups fail fast and every host reads as missing.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

fn sslwatch(watchlist: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sslwatch").unwrap();
    cmd.arg("--watchlist")
        .arg(watchlist)
        .env("SSLWATCH_DNS__RESOLVER", "127.0.0.1:9")
        .env("SSLWATCH_DNS__TIMEOUT_MS", "500")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn list_on_a_missing_watchlist_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.csv");

    sslwatch(&path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Watchlist is empty."));
    assert!(!path.exists());
}

#[test]
fn list_shows_stored_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.csv");
    std::fs::write(
        &path,
        "Sub Domains,SSL Expiry Date,days_until_expiry\n\
         example.com,2030-01-01,30\n\
         down.example.com,Error: Could not retrieve SSL expiry,-1\n",
    )
    .unwrap();

    sslwatch(&path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("example.com"))
        .stdout(predicate::str::contains("2030-01-01"))
        .stdout(predicate::str::contains("Error: Could not retrieve SSL expiry"));
}

#[test]
fn list_json_is_machine_readable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.csv");
    std::fs::write(
        &path,
        "Sub Domains,SSL Expiry Date,days_until_expiry\ndown.example.com,Error: timed out,-1\n",
    )
    .unwrap();

    let output = sslwatch(&path).args(["list", "--json"]).output().unwrap();
    assert!(output.status.success());
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value[0]["host"], "down.example.com");
    assert_eq!(value[0]["expiry"], "Error: Could not retrieve SSL expiry");
    assert_eq!(value[0]["days_until_expiry"], -1);
}

#[test]
fn remove_of_absent_host_succeeds_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.csv");

    sslwatch(&path)
        .args(["remove", "example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed example.com"));
    assert!(!path.exists());
}

#[test]
fn add_of_empty_host_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.csv");

    sslwatch(&path)
        .args(["add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("host must not be empty"));
    assert!(!path.exists());
}

#[test]
fn add_of_unresolvable_host_fails_and_leaves_watchlist_alone() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("domains.csv");
    let seeded = "Sub Domains,SSL Expiry Date,days_until_expiry\nexample.com,2030-01-01,30\n";
    std::fs::write(&path, seeded).unwrap();

    sslwatch(&path)
        .args(["add", "nonexistent.invalid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "No A record found for nonexistent.invalid",
        ));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), seeded);
}

#[test]
fn missing_config_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();

    sslwatch(&dir.path().join("domains.csv"))
        .args(["--config-file", "/definitely/not/here/sslwatch.toml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found at specified path"));
}

#[test]
fn subcommand_is_required() {
    Command::cargo_bin("sslwatch")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}
