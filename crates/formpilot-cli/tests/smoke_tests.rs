//! Smoke tests for the formpilot CLI
//!
//! None of these launch a browser: they cover argument handling, fixture
//! validation and configuration layering.

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const ENV_KEYS: [&str; 6] = [
    "BASE_URL",
    "HEADLESS",
    "CHROMIUM_PATH",
    "TEST_EMAIL",
    "TEST_PASSWORD",
    "RUST_LOG",
];

/// Get a command for the formpilot binary with a clean environment
fn formpilot() -> Command {
    let mut cmd = Command::cargo_bin("formpilot").expect("formpilot binary should exist");
    for key in ENV_KEYS {
        cmd.env_remove(key);
    }
    cmd
}

fn write_fixture(dir: &TempDir, json: &str) -> PathBuf {
    fs::write(dir.path().join("car1.jpg"), b"\xFF\xD8\xFF\xE0").unwrap();
    let path = dir.path().join("listing.json");
    fs::write(&path, json).unwrap();
    path
}

const VALID_FIXTURE: &str = r#"{
    "brand": null,
    "year": 2020,
    "mileage_km": 45000,
    "price_million_vnd": 520,
    "title": "Toyota Vios 2020",
    "description": "Xe gia đình, bảo dưỡng định kỳ",
    "image": "car1.jpg"
}"#;

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    formpilot()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    formpilot()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("check-fixture"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_no_args_fails() {
    formpilot().assert().failure();
}

#[test]
fn test_run_help_mentions_env() {
    formpilot()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TEST_EMAIL"))
        .stdout(predicate::str::contains("--report"));
}

// ============================================================================
// Fixture Tests
// ============================================================================

#[test]
fn test_check_valid_fixture() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, VALID_FIXTURE);
    formpilot()
        .args(["--color", "never", "check-fixture"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("valid"))
        .stdout(predicate::str::contains("mileage = 45000"));
}

#[test]
fn test_check_fixture_json() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, VALID_FIXTURE);
    formpilot()
        .args(["check-fixture", "--json"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"price\": \"520\""));
}

#[test]
fn test_check_fixture_missing_year() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(
        &dir,
        r#"{"mileage": 45000, "price": 520, "title": "T", "description": "D", "image": "car1.jpg"}"#,
    );
    formpilot()
        .arg("check-fixture")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("year"));
}

#[test]
fn test_check_fixture_not_an_object() {
    let dir = TempDir::new().unwrap();
    let path = write_fixture(&dir, "[1, 2, 3]");
    formpilot()
        .arg("check-fixture")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

#[test]
fn test_check_missing_file() {
    formpilot()
        .args(["check-fixture", "/nonexistent/listing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_bundled_fixture_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/create_listing_valid.json");
    formpilot().arg("check-fixture").arg(path).assert().success();
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_defaults() {
    formpilot()
        .args(["config", "--defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://localhost:3000"))
        .stdout(predicate::str::contains("headless: true"));
}

#[test]
fn test_config_env_override() {
    formpilot()
        .arg("config")
        .env("BASE_URL", "http://staging:8080")
        .env("HEADLESS", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://staging:8080"))
        .stdout(predicate::str::contains("headless: false"));
}

#[test]
fn test_config_file_then_flag() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("formpilot.yaml");
    fs::write(
        &path,
        "flow:\n  base_url: http://from-file\n  confirmation_retries: 5\n",
    )
    .unwrap();

    formpilot()
        .args(["config", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://from-file"))
        .stdout(predicate::str::contains("confirmation_retries: 5"));

    formpilot()
        .args(["config", "--base-url", "http://from-flag", "-c"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("base_url: http://from-flag"));
}

#[test]
fn test_bundled_config_parses() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/formpilot.yaml");
    formpilot()
        .args(["config", "-c"])
        .arg(path)
        .assert()
        .success()
        .stdout(predicate::str::contains("dialog_ms: 15000"));
}

#[test]
fn test_config_invalid_yaml() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.yaml");
    fs::write(&path, "flow:\n  binding: sideways\n").unwrap();
    formpilot()
        .args(["config", "-c"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("YAML"));
}

// ============================================================================
// Run Tests
// ============================================================================

#[test]
fn test_run_missing_fixture() {
    formpilot()
        .args(["run", "/nonexistent/listing.json", "--email", "a@b.c"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_run_bad_config_fails_before_browser() {
    formpilot()
        .args(["run", "listing.json", "-c", "/nonexistent/formpilot.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("I/O"));
}
