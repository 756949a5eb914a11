//! Smoke tests for the finprobe CLI
//!
//! Every command here resolves configuration only; none launches a browser.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// The binary, isolated from the caller's config file and overrides
fn finprobe(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("finprobe").expect("finprobe binary should exist");
    cmd.current_dir(dir.path());
    for key in [
        "FINPROBE_CONFIG",
        "FINPROBE_BASE_URL",
        "FINPROBE_HEADLESS",
        "FINPROBE_EMAIL",
        "FINPROBE_PASSWORD",
        "FINPROBE_FULL_NAME",
        "FINPROBE_SESSION_PATH",
        "CI",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.4.0"));
}

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("projects"))
        .stdout(predicate::str::contains("categorize"));
}

#[test]
fn test_no_args_fails() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir).assert().failure();
}

// ============================================================================
// config
// ============================================================================

#[test]
fn test_config_defaults_as_yaml() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("finance-app-five-rosy.vercel.app"))
        .stdout(predicate::str::contains("ai-tests"));
}

#[test]
fn test_config_file_and_env_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("staging.yaml");
    fs::write(&path, "base_url: https://staging.example.com\naction_timeout_ms: 5000\n").unwrap();

    finprobe(&dir)
        .args(["config", "--format", "json", "--config"])
        .arg(&path)
        .env("FINPROBE_HEADLESS", "false")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"base_url\": \"https://staging.example.com\""))
        .stdout(predicate::str::contains("\"action_timeout_ms\": 5000"))
        .stdout(predicate::str::contains("\"headless\": false"));
}

#[test]
fn test_default_file_in_working_directory() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("finprobe.yaml"), "retries: 3\n").unwrap();
    finprobe(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("retries: 3"));
}

#[test]
fn test_ci_forces_retries_and_one_worker() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .arg("config")
        .env("CI", "true")
        .assert()
        .success()
        .stdout(predicate::str::contains("retries: 2"))
        .stdout(predicate::str::contains("workers: 1"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.yaml");
    fs::write(&path, "base_url: ftp://example.com\n").unwrap();
    finprobe(&dir)
        .arg("config")
        .arg("--config")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("base_url"));
}

// ============================================================================
// projects
// ============================================================================

#[test]
fn test_projects_lists_defaults() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .arg("projects")
        .assert()
        .success()
        .stdout(predicate::str::contains("setup"))
        .stdout(predicate::str::contains("chromium"))
        .stdout(predicate::str::contains("timeout=30000ms"));
}

#[test]
fn test_projects_resolves_suite() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .args(["projects", "--suite", "expenses"])
        .assert()
        .success()
        .stdout(predicate::str::contains("expenses -> chromium (timeout 60000ms)"));
}

#[test]
fn test_unclaimed_suite_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("finprobe.yaml"),
        "projects:\n  - name: setup\n    test_match: ^auth_setup$\n    uses_session: false\n",
    )
    .unwrap();
    finprobe(&dir)
        .args(["projects", "--suite", "dashboard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No project runs suite"));
}

// ============================================================================
// categorize
// ============================================================================

#[test]
fn test_categorize_messages() {
    let dir = TempDir::new().unwrap();
    for (message, category) in [
        ("Timeout 30000ms exceeded", "timeout"),
        ("net::ERR_CONNECTION_REFUSED", "network"),
        ("Login failed for test@example.com", "auth"),
        ("expected \"Welcome\" to be visible", "assertion"),
        ("something odd", "other"),
    ] {
        finprobe(&dir)
            .args(["categorize", message])
            .assert()
            .success()
            .stdout(predicate::str::diff(format!("{category}\n")));
    }
}

// ============================================================================
// setup
// ============================================================================

#[cfg(not(feature = "browser"))]
#[test]
fn test_setup_needs_browser_feature() {
    let dir = TempDir::new().unwrap();
    finprobe(&dir)
        .arg("setup")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--features browser"));
}
