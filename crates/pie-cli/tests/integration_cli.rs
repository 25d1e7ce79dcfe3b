//! End-to-end tests for the `pie` binary.
//!
//! These never reach npm or node: they cover argument parsing, config
//! errors and `clean`.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn pie() -> Command {
    let mut cmd = Command::cargo_bin("pie").unwrap();
    cmd.env_remove("PIE_PORT").env_remove("PIE_DIR");
    cmd
}

#[test]
fn test_version() {
    pie()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_commands() {
    pie()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("pack"))
        .stdout(predicate::str::contains("clean"));
}

#[test]
fn test_clean_removes_only_the_artifact() {
    let temp = TempDir::new().unwrap();
    let controllers = temp.path().join("controllers");
    fs::create_dir_all(controllers.join("node_modules")).unwrap();
    fs::write(controllers.join("controller-bundle.js"), "bundle").unwrap();
    fs::write(controllers.join("entry.js"), "entry").unwrap();
    fs::write(controllers.join("package.json"), "{}").unwrap();

    pie()
        .args(["clean", "-d"])
        .arg(temp.path())
        .assert()
        .success();

    assert!(!controllers.join("controller-bundle.js").exists());
    assert!(controllers.join("entry.js").exists());
    assert!(controllers.join("package.json").exists());
    assert!(controllers.join("node_modules").is_dir());
}

#[test]
fn test_clean_with_nothing_to_remove_succeeds() {
    let temp = TempDir::new().unwrap();

    pie()
        .args(["clean", "-d"])
        .arg(temp.path())
        .assert()
        .success();
}

#[test]
fn test_pack_without_pies_fails() {
    let temp = TempDir::new().unwrap();

    pie()
        .args(["pack", "-d"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("pies"));

    assert!(!temp.path().join("controllers").exists());
}

#[test]
fn test_missing_explicit_config_fails() {
    let temp = TempDir::new().unwrap();

    pie()
        .args(["pack", "--config"])
        .arg(temp.path().join("missing.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_duplicate_pies_rejected() {
    let temp = TempDir::new().unwrap();
    fs::write(
        temp.path().join("pie.config.json"),
        r#"{ "pies": [{ "name": "a", "path": "a" }, { "name": "a", "path": "b" }] }"#,
    )
    .unwrap();

    pie()
        .args(["pack", "-d"])
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("declared more than once"));
}

#[test]
fn test_invalid_port_rejected_by_parser() {
    pie()
        .args(["serve", "--port", "not-a-port"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--port"));
}
