//! End-to-end tests for the `pom-sync` binary
//!
//! These invoke the actual CLI and validate its behavior from a user's
//! perspective. Tests that need a working `git` binary are gated behind
//! the `integration-tests` feature; the rest run offline.

use assert_cmd::Command;
use predicates::prelude::*;

/// Test that --help shows usage information
#[test]
fn test_help() {
    let mut cmd = Command::cargo_bin("pom-sync").unwrap();

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Sync a Maven pom.xml"))
        .stdout(predicate::str::contains("--match-scope"));
}

/// Test that a missing bearer credential is a usage error
#[test]
fn test_missing_token_fails() {
    let mut cmd = Command::cargo_bin("pom-sync").unwrap();

    cmd.env_remove("GITHUB_TOKEN")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--token"));
}

/// Test that an unknown existence-check scope is rejected
#[test]
fn test_invalid_match_scope_fails() {
    let mut cmd = Command::cargo_bin("pom-sync").unwrap();

    cmd.env("GITHUB_TOKEN", "dummy")
        .arg("--match-scope")
        .arg("shallow")
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid match scope"));
}

/// Test that running outside a git working copy fails before touching
/// the descriptor
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_fails_outside_git_working_copy() {
    let temp = assert_fs::TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("pom-sync").unwrap();

    cmd.current_dir(temp.path())
        .env("GITHUB_TOKEN", "dummy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("git remote url"));
}
