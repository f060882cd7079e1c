//! Integration tests for the mockio CLI
//!
//! These tests run the actual CLI binary and verify output.

use assert_cmd::Command;
use predicates::prelude::*;

/// Get the binary to test
fn mockio_cmd() -> Command {
    Command::cargo_bin("mockio").unwrap()
}

#[test]
fn test_help_flag() {
    mockio_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("infinite stdin/stdout streams"))
        .stdout(predicate::str::contains("probe"))
        .stdout(predicate::str::contains("race"));
}

#[test]
fn test_probe_help_lists_flags() {
    mockio_cmd()
        .args(["probe", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--writers"))
        .stdout(predicate::str::contains("--rounds"))
        .stdout(predicate::str::contains("--timeout-ms"))
        .stdout(predicate::str::contains("MOCKIO_WRITERS"));
}

#[test]
fn test_no_subcommand_fails() {
    mockio_cmd().assert().failure();
}

// ============================================================================
// Checks
// ============================================================================

#[test]
fn test_probe_passes() {
    mockio_cmd()
        .args(["probe", "--writers", "3", "--rounds", "20"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Probe passed"))
        .stdout(predicate::str::contains("Records: 60"))
        .stdout(predicate::str::contains("Echoed lines: 20"));
}

#[test]
fn test_probe_reads_config_from_env() {
    mockio_cmd()
        .arg("probe")
        .env("MOCKIO_WRITERS", "2")
        .env("MOCKIO_ROUNDS", "5")
        .assert()
        .success()
        .stdout(predicate::str::contains("Records: 10"));
}

#[test]
fn test_probe_accepts_unbounded_timeout() {
    mockio_cmd()
        .args(["probe", "--writers", "2", "--rounds", "5"])
        .args(["--timeout-ms", "18446744073709551615"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Probe passed"));
}

#[test]
fn test_race_passes() {
    mockio_cmd()
        .args(["race", "--iterations", "200"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No stalled reads"))
        .stdout(predicate::str::contains("Iterations: 200"));
}

#[test]
fn test_invalid_flag_value_fails() {
    mockio_cmd()
        .args(["race", "--iterations", "many"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}
