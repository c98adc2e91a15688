//! CLI integration tests

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;

/// Build command for the pgrc-cli binary (finds it in target/debug when run via cargo test).
fn pgrc_cli() -> Command {
    cargo_bin_cmd!("pgrc-cli")
}

/// Path to pgrc library test fixtures (relative to workspace).
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("pgrc")
        .join("tests")
        .join("fixtures")
}

#[test]
fn test_cli_help() {
    let mut cmd = pgrc_cli();

    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("DSPF"));
}

#[test]
fn test_cli_version() {
    let mut cmd = pgrc_cli();

    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_cli_verify_clean_file() {
    let mut cmd = pgrc_cli();

    cmd.arg("verify").arg(fixtures_dir().join("clean.dspf"));

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASSED"));
}

#[test]
fn test_cli_verify_floating_pin_fails() {
    let mut cmd = pgrc_cli();

    cmd.arg("verify").arg(fixtures_dir().join("floating_pin.dspf"));

    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("u2:VDD"));
}

#[test]
fn test_cli_verify_skip_opens() {
    let mut cmd = pgrc_cli();

    cmd.arg("verify")
        .arg(fixtures_dir().join("floating_pin.dspf"))
        .arg("--skip-opens");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("not checked"));
}

#[test]
fn test_cli_verify_json_output() {
    let mut cmd = pgrc_cli();

    cmd.arg("verify")
        .arg(fixtures_dir().join("short.dspf"))
        .arg("--format")
        .arg("json");

    let output = cmd.output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["failed"], 1);
    assert_eq!(json["results"][0]["report"]["shorts"][0]["layer"], "M3");
}

#[test]
fn test_cli_verify_nonexistent_file() {
    let mut cmd = pgrc_cli();

    cmd.arg("verify").arg("does_not_exist.dspf");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("ERROR"));
}

#[test]
fn test_cli_extract_writes_dspf() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("grid.dspf");

    let mut cmd = pgrc_cli();
    cmd.arg("extract")
        .arg(fixtures_dir().join("grid_layout.json"))
        .arg("--output")
        .arg(&output);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Resistors:   8"));

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.starts_with(".SUBCKT GRID VDD VSS\n"));
    assert!(text.ends_with(".ENDS\n"));
}

#[test]
fn test_cli_run_flow() {
    let dir = tempfile::tempdir().unwrap();
    let out_dir = dir.path().join("reports");

    let mut cmd = pgrc_cli();
    cmd.arg("run")
        .arg(fixtures_dir().join("grid_layout.json"))
        .arg("--out-dir")
        .arg(&out_dir)
        .arg("--design")
        .arg("CHIP");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("PASSED"));
    assert!(out_dir.join("output_CHIP.dspf").exists());
}

#[test]
fn test_cli_run_bad_layout() {
    let dir = tempfile::tempdir().unwrap();
    let layout = dir.path().join("layout.json");
    std::fs::write(&layout, r#"{ "nets": [] }"#).unwrap();

    let mut cmd = pgrc_cli();
    cmd.arg("run")
        .arg(&layout)
        .arg("--out-dir")
        .arg(dir.path());

    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("no nets"));
}

#[test]
fn test_cli_output_formats_are_different() {
    let path = fixtures_dir().join("clean.dspf");

    let mut cmd_human = pgrc_cli();
    cmd_human.arg("verify").arg(&path).arg("--format").arg("human");
    let human_output = cmd_human.output().unwrap();

    let mut cmd_json = pgrc_cli();
    cmd_json.arg("verify").arg(&path).arg("--format").arg("json");
    let json_output = cmd_json.output().unwrap();

    assert_ne!(
        human_output.stdout,
        json_output.stdout,
        "Different formats should produce different output"
    );
}
