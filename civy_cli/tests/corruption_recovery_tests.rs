//! Corruption recovery tests for the civy binary.
//!
//! These tests verify the system handles:
//! - Corrupted ledger files (reported, never overwritten)
//! - Ledger files written by older versions
//! - Corrupted journal lines
//! - Empty files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn civy(dir: &Path) -> Command {
    let config = dir.join("config.toml");
    fs::write(&config, "[economy]\nstarting_gold = 100\n").expect("Failed to write config");
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("civy"));
    cmd.arg("--data-dir")
        .arg(dir.join("data"))
        .arg("--config")
        .arg(config);
    cmd
}

fn write_ledger(dir: &Path, content: &str) {
    fs::create_dir_all(dir.join("data")).unwrap();
    fs::write(dir.join("data/ledger.json"), content).expect("Failed to write ledger");
}

#[test]
fn test_corrupted_ledger_is_reported_not_replaced() {
    let temp_dir = setup_test_dir();
    write_ledger(temp_dir.path(), "{ invalid json }}}}");

    civy(temp_dir.path())
        .args(["quickmine", "--user", "42", "wood"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("nothing was changed"));

    let content = fs::read_to_string(temp_dir.path().join("data/ledger.json")).unwrap();
    assert_eq!(content, "{ invalid json }}}}");
}

#[test]
fn test_corrupted_ledger_fails_export() {
    let temp_dir = setup_test_dir();
    write_ledger(temp_dir.path(), "[1, 2");

    civy(temp_dir.path())
        .arg("export")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CorruptLedger"));
}

#[test]
fn test_legacy_ledger_is_read() {
    let temp_dir = setup_test_dir();
    write_ledger(
        temp_dir.path(),
        r#"{
    "42": {
        "gold": 100,
        "wood": 30,
        "stone": 0,
        "iron": 0,
        "last_daily": "2020-01-01T10:00:00.500000"
    },
    "7": {"gold": 0, "wood": 0, "stone": 0, "iron": 5, "last_daily": null}
}"#,
    );

    civy(temp_dir.path())
        .args(["daily", "--user", "42", "wood"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Claimed 100 wood (now 130)"));

    civy(temp_dir.path())
        .args(["balance", "--user", "7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gold: 0"))
        .stdout(predicate::str::contains("Iron: 5"));
}

#[test]
fn test_empty_ledger_file_starts_fresh() {
    let temp_dir = setup_test_dir();
    write_ledger(temp_dir.path(), "");

    civy(temp_dir.path())
        .args(["balance", "--user", "42"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Gold: 100"));
}

#[test]
fn test_corrupted_journal_lines_ignored() {
    let temp_dir = setup_test_dir();

    civy(temp_dir.path())
        .args(["quickmine", "--user", "42", "iron"])
        .assert()
        .success();

    let journal_path = temp_dir.path().join("data/journal.jsonl");
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(&journal_path)
        .expect("Failed to open journal");
    writeln!(file, "{{ truncated").unwrap();

    civy(temp_dir.path())
        .args(["quickmine", "--user", "7", "iron"])
        .assert()
        .success();

    civy(temp_dir.path())
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("42  mined 10 iron"))
        .stdout(predicate::str::contains("7  mined 10 iron"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let temp_dir = setup_test_dir();
    let config = temp_dir.path().join("bad.toml");
    fs::write(&config, "[economy]\nmine_amount = 0\n").unwrap();

    Command::new(assert_cmd::cargo::cargo_bin!("civy"))
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .arg("--config")
        .arg(&config)
        .args(["balance", "--user", "42"])
        .assert()
        .failure();
}
