//! The binaries report fatal errors on stderr and exit with status 1.

use std::path::PathBuf;
use std::process::{Command, Output};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn assert_reported(output: &Output, needle: &str) {
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(needle),
        "stderr should mention {needle:?}, got: {stderr}"
    );
}

#[test]
fn join_with_one_kind_is_reported() {
    let out = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_format_data"))
        .env_remove("RUST_LOG")
        .arg("out")
        .arg(out.path())
        .arg("--data-dir")
        .arg(fixtures_dir())
        .args(["-s", "1", "-m", "1", "-N", "-j"])
        .output()
        .unwrap();
    assert_reported(&output, "Select at least two kinds of data for joining.");
}

#[test]
fn missing_tables_are_reported() {
    let out = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_format_data"))
        .env_remove("RUST_LOG")
        .arg("out")
        .arg(out.path())
        .arg("--data-dir")
        .arg(data.path())
        .args(["-s", "1", "-m", "1", "-N"])
        .output()
        .unwrap();
    assert_reported(&output, "K279-1.tsv");
}

#[test]
fn missing_score_folder_is_reported() {
    let root = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_quality_assurance"))
        .env_remove("RUST_LOG")
        .arg(root.path().join("nowhere"))
        .output()
        .unwrap();
    assert_reported(&output, "error");
}
