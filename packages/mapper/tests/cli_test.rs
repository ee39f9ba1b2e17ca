//! Command-line tests against the fixture collection.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn mapper() -> Command {
    let mut cmd = Command::cargo_bin("briefedition-mapper").unwrap();
    cmd.env_remove("MANIFEST_PATH")
        .env_remove("COLLECTION_ROOT")
        .env_remove("WATCH_INTERVAL_SECS")
        .arg("--manifest")
        .arg(fixtures().join("manifest.yml"))
        .arg("--root")
        .arg(fixtures());
    cmd
}

#[test]
fn test_validate() {
    mapper()
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Manifest valid"))
        .stdout(predicate::str::contains("letters"))
        .stdout(predicate::str::contains("persons"));
}

#[test]
fn test_list_prints_json_records() {
    let output = mapper().args(["list", "persons"]).output().unwrap();
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records.as_array().map(Vec::len), Some(2));
    assert_eq!(records[0]["id"], "P1");
}

#[test]
fn test_show_xml() {
    mapper()
        .args(["show", "letters", "L0002", "--format", "xml"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("<TEI"))
        .stdout(predicate::str::contains("nach 1855"));
}

#[test]
fn test_show_record_by_default() {
    mapper()
        .args(["show", "persons", "P1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""gnd": "118541838""#));
}

#[test]
fn test_show_missing_entity_fails() {
    mapper()
        .args(["show", "letters", "L9999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No letters entity with id 'L9999'"));
}

#[test]
fn test_show_unsupported_format_fails() {
    mapper()
        .args(["show", "letters", "L0001", "--format", "html"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid format: 'html'"));
}

#[test]
fn test_unknown_entity_fails() {
    mapper()
        .args(["list", "places"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown entity type: places"));
}

#[test]
fn test_missing_manifest_fails() {
    Command::cargo_bin("briefedition-mapper")
        .unwrap()
        .args(["--manifest", "/nonexistent/manifest.yml", "validate"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}
