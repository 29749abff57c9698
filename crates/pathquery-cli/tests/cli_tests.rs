//! Integration tests for the `pq` binary

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn core_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../pathquery-core")
}

fn model_path() -> PathBuf {
    core_dir().join("tests/fixtures/genomic_model.json")
}

fn xsd_path() -> String {
    core_dir().join("schemas/query.xsd").display().to_string()
}

fn json_schema_path() -> String {
    core_dir().join("schemas/query.schema.json").display().to_string()
}

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const PROFILE: &str = r#"[
  {"name": "onlySetA", "state": "current", "type": "Gene", "size": 12},
  {"name": "oldSet", "state": "to-upgrade", "type": "Gene", "size": 3}
]"#;

fn pq() -> Command {
    Command::cargo_bin("pq").unwrap()
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_cli_help() {
    pq().arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

// ============================================================================
// validate
// ============================================================================

#[test]
fn test_validate_xml_query() {
    let dir = TempDir::new().unwrap();
    let query = write(
        &dir,
        "query.xml",
        r#"<query model="genomic" view="Gene.symbol Gene.length"><constraint path="Gene.length" op="&lt;" value="500"/></query>"#,
    );

    pq().arg("validate")
        .arg(&query)
        .arg("--model")
        .arg(model_path())
        .arg("--schema")
        .arg(xsd_path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Query is valid"))
        .stdout(predicate::str::contains("[A] Gene.length < 500"));
}

#[test]
fn test_validate_json_query_with_lists() {
    let dir = TempDir::new().unwrap();
    let bags = write(&dir, "profile.json", PROFILE);
    let query = write(
        &dir,
        "query.json",
        r#"{"from": "Gene", "select": ["symbol"], "where": [{"path": "Gene", "op": "IN", "value": "onlySetA"}]}"#,
    );

    pq().args(["--format", "json", "validate"])
        .arg(&query)
        .arg("--model")
        .arg(model_path())
        .arg("--schema")
        .arg(json_schema_path())
        .arg("--bags")
        .arg(&bags)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""bag": "onlySetA""#));
}

#[test]
fn test_malformed_query_exits_with_client_code() {
    let dir = TempDir::new().unwrap();
    let query = write(&dir, "query.xml", r#"<query model="genomic" view="Gene.symbol" colour="red"/>"#);

    pq().arg("validate")
        .arg(&query)
        .arg("--model")
        .arg(model_path())
        .arg("--schema")
        .arg(xsd_path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Attribute 'colour' is not allowed"));
}

#[test]
fn test_stale_list_exits_with_service_code() {
    let dir = TempDir::new().unwrap();
    let bags = write(&dir, "profile.json", PROFILE);
    let query = write(
        &dir,
        "query.json",
        r#"{"from": "Gene", "select": ["symbol"], "where": [{"path": "Gene", "op": "IN", "value": "oldSet"}]}"#,
    );

    pq().args(["-f", "json", "validate"])
        .arg(&query)
        .arg("--model")
        .arg(model_path())
        .arg("--schema")
        .arg(json_schema_path())
        .arg("--bags")
        .arg(&bags)
        .assert()
        .code(3)
        .stdout(predicate::str::contains(r#""error": "stale-bags""#))
        .stdout(predicate::str::contains("oldSet"));
}

#[test]
fn test_missing_list_without_profile() {
    let dir = TempDir::new().unwrap();
    let query = write(
        &dir,
        "query.json",
        r#"{"from": "Gene", "select": ["symbol"], "where": [{"path": "Gene", "op": "IN", "value": "onlySetA"}]}"#,
    );

    pq().arg("validate")
        .arg(&query)
        .arg("--model")
        .arg(model_path())
        .arg("--schema")
        .arg(json_schema_path())
        .assert()
        .code(2)
        .stderr(predicate::str::contains("do not have access"));
}

#[test]
fn test_missing_query_file_fails() {
    pq().args(["validate", "/no/such/query.xml", "--model"])
        .arg(model_path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read query file"));
}

// ============================================================================
// bags
// ============================================================================

#[test]
fn test_bags_list() {
    let dir = TempDir::new().unwrap();
    let bags = write(&dir, "profile.json", PROFILE);

    pq().args(["bags", "list", "--bags"])
        .arg(&bags)
        .assert()
        .success()
        .stdout(predicate::str::contains("onlySetA"))
        .stdout(predicate::str::contains("TO_UPGRADE"));
}

#[test]
fn test_bags_describe_updates_profile() {
    let dir = TempDir::new().unwrap();
    let bags = write(&dir, "profile.json", PROFILE);

    pq().args(["-f", "json", "bags", "describe", "onlySetA", "Fly genes", "--bags"])
        .arg(&bags)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""listDescription": "Fly genes""#));

    let saved = fs::read_to_string(&bags).unwrap();
    assert!(saved.contains("Fly genes"));
}

#[test]
fn test_bags_describe_unknown_list() {
    let dir = TempDir::new().unwrap();
    let bags = write(&dir, "profile.json", PROFILE);

    pq().args(["bags", "describe", "someoneElses", "x", "--bags"])
        .arg(&bags)
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "The list someoneElses does not belong to the user",
        ));
}
