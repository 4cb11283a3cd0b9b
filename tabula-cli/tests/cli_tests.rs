//! Integration tests for the Tabula CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get the tabula binary
#[allow(deprecated)]
fn tabula_cmd() -> Command {
    Command::cargo_bin("tabula").unwrap()
}

const WIDGETS: &str = r#"{
    "name": "widgets",
    "label": "Widget",
    "field": [
        { "name": "id", "type": "id" },
        { "name": "name", "type": "string", "length": 128, "allow_null": false },
        { "name": "price", "type": "decimal", "length": 10, "scale": 2 }
    ]
}"#;

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_help_command() {
    tabula_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tabula CLI"))
        .stdout(predicate::str::contains("Usage: tabula <COMMAND>"))
        .stdout(predicate::str::contains("plan"))
        .stdout(predicate::str::contains("validate"));
}

#[test]
fn test_version_command() {
    tabula_cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("Version"))
        .stdout(predicate::str::contains("sqlserver"));
}

#[test]
fn test_plan_mysql() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "widgets.json", WIDGETS);

    tabula_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE `widgets`"))
        .stdout(predicate::str::contains("`name` varchar(128) NOT NULL"))
        .stdout(predicate::str::contains("`price` decimal(10,2) NULL"))
        .stdout(predicate::str::contains("1 table(s) planned"));
}

#[test]
fn test_plan_sqlserver_alias() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "widgets.json", WIDGETS);

    tabula_cmd()
        .current_dir(dir.path())
        .args(["plan", "--dialect", "dblib"])
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE [widgets]"))
        .stdout(predicate::str::contains("IDENTITY(1,1)"));
}

#[test]
fn test_plan_reads_config_from_working_directory() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "widgets.json", WIDGETS);
    write(&dir, "tabula.toml", "[engine]\ndialect = \"pgsql\"\n");

    tabula_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE TABLE \"widgets\""))
        .stdout(predicate::str::contains("serial NOT NULL PRIMARY KEY"));
}

#[test]
fn test_plan_merge_with_existing_tables() {
    let dir = TempDir::new().unwrap();
    let existing = write(&dir, "existing.json", WIDGETS);
    let file = write(
        &dir,
        "update.json",
        r#"{ "name": "widgets", "field": [{ "name": "sku", "type": "string", "length": 32 }] }"#,
    );

    tabula_cmd()
        .current_dir(dir.path())
        .args(["plan", "--merge", "--existing"])
        .arg(&existing)
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("ADD COLUMN `sku` varchar(32) NULL"))
        .stdout(predicate::str::contains("CREATE TABLE").not());
}

#[test]
fn test_plan_existing_without_merge_fails() {
    let dir = TempDir::new().unwrap();
    let existing = write(&dir, "existing.json", WIDGETS);

    tabula_cmd()
        .current_dir(dir.path())
        .args(["plan", "--existing"])
        .arg(&existing)
        .arg(&existing)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_plan_batch_continues_past_failures() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "batch.json",
        r#"[
            { "name": "first", "field": [{ "name": "id", "type": "id" }] },
            { "name": "second", "field": [
                { "name": "a", "type": "integer", "is_primary_key": true },
                { "name": "b", "type": "integer", "is_primary_key": true }
            ] },
            { "name": "third", "field": [{ "name": "id", "type": "id" }] }
        ]"#,
    );

    let output = tabula_cmd()
        .current_dir(dir.path())
        .args(["plan", "--json"])
        .arg(&file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let results = report["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0]["name"], "first");
    assert_eq!(results[1]["error"]["code"], 400);
    assert_eq!(results[2]["name"], "third");
    assert_eq!(report["dialect"], "mysql");
}

#[test]
fn test_plan_reports_failed_tables_in_place() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "batch.json",
        r#"[
            { "name": "first", "field": [{ "name": "id", "type": "id" }] },
            { "name": "second", "field": [{ "name": "a", "type": "" }] }
        ]"#,
    );

    tabula_cmd()
        .current_dir(dir.path())
        .arg("plan")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("#2"))
        .stdout(predicate::str::contains("no type or sql for field 'a'"))
        .stdout(predicate::str::contains("1 of 2 table(s) failed"));
}

#[test]
fn test_plan_missing_file() {
    tabula_cmd()
        .args(["plan", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn test_plan_unknown_dialect() {
    tabula_cmd()
        .args(["plan", "--dialect", "oracle", "x.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported dialect"));
}

#[test]
fn test_validate_valid_file() {
    let dir = TempDir::new().unwrap();
    let file = write(&dir, "widgets.json", WIDGETS);

    tabula_cmd()
        .current_dir(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("All tables are valid"));
}

#[test]
fn test_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    let file = write(
        &dir,
        "bad.json",
        r#"{ "name": "bad", "field": [
            { "name": "price", "type": "decimal", "precision": 4, "scale": 6 }
        ] }"#,
    );

    tabula_cmd()
        .current_dir(dir.path())
        .arg("validate")
        .arg(&file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("bad:"))
        .stderr(predicate::str::contains("Found 1 validation errors"));
}
