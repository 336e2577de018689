//! Command line tests running the `uniscm` binary

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn uniscm() -> Command {
    let mut cmd = Command::cargo_bin("uniscm").expect("binary should be built");
    cmd.env_remove("UNISCM_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}

#[test]
fn test_validate_accepts_good_url() {
    uniscm()
        .args(["validate", "scm:git:https://example.com/project.git"])
        .assert()
        .success()
        .stdout(predicate::str::contains("is valid"));
}

#[test]
fn test_validate_rejects_bad_urls() {
    uniscm()
        .args(["validate", "scm:nope:/srv/repo"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("No such provider"));

    uniscm()
        .args(["validate", "git:/srv/repo"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("must start with 'scm:'"));
}

#[test]
fn test_validate_json_output() {
    let output = uniscm()
        .args(["-o", "json", "validate", "scm:svn|https://svn.example.com/repo/trunk"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["valid"], serde_json::Value::Bool(true));
    assert_eq!(report["problems"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_providers_lists_builtins() {
    uniscm()
        .arg("providers")
        .assert()
        .success()
        .stdout(predicate::str::contains("git"))
        .stdout(predicate::str::contains("svn"));
}

#[test]
fn test_settings_file_is_used() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("uniscm.yml");
    fs::write(&settings, "executables:\n  git: /opt/git/bin/git\n").unwrap();

    uniscm()
        .arg("--config")
        .arg(&settings)
        .args(["validate", "scm:git:https://example.com/project.git"])
        .assert()
        .success();
}

#[test]
fn test_missing_settings_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    uniscm()
        .arg("--config")
        .arg(temp_dir.path().join("absent.yml"))
        .arg("providers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_bad_url_for_operation_fails() {
    let temp_dir = TempDir::new().unwrap();

    uniscm()
        .args(["status", "scm:nope:/srv/repo", "-d"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No such provider"));
}

#[test]
fn test_checkin_without_message_is_a_usage_error() {
    uniscm()
        .args(["checkin", "scm:git:/srv/repo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--message"));
}

#[test]
fn test_providers_reports_managing_provider() {
    let temp_dir = TempDir::new().unwrap();
    fs::create_dir(temp_dir.path().join(".svn")).unwrap();

    let output = uniscm()
        .args(["-o", "json", "providers", "-d"])
        .arg(temp_dir.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let managing: Vec<&str> = report
        .as_array()
        .unwrap()
        .iter()
        .filter(|provider| provider["manages_working_copy"] == serde_json::Value::Bool(true))
        .filter_map(|provider| provider["id"].as_str())
        .collect();
    assert_eq!(managing, vec!["svn"]);
}

#[test]
fn test_bad_glob_is_reported() {
    let temp_dir = TempDir::new().unwrap();

    uniscm()
        .args(["status", "scm:git:/srv/repo", "--include", "[unclosed", "-d"])
        .arg(temp_dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid pattern"));
}

#[test]
fn test_unreadable_changelog_date_format_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let settings = temp_dir.path().join("uniscm.yml");
    fs::write(&settings, "changelog_date_format: \"%Y\"\n").unwrap();

    uniscm()
        .arg("--config")
        .arg(&settings)
        .arg("providers")
        .assert()
        .failure()
        .stderr(predicate::str::contains("changelog_date_format"));
}
