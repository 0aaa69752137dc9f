// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Integration tests for the forkwatch CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A raw data directory with a small fork family and a few users
fn workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let raw = dir.path().join("raw");
    fs::create_dir_all(&raw).unwrap();
    fs::write(
        raw.join("repos.txt"),
        "1:rails/rails,2008-04-11\n2:fan/rails,2008-05-01,1\n3:other/merb,2008-04-12\n4:x/sinatra,2008-06-01\n",
    )
    .unwrap();
    fs::write(raw.join("lang.txt"), "1:Ruby;900,JavaScript;100\n").unwrap();
    fs::write(raw.join("data.txt"), "1:1\n1:3\n2:1\n2:3\n2:4\n3:2\n").unwrap();
    fs::write(raw.join("test.txt"), "1\n3\n9\n").unwrap();
    dir
}

fn derived(dir: &TempDir) -> PathBuf {
    dir.path().join("calc")
}

/// forkwatch pointed at the workspace, with ambient configuration cleared
fn forkwatch(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("forkwatch").unwrap();
    cmd.env_remove("FORKWATCH_CONFIG")
        .env_remove("RUST_LOG")
        .arg("--source-dir")
        .arg(dir.path().join("raw"))
        .arg("--derived-dir")
        .arg(derived(dir))
        .args(["--candidates", "3", "--no-color"]);
    cmd
}

#[test]
fn test_run_writes_candidate_files() {
    let dir = workspace();

    forkwatch(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Users:             3"));

    let filled = fs::read_to_string(derived(&dir).join("results-filled-3.txt")).unwrap();
    let lines: Vec<&str> = filled.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("3:1"), "unexpected line {}", lines[1]);
    assert!(derived(&dir).join("results-prob-3.txt").exists());
    assert!(derived(&dir).join("cowatch.sqlite3").exists());
}

#[test]
fn test_seed_then_fill() {
    let dir = workspace();

    forkwatch(&dir)
        .arg("seed")
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote seed candidates for 3 users"));

    let seeds = fs::read_to_string(derived(&dir).join("results-prob-3.txt")).unwrap();
    // User 1 watches 1 and 3, user 2 adds 4 to that
    assert!(seeds.lines().any(|l| l == "1:4"), "seeds were {seeds}");

    let out = dir.path().join("filled.txt");
    forkwatch(&dir)
        .args(["fill", "--output"])
        .arg(&out)
        .assert()
        .success();
    assert!(fs::read_to_string(&out).unwrap().starts_with("1:4"));
}

#[test]
fn test_build_reports_counts() {
    let dir = workspace();

    forkwatch(&dir)
        .arg("build")
        .assert()
        .success()
        .stdout(predicate::str::contains("Repos:    4 (1 forks)"))
        .stdout(predicate::str::contains("Users:    3"))
        .stdout(predicate::str::contains("Watches:  6"));
}

#[test]
fn test_build_without_raw_data_fails() {
    let dir = TempDir::new().unwrap();

    forkwatch(&dir)
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("repos.txt"));
}

#[test]
fn test_lineage() {
    let dir = workspace();

    forkwatch(&dir)
        .args(["lineage", "fan/rails"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forked from: rails/rails (1)"))
        .stdout(predicate::str::contains("ancestors (1)"));

    forkwatch(&dir)
        .args(["lineage", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("descendants (1)"))
        .stdout(predicate::str::contains("Ruby 900 lines (90.0%)"));
}

#[test]
fn test_lineage_ambiguous_name() {
    let dir = workspace();

    forkwatch(&dir)
        .args(["lineage", "rails"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Ambiguous"));
}

#[test]
fn test_related() {
    let dir = workspace();
    forkwatch(&dir).arg("build").assert().success();

    forkwatch(&dir)
        .args(["related", "rails/rails"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other/merb"))
        .stdout(predicate::str::contains("x/sinatra"));
}

#[test]
fn test_related_rebuilds_missing_table() {
    let dir = workspace();
    assert!(!derived(&dir).join("cowatch.sqlite3").exists());

    forkwatch(&dir)
        .args(["related", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("other/merb"));

    assert!(derived(&dir).join("cowatch.sqlite3").exists());
}

#[test]
fn test_related_without_watch_data_fails() {
    let dir = workspace();
    fs::remove_file(dir.path().join("raw").join("data.txt")).unwrap();

    forkwatch(&dir)
        .args(["related", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("raw input not found"))
        .stderr(predicate::str::contains("data.txt"));

    assert!(!derived(&dir).join("cowatch.sqlite3").exists());
}

#[test]
fn test_export_dot_and_json() {
    let dir = workspace();

    forkwatch(&dir)
        .args(["export", "--format", "dot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("digraph lineage"));

    let out = dir.path().join("lineage");
    forkwatch(&dir)
        .args(["export", "--format", "json", "--output"])
        .arg(&out)
        .assert()
        .success();
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.with_extension("json")).unwrap()).unwrap();
    assert!(json.is_array() || json.is_object());

    forkwatch(&dir)
        .args(["export", "--format", "yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown export format"));
}

#[test]
fn test_blend() {
    let dir = workspace();
    let primary = dir.path().join("primary.txt");
    let secondary = dir.path().join("secondary.txt");
    // Lines pair up by position, whatever user the secondary line names
    fs::write(&primary, "2:20\n1:10,11,12\n").unwrap();
    fs::write(&secondary, "7:1\n1:30,10,31\n").unwrap();

    forkwatch(&dir)
        .arg("blend")
        .arg(&primary)
        .arg(&secondary)
        .args(["--lead", "2", "--max", "4"])
        .assert()
        .success()
        .stdout("2:1,20\n1:30,10,11,12\n");
}

#[test]
fn test_config_key() {
    let dir = workspace();

    forkwatch(&dir)
        .args(["config", "candidates"])
        .assert()
        .success()
        .stdout("3\n");

    forkwatch(&dir)
        .args(["config", "nonsense"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown configuration key"));
}

#[test]
fn test_config_file_is_layered() {
    let dir = workspace();
    let file = dir.path().join("forkwatch.toml");
    fs::write(&file, "fallback_excludes_watched = true\n").unwrap();

    forkwatch(&dir)
        .arg("--config")
        .arg(&file)
        .args(["config", "fallback_excludes_watched"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();

    forkwatch(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("forkwatch"));
}
