//! Integration tests for the `sprig` CLI.
//!
//! Each test runs the built binary as a subprocess against a temp data
//! directory and verifies stdout and/or the files it leaves behind.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Get the path to the built `sprig` binary.
fn sprig_bin() -> PathBuf {
    // cargo test builds to target/debug/
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("sprig");
    path
}

/// Run sprig against the given data dir, asserting success.
fn sprig(data_dir: &Path, args: &[&str]) -> String {
    let output = Command::new(sprig_bin())
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .output()
        .expect("failed to run sprig");
    assert!(
        output.status.success(),
        "sprig {:?} failed:\nstdout: {}\nstderr: {}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr),
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Extract the id printed by `sprig add`.
fn added_id(stdout: &str) -> String {
    stdout
        .trim()
        .strip_prefix("added ")
        .expect("add output should start with 'added '")
        .to_string()
}

#[test]
fn add_then_list_shows_the_task() {
    let dir = TempDir::new().unwrap();
    sprig(dir.path(), &["add", "write the report"]);
    let out = sprig(dir.path(), &["list"]);
    assert!(out.contains("[ ]"));
    assert!(out.contains("write the report"));
}

#[test]
fn toggle_marks_a_task_done_and_persists() {
    let dir = TempDir::new().unwrap();
    let id = added_id(&sprig(dir.path(), &["add", "quick task"]));

    let out = sprig(dir.path(), &["toggle", &id]);
    assert!(out.contains("is now done"));

    let out = sprig(dir.path(), &["list"]);
    assert!(out.contains("[x]"));

    // The collection landed on disk in the current document shape.
    let text = fs::read_to_string(dir.path().join("todos.json")).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(doc["source"], "manual");
    assert_eq!(doc["data"][0]["completed"], true);
    assert!(doc["data"][0].get("completedAt").is_some());
}

#[test]
fn delete_cascade_removes_subtasks() {
    let dir = TempDir::new().unwrap();
    let parent = added_id(&sprig(dir.path(), &["add", "parent task"]));
    sprig(dir.path(), &["add", "child task", "--parent", &parent]);

    let out = sprig(dir.path(), &["--yes", "delete", &parent]);
    assert!(out.contains("deleted 2 task(s)"));

    let out = sprig(dir.path(), &["list"]);
    assert_eq!(out.trim(), "no tasks");
}

#[test]
fn export_then_import_round_trips() {
    let dir = TempDir::new().unwrap();
    sprig(dir.path(), &["add", "first"]);
    sprig(dir.path(), &["add", "second"]);

    let backup = dir.path().join("backup.json");
    sprig(dir.path(), &["export", backup.to_str().unwrap()]);

    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&backup).unwrap()).unwrap();
    assert_eq!(doc["version"], "1.0");
    assert_eq!(doc["todos"].as_array().unwrap().len(), 2);

    // Import into a fresh data dir.
    let other = TempDir::new().unwrap();
    let out = sprig(other.path(), &["--yes", "import", backup.to_str().unwrap()]);
    assert!(out.contains("imported 2 task(s)"));
    let out = sprig(other.path(), &["list"]);
    assert!(out.contains("first"));
    assert!(out.contains("second"));
}

#[test]
fn settings_change_persists() {
    let dir = TempDir::new().unwrap();
    let out = sprig(dir.path(), &["settings", "--archive-days", "7"]);
    assert!(out.contains("archive-days: 7"));

    // A fresh process reads the stored value back.
    let out = sprig(dir.path(), &["settings"]);
    assert!(out.contains("archive-days: 7"));
    assert!(dir.path().join("settings.json").exists());
}

#[test]
fn status_reports_missing_remote_config() {
    let dir = TempDir::new().unwrap();
    let out = sprig(dir.path(), &["status"]);
    assert!(out.contains("not configured"));
}

#[test]
fn legacy_bare_array_document_still_loads() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path()).unwrap();
    fs::write(
        dir.path().join("todos.json"),
        r#"[{"id":"legacy-1","text":"from the old format","completed":false,"createdAt":"2024-01-01T00:00:00Z"}]"#,
    )
    .unwrap();

    let out = sprig(dir.path(), &["list"]);
    assert!(out.contains("from the old format"));
}

#[test]
fn empty_task_text_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = Command::new(sprig_bin())
        .arg("--data-dir")
        .arg(dir.path())
        .args(["add", "   "])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("empty"));
}

#[test]
fn json_list_nests_children() {
    let dir = TempDir::new().unwrap();
    let parent = added_id(&sprig(dir.path(), &["add", "parent"]));
    sprig(dir.path(), &["add", "child", "--parent", &parent]);

    let out = sprig(dir.path(), &["--json", "list"]);
    let doc: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(doc.as_array().unwrap().len(), 1);
    assert_eq!(doc[0]["children"][0]["text"], "child");
}
