//! Integration tests for repopulse CLI

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn run_repopulse(args: &[&str]) -> (String, String, bool) {
    let mut cmd_args = vec!["run", "-q", "-p", "repopulse", "--"];
    cmd_args.extend(args);

    let output = Command::new("cargo")
        .args(&cmd_args)
        .current_dir(env!("CARGO_MANIFEST_DIR").to_string() + "/..")
        .env_remove("INFLUX_TOKEN")
        .env_remove("REPOPULSE_CHURN_WINDOW_DAYS")
        .env_remove("REPOPULSE_CLONE_TIMEOUT_SECS")
        .env_remove("REPOPULSE_POOL_SIZE")
        .env_remove("REPOPULSE_QUEUE_CAPACITY")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

/// Two packages: `app` with Python, `web` with JavaScript.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("app")).unwrap();
    fs::create_dir_all(root.join("web")).unwrap();
    fs::write(
        root.join("app/main.py"),
        "# entry point\n\ndef main():\n    return 1\n",
    )
    .unwrap();
    fs::write(
        root.join("web/index.js"),
        "// ui\nconst x = 1;\n/* block\n   comment */\n",
    )
    .unwrap();
    fs::write(root.join("README.md"), "# not counted\n").unwrap();
    dir
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_cli_help() {
    let (stdout, _, success) = run_repopulse(&["--help"]);

    assert!(success);
    assert!(stdout.contains("repopulse"));
    assert!(stdout.contains("--output"));
    assert!(stdout.contains("--by-package"));
    assert!(stdout.contains("--by-file"));
    assert!(stdout.contains("churn"));
    assert!(stdout.contains("analyze"));
}

#[test]
fn test_cli_version() {
    let (stdout, _, success) = run_repopulse(&["--version"]);

    assert!(success);
    assert!(stdout.contains("repopulse"));
}

#[test]
fn test_analyze_help_lists_pool_flags() {
    let (stdout, _, success) = run_repopulse(&["analyze", "--help"]);

    assert!(success);
    assert!(stdout.contains("--workers"));
    assert!(stdout.contains("--queue-capacity"));
    assert!(stdout.contains("--dry-run"));
    assert!(stdout.contains("--clone-timeout"));
    assert!(stdout.contains("--influx-bucket"));
}

#[test]
fn test_table_output() {
    let dir = fixture();
    let (stdout, _, success) = run_repopulse(&[path_str(dir.path())]);

    assert!(success);
    assert!(stdout.contains("Code"));
    assert!(stdout.contains("Comments"));
    assert!(stdout.contains("Blanks"));
    assert!(stdout.contains("Weighted"));
    assert!(stdout.contains("Total (2 files)"));
}

#[test]
fn test_json_output() {
    let dir = fixture();
    let (stdout, _, success) = run_repopulse(&["loc", path_str(dir.path()), "--output", "json"]);

    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("Invalid JSON output");
    assert_eq!(parsed["headers"][1], "Code");
    assert_eq!(parsed["footer"]["label"], "Total (2 files)");
    // code 3, comments 4, blanks 1, total 8, weighted 5.0
    assert_eq!(
        parsed["footer"]["values"],
        serde_json::json!(["3", "4", "1", "8", "5.0"])
    );
}

#[test]
fn test_by_package_output() {
    let dir = fixture();
    let (stdout, _, success) = run_repopulse(&[
        "loc",
        path_str(dir.path()),
        "--by-package",
        "--output",
        "json",
    ]);

    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let labels: Vec<&str> = parsed["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["label"].as_str().unwrap())
        .collect();
    assert_eq!(labels, vec!["app", "web"]);
    assert_eq!(parsed["footer"]["label"], "Total (2 packages)");
}

#[test]
fn test_exclude_filter() {
    let dir = fixture();
    let (stdout, _, success) = run_repopulse(&[
        "loc",
        path_str(dir.path()),
        "--by-file",
        "--exclude",
        "**/web/**",
        "--output",
        "json",
    ]);

    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["rows"].as_array().unwrap().len(), 1);
    assert_eq!(parsed["rows"][0]["label"], "app/main.py");
}

#[test]
fn test_invalid_path() {
    let (_, stderr, success) = run_repopulse(&["/nonexistent/path/that/does/not/exist"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_churn_on_plain_directory_is_empty() {
    let dir = fixture();
    let (stdout, _, success) = run_repopulse(&[
        "churn",
        path_str(dir.path()),
        "--since",
        "2025-06-01",
        "--until",
        "2025-06-07",
        "--output",
        "json",
    ]);

    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["total"]["total"], 0);
    assert!(parsed["commits"].as_array().unwrap().is_empty());
}

#[test]
fn test_churn_rejects_reversed_range() {
    let dir = fixture();
    let (_, stderr, success) = run_repopulse(&[
        "churn",
        path_str(dir.path()),
        "--since",
        "2025-06-07",
        "--until",
        "2025-06-01",
    ]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_analyze_dry_run_completes_job() {
    let dir = fixture();
    let (stdout, _, success) = run_repopulse(&[
        "analyze",
        "--path",
        path_str(dir.path()),
        "--dry-run",
        "--workers",
        "2",
        "--output",
        "json",
    ]);

    assert!(success);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let job = &parsed["jobs"][0];
    assert_eq!(job["status"], "completed");
    assert_eq!(job["progress"], 100);
    assert_eq!(job["result"]["file_count"], 2);
    assert_eq!(job["result"]["package_count"], 2);
    assert_eq!(job["result"]["commit_hash"], "unknown");
    assert_eq!(parsed["pool"]["pool_size"], 2);
    assert_eq!(parsed["pool"]["completed"], 1);
    assert_eq!(parsed["pool"]["accepting"], false);
}

#[test]
fn test_analyze_rejects_invalid_url() {
    let (_, stderr, success) = run_repopulse(&[
        "analyze",
        "--repo-url",
        "ftp://example.com/repo",
        "--dry-run",
    ]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("invalid repository url"));
}

#[test]
fn test_analyze_requires_a_source() {
    let (_, stderr, success) = run_repopulse(&["analyze", "--dry-run"]);

    assert!(!success);
    assert!(stderr.contains("nothing to analyze"));
}

#[test]
fn test_analyze_rejects_zero_workers() {
    let dir = fixture();
    let (_, stderr, success) = run_repopulse(&[
        "analyze",
        "--path",
        path_str(dir.path()),
        "--workers",
        "0",
        "--dry-run",
    ]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}
