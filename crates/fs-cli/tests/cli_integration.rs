//! End-to-end tests of the `fstore` binary against the sample project.

use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Path to the compiled fstore binary
fn fstore_bin() -> String {
    env!("CARGO_BIN_EXE_fstore").to_string()
}

/// Run an `fstore` command and return (stdout, stderr, exit code).
fn run_fstore(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(fstore_bin())
        .args(args)
        .env_remove("FSTORE_TARGET")
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute fstore with args {:?}: {}", args, e));
    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let dest = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &dest);
        } else {
            fs::copy(entry.path(), dest).unwrap();
        }
    }
}

/// Fresh copy of the sample project, so builds never touch the fixture.
fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    copy_dir(Path::new("tests/fixtures/sample_project"), dir.path());
    dir
}

fn project_arg(dir: &TempDir) -> String {
    dir.path().display().to_string()
}

fn parse_json(stdout: &str) -> serde_json::Value {
    serde_json::from_str(stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({}):\n{}", e, stdout))
}

fn status_of<'a>(report: &'a serde_json::Value, table: &str) -> &'a str {
    report["tables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["table"] == table)
        .unwrap_or_else(|| panic!("no result for '{}'", table))["status"]
        .as_str()
        .unwrap()
}

#[test]
fn test_ls_json_lists_tables_in_build_order() {
    let dir = sample_project();
    let (stdout, stderr, code) = run_fstore(&["ls", "-p", &project_arg(&dir), "-o", "json"]);
    assert_eq!(code, 0, "ls failed: {}", stderr);

    let tables = parse_json(&stdout);
    let names: Vec<&str> = tables
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["merchant_stats", "user_spend", "user_segments"]);

    let segments = &tables[2];
    assert_eq!(segments["reads"], "table:user_spend");
    assert_eq!(segments["upstream"], serde_json::json!(["user_spend"]));
    assert_eq!(tables[0]["write_mode"], "upsert");
}

#[test]
fn test_ls_table_output() {
    let dir = sample_project();
    let (stdout, _, code) = run_fstore(&["ls", "-p", &project_arg(&dir)]);
    assert_eq!(code, 0);
    assert!(stdout.contains("NAME"));
    assert!(stdout.contains("source:transactions"));
    assert!(stdout.contains("3 tables"));
}

#[test]
fn test_compile_prints_sql_for_every_table() {
    let dir = sample_project();
    let (stdout, stderr, code) = run_fstore(&["compile", "-p", &project_arg(&dir)]);
    assert_eq!(code, 0, "compile failed: {}", stderr);

    assert!(stdout.contains("-- merchant_stats (duckdb)"));
    assert!(stdout.contains("-- user_spend (duckdb)"));
    assert!(stdout.contains("-- user_segments (duckdb)"));
    assert!(stdout.contains("\"transactions\""));
    assert!(stdout.contains("MAX("), "aggregates keep the newest timestamp");
    assert!(
        !dir.path().join("target/features.duckdb").exists(),
        "compile must not create the storage database"
    );
}

#[test]
fn test_compile_single_table() {
    let dir = sample_project();
    let (stdout, _, code) = run_fstore(&[
        "compile",
        "-p",
        &project_arg(&dir),
        "--table",
        "user_segments",
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("-- user_segments"));
    assert!(stdout.contains("\"user_spend\""));
    assert!(!stdout.contains("-- merchant_stats"));
}

#[test]
fn test_compile_reports_broken_table_and_prints_the_rest() {
    let dir = sample_project();
    fs::write(
        dir.path().join("tables/broken.yml"),
        r#"name: broken
from: { source: transactions }
entity: { name: user, join_keys: [user_id] }
transforms:
  - { name: doubled, expr: "base * 2", dtype: float64 }
  - { name: base, expr: "amount", dtype: float64 }
"#,
    )
    .unwrap();

    let (stdout, stderr, code) = run_fstore(&["compile", "-p", &project_arg(&dir)]);
    assert_eq!(code, 1);
    assert!(stderr.contains("-- broken: [C003]"), "{}", stderr);
    assert!(stderr.contains("1 tables failed to compile"));
    assert!(stdout.contains("-- user_spend (duckdb)"));
    assert!(!stdout.contains("-- broken"));

    let (stdout, _, code) = run_fstore(&[
        "compile",
        "-p",
        &project_arg(&dir),
        "--table",
        "user_spend",
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("-- user_spend"));
}

#[test]
fn test_build_succeeds() {
    let dir = sample_project();
    let (stdout, stderr, code) = run_fstore(&["build", "-p", &project_arg(&dir)]);
    assert_eq!(code, 0, "build failed:\n{}\n{}", stdout, stderr);
    assert!(stdout.contains("3 succeeded, 0 failed, 0 skipped"), "{}", stdout);
    assert!(dir.path().join("target/features.duckdb").exists());
    assert!(dir.path().join("target/registry.duckdb").exists());
}

#[test]
fn test_build_json_report() {
    let dir = sample_project();
    let (stdout, stderr, code) = run_fstore(&["build", "-p", &project_arg(&dir), "-o", "json"]);
    assert_eq!(code, 0, "build failed: {}", stderr);

    let report = parse_json(&stdout);
    assert_eq!(report["cancelled"], false);
    for table in ["merchant_stats", "user_spend", "user_segments"] {
        assert_eq!(status_of(&report, table), "succeeded");
    }
    let spend = report["tables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["table"] == "user_spend")
        .unwrap();
    assert_eq!(spend["rows_written"], 3);
    assert_eq!(spend["write_mode"], "overwrite");
}

#[test]
fn test_build_single_table_runs_upstream_first() {
    let dir = sample_project();
    let (stdout, stderr, code) = run_fstore(&[
        "build",
        "-p",
        &project_arg(&dir),
        "-o",
        "json",
        "--table",
        "user_segments",
    ]);
    assert_eq!(code, 0, "build failed: {}", stderr);

    let report = parse_json(&stdout);
    let names: Vec<&str> = report["tables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["table"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["user_spend", "user_segments"]);
}

#[test]
fn test_build_failing_constraint_exits_with_table_failure_code() {
    let dir = sample_project();
    fs::write(
        dir.path().join("tables/big_tickets.yml"),
        r#"name: big_tickets
from: { source: transactions }
entity: { name: user, join_keys: [user_id] }
timestamp_field: event_ts
aggregates:
  - { name: largest, column: amount, function: max, le: 10 }
"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("tables/ticket_flags.yml"),
        r#"name: ticket_flags
from: { table: big_tickets }
entity: { name: user, join_keys: [user_id] }
columns:
  - name: largest
"#,
    )
    .unwrap();

    let (stdout, _, code) = run_fstore(&["build", "-p", &project_arg(&dir), "-o", "json"]);
    assert_eq!(code, 4);

    let report = parse_json(&stdout);
    assert_eq!(status_of(&report, "big_tickets"), "failed");
    assert_eq!(status_of(&report, "ticket_flags"), "skipped");
    assert_eq!(status_of(&report, "user_spend"), "succeeded");

    let failed = report["tables"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["table"] == "big_tickets")
        .unwrap();
    assert_eq!(failed["failed_in"], "validating");
    assert!(failed["reason"].as_str().unwrap().contains("largest:range"));
}

#[test]
fn test_build_skip_quality_ignores_failing_constraint() {
    let dir = sample_project();
    fs::write(
        dir.path().join("tables/big_tickets.yml"),
        r#"name: big_tickets
from: { source: transactions }
entity: { name: user, join_keys: [user_id] }
timestamp_field: event_ts
aggregates:
  - { name: largest, column: amount, function: max, le: 10 }
"#,
    )
    .unwrap();

    let (stdout, stderr, code) =
        run_fstore(&["build", "-p", &project_arg(&dir), "--skip-quality"]);
    assert_eq!(code, 0, "build failed:\n{}\n{}", stdout, stderr);
    assert!(stdout.contains("4 succeeded"));
}

#[test]
fn test_freshness_before_and_after_build() {
    let dir = sample_project();
    let (stdout, stderr, code) = run_fstore(&["freshness", "-p", &project_arg(&dir)]);
    assert_eq!(code, 0, "freshness failed: {}", stderr);
    assert!(stdout.contains("never built"));
    assert!(stdout.contains("3 never built"));

    let (_, _, code) = run_fstore(&["build", "-p", &project_arg(&dir)]);
    assert_eq!(code, 0);

    let (stdout, _, code) = run_fstore(&["freshness", "-p", &project_arg(&dir), "-o", "json"]);
    assert_eq!(code, 0);
    let report = parse_json(&stdout);
    let tables = report["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 3);
    assert!(tables.iter().all(|t| t["last_build_at"].is_string()), "{}", stdout);
}

#[test]
fn test_missing_project_exits_with_error() {
    let (_, stderr, code) = run_fstore(&["ls", "-p", "/nonexistent/featherstore/project"]);
    assert_eq!(code, 1);
    assert!(stderr.contains("Failed to load project"), "{}", stderr);
}
