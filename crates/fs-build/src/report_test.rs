use super::*;

fn name(s: &str) -> TableName {
    TableName::try_new(s).unwrap()
}

fn succeeded(table: &str, rows: u64) -> TableResult {
    let mut r = TableResult::blank(
        name(table),
        TableStatus::Succeeded,
        vec![TableState::Pending, TableState::Succeeded],
    );
    r.write_mode = Some(WriteMode::Overwrite);
    r.rows_written = rows;
    r.duration_ms = 12;
    r
}

fn report(tables: Vec<TableResult>) -> RunReport {
    let now = Utc::now();
    RunReport {
        run_id: "run-1".into(),
        started_at: now,
        finished_at: now,
        elapsed_ms: 1500,
        tables,
        cancelled: false,
        aborted: None,
    }
}

#[test]
fn test_all_succeeded_exits_zero() {
    let r = report(vec![succeeded("a", 3), succeeded("b", 1)]);
    assert!(r.is_success());
    assert_eq!(r.exit_code(), 0);
    assert_eq!(r.succeeded_count(), 2);
    assert!(r.unsuccessful().is_empty());
}

#[test]
fn test_failure_and_skip_exit_nonzero() {
    let mut failed = TableResult::blank(
        name("b"),
        TableStatus::Failed,
        vec![TableState::Pending, TableState::Compiling, TableState::Executing, TableState::Failed],
    );
    failed.failed_in = Some(TableState::Executing);
    failed.reason = Some("[D002] SQL execution failed: boom".into());
    let mut skipped = TableResult::blank(
        name("c"),
        TableStatus::Skipped,
        vec![TableState::Pending, TableState::Skipped],
    );
    skipped.upstream = Some(name("b"));

    let r = report(vec![succeeded("a", 3), failed, skipped]);
    assert!(!r.is_success());
    assert_eq!(r.exit_code(), EXIT_TABLE_FAILURES);
    assert_eq!(r.failed_count(), 1);
    assert_eq!(r.skipped_count(), 1);

    let text = r.render_text();
    assert!(text.contains("  \u{2713} a (overwrite, 3 rows) [12ms]"), "{text}");
    assert!(
        text.contains("  \u{2717} b (executing) - [D002] SQL execution failed: boom"),
        "{text}"
    );
    assert!(text.contains("  - c (skipped: b failed)"), "{text}");
    assert!(text.contains("1 succeeded, 1 failed, 1 skipped"), "{text}");
}

#[test]
fn test_cancelled_run_is_not_success() {
    let mut r = report(vec![succeeded("a", 1), TableResult::not_run(name("b"))]);
    r.cancelled = true;
    assert_eq!(r.exit_code(), EXIT_TABLE_FAILURES);
    let text = r.render_text();
    assert!(text.contains("Run cancelled."));
    assert!(text.contains("1 not run"));
}

#[test]
fn test_warnings_are_counted() {
    let mut a = succeeded("a", 1);
    a.warnings.push("sla:min_row_count: expected >= 10 rows, got 1 rows".into());
    let r = report(vec![a]);
    assert!(r.is_success());
    assert_eq!(r.warning_count(), 1);
    assert!(r.render_text().contains("(1 warnings)"));
}

#[test]
fn test_json_shape() {
    let r = report(vec![succeeded("a", 2), TableResult::not_run(name("b"))]);
    let value: serde_json::Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();
    assert_eq!(value["run_id"], "run-1");
    assert_eq!(value["tables"][0]["status"], "succeeded");
    assert_eq!(value["tables"][0]["write_mode"], "overwrite");
    assert_eq!(value["tables"][1]["status"], "not_run");
    assert_eq!(value["tables"][1]["states"][0], "pending");
    assert!(value["tables"][1].get("reason").is_none());
}
