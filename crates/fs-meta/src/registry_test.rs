use super::*;
use chrono::{DateTime, NaiveDate, Utc};
use fs_core::{
    BuildOutcome, ConstraintResult, ConstraintTag, ConstraintTarget, Diagnostic, FieldChange,
    FieldChangeKind, LogicalType, Severity, WriteMode,
};

fn table(name: &str) -> TableName {
    TableName::try_new(name).unwrap()
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_micro_opt(hour, 0, 0, 250)
        .unwrap()
        .and_utc()
}

fn record(run_id: &str, name: &str, outcome: BuildOutcome, day: u32) -> BuildRecord {
    BuildRecord {
        run_id: run_id.to_string(),
        table: table(name),
        started_at: at(day, 1),
        finished_at: at(day, 2),
        duration_ms: 3_600_000,
        outcome,
        error: (outcome == BuildOutcome::Failed).then(|| "[D002] SQL execution failed".to_string()),
        write_mode: (outcome == BuildOutcome::Succeeded).then_some(WriteMode::Overwrite),
        rows_written: if outcome == BuildOutcome::Succeeded { 10 } else { 0 },
        constraint_results: Vec::new(),
        schema_changes: Vec::new(),
        data_timestamp_max: None,
    }
}

fn schema(pairs: &[(&str, LogicalType)]) -> SchemaSnapshot {
    SchemaSnapshot::from_pairs(pairs.iter().copied())
}

#[test]
fn record_build_round_trips_all_fields() {
    let db = MetaDb::open_memory().unwrap();
    let mut rec = record("run-1", "user_spend", BuildOutcome::Succeeded, 3);
    rec.data_timestamp_max = Some(at(2, 23).naive_utc());
    rec.schema_changes = vec![FieldChange {
        name: "amount".into(),
        kind: FieldChangeKind::Widened,
        old_type: Some(LogicalType::Int32),
        new_type: Some(LogicalType::Int64),
    }];
    rec.constraint_results = vec![
        ConstraintResult {
            id: "amount:not_null".into(),
            tag: ConstraintTag::NotNull,
            target: ConstraintTarget::Column("amount".into()),
            passed: true,
            severity: Severity::Error,
            expected: "no nulls".into(),
            actual: "0 nulls (0.0%)".into(),
            rows_checked: 10,
            diagnostic: None,
        },
        ConstraintResult {
            id: "sla:min_row_count".into(),
            tag: ConstraintTag::MinRowCount,
            target: ConstraintTarget::Table,
            passed: false,
            severity: Severity::Warn,
            expected: ">= 100 rows".into(),
            actual: "10 rows".into(),
            rows_checked: 10,
            diagnostic: Some(Diagnostic {
                failing_rows: 0,
                sample_values: vec![],
            }),
        },
    ];

    db.record_build(&rec).unwrap();

    let latest = db.latest_records().unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[&table("user_spend")], rec);
}

#[test]
fn latest_records_ignore_failures_and_pick_newest() {
    let db = MetaDb::open_memory().unwrap();
    db.record_build(&record("run-1", "a", BuildOutcome::Succeeded, 1))
        .unwrap();
    db.record_build(&record("run-2", "a", BuildOutcome::Succeeded, 2))
        .unwrap();
    db.record_build(&record("run-3", "a", BuildOutcome::Failed, 3))
        .unwrap();
    db.record_build(&record("run-3", "b", BuildOutcome::Skipped, 3))
        .unwrap();

    let latest = db.latest_records().unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[&table("a")].run_id, "run-2");
    assert!(!latest.contains_key(&table("b")));
}

#[test]
fn duplicate_record_for_same_run_and_table_is_rejected() {
    let db = MetaDb::open_memory().unwrap();
    let rec = record("run-1", "a", BuildOutcome::Succeeded, 1);
    db.record_build(&rec).unwrap();
    assert!(db.record_build(&rec).is_err());
}

#[test]
fn history_and_run_queries() {
    let db = MetaDb::open_memory().unwrap();
    db.record_build(&record("run-1", "a", BuildOutcome::Succeeded, 1))
        .unwrap();
    db.record_build(&record("run-2", "a", BuildOutcome::Failed, 2))
        .unwrap();
    db.record_build(&record("run-2", "b", BuildOutcome::Skipped, 2))
        .unwrap();

    let history = db
        .with_conn(|conn| crate::query::table_history(conn, &table("a"), 10))
        .unwrap();
    let runs: Vec<&str> = history.iter().map(|r| r.run_id.as_str()).collect();
    assert_eq!(runs, vec!["run-2", "run-1"]);
    assert_eq!(history[0].error.as_deref(), Some("[D002] SQL execution failed"));

    let run = db
        .with_conn(|conn| crate::query::run_records(conn, "run-2"))
        .unwrap();
    let tables: Vec<&str> = run.iter().map(|r| r.table.as_str()).collect();
    assert_eq!(tables, vec!["a", "b"]);
}

#[test]
fn latest_schema_is_none_before_first_build() {
    let db = MetaDb::open_memory().unwrap();
    assert_eq!(db.latest_schema(&table("a")).unwrap(), None);
}

#[test]
fn latest_schema_returns_most_recent_snapshot() {
    let db = MetaDb::open_memory().unwrap();
    let v1 = schema(&[("user_id", LogicalType::Int64), ("spend", LogicalType::Int32)]);
    let v2 = schema(&[("user_id", LogicalType::Int64), ("spend", LogicalType::Float64)]);
    db.save_schema(&table("a"), "run-1", &v1).unwrap();
    db.save_schema(&table("a"), "run-2", &v2).unwrap();
    db.save_schema(&table("b"), "run-2", &v1).unwrap();

    assert_eq!(db.latest_schema(&table("a")).unwrap(), Some(v2));
    assert_eq!(db.latest_schema(&table("b")).unwrap(), Some(v1));
}

#[test]
fn null_registry_remembers_nothing() {
    let registry = NullRegistry;
    registry
        .record_build(&record("run-1", "a", BuildOutcome::Succeeded, 1))
        .unwrap();
    registry
        .save_schema(&table("a"), "run-1", &schema(&[("x", LogicalType::Bool)]))
        .unwrap();
    assert!(registry.latest_schema(&table("a")).unwrap().is_none());
    assert!(registry.latest_records().unwrap().is_empty());
}
