use super::*;
use crate::constraint::{ConstraintTag, ConstraintTarget, Severity};

fn table(name: &str) -> TableName {
    TableName::try_new(name).unwrap()
}

#[test]
fn test_draft_finalize_carries_fields() {
    let run_id = new_run_id();
    let mut draft = BuildRecordDraft::open(&run_id, table("user_spend"));
    draft.set_write(WriteMode::Overwrite, 42);
    draft.set_constraint_results(vec![ConstraintResult {
        id: "a:not_null".into(),
        tag: ConstraintTag::NotNull,
        target: ConstraintTarget::Column("a".into()),
        passed: true,
        severity: Severity::Error,
        expected: "no nulls".into(),
        actual: "0 nulls".into(),
        rows_checked: 42,
        diagnostic: None,
    }]);
    let started = draft.started_at();

    let record = draft.finalize(BuildOutcome::Succeeded, None);
    assert_eq!(record.run_id, run_id);
    assert_eq!(record.table, "user_spend");
    assert_eq!(record.started_at, started);
    assert!(record.finished_at >= record.started_at);
    assert_eq!(record.rows_written, 42);
    assert_eq!(record.write_mode, Some(WriteMode::Overwrite));
    assert_eq!(record.constraint_results.len(), 1);
    assert!(record.succeeded());
}

#[test]
fn test_failed_record_keeps_error() {
    let draft = BuildRecordDraft::open("run", table("t"));
    let record = draft.finalize(BuildOutcome::Failed, Some("boom".into()));
    assert_eq!(record.outcome, BuildOutcome::Failed);
    assert_eq!(record.error.as_deref(), Some("boom"));
    assert_eq!(record.write_mode, None);
    assert!(!record.succeeded());
}

#[test]
fn test_record_json_roundtrip() {
    let record = BuildRecordDraft::open("run", table("t")).finalize(BuildOutcome::Skipped, None);
    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("\"outcome\":\"skipped\""));
    let back: BuildRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn test_run_ids_are_unique() {
    assert_ne!(new_run_id(), new_run_id());
}
