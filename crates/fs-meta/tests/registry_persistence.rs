//! The registry keeps build history across process restarts.

use fs_core::{
    BuildOutcome, BuildRecordDraft, LogicalType, SchemaSnapshot, TableName, WriteMode,
};
use fs_meta::{MetaDb, Registry};

#[test]
fn history_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target").join("registry.duckdb");
    let table = TableName::try_new("user_spend").unwrap();
    let schema = SchemaSnapshot::from_pairs([
        ("user_id", LogicalType::Int64),
        ("spend_90d", LogicalType::Float64),
    ]);

    {
        let registry = MetaDb::open(&path).unwrap();
        let mut draft = BuildRecordDraft::open("run-1", table.clone());
        draft.set_write(WriteMode::Overwrite, 3);
        let record = draft.finalize(BuildOutcome::Succeeded, None);
        registry.record_build(&record).unwrap();
        registry.save_schema(&table, "run-1", &schema).unwrap();
    }

    let registry = MetaDb::open(&path).unwrap();
    let latest = registry.latest_records().unwrap();
    let record = &latest[&table];
    assert_eq!(record.run_id, "run-1");
    assert_eq!(record.rows_written, 3);
    assert_eq!(record.write_mode, Some(WriteMode::Overwrite));
    assert!(record.succeeded());
    assert_eq!(registry.latest_schema(&table).unwrap(), Some(schema));
}

#[test]
fn registry_is_usable_as_trait_object() {
    let registry: Box<dyn Registry> = Box::new(MetaDb::open_memory().unwrap());
    let table = TableName::try_new("t").unwrap();
    assert!(registry.latest_schema(&table).unwrap().is_none());
}
