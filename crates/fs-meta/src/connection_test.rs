//! Tests for MetaDb connection, migration, DDL and transactions.

use crate::MetaDb;

fn count(db: &MetaDb, sql: &str) -> i64 {
    db.with_conn(|conn| Ok(conn.query_row(sql, [], |row| row.get::<_, i64>(0))?))
        .unwrap()
}

#[test]
fn open_memory_applies_all_migrations() {
    let db = MetaDb::open_memory().unwrap();
    let version = db
        .with_conn(crate::migration::current_version)
        .unwrap();
    assert_eq!(version as usize, crate::ddl::MIGRATIONS.len());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM fs_meta.build_records"), 0);
    assert_eq!(count(&db, "SELECT COUNT(*) FROM fs_meta.schema_snapshots"), 0);
}

#[test]
fn open_file_creates_database_and_parents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("target").join("registry.duckdb");
    assert!(!path.exists());
    let _db = MetaDb::open(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn open_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.duckdb");
    {
        let _db = MetaDb::open(&path).unwrap();
    }
    let db = MetaDb::open(&path).unwrap();
    assert_eq!(
        count(&db, "SELECT COUNT(*) FROM fs_meta.schema_version"),
        crate::ddl::MIGRATIONS.len() as i64
    );
}

#[test]
fn outcome_check_constraint_rejects_unknown_values() {
    let db = MetaDb::open_memory().unwrap();
    let result = db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO fs_meta.build_records (run_id, table_name, started_at, finished_at, duration_ms, outcome)
             VALUES ('r', 't', now(), now(), 0, 'exploded')",
            [],
        )?;
        Ok(())
    });
    assert!(result.is_err());
}

#[test]
fn transaction_commits_on_ok() {
    let db = MetaDb::open_memory().unwrap();
    db.transaction(|conn| {
        conn.execute(
            "INSERT INTO fs_meta.schema_snapshots (table_name, run_id, fields) VALUES ('t', 'r', '{}')",
            [],
        )?;
        Ok(())
    })
    .unwrap();
    assert_eq!(count(&db, "SELECT COUNT(*) FROM fs_meta.schema_snapshots"), 1);
}

#[test]
fn transaction_rolls_back_on_err() {
    let db = MetaDb::open_memory().unwrap();
    let result: crate::MetaResult<()> = db.transaction(|conn| {
        conn.execute(
            "INSERT INTO fs_meta.schema_snapshots (table_name, run_id, fields) VALUES ('t', 'r', '{}')",
            [],
        )?;
        Err(crate::MetaError::InvalidRecord("abort".into()))
    });
    assert!(result.is_err());
    assert_eq!(count(&db, "SELECT COUNT(*) FROM fs_meta.schema_snapshots"), 0);
}
