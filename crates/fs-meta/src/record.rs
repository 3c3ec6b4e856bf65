//! Write build history: build records, their constraint results, and schema
//! snapshots.

use crate::error::{MetaResult, MetaResultExt};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;
use fs_core::{BuildRecord, SchemaSnapshot, TableName};
use serde::Serialize;

/// Encode a unit enum as its serde string form (`succeeded`, `warn`, ...).
pub(crate) fn enum_str<T: Serialize>(value: &T) -> MetaResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

fn micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

fn naive_micros(ts: NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

/// Insert a finalized build record and its constraint results.
///
/// Returns the generated `record_id`. Call inside a transaction so a record
/// is never stored without its results.
pub fn insert_build_record(conn: &Connection, record: &BuildRecord) -> MetaResult<i64> {
    let write_mode = record.write_mode.as_ref().map(enum_str).transpose()?;
    let schema_changes = serde_json::to_string(&record.schema_changes)?;

    let record_id: i64 = conn
        .query_row(
            "INSERT INTO fs_meta.build_records (run_id, table_name, started_at, finished_at, duration_ms, outcome, error, write_mode, rows_written, data_timestamp_max, schema_changes)
             VALUES (?, ?, make_timestamp(CAST(? AS BIGINT)), make_timestamp(CAST(? AS BIGINT)), ?, ?, ?, ?, ?, make_timestamp(CAST(? AS BIGINT)), ?)
             RETURNING record_id",
            duckdb::params![
                record.run_id,
                record.table.as_str(),
                micros(record.started_at),
                micros(record.finished_at),
                record.duration_ms,
                enum_str(&record.outcome)?,
                record.error,
                write_mode,
                record.rows_written,
                record.data_timestamp_max.map(naive_micros),
                schema_changes,
            ],
            |row| row.get(0),
        )
        .query_context("insert build_records")?;

    for (ordinal, result) in record.constraint_results.iter().enumerate() {
        conn.execute(
            "INSERT INTO fs_meta.constraint_results (record_id, ordinal, constraint_id, tag, passed, severity, payload) VALUES (?, ?, ?, ?, ?, ?, ?)",
            duckdb::params![
                record_id,
                ordinal as i64,
                result.id,
                result.tag.as_str(),
                result.passed,
                enum_str(&result.severity)?,
                serde_json::to_string(result)?,
            ],
        )
        .query_context("insert constraint_results")?;
    }

    log::debug!(
        "Recorded build of '{}' (run {}, {}, {} constraint results)",
        record.table,
        record.run_id,
        record.outcome,
        record.constraint_results.len()
    );
    Ok(record_id)
}

/// Store the output schema produced by a build.
pub fn insert_schema_snapshot(
    conn: &Connection,
    table: &TableName,
    run_id: &str,
    schema: &SchemaSnapshot,
) -> MetaResult<()> {
    let fields = serde_json::to_string(schema)?;
    conn.execute(
        "INSERT INTO fs_meta.schema_snapshots (table_name, run_id, fields) VALUES (?, ?, ?)",
        duckdb::params![table.as_str(), run_id, fields],
    )
    .query_context("insert schema_snapshots")?;
    Ok(())
}
