//! Read build history back out of the registry.

use crate::error::{MetaError, MetaResult, MetaResultExt};
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::Connection;
use fs_core::{BuildRecord, ConstraintResult, FieldChange, SchemaSnapshot, TableName};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

const RECORD_COLUMNS: &str = "record_id, run_id, table_name, epoch_us(started_at), epoch_us(finished_at), duration_ms, outcome, error, write_mode, rows_written, epoch_us(data_timestamp_max), schema_changes";

/// Decode a unit enum from its serde string form.
fn parse_enum<T: DeserializeOwned>(value: &str) -> MetaResult<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|e| MetaError::InvalidRecord(format!("'{value}': {e}")))
}

fn utc_from_micros(micros: i64) -> MetaResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| MetaError::InvalidRecord(format!("timestamp out of range: {micros}")))
}

fn naive_from_micros(micros: i64) -> MetaResult<NaiveDateTime> {
    utc_from_micros(micros).map(|ts| ts.naive_utc())
}

/// A `build_records` row before decoding.
struct RecordRow {
    record_id: i64,
    run_id: String,
    table_name: String,
    started_at: i64,
    finished_at: i64,
    duration_ms: u64,
    outcome: String,
    error: Option<String>,
    write_mode: Option<String>,
    rows_written: u64,
    data_timestamp_max: Option<i64>,
    schema_changes: String,
}

impl RecordRow {
    fn from_row(row: &duckdb::Row<'_>) -> duckdb::Result<Self> {
        Ok(Self {
            record_id: row.get(0)?,
            run_id: row.get(1)?,
            table_name: row.get(2)?,
            started_at: row.get(3)?,
            finished_at: row.get(4)?,
            duration_ms: row.get(5)?,
            outcome: row.get(6)?,
            error: row.get(7)?,
            write_mode: row.get(8)?,
            rows_written: row.get(9)?,
            data_timestamp_max: row.get(10)?,
            schema_changes: row.get(11)?,
        })
    }

    fn into_record(self, constraint_results: Vec<ConstraintResult>) -> MetaResult<BuildRecord> {
        let schema_changes: Vec<FieldChange> = serde_json::from_str(&self.schema_changes)?;
        Ok(BuildRecord {
            run_id: self.run_id,
            table: TableName::try_new(self.table_name)
                .map_err(|e| MetaError::InvalidRecord(e.to_string()))?,
            started_at: utc_from_micros(self.started_at)?,
            finished_at: utc_from_micros(self.finished_at)?,
            duration_ms: self.duration_ms,
            outcome: parse_enum(&self.outcome)?,
            error: self.error,
            write_mode: self.write_mode.as_deref().map(parse_enum).transpose()?,
            rows_written: self.rows_written,
            constraint_results,
            schema_changes,
            data_timestamp_max: self.data_timestamp_max.map(naive_from_micros).transpose()?,
        })
    }
}

fn constraint_results(conn: &Connection, record_id: i64) -> MetaResult<Vec<ConstraintResult>> {
    let mut stmt = conn
        .prepare("SELECT payload FROM fs_meta.constraint_results WHERE record_id = ? ORDER BY ordinal")
        .query_context("prepare constraint_results")?;
    let payloads: Vec<String> = stmt
        .query_map(duckdb::params![record_id], |row| row.get(0))
        .query_context("query constraint_results")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("read constraint_results")?;
    payloads
        .iter()
        .map(|p| serde_json::from_str(p).map_err(MetaError::from))
        .collect()
}

fn load_records(
    conn: &Connection,
    sql: &str,
    params: &[&dyn duckdb::ToSql],
) -> MetaResult<Vec<BuildRecord>> {
    let mut stmt = conn.prepare(sql).query_context("prepare build_records")?;
    let rows: Vec<RecordRow> = stmt
        .query_map(params, RecordRow::from_row)
        .query_context("query build_records")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("read build_records")?;
    rows.into_iter()
        .map(|row| {
            let results = constraint_results(conn, row.record_id)?;
            row.into_record(results)
        })
        .collect()
}

/// The most recent successful build record of every table.
pub fn latest_successful_records(conn: &Connection) -> MetaResult<HashMap<TableName, BuildRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM fs_meta.build_records
         WHERE outcome = 'succeeded'
         QUALIFY row_number() OVER (PARTITION BY table_name ORDER BY finished_at DESC, record_id DESC) = 1"
    );
    let records = load_records(conn, &sql, &[])?;
    Ok(records
        .into_iter()
        .map(|r| (r.table.clone(), r))
        .collect())
}

/// Build records of one table, newest first.
pub fn table_history(
    conn: &Connection,
    table: &TableName,
    limit: usize,
) -> MetaResult<Vec<BuildRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM fs_meta.build_records
         WHERE table_name = ?
         ORDER BY finished_at DESC, record_id DESC
         LIMIT {limit}"
    );
    load_records(conn, &sql, &[&table.as_str()])
}

/// All build records of one run, in the order they were recorded.
pub fn run_records(conn: &Connection, run_id: &str) -> MetaResult<Vec<BuildRecord>> {
    let sql = format!(
        "SELECT {RECORD_COLUMNS} FROM fs_meta.build_records WHERE run_id = ? ORDER BY record_id"
    );
    load_records(conn, &sql, &[&run_id])
}

/// The schema stored by the most recent build of `table`.
pub fn latest_schema(conn: &Connection, table: &TableName) -> MetaResult<Option<SchemaSnapshot>> {
    let mut stmt = conn
        .prepare(
            "SELECT fields FROM fs_meta.schema_snapshots WHERE table_name = ? ORDER BY snapshot_id DESC LIMIT 1",
        )
        .query_context("prepare schema_snapshots")?;
    let rows: Vec<String> = stmt
        .query_map(duckdb::params![table.as_str()], |row| row.get(0))
        .query_context("query schema_snapshots")?
        .collect::<Result<Vec<_>, _>>()
        .query_context("read schema_snapshots")?;
    rows.first()
        .map(|fields| serde_json::from_str(fields).map_err(MetaError::from))
        .transpose()
}
