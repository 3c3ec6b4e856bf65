//! Build records: the persisted history of each table build step.

use crate::constraint::ConstraintResult;
use crate::feature_table::WriteMode;
use crate::schema_evolution::FieldChange;
use crate::table_name::TableName;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Final outcome of a table build step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildOutcome::Succeeded => write!(f, "succeeded"),
            BuildOutcome::Failed => write!(f, "failed"),
            BuildOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// Generate a new run identifier.
pub fn new_run_id() -> String {
    Uuid::new_v4().to_string()
}

/// An open build record, filled in while a table step runs.
///
/// Consumed by [`finalize`](Self::finalize); the resulting [`BuildRecord`]
/// has no mutating methods.
#[derive(Debug, Clone)]
pub struct BuildRecordDraft {
    run_id: String,
    table: TableName,
    started_at: DateTime<Utc>,
    write_mode: Option<WriteMode>,
    rows_written: u64,
    constraint_results: Vec<ConstraintResult>,
    schema_changes: Vec<FieldChange>,
    data_timestamp_max: Option<NaiveDateTime>,
}

impl BuildRecordDraft {
    pub fn open(run_id: &str, table: TableName) -> Self {
        Self {
            run_id: run_id.to_string(),
            table,
            started_at: Utc::now(),
            write_mode: None,
            rows_written: 0,
            constraint_results: Vec::new(),
            schema_changes: Vec::new(),
            data_timestamp_max: None,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn set_write(&mut self, mode: WriteMode, rows: u64) {
        self.write_mode = Some(mode);
        self.rows_written = rows;
    }

    pub fn set_constraint_results(&mut self, results: Vec<ConstraintResult>) {
        self.constraint_results = results;
    }

    pub fn constraint_results(&self) -> &[ConstraintResult] {
        &self.constraint_results
    }

    pub fn set_schema_changes(&mut self, changes: Vec<FieldChange>) {
        self.schema_changes = changes;
    }

    pub fn set_data_timestamp_max(&mut self, ts: Option<NaiveDateTime>) {
        self.data_timestamp_max = ts;
    }

    /// Close the record with its outcome.
    pub fn finalize(self, outcome: BuildOutcome, error: Option<String>) -> BuildRecord {
        let finished_at = Utc::now();
        let duration_ms = (finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        BuildRecord {
            run_id: self.run_id,
            table: self.table,
            started_at: self.started_at,
            finished_at,
            duration_ms,
            outcome,
            error,
            write_mode: self.write_mode,
            rows_written: self.rows_written,
            constraint_results: self.constraint_results,
            schema_changes: self.schema_changes,
            data_timestamp_max: self.data_timestamp_max,
        }
    }
}

/// A finalized build record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub run_id: String,
    pub table: TableName,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: BuildOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_mode: Option<WriteMode>,
    pub rows_written: u64,
    #[serde(default)]
    pub constraint_results: Vec<ConstraintResult>,
    #[serde(default)]
    pub schema_changes: Vec<FieldChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_timestamp_max: Option<NaiveDateTime>,
}

impl BuildRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome == BuildOutcome::Succeeded
    }
}

#[cfg(test)]
#[path = "build_record_test.rs"]
mod tests;
