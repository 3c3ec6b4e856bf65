//! Run results: per-table outcomes, counts, exit code, text and JSON output.

use crate::state::TableState;
use chrono::{DateTime, Utc};
use fs_core::{ConstraintResult, FieldChange, TableName, WriteMode};
use serde::Serialize;
use std::fmt::Write as _;

/// Process exit status when any table did not succeed.
pub const EXIT_TABLE_FAILURES: i32 = 4;

/// User-visible outcome of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
    Succeeded,
    Failed,
    Skipped,
    /// Not started because the run was cancelled or aborted
    NotRun,
}

impl std::fmt::Display for TableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableStatus::Succeeded => write!(f, "succeeded"),
            TableStatus::Failed => write!(f, "failed"),
            TableStatus::Skipped => write!(f, "skipped"),
            TableStatus::NotRun => write!(f, "not_run"),
        }
    }
}

/// Result of one table in a run.
#[derive(Debug, Clone, Serialize)]
pub struct TableResult {
    pub table: TableName,
    pub status: TableStatus,
    /// States visited, starting with `pending`
    pub states: Vec<TableState>,
    /// State the table was in when it failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_in: Option<TableState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Failed upstream table that caused a skip
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream: Option<TableName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_mode: Option<WriteMode>,
    pub rows_written: u64,
    pub duration_ms: u64,
    /// Quality warnings and persistence warnings
    pub warnings: Vec<String>,
    pub constraint_results: Vec<ConstraintResult>,
    pub schema_changes: Vec<FieldChange>,
}

impl TableResult {
    /// Result for a table that never left `pending`.
    pub fn not_run(table: TableName) -> Self {
        Self::blank(table, TableStatus::NotRun, vec![TableState::Pending])
    }

    pub(crate) fn blank(table: TableName, status: TableStatus, states: Vec<TableState>) -> Self {
        Self {
            table,
            status,
            states,
            failed_in: None,
            reason: None,
            upstream: None,
            write_mode: None,
            rows_written: 0,
            duration_ms: 0,
            warnings: Vec::new(),
            constraint_results: Vec::new(),
            schema_changes: Vec::new(),
        }
    }

    /// Final state reached.
    pub fn final_state(&self) -> TableState {
        self.states.last().copied().unwrap_or(TableState::Pending)
    }

    /// One progress line, e.g. `  ✓ user_spend (overwrite, 120 rows) [35ms]`.
    pub fn summary_line(&self) -> String {
        match self.status {
            TableStatus::Succeeded => {
                let mode = self
                    .write_mode
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let mut line = format!(
                    "  \u{2713} {} ({}, {} rows) [{}ms]",
                    self.table, mode, self.rows_written, self.duration_ms
                );
                if !self.warnings.is_empty() {
                    let _ = write!(line, " ({} warnings)", self.warnings.len());
                }
                line
            }
            TableStatus::Failed => format!(
                "  \u{2717} {} ({}) - {} [{}ms]",
                self.table,
                self.failed_in.unwrap_or(TableState::Pending),
                self.reason.as_deref().unwrap_or("unknown error"),
                self.duration_ms
            ),
            TableStatus::Skipped => match &self.upstream {
                Some(upstream) => format!(
                    "  - {} (skipped: {} failed)",
                    self.table, upstream
                ),
                None => format!("  - {} (skipped)", self.table),
            },
            TableStatus::NotRun => format!("  - {} (not run)", self.table),
        }
    }
}

/// Outcome of a whole build run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub tables: Vec<TableResult>,
    /// Stopped by a cancellation request
    pub cancelled: bool,
    /// Reason the run stopped early after an engine failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl RunReport {
    fn count(&self, status: TableStatus) -> usize {
        self.tables.iter().filter(|t| t.status == status).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.count(TableStatus::Succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.count(TableStatus::Failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(TableStatus::Skipped)
    }

    pub fn not_run_count(&self) -> usize {
        self.count(TableStatus::NotRun)
    }

    pub fn warning_count(&self) -> usize {
        self.tables.iter().map(|t| t.warnings.len()).sum()
    }

    pub fn table(&self, name: &str) -> Option<&TableResult> {
        self.tables.iter().find(|t| t.table == name)
    }

    /// True only when every selected table succeeded.
    pub fn is_success(&self) -> bool {
        !self.cancelled
            && self.aborted.is_none()
            && self.tables.iter().all(|t| t.status == TableStatus::Succeeded)
    }

    /// 0 on success, [`EXIT_TABLE_FAILURES`] otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            EXIT_TABLE_FAILURES
        }
    }

    /// Tables that failed or were skipped, in build order.
    pub fn unsuccessful(&self) -> Vec<&TableResult> {
        self.tables
            .iter()
            .filter(|t| matches!(t.status, TableStatus::Failed | TableStatus::Skipped))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report: one line per table, then totals.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for table in &self.tables {
            let _ = writeln!(out, "{}", table.summary_line());
        }
        out.push_str(&self.summary());
        out
    }

    /// Totals, preceded by cancellation or abort notices.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if self.cancelled {
            let _ = writeln!(out, "\nRun cancelled.");
        }
        if let Some(reason) = &self.aborted {
            let _ = writeln!(out, "\nRun aborted: {}", reason);
        }
        let _ = write!(
            out,
            "\nCompleted in {:.2}s: {} succeeded, {} failed, {} skipped",
            self.elapsed_ms as f64 / 1000.0,
            self.succeeded_count(),
            self.failed_count(),
            self.skipped_count()
        );
        if self.not_run_count() > 0 {
            let _ = write!(out, ", {} not run", self.not_run_count());
        }
        let warnings = self.warning_count();
        if warnings > 0 {
            let _ = write!(out, " ({} warnings)", warnings);
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
