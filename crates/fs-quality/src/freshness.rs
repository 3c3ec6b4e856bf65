//! Freshness monitoring: build and data staleness against table SLAs.

use crate::checks::format_age;
use chrono::{DateTime, NaiveDateTime, Utc};
use fs_core::{BuildRecord, FeatureTableDefinition, Interval, Severity, TableName};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Freshness verdict of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FreshnessStatus {
    Fresh,
    Warn,
    Error,
    /// Never built successfully
    Unknown,
}

impl FreshnessStatus {
    fn from_severity(severity: Severity) -> Self {
        match severity {
            Severity::Warn => FreshnessStatus::Warn,
            Severity::Error => FreshnessStatus::Error,
        }
    }
}

impl fmt::Display for FreshnessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreshnessStatus::Fresh => write!(f, "fresh"),
            FreshnessStatus::Warn => write!(f, "warn"),
            FreshnessStatus::Error => write!(f, "error"),
            FreshnessStatus::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableFreshness {
    pub table: TableName,
    pub last_build_at: Option<DateTime<Utc>>,
    pub data_timestamp_max: Option<NaiveDateTime>,
    /// Seconds since the last build finished
    pub build_staleness_secs: Option<i64>,
    /// Seconds since the newest data point
    pub data_staleness_secs: Option<i64>,
    pub max_staleness: Option<Interval>,
    pub rows_written: Option<u64>,
    pub min_row_count: Option<u64>,
    pub status: FreshnessStatus,
    pub severity: Severity,
}

impl TableFreshness {
    /// Human-readable staleness, the larger of build and data staleness.
    pub fn age(&self) -> Option<String> {
        let secs = self
            .build_staleness_secs
            .into_iter()
            .chain(self.data_staleness_secs)
            .max()?;
        Some(format_age(chrono::Duration::seconds(secs)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FreshnessReport {
    pub tables: Vec<TableFreshness>,
    /// Some table violates its SLA
    pub has_stale: bool,
    /// Some table has never been built
    pub has_unknown: bool,
}

impl FreshnessReport {
    /// True if any table is stale at error severity.
    pub fn has_errors(&self) -> bool {
        self.tables
            .iter()
            .any(|t| t.status == FreshnessStatus::Error)
    }
}

/// Compare each table's latest successful build with its SLA.
///
/// Staleness is the larger of time since the build finished and time since
/// the newest data timestamp recorded by that build. A table with no record
/// is `unknown`; a table without an SLA is `fresh` once built.
pub fn check_freshness<'a>(
    tables: impl IntoIterator<Item = &'a FeatureTableDefinition>,
    latest: &HashMap<TableName, BuildRecord>,
    now: DateTime<Utc>,
) -> FreshnessReport {
    let mut report = FreshnessReport::default();

    for table in tables {
        let sla = table.sla.as_ref();
        let max_staleness = sla.and_then(|s| s.max_staleness);
        let min_row_count = sla.and_then(|s| s.min_row_count);
        let severity = sla.map(|s| s.severity).unwrap_or(Severity::Warn);

        let Some(record) = latest.get(&table.name) else {
            report.has_unknown = true;
            report.tables.push(TableFreshness {
                table: table.name.clone(),
                last_build_at: None,
                data_timestamp_max: None,
                build_staleness_secs: None,
                data_staleness_secs: None,
                max_staleness,
                rows_written: None,
                min_row_count,
                status: FreshnessStatus::Unknown,
                severity,
            });
            continue;
        };

        let build_staleness = now - record.finished_at;
        let data_staleness = record
            .data_timestamp_max
            .map(|ts| now - ts.and_utc());

        let mut status = FreshnessStatus::Fresh;
        if let Some(max) = max_staleness {
            let effective = data_staleness
                .filter(|d| *d > build_staleness)
                .unwrap_or(build_staleness);
            if effective > max.to_chrono() {
                status = FreshnessStatus::from_severity(severity);
            }
        }
        if let Some(min) = min_row_count {
            if record.rows_written < min && status == FreshnessStatus::Fresh {
                status = FreshnessStatus::from_severity(severity);
            }
        }
        if status != FreshnessStatus::Fresh {
            report.has_stale = true;
        }

        report.tables.push(TableFreshness {
            table: table.name.clone(),
            last_build_at: Some(record.finished_at),
            data_timestamp_max: record.data_timestamp_max,
            build_staleness_secs: Some(build_staleness.num_seconds()),
            data_staleness_secs: data_staleness.map(|d| d.num_seconds()),
            max_staleness,
            rows_written: Some(record.rows_written),
            min_row_count,
            status,
            severity,
        });
    }

    report
}

#[cfg(test)]
#[path = "freshness_test.rs"]
mod tests;
