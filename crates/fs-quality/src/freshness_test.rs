use super::*;
use chrono::TimeZone;
use fs_core::{BuildOutcome, BuildRecordDraft};

fn table(yaml_sla: &str) -> FeatureTableDefinition {
    let yaml = format!(
        "name: t\nfrom: {{ source: s }}\nentity: {{ name: e, join_keys: [id] }}\ntimestamp_field: ts\n{}",
        yaml_sla
    );
    serde_yaml::from_str(&yaml).unwrap()
}

fn record(rows: u64, data_ts: Option<NaiveDateTime>) -> BuildRecord {
    let mut draft = BuildRecordDraft::open("run", TableName::try_new("t").unwrap());
    draft.set_write(fs_core::WriteMode::Overwrite, rows);
    draft.set_data_timestamp_max(data_ts);
    draft.finalize(BuildOutcome::Succeeded, None)
}

fn records(record: BuildRecord) -> HashMap<TableName, BuildRecord> {
    HashMap::from([(record.table.clone(), record)])
}

#[test]
fn test_never_built_is_unknown() {
    let def = table("");
    let report = check_freshness([&def], &HashMap::new(), Utc::now());
    assert!(report.has_unknown);
    assert!(!report.has_stale);
    assert_eq!(report.tables[0].status, FreshnessStatus::Unknown);
    assert!(report.tables[0].age().is_none());
}

#[test]
fn test_no_sla_is_fresh() {
    let def = table("");
    let report = check_freshness([&def], &records(record(5, None)), Utc::now());
    assert_eq!(report.tables[0].status, FreshnessStatus::Fresh);
    assert!(!report.has_stale);
}

#[test]
fn test_stale_data_uses_sla_severity() {
    let def = table("sla: { max_staleness: 6h, severity: error }");
    let old_data = Utc
        .with_ymd_and_hms(2020, 1, 1, 0, 0, 0)
        .unwrap()
        .naive_utc();
    let report = check_freshness([&def], &records(record(5, Some(old_data))), Utc::now());
    assert_eq!(report.tables[0].status, FreshnessStatus::Error);
    assert!(report.has_stale);
    assert!(report.has_errors());
}

#[test]
fn test_recent_build_and_data_are_fresh() {
    let def = table("sla: { max_staleness: 6h }");
    let now = Utc::now();
    let data_ts = (now - chrono::Duration::hours(1)).naive_utc();
    let report = check_freshness([&def], &records(record(5, Some(data_ts))), now);
    let entry = &report.tables[0];
    assert_eq!(entry.status, FreshnessStatus::Fresh);
    assert_eq!(entry.severity, Severity::Warn);
    assert_eq!(entry.data_staleness_secs, Some(3600));
}

#[test]
fn test_build_staleness_counts() {
    let def = table("sla: { max_staleness: 1h }");
    let later = Utc::now() + chrono::Duration::hours(3);
    let report = check_freshness([&def], &records(record(5, None)), later);
    assert_eq!(report.tables[0].status, FreshnessStatus::Warn);
}

#[test]
fn test_min_row_count_violation() {
    let def = table("sla: { min_row_count: 100 }");
    let report = check_freshness([&def], &records(record(5, None)), Utc::now());
    assert_eq!(report.tables[0].status, FreshnessStatus::Warn);
    assert_eq!(report.tables[0].rows_written, Some(5));
}

#[test]
fn test_report_serializes_lowercase_status() {
    let def = table("");
    let report = check_freshness([&def], &HashMap::new(), Utc::now());
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["tables"][0]["status"], "unknown");
}
