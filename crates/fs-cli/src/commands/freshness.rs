//! Freshness command implementation
//!
//! Compares each table's latest successful build in the registry with its
//! SLA. Exits non-zero when a table is stale at error severity.

use anyhow::{Context, Result};
use chrono::Utc;
use fs_quality::{check_freshness, FreshnessReport, FreshnessStatus, TableFreshness};

use crate::cli::{FreshnessArgs, GlobalArgs, OutputFormat};
use crate::commands::common::{self, load_project, ExitCode};

/// Execute the freshness command
pub async fn execute(args: &FreshnessArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let registry = common::open_registry(&project, global.verbose)?;
    let latest = registry
        .latest_records()
        .context("Failed to read build history")?;

    let report = check_freshness(project.definitions.tables(), &latest, Utc::now());

    match args.output {
        OutputFormat::Text => print_report(&report),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report)
                .context("Failed to serialize freshness report")?
        ),
    }

    if report.has_errors() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn status_symbol(status: FreshnessStatus) -> &'static str {
    match status {
        FreshnessStatus::Fresh => "\u{2713}",
        FreshnessStatus::Warn => "!",
        FreshnessStatus::Error => "\u{2717}",
        FreshnessStatus::Unknown => "?",
    }
}

fn describe(table: &TableFreshness) -> String {
    let age = table
        .age()
        .map(|a| format!("{} old", a))
        .unwrap_or_else(|| "never built".to_string());
    match &table.max_staleness {
        Some(max) => format!("{} (max {})", age, max),
        None => age,
    }
}

fn print_report(report: &FreshnessReport) {
    if report.tables.is_empty() {
        println!("No feature tables found.");
        return;
    }
    for table in &report.tables {
        println!(
            "  {} {} [{}] {}",
            status_symbol(table.status),
            table.table,
            table.status,
            describe(table)
        );
    }

    let count = |status: FreshnessStatus| {
        report
            .tables
            .iter()
            .filter(|t| t.status == status)
            .count()
    };
    println!(
        "\nFreshness check: {} fresh, {} warnings, {} errors, {} never built",
        count(FreshnessStatus::Fresh),
        count(FreshnessStatus::Warn),
        count(FreshnessStatus::Error),
        count(FreshnessStatus::Unknown)
    );
}
