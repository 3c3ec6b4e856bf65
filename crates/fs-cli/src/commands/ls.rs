//! List command implementation

use anyhow::{Context, Result};
use fs_core::{FeatureTableDefinition, SourceRef, WriteMode};
use serde::Serialize;

use crate::cli::{GlobalArgs, LsArgs, OutputFormat};
use crate::commands::common::load_project;

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let dag = project
        .definitions
        .dag()
        .context("Failed to build dependency graph")?;
    let order = dag
        .topological_order()
        .context("Failed to resolve build order")?;

    let tables: Vec<TableInfo> = order
        .iter()
        .filter_map(|name| project.definitions.table(name))
        .map(|def| TableInfo::new(def, dag.dependencies(&def.name)))
        .collect();

    match args.output {
        OutputFormat::Text => print_table(&tables),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&tables).context("Failed to serialize table list")?
        ),
    }
    Ok(())
}

/// Table information for display
#[derive(Debug, Serialize)]
struct TableInfo {
    name: String,
    entity: String,
    reads: String,
    write_mode: WriteMode,
    upstream: Vec<String>,
    features: usize,
}

impl TableInfo {
    fn new(def: &FeatureTableDefinition, upstream: Vec<fs_core::TableName>) -> Self {
        let reads = match &def.from {
            SourceRef::Source(name) => format!("source:{}", name),
            SourceRef::Table(name) => format!("table:{}", name),
        };
        Self {
            name: def.name.to_string(),
            entity: def.entity.name.clone(),
            reads,
            write_mode: def.write_mode,
            upstream: upstream.into_iter().map(|t| t.into_inner()).collect(),
            features: def.columns.len() + def.aggregates.len() + def.transforms.len(),
        }
    }
}

/// Print tables in table format
fn print_table(tables: &[TableInfo]) {
    if tables.is_empty() {
        println!("No feature tables found.");
        return;
    }
    let width = |f: fn(&TableInfo) -> usize, header: &str| {
        tables.iter().map(f).max().unwrap_or(0).max(header.len())
    };
    let name_width = width(|t| t.name.len(), "NAME");
    let entity_width = width(|t| t.entity.len(), "ENTITY");
    let reads_width = width(|t| t.reads.len(), "READS");
    let mode_width = 9;

    println!(
        "{:<name_width$}  {:<entity_width$}  {:<reads_width$}  {:<mode_width$}  UPSTREAM",
        "NAME", "ENTITY", "READS", "MODE"
    );
    println!(
        "{}",
        "-".repeat(name_width + entity_width + reads_width + mode_width + 18)
    );
    for t in tables {
        let upstream = if t.upstream.is_empty() {
            "-".to_string()
        } else {
            t.upstream.join(", ")
        };
        println!(
            "{:<name_width$}  {:<entity_width$}  {:<reads_width$}  {:<mode_width$}  {}",
            t.name,
            t.entity,
            t.reads,
            t.write_mode.to_string(),
            upstream
        );
    }
    println!("\n{} tables", tables.len());
}
