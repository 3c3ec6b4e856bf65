//! Compile command implementation

use anyhow::{Context, Result};
use fs_build::{plan_run, register_sources, BuildOptions};
use fs_core::{DefinitionSet, Project};
use fs_db::DuckDbBackend;
use fs_quality::Validator;
use fs_sql::{dialect_for, CompiledQuery};

use crate::cli::{CompileArgs, GlobalArgs};
use crate::commands::common::{self, load_project, ExitCode};

/// Execute the compile command
pub async fn execute(args: &CompileArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let definitions = definitions_with_schemas(&project, global.verbose)?;
    let dialect = dialect_for(project.config.dialect);

    let options = BuildOptions {
        table: common::parse_table(args.table.as_deref())?,
        ..Default::default()
    };
    let plan = plan_run(&definitions, &options, dialect.as_ref(), &Validator::default())
        .context("Compilation failed")?;

    let mut failed = 0;
    for name in &plan.order {
        if let Some(reason) = plan.compile_errors.get(name) {
            eprintln!("-- {}: {}", name, reason);
            failed += 1;
            continue;
        }
        let Some(logical) = plan.plans.get(name) else {
            continue;
        };
        match CompiledQuery::from_plan(logical.clone(), dialect.as_ref()) {
            Ok(compiled) => {
                println!("-- {} ({})", name, compiled.dialect);
                println!("{};\n", compiled.sql);
            }
            Err(e) => {
                eprintln!("-- {}: {}", name, e);
                failed += 1;
            }
        }
    }

    if global.verbose {
        eprintln!(
            "[verbose] Compiled {} of {} tables for {}",
            plan.order.len() - failed,
            plan.order.len(),
            dialect.name()
        );
    }
    if failed > 0 {
        eprintln!("{} tables failed to compile", failed);
        return Err(ExitCode(1).into());
    }
    Ok(())
}

/// Source schemas are only read from the data when a source does not declare
/// one; a throwaway in-memory engine does the reading.
fn definitions_with_schemas(project: &Project, verbose: bool) -> Result<DefinitionSet> {
    let undeclared = project.definitions.sources_without_schema().len();
    if undeclared == 0 {
        return Ok(project.definitions.clone());
    }
    if verbose {
        eprintln!(
            "[verbose] Reading schema of {} undeclared sources",
            undeclared
        );
    }
    let engine = DuckDbBackend::in_memory().context("Failed to open in-memory engine")?;
    register_sources(project, &engine).context("Failed to read source schemas")
}
