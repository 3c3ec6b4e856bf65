//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use fs_core::{Config, Project, TableName};
use fs_db::DuckDbBackend;
use fs_meta::{MetaDb, NullRegistry, Registry};
use std::fmt;
use std::path::Path;

use crate::cli::GlobalArgs;

/// Error type representing a non-zero process exit code.
///
/// Return `Err(ExitCode(N).into())` instead of calling `std::process::exit`
/// so that destructors (open DuckDB files, progress bars) run first.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; main never prints it.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    Project::load(Path::new(&global.project_dir)).context("Failed to load project")
}

/// Open the compute engine and storage database for the selected target.
///
/// Relative database paths are resolved against the project root.
pub(crate) fn create_backend(project: &Project, target: Option<&str>) -> Result<DuckDbBackend> {
    let resolved_target = Config::resolve_target(target);
    let db_config = project
        .config
        .get_database_config(resolved_target.as_deref())
        .context("Failed to get database configuration")?;
    let path = if db_config.path == ":memory:" || Path::new(&db_config.path).is_absolute() {
        db_config.path
    } else {
        project.root.join(&db_config.path).display().to_string()
    };
    DuckDbBackend::new(&path).with_context(|| format!("Failed to connect to database '{}'", path))
}

/// The project's registry, or one that stores nothing when disabled.
pub(crate) fn open_registry(project: &Project, verbose: bool) -> Result<Box<dyn Registry>> {
    if !project.config.registry.enabled {
        if verbose {
            eprintln!("[verbose] Registry disabled; build history will not be recorded");
        }
        return Ok(Box::new(NullRegistry));
    }
    let path = project.config.registry_path_absolute(&project.root);
    let registry = MetaDb::open(&path)
        .with_context(|| format!("Failed to open registry at {}", path.display()))?;
    Ok(Box::new(registry))
}

/// Parse an optional table name argument.
pub(crate) fn parse_table(arg: Option<&str>) -> Result<Option<TableName>> {
    arg.map(|name| TableName::try_new(name).with_context(|| format!("Invalid table name '{}'", name)))
        .transpose()
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
