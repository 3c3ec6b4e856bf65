//! Expose project sources to the compute engine and fill in their schemas.

use crate::error::{BuildError, BuildResult};
use fs_core::{DefinitionSet, Project};
use fs_db::ComputeEngine;

/// Register every source of `project` with `engine`.
///
/// Sources without a declared schema get the schema the engine reports.
/// Returns the project's definitions with every source schema known, ready
/// for planning.
pub fn register_sources(
    project: &Project,
    engine: &dyn ComputeEngine,
) -> BuildResult<DefinitionSet> {
    let mut definitions = project.definitions.clone();
    let undeclared: Vec<String> = definitions
        .sources_without_schema()
        .iter()
        .map(|s| s.name.to_string())
        .collect();

    for source in definitions.sources() {
        let path = project.source_path(source);
        engine
            .register_source(&source.name, &path, source.format)
            .map_err(|e| BuildError::SourceRegistration {
                source_name: source.name.to_string(),
                source: e,
            })?;
    }

    for name in undeclared {
        let schema = engine
            .describe(&name)
            .map_err(|e| BuildError::SourceRegistration {
                source_name: name.clone(),
                source: e,
            })?;
        log::debug!("Source '{}' described with {} columns", name, schema.len());
        definitions.set_source_schema(&name, schema)?;
    }
    Ok(definitions)
}
