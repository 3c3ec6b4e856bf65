//! Project loading: configuration plus feature table definitions.
//!
//! [`Project::load`] is the definition source for a build. Every structural
//! problem (duplicate names, unknown sources or upstream tables, invalid
//! definitions) is reported here, before any table is touched.

mod loading;

use crate::config::{Config, SourceDefinition};
use crate::dag::FeatureDag;
use crate::error::{CoreError, CoreResult};
use crate::feature_table::{FeatureTableDefinition, SourceRef};
use crate::schema::SchemaSnapshot;
use crate::table_name::{SourceName, TableName};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// A loaded Featherstore project
#[derive(Debug, Clone)]
pub struct Project {
    /// Project root directory
    pub root: PathBuf,
    /// Parsed fstore.yml
    pub config: Config,
    /// Validated table and source definitions
    pub definitions: DefinitionSet,
}

impl Project {
    /// Load a project from a directory
    pub fn load(root: &Path) -> CoreResult<Self> {
        if !root.is_dir() {
            return Err(CoreError::ProjectNotFound {
                path: root.display().to_string(),
            });
        }
        let config = Config::load_from_dir(root)?;

        let mut tables = Vec::new();
        for dir in config.table_paths_absolute(root) {
            if !dir.exists() {
                log::debug!("Table path {} does not exist, skipping", dir.display());
                continue;
            }
            for path in loading::discover_table_files(&dir)? {
                tables.push(loading::load_table_file(&path)?);
            }
        }

        let definitions = DefinitionSet::new(config.sources.clone(), tables)?;
        log::debug!(
            "Loaded project '{}': {} sources, {} tables",
            config.name,
            definitions.sources().count(),
            definitions.len()
        );

        Ok(Self {
            root: root.to_path_buf(),
            config,
            definitions,
        })
    }

    /// Absolute path of a source file relative to the project root
    pub fn source_path(&self, source: &SourceDefinition) -> PathBuf {
        let path = Path::new(&source.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

/// The full, validated set of sources and feature tables.
#[derive(Debug, Clone, Default)]
pub struct DefinitionSet {
    sources: BTreeMap<SourceName, SourceDefinition>,
    source_schemas: BTreeMap<SourceName, SchemaSnapshot>,
    tables: BTreeMap<TableName, FeatureTableDefinition>,
}

impl DefinitionSet {
    /// Validate and index definitions.
    pub fn new(
        sources: Vec<SourceDefinition>,
        tables: Vec<FeatureTableDefinition>,
    ) -> CoreResult<Self> {
        let mut set = Self::default();

        for source in sources {
            if let Some(fields) = &source.schema {
                set.source_schemas
                    .insert(source.name.clone(), SchemaSnapshot::new(fields.clone()));
            }
            if set.sources.contains_key(&source.name) {
                return Err(CoreError::DuplicateName {
                    name: source.name.to_string(),
                    kind: "source".to_string(),
                });
            }
            set.sources.insert(source.name.clone(), source);
        }

        for table in tables {
            table.validate()?;
            if set.tables.contains_key(&table.name) {
                return Err(CoreError::DuplicateName {
                    name: table.name.to_string(),
                    kind: "table".to_string(),
                });
            }
            if set.sources.contains_key(table.name.as_str()) {
                return Err(CoreError::DuplicateName {
                    name: table.name.to_string(),
                    kind: "table and source".to_string(),
                });
            }
            set.tables.insert(table.name.clone(), table);
        }

        for table in set.tables.values() {
            if let SourceRef::Source(source) = &table.from {
                if !set.sources.contains_key(source) {
                    return Err(CoreError::UnresolvedUpstream {
                        table: table.name.to_string(),
                        kind: "source".to_string(),
                        name: source.to_string(),
                    });
                }
            }
            for upstream in table.upstream_tables() {
                if !set.tables.contains_key(&upstream) {
                    return Err(CoreError::UnresolvedUpstream {
                        table: table.name.to_string(),
                        kind: "table".to_string(),
                        name: upstream.to_string(),
                    });
                }
            }
        }

        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn table(&self, name: &str) -> Option<&FeatureTableDefinition> {
        self.tables.get(name)
    }

    /// Tables sorted by name
    pub fn tables(&self) -> impl Iterator<Item = &FeatureTableDefinition> {
        self.tables.values()
    }

    pub fn source(&self, name: &str) -> Option<&SourceDefinition> {
        self.sources.get(name)
    }

    pub fn sources(&self) -> impl Iterator<Item = &SourceDefinition> {
        self.sources.values()
    }

    /// Schema of a source, if declared or already resolved.
    pub fn source_schema(&self, name: &str) -> Option<&SchemaSnapshot> {
        self.source_schemas.get(name)
    }

    /// Sources whose schema is neither declared nor resolved yet.
    pub fn sources_without_schema(&self) -> Vec<&SourceDefinition> {
        self.sources
            .values()
            .filter(|s| !self.source_schemas.contains_key(&s.name))
            .collect()
    }

    /// Record a schema read from the compute engine.
    pub fn set_source_schema(&mut self, name: &str, schema: SchemaSnapshot) -> CoreResult<()> {
        let key = self
            .sources
            .get_key_value(name)
            .map(|(k, _)| k.clone())
            .ok_or_else(|| CoreError::UnknownTable {
                name: name.to_string(),
            })?;
        self.source_schemas.insert(key, schema);
        Ok(())
    }

    /// Table -> upstream tables map
    pub fn dependencies(&self) -> BTreeMap<TableName, Vec<TableName>> {
        self.tables
            .iter()
            .map(|(name, def)| (name.clone(), def.upstream_tables()))
            .collect()
    }

    /// Dependency graph over every table
    pub fn dag(&self) -> CoreResult<FeatureDag> {
        FeatureDag::build(&self.dependencies())
    }
}

#[cfg(test)]
#[path = "project_test.rs"]
mod tests;
