//! Configuration types and parsing for fstore.yml

use crate::error::{CoreError, CoreResult};
use crate::schema::SchemaField;
use crate::serde_helpers::{default_true, default_version};
use crate::table_name::SourceName;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

/// Config file names searched in a project directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 2] = ["fstore.yml", "fstore.yaml"];

/// Environment variable consulted when `--target` is not given.
pub const TARGET_ENV_VAR: &str = "FSTORE_TARGET";

/// Main project configuration from fstore.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// SQL dialect feature queries are rendered in
    #[serde(default)]
    pub dialect: DialectKind,

    /// Compute engine / storage database
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Build history registry
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Directories containing feature table definitions
    #[serde(default = "default_table_paths")]
    pub table_paths: Vec<String>,

    /// Raw sources feature tables read from
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,

    /// Quality gate defaults
    #[serde(default)]
    pub quality: QualityConfig,

    /// Named target configurations (e.g., dev, prod) overriding `database`
    #[serde(default)]
    pub targets: HashMap<String, TargetConfig>,
}

/// SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// DuckDB SQL dialect
    #[default]
    DuckDb,
    /// Snowflake SQL dialect
    Snowflake,
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialectKind::DuckDb => write!(f, "duckdb"),
            DialectKind::Snowflake => write!(f, "snowflake"),
        }
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Database path (file-based DuckDB or :memory:)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Registry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Path of the registry database, relative to the project root
    #[serde(default = "default_registry_path")]
    pub path: String,

    /// Whether build records and schemas are persisted
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: default_registry_path(),
            enabled: true,
        }
    }
}

/// Quality gate defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QualityConfig {
    /// Default sample percentage for tables that do not declare one
    #[serde(default)]
    pub sample_pct: Option<u8>,
}

/// Target-specific configuration overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Database configuration override
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// File format of a raw source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    #[default]
    Parquet,
    Csv,
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceFormat::Parquet => write!(f, "parquet"),
            SourceFormat::Csv => write!(f, "csv"),
        }
    }
}

/// A raw source registered with the compute engine under `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceDefinition {
    pub name: SourceName,
    /// File path or glob, relative to the project root
    pub path: String,
    #[serde(default)]
    pub format: SourceFormat,
    /// Declared schema. When absent it is read from the engine.
    #[serde(default)]
    pub schema: Option<Vec<SchemaField>>,
}

const DEFAULT_DB_PATH: &str = ":memory:";

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_registry_path() -> String {
    "target/registry.duckdb".to_string()
}

fn default_table_paths() -> Vec<String> {
    vec!["tables".to_string()]
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a project directory
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        match CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists())
        {
            Some(path) => Self::load(&path),
            None => Err(CoreError::ConfigNotFound {
                path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
            }),
        }
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.table_paths.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "At least one table_paths entry must be specified".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(CoreError::DuplicateName {
                    name: source.name.to_string(),
                    kind: "source".to_string(),
                });
            }
        }

        if let Some(pct) = self.quality.sample_pct {
            if !(1..=100).contains(&pct) {
                return Err(CoreError::ConfigInvalid {
                    message: format!("quality.sample_pct must be between 1 and 100, got {}", pct),
                });
            }
        }

        Ok(())
    }

    /// Get absolute table paths relative to a project root
    pub fn table_paths_absolute(&self, root: &Path) -> Vec<PathBuf> {
        self.table_paths.iter().map(|p| root.join(p)).collect()
    }

    /// Get absolute registry path relative to a project root
    pub fn registry_path_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.registry.path)
    }

    /// Look up a source by name
    pub fn source(&self, name: &str) -> Option<&SourceDefinition> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Get the list of available target names, sorted
    pub fn available_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get database configuration, optionally applying target overrides
    pub fn get_database_config(&self, target: Option<&str>) -> CoreResult<DatabaseConfig> {
        match target {
            Some(name) => {
                let target_config =
                    self.targets
                        .get(name)
                        .ok_or_else(|| CoreError::ConfigInvalid {
                            message: format!(
                                "Target '{}' not found. Available targets: {}",
                                name,
                                self.available_targets().join(", ")
                            ),
                        })?;

                Ok(target_config
                    .database
                    .clone()
                    .unwrap_or_else(|| self.database.clone()))
            }
            None => Ok(self.database.clone()),
        }
    }

    /// Resolve target from CLI flag or FSTORE_TARGET environment variable
    ///
    /// Priority: CLI flag > FSTORE_TARGET env var > None
    pub fn resolve_target(cli_target: Option<&str>) -> Option<String> {
        cli_target
            .map(String::from)
            .or_else(|| std::env::var(TARGET_ENV_VAR).ok())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
