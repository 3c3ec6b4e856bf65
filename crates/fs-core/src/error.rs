//! Error types for fs-core

use thiserror::Error;

/// Core error type for Featherstore
#[derive(Error, Debug)]
pub enum CoreError {
    /// E001: Configuration file not found
    #[error("[E001] Config file not found: {path}")]
    ConfigNotFound { path: String },

    /// E002: Failed to parse configuration file
    #[error("[E002] Failed to parse config: {message}")]
    ConfigParseError { message: String },

    /// E003: Invalid configuration value
    #[error("[E003] Invalid config: {message}")]
    ConfigInvalid { message: String },

    /// E004: Project directory not found
    #[error("[E004] Project directory not found: {path}")]
    ProjectNotFound { path: String },

    /// E005: Table not present in the definition set
    #[error("[E005] Unknown table: {name}")]
    UnknownTable { name: String },

    /// E006: Feature table definition is invalid
    #[error("[E006] Invalid feature table '{table}': {message}")]
    InvalidDefinition { table: String, message: String },

    /// E007: Circular dependency detected
    #[error("[E007] Circular dependency detected between tables: {}", members.join(", "))]
    CircularDependency { members: Vec<String> },

    /// E008: Duplicate table or source name
    #[error("[E008] Duplicate name '{name}' ({kind})")]
    DuplicateName { name: String, kind: String },

    /// E009: A table reads from a source or table that is not defined
    #[error("[E009] Table '{table}' references unknown {kind} '{name}'")]
    UnresolvedUpstream {
        table: String,
        kind: String,
        name: String,
    },

    /// E010: Invalid scoped build range
    #[error("[E010] Invalid build range: '{start}' comes after '{end}' in build order")]
    InvalidRange { start: String, end: String },

    /// E011: Invalid duration literal
    #[error("[E011] Invalid duration '{value}': expected a number followed by d, h, m or s")]
    InvalidDuration { value: String },

    /// E012: Unknown logical type name
    #[error("[E012] Unknown type '{name}'")]
    UnknownType { name: String },

    /// E013: Empty name where a name is required
    #[error("[E013] Empty name in {context}")]
    EmptyName { context: String },

    /// E017: Name is not a valid identifier
    #[error("[E017] Invalid {context} '{name}': use letters, digits and underscores, not starting with a digit")]
    InvalidIdentifier { name: String, context: String },

    /// E018: Malformed result data
    #[error("[E018] Invalid table data: {message}")]
    InvalidData { message: String },

    /// E014: IO error
    #[error("[E014] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// E016: IO error with file path context
    #[error("[E016] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// E015: YAML parse error
    #[error("[E015] YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result type alias for CoreError
pub type CoreResult<T> = Result<T, CoreError>;
