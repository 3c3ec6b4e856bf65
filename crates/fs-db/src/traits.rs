//! Collaborator traits driven by the build orchestrator

use crate::error::DbResult;
use fs_core::{DialectKind, SchemaSnapshot, SourceFormat, TableData, WriteMode};
use std::path::Path;

/// Executes rendered queries and returns their result sets.
///
/// Calls are synchronous; timeouts are the engine's concern.
pub trait ComputeEngine: Send + Sync {
    /// Engine identifier for logging
    fn engine_name(&self) -> &'static str;

    /// SQL dialect the engine executes
    fn dialect(&self) -> DialectKind;

    /// Expose a source file to queries under `name`
    fn register_source(&self, name: &str, path: &Path, format: SourceFormat) -> DbResult<()>;

    /// Column names and types of a relation
    fn describe(&self, relation: &str) -> DbResult<SchemaSnapshot>;

    /// Run a query and collect its full result
    fn execute(&self, sql: &str) -> DbResult<TableData>;
}

/// Durably writes computed feature tables.
pub trait TableWriter: Send + Sync {
    /// Write `data` to `table` under `mode`, returning the rows written.
    ///
    /// `overwrite` replaces the table atomically and is idempotent;
    /// `upsert` replaces existing rows matching `merge_keys`.
    fn write(
        &self,
        table: &str,
        data: &TableData,
        mode: WriteMode,
        merge_keys: &[String],
    ) -> DbResult<u64>;

    /// Check if a table exists
    fn table_exists(&self, table: &str) -> DbResult<bool>;
}
