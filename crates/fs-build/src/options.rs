//! Per-run build options.

use fs_core::TableName;

/// What to build and how.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Build only this table and its upstream tables
    pub table: Option<TableName>,
    /// First table of the build order to include
    pub start: Option<TableName>,
    /// Last table of the build order to include
    pub end: Option<TableName>,
    /// Overwrite every table regardless of its write mode
    pub full_refresh: bool,
    /// Skip the validate-before-write quality gate
    pub skip_quality: bool,
    /// Run identifier; generated when absent
    pub run_id: Option<String>,
}
