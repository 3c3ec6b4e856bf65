//! Strongly-typed names for feature tables and raw sources.

use crate::newtype_string::define_identifier;

define_identifier! {
    /// Name of a feature table. Also the name of the materialized table and the
    /// registry key for its build history.
    pub struct TableName, "feature table name";
}

define_identifier! {
    /// Name of a raw source registered with the compute engine.
    pub struct SourceName, "source name";
}

#[cfg(test)]
#[path = "table_name_test.rs"]
mod tests;
