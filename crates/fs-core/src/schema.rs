//! Schema snapshots: the ordered (name, type) list of a materialized table.

use crate::types::LogicalType;
use serde::{Deserialize, Serialize};

/// One field of a schema snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub dtype: LogicalType,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, dtype: LogicalType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// Ordered list of fields. Order is informational only; compatibility is
/// decided by name and type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaSnapshot {
    fields: Vec<SchemaField>,
}

impl SchemaSnapshot {
    pub fn new(fields: Vec<SchemaField>) -> Self {
        Self { fields }
    }

    /// Convenience constructor from `(name, type)` pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, LogicalType)>) -> Self {
        Self::new(
            pairs
                .into_iter()
                .map(|(name, dtype)| SchemaField::new(name, dtype))
                .collect(),
        )
    }

    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
