//! Schema evolution detection between successive builds of a table.
//!
//! Two snapshots are compared by field name. Unmatched names are additions or
//! removals; matched names whose type differs are classified with a fixed
//! widening lattice:
//!
//! - within a family, a wider bit width widens (`int8 < int16 < int32 < int64`,
//!   `uint8 < .. < uint64`, `float32 < float64`), a narrower one narrows
//! - `uintN -> intM` widens iff `M > N`, otherwise narrows
//! - `intN -> uintM` always narrows (sign is lost)
//! - any integer to float widens, float to integer narrows
//! - `date -> datetime` widens, `datetime -> date` narrows
//! - everything else (string, bool, numeric/temporal crossings) is incompatible

use crate::schema::SchemaSnapshot;
use crate::types::LogicalType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Classification of a single field change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldChangeKind {
    Added,
    Removed,
    Widened,
    Narrowed,
    Incompatible,
}

impl FieldChangeKind {
    /// Action a writer must take to keep stored history consistent.
    pub fn migration_action(&self) -> MigrationAction {
        match self {
            FieldChangeKind::Added => MigrationAction::FullBackfill,
            FieldChangeKind::Removed | FieldChangeKind::Widened => MigrationAction::Continue,
            FieldChangeKind::Narrowed | FieldChangeKind::Incompatible => {
                MigrationAction::FullBackfill
            }
        }
    }
}

impl fmt::Display for FieldChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldChangeKind::Added => "added",
            FieldChangeKind::Removed => "removed",
            FieldChangeKind::Widened => "widened",
            FieldChangeKind::Narrowed => "narrowed",
            FieldChangeKind::Incompatible => "incompatible",
        };
        f.write_str(s)
    }
}

/// What to do with previously written data after a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationAction {
    None,
    Continue,
    FullBackfill,
}

/// A detected change to one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange {
    pub name: String,
    pub kind: FieldChangeKind,
    pub old_type: Option<LogicalType>,
    pub new_type: Option<LogicalType>,
}

impl FieldChange {
    pub fn migration_action(&self) -> MigrationAction {
        self.kind.migration_action()
    }

    pub fn description(&self) -> String {
        match (self.old_type, self.new_type) {
            (Some(old), Some(new)) => format!("{} {} ({} -> {})", self.name, self.kind, old, new),
            (None, Some(new)) => format!("{} added ({})", self.name, new),
            (Some(old), None) => format!("{} removed ({})", self.name, old),
            (None, None) => format!("{} {}", self.name, self.kind),
        }
    }
}

/// Classify a type change. Returns `None` when the types are equal.
pub fn classify_type_change(old: LogicalType, new: LogicalType) -> Option<FieldChangeKind> {
    use FieldChangeKind::{Incompatible, Narrowed, Widened};

    if old == new {
        return None;
    }
    let widen_if = |cond: bool| if cond { Widened } else { Narrowed };
    let kind = match (old.bit_width(), new.bit_width()) {
        (Some(ow), Some(nw)) => {
            if old.is_signed_int() && new.is_signed_int()
                || old.is_unsigned_int() && new.is_unsigned_int()
                || old.is_float() && new.is_float()
            {
                widen_if(nw > ow)
            } else if old.is_unsigned_int() && new.is_signed_int() {
                widen_if(nw > ow)
            } else if old.is_integer() && new.is_float() {
                Widened
            } else {
                // signed -> unsigned, float -> integer
                Narrowed
            }
        }
        _ => match (old, new) {
            (LogicalType::Date, LogicalType::Datetime) => Widened,
            (LogicalType::Datetime, LogicalType::Date) => Narrowed,
            _ => Incompatible,
        },
    };
    Some(kind)
}

/// Compare two snapshots.
///
/// Output: additions and removals first, sorted together by name, then type
/// changes sorted by name. Unchanged fields are omitted.
pub fn diff_schemas(previous: &SchemaSnapshot, current: &SchemaSnapshot) -> Vec<FieldChange> {
    let old: BTreeMap<&str, LogicalType> =
        previous.fields().iter().map(|f| (f.name.as_str(), f.dtype)).collect();
    let new: BTreeMap<&str, LogicalType> =
        current.fields().iter().map(|f| (f.name.as_str(), f.dtype)).collect();

    let mut membership = Vec::new();
    let mut modified = Vec::new();

    for (name, &old_type) in &old {
        match new.get(name) {
            None => membership.push(FieldChange {
                name: name.to_string(),
                kind: FieldChangeKind::Removed,
                old_type: Some(old_type),
                new_type: None,
            }),
            Some(&new_type) => {
                if let Some(kind) = classify_type_change(old_type, new_type) {
                    modified.push(FieldChange {
                        name: name.to_string(),
                        kind,
                        old_type: Some(old_type),
                        new_type: Some(new_type),
                    });
                }
            }
        }
    }
    for (name, &new_type) in &new {
        if !old.contains_key(name) {
            membership.push(FieldChange {
                name: name.to_string(),
                kind: FieldChangeKind::Added,
                old_type: None,
                new_type: Some(new_type),
            });
        }
    }

    membership.sort_by(|a, b| a.name.cmp(&b.name));
    membership.extend(modified);
    membership
}

/// Result of comparing a table's previous schema with its new one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaEvolution {
    pub changes: Vec<FieldChange>,
}

impl SchemaEvolution {
    /// Detect changes. A missing previous schema is a first build: no changes.
    pub fn detect(previous: Option<&SchemaSnapshot>, current: &SchemaSnapshot) -> Self {
        let changes = previous
            .map(|prev| diff_schemas(prev, current))
            .unwrap_or_default();
        Self { changes }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Strongest action required by any change.
    pub fn migration_action(&self) -> MigrationAction {
        self.changes
            .iter()
            .map(FieldChange::migration_action)
            .max()
            .unwrap_or(MigrationAction::None)
    }

    pub fn requires_backfill(&self) -> bool {
        self.migration_action() == MigrationAction::FullBackfill
    }
}

#[cfg(test)]
#[path = "schema_evolution_test.rs"]
mod tests;
