//! Quality constraints attached to feature fields and table SLAs, and the
//! results of evaluating them.

use crate::data::ScalarValue;
use crate::types::Interval;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a failing constraint affects the build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks the write.
    #[default]
    Error,
    /// Recorded, does not block the write.
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warn => f.write_str("warn"),
        }
    }
}

/// A literal in an `allowed_values` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Literal {
    /// Whether `value` equals this literal. Integers compare across signedness.
    pub fn matches(&self, value: &ScalarValue) -> bool {
        match (self, value) {
            (Literal::Bool(a), ScalarValue::Bool(b)) => a == b,
            (Literal::Int(a), ScalarValue::Int(b)) => a == b,
            (Literal::Int(a), ScalarValue::UInt(b)) => u64::try_from(*a).is_ok_and(|a| a == *b),
            (Literal::Text(a), ScalarValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(v) => write!(f, "{v}"),
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v}"),
            Literal::Text(v) => write!(f, "'{v}'"),
        }
    }
}

/// Tag identifying a constraint kind. Evaluators are registered by tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintTag {
    Range,
    NotNull,
    MaxNullPct,
    AllowedValues,
    Pattern,
    Custom,
    MinRowCount,
    MaxStaleness,
}

impl ConstraintTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintTag::Range => "range",
            ConstraintTag::NotNull => "not_null",
            ConstraintTag::MaxNullPct => "max_null_pct",
            ConstraintTag::AllowedValues => "allowed_values",
            ConstraintTag::Pattern => "pattern",
            ConstraintTag::Custom => "custom",
            ConstraintTag::MinRowCount => "min_row_count",
            ConstraintTag::MaxStaleness => "max_staleness",
        }
    }
}

impl fmt::Display for ConstraintTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint kind with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Inclusive numeric bounds; nulls are excluded before comparison.
    Range { ge: Option<f64>, le: Option<f64> },
    NotNull,
    /// Maximum fraction of null rows, in `[0, 1]`.
    MaxNullPct { threshold: f64 },
    AllowedValues { values: Vec<Literal> },
    Pattern { regex: String },
    /// Named predicate looked up in the predicate registry.
    Custom { name: String },
    MinRowCount { min: u64 },
    MaxStaleness {
        max: Interval,
        timestamp_field: String,
    },
}

impl ConstraintKind {
    pub fn tag(&self) -> ConstraintTag {
        match self {
            ConstraintKind::Range { .. } => ConstraintTag::Range,
            ConstraintKind::NotNull => ConstraintTag::NotNull,
            ConstraintKind::MaxNullPct { .. } => ConstraintTag::MaxNullPct,
            ConstraintKind::AllowedValues { .. } => ConstraintTag::AllowedValues,
            ConstraintKind::Pattern { .. } => ConstraintTag::Pattern,
            ConstraintKind::Custom { .. } => ConstraintTag::Custom,
            ConstraintKind::MinRowCount { .. } => ConstraintTag::MinRowCount,
            ConstraintKind::MaxStaleness { .. } => ConstraintTag::MaxStaleness,
        }
    }
}

/// What a constraint is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", content = "name", rename_all = "lowercase")]
pub enum ConstraintTarget {
    Column(String),
    Table,
}

impl fmt::Display for ConstraintTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintTarget::Column(name) => f.write_str(name),
            ConstraintTarget::Table => f.write_str("sla"),
        }
    }
}

/// A constraint bound to its target, with its configured severity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub target: ConstraintTarget,
    pub kind: ConstraintKind,
    pub severity: Severity,
}

impl Constraint {
    /// Field constraint, `error` severity by default.
    pub fn column(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            target: ConstraintTarget::Column(name.into()),
            kind,
            severity: Severity::Error,
        }
    }

    /// Table-level SLA constraint, `warn` severity by default.
    pub fn table(kind: ConstraintKind) -> Self {
        Self {
            target: ConstraintTarget::Table,
            kind,
            severity: Severity::Warn,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn tag(&self) -> ConstraintTag {
        self.kind.tag()
    }

    /// Stable identity, e.g. `amount:range` or `sla:min_row_count`.
    pub fn id(&self) -> String {
        match &self.kind {
            ConstraintKind::Custom { name } => format!("{}:custom:{}", self.target, name),
            kind => format!("{}:{}", self.target, kind.tag()),
        }
    }

    /// Severity used for the build decision. Custom predicates always block.
    pub fn effective_severity(&self) -> Severity {
        match self.kind {
            ConstraintKind::Custom { .. } => Severity::Error,
            _ => self.severity,
        }
    }
}

/// Details attached to a failing result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub failing_rows: u64,
    pub sample_values: Vec<String>,
}

/// Outcome of evaluating one constraint against a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    pub id: String,
    pub tag: ConstraintTag,
    pub target: ConstraintTarget,
    pub passed: bool,
    pub severity: Severity,
    pub expected: String,
    pub actual: String,
    pub rows_checked: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
}

impl ConstraintResult {
    /// A failure that must abort the write.
    pub fn is_blocking(&self) -> bool {
        !self.passed && self.severity == Severity::Error
    }

    /// A failure that is recorded but does not block.
    pub fn is_warning(&self) -> bool {
        !self.passed && self.severity == Severity::Warn
    }
}

#[cfg(test)]
#[path = "constraint_test.rs"]
mod tests;
