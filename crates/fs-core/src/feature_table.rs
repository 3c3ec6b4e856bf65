//! Feature table definitions, as declared in `tables/*.yml`.

use crate::constraint::{Constraint, ConstraintKind, Literal, Severity};
use crate::error::{CoreError, CoreResult};
use crate::table_name::{SourceName, TableName};
use crate::types::{Interval, LogicalType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

/// How a computed result is committed to storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Add rows to the existing table (default)
    #[default]
    Append,
    /// Replace the table contents
    Overwrite,
    /// Replace rows matching the merge keys, insert the rest
    Upsert,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Append => write!(f, "append"),
            WriteMode::Overwrite => write!(f, "overwrite"),
            WriteMode::Upsert => write!(f, "upsert"),
        }
    }
}

/// Where a feature table reads its rows from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceRef {
    /// A raw source registered in `fstore.yml`
    Source(SourceName),
    /// Another feature table (implies an upstream dependency)
    Table(TableName),
}

impl SourceRef {
    pub fn name(&self) -> &str {
        match self {
            SourceRef::Source(name) => name.as_str(),
            SourceRef::Table(name) => name.as_str(),
        }
    }
}

/// The entity a table's rows are keyed by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Entity {
    pub name: String,
    pub join_keys: Vec<String>,
}

/// Quality checks declared inline on a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldChecks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_null: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_null_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Literal>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Names of custom predicates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl FieldChecks {
    /// Expand the inline checks into constraints on `column`.
    pub fn constraints(&self, column: &str) -> Vec<Constraint> {
        let severity = self.severity.unwrap_or_default();
        let mut out = Vec::new();
        let mut push = |kind| out.push(Constraint::column(column, kind).with_severity(severity));

        if self.not_null {
            push(ConstraintKind::NotNull);
        }
        if self.ge.is_some() || self.le.is_some() {
            push(ConstraintKind::Range {
                ge: self.ge,
                le: self.le,
            });
        }
        if let Some(threshold) = self.max_null_pct {
            push(ConstraintKind::MaxNullPct { threshold });
        }
        if let Some(values) = &self.allowed_values {
            push(ConstraintKind::AllowedValues {
                values: values.clone(),
            });
        }
        if let Some(regex) = &self.pattern {
            push(ConstraintKind::Pattern {
                regex: regex.clone(),
            });
        }
        for name in &self.custom {
            push(ConstraintKind::Custom { name: name.clone() });
        }
        out
    }
}

/// A source column carried through to the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureField {
    pub name: String,
    /// Declared type; checked against the source schema when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dtype: Option<LogicalType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub checks: FieldChecks,
}

/// Aggregation functions available to aggregate features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggFunction {
    Sum,
    Count,
    Avg,
    Min,
    Max,
    CountDistinct,
}

impl AggFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunction::Sum => "sum",
            AggFunction::Count => "count",
            AggFunction::Avg => "avg",
            AggFunction::Min => "min",
            AggFunction::Max => "max",
            AggFunction::CountDistinct => "count_distinct",
        }
    }
}

impl fmt::Display for AggFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A windowed aggregate feature, grouped by the entity's join keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSpec {
    pub name: String,
    pub column: String,
    pub function: AggFunction,
    /// Trailing window relative to build time; absent means all history.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Interval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub checks: FieldChecks,
}

/// A named SQL expression over source columns, aggregates and earlier transforms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformSpec {
    pub name: String,
    pub expr: String,
    /// Output type; the expression result is cast to it.
    pub dtype: LogicalType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub checks: FieldChecks,
}

/// Table-level operational guarantees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Sla {
    #[serde(default)]
    pub max_staleness: Option<Interval>,
    #[serde(default)]
    pub min_row_count: Option<u64>,
    #[serde(default = "default_sla_severity")]
    pub severity: Severity,
}

fn default_sla_severity() -> Severity {
    Severity::Warn
}

/// Declarative definition of one feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureTableDefinition {
    pub name: TableName,
    #[serde(default)]
    pub description: Option<String>,
    pub from: SourceRef,
    pub entity: Entity,
    #[serde(default)]
    pub timestamp_field: Option<String>,
    /// Row predicates applied to the source before features are computed
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub columns: Vec<FeatureField>,
    #[serde(default)]
    pub aggregates: Vec<AggregateSpec>,
    #[serde(default)]
    pub transforms: Vec<TransformSpec>,
    #[serde(default)]
    pub write_mode: WriteMode,
    /// Upsert keys; defaults to the entity's join keys
    #[serde(default)]
    pub merge_keys: Option<Vec<String>>,
    /// Also publish the latest row per entity to `<name>_online`
    #[serde(default)]
    pub online: bool,
    /// Explicit upstream tables, in addition to the one in `from`
    #[serde(default)]
    pub depends_on: Vec<TableName>,
    #[serde(default)]
    pub sla: Option<Sla>,
    /// Percentage of rows (1-100) validated by the quality gate
    #[serde(default)]
    pub sample_pct: Option<u8>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl FeatureTableDefinition {
    /// Upstream feature tables, sorted and de-duplicated.
    pub fn upstream_tables(&self) -> Vec<TableName> {
        let mut set: BTreeSet<TableName> = self.depends_on.iter().cloned().collect();
        if let SourceRef::Table(name) = &self.from {
            set.insert(name.clone());
        }
        set.into_iter().collect()
    }

    /// Whether features are aggregated per entity.
    pub fn is_aggregated(&self) -> bool {
        !self.aggregates.is_empty()
    }

    pub fn effective_merge_keys(&self) -> &[String] {
        self.merge_keys
            .as_deref()
            .unwrap_or(&self.entity.join_keys)
    }

    /// Declared feature names: columns, aggregates, transforms, in declaration order.
    pub fn feature_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|c| c.name.as_str())
            .chain(self.aggregates.iter().map(|a| a.name.as_str()))
            .chain(self.transforms.iter().map(|t| t.name.as_str()))
            .collect()
    }

    /// Every output column: join keys, timestamp, then features.
    pub fn output_names(&self) -> Vec<&str> {
        self.entity
            .join_keys
            .iter()
            .map(String::as_str)
            .chain(self.timestamp_field.as_deref())
            .chain(self.feature_names())
            .collect()
    }

    /// All constraints: per-feature checks in declaration order, then SLA.
    pub fn constraints(&self) -> Vec<Constraint> {
        let mut out: Vec<Constraint> = self
            .columns
            .iter()
            .flat_map(|c| c.checks.constraints(&c.name))
            .chain(
                self.aggregates
                    .iter()
                    .flat_map(|a| a.checks.constraints(&a.name)),
            )
            .chain(
                self.transforms
                    .iter()
                    .flat_map(|t| t.checks.constraints(&t.name)),
            )
            .collect();

        if let Some(sla) = &self.sla {
            if let Some(min) = sla.min_row_count {
                out.push(
                    Constraint::table(ConstraintKind::MinRowCount { min })
                        .with_severity(sla.severity),
                );
            }
            if let (Some(max), Some(ts)) = (sla.max_staleness, &self.timestamp_field) {
                out.push(
                    Constraint::table(ConstraintKind::MaxStaleness {
                        max,
                        timestamp_field: ts.clone(),
                    })
                    .with_severity(sla.severity),
                );
            }
        }
        out
    }

    /// Structural validation that needs no other definitions.
    pub fn validate(&self) -> CoreResult<()> {
        let invalid = |message: String| CoreError::InvalidDefinition {
            table: self.name.to_string(),
            message,
        };

        if self.entity.join_keys.is_empty() {
            return Err(invalid(format!(
                "entity '{}' must declare at least one join key",
                self.entity.name
            )));
        }

        let mut seen = HashSet::new();
        for name in self.output_names() {
            if !seen.insert(name) {
                return Err(invalid(format!("output name '{}' is declared twice", name)));
            }
        }

        if self.timestamp_field.is_none() {
            if let Some(agg) = self.aggregates.first() {
                return Err(invalid(format!(
                    "aggregate '{}' requires timestamp_field",
                    agg.name
                )));
            }
            if self.sla.as_ref().is_some_and(|s| s.max_staleness.is_some()) {
                return Err(invalid(
                    "sla.max_staleness requires timestamp_field".to_string(),
                ));
            }
        }

        if let Some(pct) = self.sample_pct {
            if !(1..=100).contains(&pct) {
                return Err(invalid(format!(
                    "sample_pct must be between 1 and 100, got {}",
                    pct
                )));
            }
        }

        if let Some(keys) = &self.merge_keys {
            if keys.is_empty() {
                return Err(invalid("merge_keys must not be empty".to_string()));
            }
            let outputs = self.output_names();
            if let Some(missing) = keys.iter().find(|k| !outputs.contains(&k.as_str())) {
                return Err(invalid(format!(
                    "merge key '{}' is not an output column",
                    missing
                )));
            }
        }

        if self.upstream_tables().contains(&self.name) {
            return Err(invalid("table cannot depend on itself".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "feature_table_test.rs"]
mod tests;
