//! Dialect-neutral logical plan of a feature table query.

use fs_core::{AggFunction, Interval, LogicalType, SchemaSnapshot, TableName};
use sqlparser::ast::Expr;

/// One windowed aggregate computed per entity.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOp {
    pub output: String,
    pub function: AggFunction,
    pub column: String,
    pub window: Option<Interval>,
    pub input_type: LogicalType,
    pub output_type: LogicalType,
}

/// How the feature relation is derived from the filtered source.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanMode {
    /// One output row per source row
    Row,
    /// One output row per entity: newest timestamp, latest value of carried
    /// columns, and the aggregates
    Aggregate {
        group_by: Vec<String>,
        timestamp: String,
        carried: Vec<String>,
        aggregates: Vec<AggregateOp>,
    },
}

/// Expression producing one output column.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputExpr {
    /// A column of the feature relation, optionally cast
    Column { name: String, cast: Option<LogicalType> },
    /// A transform with earlier transforms already inlined, cast to its type
    Derived { expr: Expr, cast: LogicalType },
}

/// An entry of the final projection.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputColumn {
    pub name: String,
    pub expr: OutputExpr,
    pub dtype: LogicalType,
}

/// Logical operations, in evaluation order.
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalOp {
    /// Read a source or upstream feature table
    Scan { relation: String, schema: SchemaSnapshot },
    /// Keep rows matching a predicate
    Filter { predicate: Expr },
    /// Group-by-aggregate or row passthrough
    Features(PlanMode),
    /// Final projection in declaration order
    Select { outputs: Vec<OutputColumn> },
}

/// Planned query for one feature table.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalPlan {
    pub table: TableName,
    pub ops: Vec<LogicalOp>,
    pub output_schema: SchemaSnapshot,
}

impl LogicalPlan {
    /// Relation read by the plan.
    pub fn relation(&self) -> Option<&str> {
        self.ops.iter().find_map(|op| match op {
            LogicalOp::Scan { relation, .. } => Some(relation.as_str()),
            _ => None,
        })
    }

    pub fn filters(&self) -> impl Iterator<Item = &Expr> {
        self.ops.iter().filter_map(|op| match op {
            LogicalOp::Filter { predicate } => Some(predicate),
            _ => None,
        })
    }

    pub fn mode(&self) -> Option<&PlanMode> {
        self.ops.iter().find_map(|op| match op {
            LogicalOp::Features(mode) => Some(mode),
            _ => None,
        })
    }

    pub fn outputs(&self) -> &[OutputColumn] {
        self.ops
            .iter()
            .find_map(|op| match op {
                LogicalOp::Select { outputs } => Some(outputs.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Every user-written expression in the plan (filters and transforms).
    pub fn expressions(&self) -> Vec<&Expr> {
        let derived = self.outputs().iter().filter_map(|o| match &o.expr {
            OutputExpr::Derived { expr, .. } => Some(expr),
            OutputExpr::Column { .. } => None,
        });
        self.filters().chain(derived).collect()
    }
}
