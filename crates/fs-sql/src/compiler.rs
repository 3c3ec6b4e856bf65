//! Planning and compilation of feature table definitions.

use crate::dialect::SqlDialect;
use crate::error::{CompileError, CompileResult, RenderResult};
use crate::expr::{find_aggregate, inline_references, parse_expression, referenced_columns};
use crate::ir::{AggregateOp, LogicalOp, LogicalPlan, OutputColumn, OutputExpr, PlanMode};
use crate::render::render;
use fs_core::{
    AggFunction, DefinitionSet, DialectKind, FeatureTableDefinition, LogicalType, SchemaField,
    SchemaSnapshot, TableName,
};
use sqlparser::ast::Expr;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Known relation schemas: sources plus already planned feature tables.
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    relations: BTreeMap<String, SchemaSnapshot>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog seeded with every source schema known to the definition set.
    pub fn from_sources(definitions: &DefinitionSet) -> Self {
        let mut catalog = Self::new();
        for source in definitions.sources() {
            if let Some(schema) = definitions.source_schema(&source.name) {
                catalog.insert(source.name.as_str(), schema.clone());
            }
        }
        catalog
    }

    pub fn insert(&mut self, relation: &str, schema: SchemaSnapshot) {
        self.relations.insert(relation.to_string(), schema);
    }

    pub fn get(&self, relation: &str) -> Option<&SchemaSnapshot> {
        self.relations.get(relation)
    }
}

/// A rendered query, ready for the compute engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub table: TableName,
    pub plan: LogicalPlan,
    pub sql: String,
    pub dialect: DialectKind,
}

impl CompiledQuery {
    /// Render an existing plan.
    pub fn from_plan(plan: LogicalPlan, dialect: &dyn SqlDialect) -> RenderResult<Self> {
        let sql = render(&plan, dialect)?;
        Ok(Self {
            table: plan.table.clone(),
            plan,
            sql,
            dialect: dialect.kind(),
        })
    }

    pub fn output_schema(&self) -> &SchemaSnapshot {
        &self.plan.output_schema
    }
}

/// Plan and render one definition.
pub fn compile(
    def: &FeatureTableDefinition,
    catalog: &SchemaCatalog,
    dialect: &dyn SqlDialect,
) -> CompileResult<CompiledQuery> {
    let plan = plan(def, catalog, dialect)?;
    Ok(CompiledQuery::from_plan(plan, dialect)?)
}

/// Plans of a set of tables, and the errors of those that could not be planned.
#[derive(Debug, Default)]
pub struct PlanSet {
    pub plans: BTreeMap<TableName, LogicalPlan>,
    pub errors: BTreeMap<TableName, CompileError>,
}

/// Plan every table in `order`, feeding each output schema to its dependents.
///
/// `order` must list upstream tables before the tables reading them. A table
/// that fails to plan does not stop the others; a table reading it fails with
/// [`CompileError::UpstreamNotPlanned`].
pub fn plan_all(
    definitions: &DefinitionSet,
    order: &[TableName],
    dialect: &dyn SqlDialect,
) -> PlanSet {
    let mut catalog = SchemaCatalog::from_sources(definitions);
    let mut set = PlanSet::default();
    for name in order {
        let Some(def) = definitions.table(name) else {
            continue;
        };
        let failed_upstream = def
            .upstream_tables()
            .into_iter()
            .find(|upstream| set.errors.contains_key(upstream));
        let planned = match failed_upstream {
            Some(upstream) => Err(CompileError::UpstreamNotPlanned {
                table: name.to_string(),
                upstream: upstream.to_string(),
            }),
            None => plan(def, &catalog, dialect),
        };
        match planned {
            Ok(planned) => {
                log::debug!(
                    "Planned '{}' with {} output columns",
                    name,
                    planned.output_schema.len()
                );
                catalog.insert(name.as_str(), planned.output_schema.clone());
                set.plans.insert(name.clone(), planned);
            }
            Err(e) => {
                set.errors.insert(name.clone(), e);
            }
        }
    }
    set
}

/// Output type of an aggregate over `input`.
pub fn aggregate_output_type(
    function: AggFunction,
    input: LogicalType,
) -> Result<LogicalType, String> {
    match function {
        AggFunction::Count | AggFunction::CountDistinct => Ok(LogicalType::Int64),
        AggFunction::Sum if input.is_integer() => Ok(LogicalType::Int64),
        AggFunction::Sum if input.is_float() => Ok(LogicalType::Float64),
        AggFunction::Avg if input.is_numeric() => Ok(LogicalType::Float64),
        AggFunction::Sum | AggFunction::Avg => Err(format!(
            "{} requires a numeric column, found {}",
            function, input
        )),
        AggFunction::Min | AggFunction::Max => Ok(input),
    }
}

/// Resolve references, infer types, and build the logical plan.
pub fn plan(
    def: &FeatureTableDefinition,
    catalog: &SchemaCatalog,
    dialect: &dyn SqlDialect,
) -> CompileResult<LogicalPlan> {
    Planner::new(def, catalog)?.plan(dialect)
}

struct Planner<'a> {
    def: &'a FeatureTableDefinition,
    relation: &'a str,
    schema: &'a SchemaSnapshot,
    outputs: Vec<OutputColumn>,
    output_names: HashSet<String>,
}

impl<'a> Planner<'a> {
    fn new(def: &'a FeatureTableDefinition, catalog: &'a SchemaCatalog) -> CompileResult<Self> {
        let relation = def.from.name();
        let schema = catalog
            .get(relation)
            .ok_or_else(|| CompileError::UnknownRelation {
                table: def.name.to_string(),
                relation: relation.to_string(),
            })?;
        Ok(Self {
            def,
            relation,
            schema,
            outputs: Vec::new(),
            output_names: HashSet::new(),
        })
    }

    fn table(&self) -> String {
        self.def.name.to_string()
    }

    /// Type of a column of the scanned relation.
    fn resolve(&self, column: &str) -> CompileResult<LogicalType> {
        self.schema
            .field(column)
            .map(|f| f.dtype)
            .ok_or_else(|| CompileError::UnresolvedReference {
                table: self.table(),
                column: column.to_string(),
                scope: format!("relation '{}'", self.relation),
            })
    }

    fn push_output(&mut self, output: OutputColumn) -> CompileResult<()> {
        if !self.output_names.insert(output.name.clone()) {
            return Err(CompileError::DuplicateOutput {
                table: self.table(),
                name: output.name,
            });
        }
        self.outputs.push(output);
        Ok(())
    }

    fn invalid_expression(&self, feature: &str, message: String) -> CompileError {
        CompileError::InvalidExpression {
            table: self.table(),
            feature: feature.to_string(),
            message,
        }
    }

    /// Parse a row-level expression and reject aggregates and qualified names.
    fn parse_row_expr(
        &self,
        feature: &str,
        sql: &str,
        dialect: &dyn SqlDialect,
    ) -> CompileResult<(Expr, Vec<String>)> {
        let expr =
            parse_expression(dialect, sql).map_err(|m| self.invalid_expression(feature, m))?;
        if let Some(func) = find_aggregate(&expr) {
            return Err(self.invalid_expression(
                feature,
                format!("aggregate or window function '{}' is not allowed here", func),
            ));
        }
        let columns = referenced_columns(&expr).map_err(|m| self.invalid_expression(feature, m))?;
        Ok((expr, columns))
    }

    fn plan(mut self, dialect: &dyn SqlDialect) -> CompileResult<LogicalPlan> {
        let def = self.def;
        let mut ops = vec![LogicalOp::Scan {
            relation: self.relation.to_string(),
            schema: self.schema.clone(),
        }];

        for filter in &def.filters {
            let (predicate, columns) = self.parse_row_expr("filter", filter, dialect)?;
            for column in &columns {
                self.resolve(column)?;
            }
            ops.push(LogicalOp::Filter { predicate });
        }

        for key in &def.entity.join_keys {
            let dtype = self.resolve(key)?;
            self.push_output(OutputColumn {
                name: key.clone(),
                expr: OutputExpr::Column {
                    name: key.clone(),
                    cast: None,
                },
                dtype,
            })?;
        }

        if let Some(ts) = &def.timestamp_field {
            let dtype = self.resolve(ts)?;
            if !dtype.is_temporal() {
                return Err(self.invalid_expression(
                    ts,
                    format!("timestamp_field must be date or datetime, found {}", dtype),
                ));
            }
            self.push_output(OutputColumn {
                name: ts.clone(),
                expr: OutputExpr::Column {
                    name: ts.clone(),
                    cast: None,
                },
                dtype,
            })?;
        }

        for column in &def.columns {
            let source_type = self.resolve(&column.name)?;
            let dtype = column.dtype.unwrap_or(source_type);
            self.push_output(OutputColumn {
                name: column.name.clone(),
                expr: OutputExpr::Column {
                    name: column.name.clone(),
                    cast: (dtype != source_type).then_some(dtype),
                },
                dtype,
            })?;
        }

        let mode = self.plan_mode()?;
        if let PlanMode::Aggregate { aggregates, .. } = &mode {
            for agg in aggregates {
                self.push_output(OutputColumn {
                    name: agg.output.clone(),
                    expr: OutputExpr::Column {
                        name: agg.output.clone(),
                        cast: None,
                    },
                    dtype: agg.output_type,
                })?;
            }
        }
        ops.push(LogicalOp::Features(mode));

        self.plan_transforms(dialect)?;

        let output_schema = SchemaSnapshot::new(
            self.outputs
                .iter()
                .map(|o| SchemaField::new(&o.name, o.dtype))
                .collect(),
        );
        ops.push(LogicalOp::Select {
            outputs: self.outputs,
        });

        Ok(LogicalPlan {
            table: def.name.clone(),
            ops,
            output_schema,
        })
    }

    fn plan_mode(&self) -> CompileResult<PlanMode> {
        let def = self.def;
        if !def.is_aggregated() {
            return Ok(PlanMode::Row);
        }
        let Some(timestamp) = def.timestamp_field.clone() else {
            return Err(CompileError::InvalidAggregate {
                table: self.table(),
                feature: def.aggregates[0].name.clone(),
                message: "aggregates require timestamp_field".to_string(),
            });
        };

        let mut aggregates = Vec::with_capacity(def.aggregates.len());
        for spec in &def.aggregates {
            let input_type = self.resolve(&spec.column)?;
            let output_type =
                aggregate_output_type(spec.function, input_type).map_err(|message| {
                    CompileError::InvalidAggregate {
                        table: self.table(),
                        feature: spec.name.clone(),
                        message,
                    }
                })?;
            aggregates.push(AggregateOp {
                output: spec.name.clone(),
                function: spec.function,
                column: spec.column.clone(),
                window: spec.window,
                input_type,
                output_type,
            });
        }

        Ok(PlanMode::Aggregate {
            group_by: def.entity.join_keys.clone(),
            timestamp,
            carried: def.columns.iter().map(|c| c.name.clone()).collect(),
            aggregates,
        })
    }

    /// Columns a transform may read: every source column in row mode, the
    /// grouped outputs in aggregate mode.
    fn transform_scope(&self) -> HashSet<String> {
        if self.def.is_aggregated() {
            self.output_names.clone()
        } else {
            self.schema.names().map(String::from).collect()
        }
    }

    fn plan_transforms(&mut self, dialect: &dyn SqlDialect) -> CompileResult<()> {
        let def = self.def;
        let scope = self.transform_scope();
        let mut defined: HashMap<String, Expr> = HashMap::new();

        for (i, transform) in def.transforms.iter().enumerate() {
            if scope.contains(&transform.name) || self.output_names.contains(&transform.name) {
                return Err(CompileError::DuplicateOutput {
                    table: self.table(),
                    name: transform.name.clone(),
                });
            }

            let (mut expr, columns) =
                self.parse_row_expr(&transform.name, &transform.expr, dialect)?;
            for column in columns {
                if scope.contains(&column) || defined.contains_key(&column) {
                    continue;
                }
                if def.transforms[i..].iter().any(|t| t.name == column) {
                    return Err(CompileError::ForwardReference {
                        table: self.table(),
                        feature: transform.name.clone(),
                        reference: column,
                    });
                }
                return Err(CompileError::UnresolvedReference {
                    table: self.table(),
                    column,
                    scope: format!("columns available to transform '{}'", transform.name),
                });
            }

            inline_references(&mut expr, &defined);
            defined.insert(transform.name.clone(), expr.clone());
            self.push_output(OutputColumn {
                name: transform.name.clone(),
                expr: OutputExpr::Derived {
                    expr,
                    cast: transform.dtype,
                },
                dtype: transform.dtype,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "compiler_test.rs"]
mod tests;
