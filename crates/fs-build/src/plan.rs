//! Run planning: table selection and the configuration-time preflight.

use crate::error::{BuildError, BuildResult};
use crate::options::BuildOptions;
use fs_core::{Constraint, CoreError, DefinitionSet, FeatureDag, TableName};
use fs_quality::Validator;
use fs_sql::{plan_all, CompileError, LogicalPlan, SqlDialect};
use std::collections::{BTreeMap, BTreeSet};

/// Everything decided before the first table is touched.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Tables to build, in graph order
    pub order: Vec<TableName>,
    /// Logical plan of every table in `order` that could be planned
    pub plans: BTreeMap<TableName, LogicalPlan>,
    /// Tables in `order` that could not be planned; each fails in `compiling`
    pub compile_errors: BTreeMap<TableName, String>,
    /// Constraints of every table in `order`, checked against its plan
    pub constraints: BTreeMap<TableName, Vec<Constraint>>,
    pub dag: FeatureDag,
}

/// Tables selected by `options`, in graph order.
///
/// The full order is sliced to `[start, end]`; with `table` set, the slice is
/// further restricted to that table and its upstream tables.
pub fn select_tables(dag: &FeatureDag, options: &BuildOptions) -> BuildResult<Vec<TableName>> {
    let mut order = dag.scoped_order(options.start.as_deref(), options.end.as_deref())?;

    if let Some(table) = &options.table {
        if !dag.contains(table) {
            return Err(CoreError::UnknownTable {
                name: table.to_string(),
            }
            .into());
        }
        let mut keep = dag.ancestors(table);
        keep.insert(table.clone());
        order.retain(|t| keep.contains(t));
    }
    Ok(order)
}

/// Select tables, plan them and their upstream tables, and check every
/// constraint definition.
///
/// Errors here are configuration-time aborts: a cycle, a reference that does
/// not resolve, or a malformed constraint. Any other planning error fails
/// only its table (and, through skips, its dependents) and is kept in
/// [`RunPlan::compile_errors`]. Tables outside the selection and its upstream
/// closure are never planned.
pub fn plan_run(
    definitions: &DefinitionSet,
    options: &BuildOptions,
    dialect: &dyn SqlDialect,
    validator: &Validator,
) -> BuildResult<RunPlan> {
    let dag = definitions.dag()?;
    let full_order = dag.topological_order()?;
    let order = select_tables(&dag, options)?;

    let mut scope: BTreeSet<TableName> = order.iter().cloned().collect();
    for name in &order {
        scope.extend(dag.ancestors(name));
    }
    let scoped: Vec<TableName> = full_order
        .iter()
        .filter(|t| scope.contains(*t))
        .cloned()
        .collect();

    let mut planned = plan_all(definitions, &scoped, dialect);
    let first_abort = scoped
        .iter()
        .find(|t| planned.errors.get(*t).is_some_and(aborts_run));
    if let Some(err) = first_abort.and_then(|t| planned.errors.remove(t)) {
        return Err(err.into());
    }

    let mut plans = BTreeMap::new();
    let mut compile_errors = BTreeMap::new();
    let mut constraints = BTreeMap::new();
    for name in &order {
        let Some(def) = definitions.table(name) else {
            return Err(CoreError::UnknownTable {
                name: name.to_string(),
            }
            .into());
        };
        if let Some(err) = planned.errors.remove(name) {
            log::warn!("'{}' cannot be compiled: {}", name, err);
            compile_errors.insert(name.clone(), err.to_string());
            continue;
        }
        let Some(plan) = planned.plans.remove(name) else {
            return Err(CoreError::UnknownTable {
                name: name.to_string(),
            }
            .into());
        };
        let table_constraints = def.constraints();
        validator
            .check_definitions(&table_constraints, &plan.output_schema)
            .map_err(|e| BuildError::ConstraintDefinition {
                table: name.to_string(),
                source: e,
            })?;
        constraints.insert(name.clone(), table_constraints);
        plans.insert(name.clone(), plan);
    }

    log::debug!(
        "Run plan: {} of {} tables, {} planned with their upstream tables",
        order.len(),
        full_order.len(),
        scoped.len()
    );
    Ok(RunPlan {
        order,
        plans,
        compile_errors,
        constraints,
        dag,
    })
}

/// Reference errors mean the definition set itself is broken.
fn aborts_run(err: &CompileError) -> bool {
    matches!(
        err,
        CompileError::UnresolvedReference { .. } | CompileError::UnknownRelation { .. }
    )
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
