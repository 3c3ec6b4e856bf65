//! Evaluator trait and the tag-keyed registry that dispatches to it.

use crate::checks::{
    AllowedValuesCheck, CustomCheck, MaxNullPctCheck, MaxStalenessCheck, MinRowCountCheck,
    NotNullCheck, PatternCheck, RangeCheck,
};
use crate::error::{QualityError, QualityResult};
use crate::predicate::PredicateRegistry;
use chrono::NaiveDateTime;
use fs_core::{
    Column, Constraint, ConstraintResult, ConstraintTag, ConstraintTarget, LogicalType,
    SchemaSnapshot, TableData,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Everything an evaluator may read while checking one result set.
pub struct EvalContext<'a> {
    pub data: &'a TableData,
    pub predicates: &'a PredicateRegistry,
    /// Reference time for staleness checks (UTC, naive)
    pub now: NaiveDateTime,
}

impl<'a> EvalContext<'a> {
    /// The column a field constraint is attached to.
    pub fn column(&self, constraint: &Constraint) -> QualityResult<&'a Column> {
        let name = column_name(constraint)?;
        self.data
            .column(name)
            .ok_or_else(|| QualityError::UnknownColumn {
                constraint: constraint.id(),
                column: name.to_string(),
            })
    }

    pub fn rows(&self) -> u64 {
        self.data.num_rows() as u64
    }
}

/// Checks one constraint kind.
///
/// `check_definition` runs at configuration time against the planned output
/// schema; `evaluate` runs against computed data and reports failure as a
/// result, never as an error.
pub trait ConstraintEvaluator: Send + Sync {
    /// Kind handled by this evaluator
    fn tag(&self) -> ConstraintTag;

    /// Reject constraints whose parameters do not fit the target column.
    fn check_definition(
        &self,
        constraint: &Constraint,
        schema: &SchemaSnapshot,
        predicates: &PredicateRegistry,
    ) -> QualityResult<()>;

    /// Evaluate the constraint against the data in `ctx`.
    fn evaluate(&self, constraint: &Constraint, ctx: &EvalContext<'_>)
        -> QualityResult<ConstraintResult>;
}

/// Name of the column a constraint targets; table constraints have none.
pub(crate) fn column_name(constraint: &Constraint) -> QualityResult<&str> {
    match &constraint.target {
        ConstraintTarget::Column(name) => Ok(name),
        ConstraintTarget::Table => Err(QualityError::InvalidTarget {
            constraint: constraint.id(),
            target: "the table".to_string(),
        }),
    }
}

/// Type of the column a constraint targets, from the schema.
pub(crate) fn column_type(
    constraint: &Constraint,
    schema: &SchemaSnapshot,
) -> QualityResult<LogicalType> {
    let name = column_name(constraint)?;
    schema
        .field(name)
        .map(|f| f.dtype)
        .ok_or_else(|| QualityError::UnknownColumn {
            constraint: constraint.id(),
            column: name.to_string(),
        })
}

/// Evaluators keyed by constraint tag.
///
/// [`EvaluatorRegistry::new`] comes pre-populated with every built-in kind.
/// Registering an evaluator for a tag that already has one replaces it.
pub struct EvaluatorRegistry {
    evaluators: HashMap<ConstraintTag, Arc<dyn ConstraintEvaluator>>,
}

impl Default for EvaluatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EvaluatorRegistry {
    /// Registry with the built-in evaluators.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(RangeCheck);
        registry.register(NotNullCheck);
        registry.register(MaxNullPctCheck);
        registry.register(AllowedValuesCheck);
        registry.register(PatternCheck);
        registry.register(CustomCheck);
        registry.register(MinRowCountCheck);
        registry.register(MaxStalenessCheck);
        registry
    }

    /// Registry with no evaluators.
    pub fn empty() -> Self {
        Self {
            evaluators: HashMap::new(),
        }
    }

    /// Register an evaluator under its tag, returning the one it replaced.
    pub fn register<E: ConstraintEvaluator + 'static>(
        &mut self,
        evaluator: E,
    ) -> Option<Arc<dyn ConstraintEvaluator>> {
        let tag = evaluator.tag();
        log::debug!("Registering constraint evaluator for '{}'", tag);
        self.evaluators.insert(tag, Arc::new(evaluator))
    }

    pub fn get(&self, tag: ConstraintTag) -> QualityResult<&dyn ConstraintEvaluator> {
        self.evaluators
            .get(&tag)
            .map(|e| e.as_ref())
            .ok_or(QualityError::MissingEvaluator { tag })
    }

    pub fn contains(&self, tag: ConstraintTag) -> bool {
        self.evaluators.contains_key(&tag)
    }
}

#[cfg(test)]
#[path = "evaluator_test.rs"]
mod tests;
