//! Validate-before-write: evaluate constraints against a computed result.

use crate::error::QualityResult;
use crate::evaluator::{EvalContext, EvaluatorRegistry};
use crate::predicate::PredicateRegistry;
use chrono::{NaiveDateTime, Utc};
use fs_core::{Constraint, ConstraintResult, SchemaSnapshot, TableData};

/// Evaluator and predicate registries bundled for repeated use.
#[derive(Default)]
pub struct Validator {
    registry: EvaluatorRegistry,
    predicates: PredicateRegistry,
}

impl Validator {
    /// Validator with the built-in evaluators.
    pub fn new(predicates: PredicateRegistry) -> Self {
        Self::with_registry(EvaluatorRegistry::new(), predicates)
    }

    pub fn with_registry(registry: EvaluatorRegistry, predicates: PredicateRegistry) -> Self {
        Self {
            registry,
            predicates,
        }
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    /// Reject malformed constraints against a (planned) schema.
    pub fn check_definitions(
        &self,
        constraints: &[Constraint],
        schema: &SchemaSnapshot,
    ) -> QualityResult<()> {
        check_with(&self.registry, &self.predicates, constraints, schema)
    }

    pub fn validate(
        &self,
        data: &TableData,
        constraints: &[Constraint],
    ) -> QualityResult<Vec<ConstraintResult>> {
        self.validate_at(data, constraints, Utc::now().naive_utc())
    }

    /// Like [`validate`](Self::validate) with a fixed reference time.
    pub fn validate_at(
        &self,
        data: &TableData,
        constraints: &[Constraint],
        now: NaiveDateTime,
    ) -> QualityResult<Vec<ConstraintResult>> {
        validate_with(&self.registry, &self.predicates, data, constraints, now)
    }
}

/// Check every constraint definition against `schema` with the built-in
/// evaluators.
pub fn check_definitions(
    constraints: &[Constraint],
    schema: &SchemaSnapshot,
    predicates: &PredicateRegistry,
) -> QualityResult<()> {
    check_with(&EvaluatorRegistry::new(), predicates, constraints, schema)
}

/// Evaluate constraints against `data`, in order.
///
/// Failing constraints are results, not errors; an error means a constraint
/// is malformed for this data (wrong column type, unknown column, bad
/// parameters) or has no evaluator.
pub fn validate(
    data: &TableData,
    constraints: &[Constraint],
    predicates: &PredicateRegistry,
) -> QualityResult<Vec<ConstraintResult>> {
    validate_at(data, constraints, predicates, Utc::now().naive_utc())
}

pub fn validate_at(
    data: &TableData,
    constraints: &[Constraint],
    predicates: &PredicateRegistry,
    now: NaiveDateTime,
) -> QualityResult<Vec<ConstraintResult>> {
    validate_with(&EvaluatorRegistry::new(), predicates, data, constraints, now)
}

fn check_with(
    registry: &EvaluatorRegistry,
    predicates: &PredicateRegistry,
    constraints: &[Constraint],
    schema: &SchemaSnapshot,
) -> QualityResult<()> {
    for constraint in constraints {
        registry
            .get(constraint.tag())?
            .check_definition(constraint, schema, predicates)?;
    }
    Ok(())
}

fn validate_with(
    registry: &EvaluatorRegistry,
    predicates: &PredicateRegistry,
    data: &TableData,
    constraints: &[Constraint],
    now: NaiveDateTime,
) -> QualityResult<Vec<ConstraintResult>> {
    let schema = data.schema();
    check_with(registry, predicates, constraints, &schema)?;

    let ctx = EvalContext {
        data,
        predicates,
        now,
    };
    let mut results = Vec::with_capacity(constraints.len());
    for constraint in constraints {
        let result = registry.get(constraint.tag())?.evaluate(constraint, &ctx)?;
        if !result.passed {
            log::debug!(
                "Constraint {} failed ({}): expected {}, got {}",
                result.id,
                result.severity,
                result.expected,
                result.actual
            );
        }
        results.push(result);
    }
    Ok(results)
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
