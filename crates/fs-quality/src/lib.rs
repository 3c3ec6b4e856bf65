//! fs-quality - Constraint engine for Featherstore
//!
//! Evaluates field and SLA constraints against freshly computed table data
//! before it is written. Failing constraints are ordinary results; only
//! malformed constraint definitions are errors.

pub mod checks;
pub mod error;
pub mod evaluator;
pub mod freshness;
pub mod predicate;
pub mod report;
pub mod validate;

pub use error::{QualityError, QualityResult};
pub use evaluator::{ConstraintEvaluator, EvalContext, EvaluatorRegistry};
pub use freshness::{check_freshness, FreshnessReport, FreshnessStatus, TableFreshness};
pub use predicate::{CustomPredicate, PredicateRegistry};
pub use report::QualityReport;
pub use validate::{check_definitions, validate, validate_at, Validator};
