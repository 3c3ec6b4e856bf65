//! Error types for fs-quality

use fs_core::{ConstraintTag, LogicalType};
use thiserror::Error;

/// Malformed constraint definitions. A constraint that merely fails is not
/// an error; it is reported as a failing `ConstraintResult`.
#[derive(Error, Debug)]
pub enum QualityError {
    /// Constraint targets a column the data does not have (Q001)
    #[error("[Q001] Constraint '{constraint}' references unknown column '{column}'")]
    UnknownColumn { constraint: String, column: String },

    /// Constraint kind does not apply to the column type (Q002)
    #[error("[Q002] Constraint '{constraint}' requires {expected} values, column '{column}' is {dtype}")]
    IncompatibleType {
        constraint: String,
        column: String,
        dtype: LogicalType,
        expected: &'static str,
    },

    /// Threshold outside its valid range (Q003)
    #[error("[Q003] Constraint '{constraint}' has invalid threshold {value}: must be between 0 and 1")]
    InvalidThreshold { constraint: String, value: f64 },

    /// Regular expression does not compile (Q004)
    #[error("[Q004] Constraint '{constraint}' has invalid pattern: {message}")]
    InvalidPattern { constraint: String, message: String },

    /// Range bounds are missing or inverted (Q005)
    #[error("[Q005] Constraint '{constraint}' has invalid bounds: {message}")]
    InvalidBounds { constraint: String, message: String },

    /// Custom predicate is not registered (Q006)
    #[error("[Q006] Constraint '{constraint}' uses unknown predicate '{name}'")]
    UnknownPredicate { constraint: String, name: String },

    /// Constraint kind does not apply to its target (Q007)
    #[error("[Q007] Constraint '{constraint}' cannot be attached to {target}")]
    InvalidTarget { constraint: String, target: String },

    /// No evaluator registered for a constraint kind (Q008)
    #[error("[Q008] No evaluator registered for constraint kind '{tag}'")]
    MissingEvaluator { tag: ConstraintTag },

    /// Allowed-values set is empty (Q009)
    #[error("[Q009] Constraint '{constraint}' has an empty allowed_values set")]
    EmptyAllowedValues { constraint: String },
}

/// Result type alias for QualityError
pub type QualityResult<T> = Result<T, QualityError>;
