//! Error types for fs-sql

use thiserror::Error;

/// Errors raised while planning a feature table (reference resolution and
/// type inference).
#[derive(Error, Debug)]
pub enum CompileError {
    /// Column does not exist where it is referenced (C001)
    #[error("[C001] Unresolved reference in '{table}': column '{column}' not found in {scope}")]
    UnresolvedReference {
        table: String,
        column: String,
        scope: String,
    },

    /// Relation read by the table has no known schema (C002)
    #[error("[C002] Unknown relation '{relation}' read by '{table}': no schema available")]
    UnknownRelation { table: String, relation: String },

    /// Transform references an output declared later (C003)
    #[error("[C003] Forward reference in '{table}': '{feature}' uses '{reference}' before it is defined")]
    ForwardReference {
        table: String,
        feature: String,
        reference: String,
    },

    /// Two outputs share a name (C004)
    #[error("[C004] Duplicate output '{name}' in '{table}'")]
    DuplicateOutput { table: String, name: String },

    /// Expression cannot be parsed or is not allowed (C005)
    #[error("[C005] Invalid expression for '{feature}' in '{table}': {message}")]
    InvalidExpression {
        table: String,
        feature: String,
        message: String,
    },

    /// Aggregation is not valid for its input (C006)
    #[error("[C006] Invalid aggregate '{feature}' in '{table}': {message}")]
    InvalidAggregate {
        table: String,
        feature: String,
        message: String,
    },

    /// An upstream table this one reads could not be planned (C007)
    #[error("[C007] '{table}' cannot be planned: upstream '{upstream}' failed to compile")]
    UpstreamNotPlanned { table: String, upstream: String },

    /// Rendering failed (see [`RenderError`])
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors raised while rendering a plan for a specific dialect.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Function cannot be expressed in the target dialect (R001)
    #[error("[R001] Function '{function}' is not supported by the {dialect} dialect")]
    UnsupportedFunction { function: String, dialect: String },
}

/// Result type alias for CompileError
pub type CompileResult<T> = Result<T, CompileError>;

/// Result type alias for RenderError
pub type RenderResult<T> = Result<T, RenderError>;
