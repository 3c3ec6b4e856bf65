//! Error types for fs-build

use crate::state::TableState;
use fs_core::CoreError;
use fs_db::DbError;
use fs_quality::QualityError;
use fs_sql::CompileError;
use thiserror::Error;

/// Configuration-time errors that abort a run before any table is touched,
/// and engine failures that abort the rest of a run.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Definitions or selection are invalid (B001)
    #[error("[B001] {0}")]
    Definition(#[from] CoreError),

    /// A table cannot be planned (B002)
    #[error("[B002] Compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// A constraint does not fit its table (B003)
    #[error("[B003] Invalid constraint on '{table}': {source}")]
    ConstraintDefinition {
        table: String,
        #[source]
        source: QualityError,
    },

    /// A source cannot be exposed to the engine (B004)
    #[error("[B004] Source '{source_name}' could not be registered: {source}")]
    SourceRegistration {
        source_name: String,
        #[source]
        source: DbError,
    },

    /// Configured dialect differs from the engine's (B005)
    #[error("[B005] Tables are compiled for {configured} but the {engine} engine executes {engine_dialect}")]
    DialectMismatch {
        configured: String,
        engine: String,
        engine_dialect: String,
    },

    /// Illegal state machine transition (B006)
    #[error("[B006] Invalid transition for '{table}': {from} -> {to}")]
    InvalidTransition {
        table: String,
        from: TableState,
        to: TableState,
    },

    /// The engine can no longer serve queries (B007)
    #[error("[B007] Compute engine unavailable: {0}")]
    EngineUnavailable(String),
}

/// Result type alias for BuildError
pub type BuildResult<T> = Result<T, BuildError>;

/// How far a failed step reaches.
#[derive(Debug)]
pub enum StepError {
    /// Fails the current table; its dependents are skipped.
    Table { state: TableState, reason: String },
    /// Fails the current table and stops the run.
    Run(BuildError),
}

impl StepError {
    pub fn table(state: TableState, reason: impl Into<String>) -> Self {
        StepError::Table {
            state,
            reason: reason.into(),
        }
    }

    /// Classify an engine or writer error raised in `state`.
    pub fn from_db(state: TableState, err: DbError) -> Self {
        match err {
            DbError::MutexPoisoned(msg) => StepError::Run(BuildError::EngineUnavailable(msg)),
            other => StepError::table(state, other.to_string()),
        }
    }
}

impl From<BuildError> for StepError {
    fn from(err: BuildError) -> Self {
        StepError::Run(err)
    }
}
