//! Error types for the registry.

use thiserror::Error;

/// Registry errors.
#[derive(Error, Debug)]
pub enum MetaError {
    /// Failed to open or create the registry database (M001).
    #[error("[M001] Registry connection failed: {0}")]
    ConnectionError(String),

    /// Schema migration failed (M002).
    #[error("[M002] Registry migration failed: {0}")]
    MigrationError(String),

    /// SQL execution error inside the registry (M003).
    #[error("[M003] Registry query failed: {0}")]
    QueryError(String),

    /// Transaction management error (M004).
    #[error("[M004] Registry transaction failed: {0}")]
    TransactionError(String),

    /// A stored payload could not be encoded or decoded (M005).
    #[error("[M005] Registry payload serialization failed: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A stored row does not describe a valid record (M006).
    #[error("[M006] Invalid registry record: {0}")]
    InvalidRecord(String),

    /// Connection mutex poisoned by a panicking thread (M007).
    #[error("[M007] Registry mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// DuckDB driver error with preserved source chain (M008).
    #[error("[M008] DuckDB error")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MetaError`].
pub type MetaResult<T> = Result<T, MetaError>;

impl From<duckdb::Error> for MetaError {
    fn from(err: duckdb::Error) -> Self {
        MetaError::DuckDb(err)
    }
}

/// Attach a short description of the failing operation to driver errors.
pub(crate) trait MetaResultExt<T> {
    fn query_context(self, what: &str) -> MetaResult<T>;
}

impl<T> MetaResultExt<T> for Result<T, duckdb::Error> {
    fn query_context(self, what: &str) -> MetaResult<T> {
        self.map_err(|e| MetaError::QueryError(format!("{what}: {e}")))
    }
}
