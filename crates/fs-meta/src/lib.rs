//! Build history registry for Featherstore.
//!
//! Provides the [`Registry`] collaborator the build orchestrator persists to,
//! and a DuckDB-backed implementation at `target/registry.duckdb` holding
//! build records, constraint results and the schema snapshot of every
//! successful build.

pub mod connection;
pub mod ddl;
pub mod error;
pub mod migration;
pub mod query;
pub mod record;
pub mod registry;

pub use connection::MetaDb;
pub use error::{MetaError, MetaResult};
pub use registry::{NullRegistry, Registry};
