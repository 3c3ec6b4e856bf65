//! fs-db - Compute engine and storage layer for Featherstore
//!
//! This crate provides the `ComputeEngine` and `TableWriter` traits the
//! build orchestrator drives, and a DuckDB implementation of both.

mod convert;
pub mod duckdb;
pub mod error;
pub mod traits;

pub use duckdb::DuckDbBackend;
pub use error::{DbError, DbResult};
pub use traits::{ComputeEngine, TableWriter};
