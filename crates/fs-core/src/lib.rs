//! fs-core - Core library for Featherstore
//!
//! This crate provides the shared data model used across all Featherstore
//! components: feature table definitions, logical types and schema snapshots,
//! schema evolution, constraints, build records, columnar result data, the
//! dependency graph resolver, and project configuration loading.

pub mod build_record;
pub mod config;
pub mod constraint;
pub mod dag;
pub mod data;
pub mod error;
pub mod feature_table;
mod newtype_string;
pub mod project;
pub mod schema;
pub mod schema_evolution;
pub(crate) mod serde_helpers;
pub mod sql_utils;
pub mod table_name;
pub mod types;

pub use build_record::{BuildOutcome, BuildRecord, BuildRecordDraft};
pub use config::{Config, DialectKind, SourceDefinition, SourceFormat};
pub use constraint::{
    Constraint, ConstraintKind, ConstraintResult, ConstraintTag, ConstraintTarget, Diagnostic,
    Literal, Severity,
};
pub use dag::FeatureDag;
pub use data::{Column, ScalarValue, TableData};
pub use error::{CoreError, CoreResult};
pub use feature_table::{
    AggFunction, AggregateSpec, Entity, FeatureField, FeatureTableDefinition, FieldChecks, Sla,
    SourceRef, TransformSpec, WriteMode,
};
pub use project::{DefinitionSet, Project};
pub use schema::{SchemaField, SchemaSnapshot};
pub use schema_evolution::{
    diff_schemas, FieldChange, FieldChangeKind, MigrationAction, SchemaEvolution,
};
pub use table_name::{SourceName, TableName};
pub use types::{Interval, IntervalUnit, LogicalType};
