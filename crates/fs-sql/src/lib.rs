//! fs-sql - Query compiler for Featherstore
//!
//! Compilation runs in two phases. [`plan`] resolves every column a feature
//! table references, infers output types and produces a dialect-neutral
//! [`LogicalPlan`]. [`render`] turns a plan into SQL for a target dialect.
//! Both phases are pure: nothing here touches a database.

pub mod compiler;
pub mod dialect;
pub mod error;
pub mod expr;
pub mod ir;
pub mod render;

pub use compiler::{compile, plan, plan_all, CompiledQuery, PlanSet, SchemaCatalog};
pub use dialect::{dialect_for, DuckDbDialect, SnowflakeDialect, SqlDialect};
pub use error::{CompileError, CompileResult, RenderError, RenderResult};
pub use ir::{AggregateOp, LogicalOp, LogicalPlan, OutputColumn, OutputExpr, PlanMode};
pub use render::render;
