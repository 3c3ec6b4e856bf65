//! fs-build - Build orchestrator for Featherstore
//!
//! Drives each selected feature table through
//! `pending → compiling → executing → validating → writing → persisting → succeeded`,
//! in graph order, on one thread. A failed table skips its dependents; a
//! registry failure never changes a table's outcome.

pub mod cancel;
pub mod error;
pub mod options;
pub mod orchestrator;
pub mod plan;
pub mod report;
pub mod sources;
pub mod state;

pub use cancel::CancellationToken;
pub use error::{BuildError, BuildResult, StepError};
pub use options::BuildOptions;
pub use orchestrator::{online_table_name, BuildObserver, Orchestrator};
pub use plan::{plan_run, select_tables, RunPlan};
pub use report::{RunReport, TableResult, TableStatus, EXIT_TABLE_FAILURES};
pub use sources::register_sources;
pub use state::{TableState, TableStateMachine, Transition};
