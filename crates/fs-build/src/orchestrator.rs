//! Build orchestrator: drives every selected table through its state machine.
//!
//! Tables run one at a time in graph order. A table whose upstream failed (or
//! was itself skipped) moves straight from `pending` to `skipped`; a failure
//! inside a table step fails that table only, unless the engine is gone, in
//! which case the rest of the run is abandoned. Registry writes never change a
//! table's outcome.

use crate::cancel::CancellationToken;
use crate::error::{BuildError, BuildResult, StepError};
use crate::options::BuildOptions;
use crate::plan::{plan_run, RunPlan};
use crate::report::{RunReport, TableResult, TableStatus};
use crate::state::{TableState, TableStateMachine};
use chrono::Utc;
use fs_core::build_record::new_run_id;
use fs_core::{
    BuildOutcome, BuildRecord, BuildRecordDraft, Constraint, ConstraintTarget, DefinitionSet,
    DialectKind, FeatureTableDefinition, SchemaEvolution, SchemaSnapshot, TableData, TableName,
    WriteMode,
};
use fs_db::{ComputeEngine, TableWriter};
use fs_meta::Registry;
use fs_quality::{QualityReport, Validator};
use fs_sql::{dialect_for, CompiledQuery, SqlDialect};
use std::collections::HashMap;
use std::time::Instant;

/// Receives progress events while a run is in flight.
///
/// Every method defaults to doing nothing.
pub trait BuildObserver {
    /// Called once the run plan is known, before the first table starts.
    fn run_started(&self, _run_id: &str, _tables: &[TableName]) {}

    fn state_changed(&self, _table: &TableName, _from: TableState, _to: TableState) {}

    /// Called once per table with its final result.
    fn table_finished(&self, _result: &TableResult) {}
}

struct SilentObserver;

impl BuildObserver for SilentObserver {}

/// Everything a successful table carries from `writing` into `persisting`.
struct Written {
    schema: SchemaSnapshot,
    warnings: Vec<String>,
}

/// Runs builds of one definition set against one engine, writer and registry.
pub struct Orchestrator<'a> {
    definitions: &'a DefinitionSet,
    engine: &'a dyn ComputeEngine,
    writer: &'a dyn TableWriter,
    registry: &'a dyn Registry,
    dialect: Box<dyn SqlDialect>,
    validator: Validator,
    cancel: CancellationToken,
    default_sample_pct: u8,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator compiling for `dialect`, with the built-in constraint
    /// evaluators, no custom predicates and full-data validation.
    pub fn new(
        definitions: &'a DefinitionSet,
        dialect: DialectKind,
        engine: &'a dyn ComputeEngine,
        writer: &'a dyn TableWriter,
        registry: &'a dyn Registry,
    ) -> Self {
        Self {
            definitions,
            engine,
            writer,
            registry,
            dialect: dialect_for(dialect),
            validator: Validator::default(),
            cancel: CancellationToken::new(),
            default_sample_pct: 100,
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sample percentage for tables that do not set `sample_pct`.
    pub fn with_default_sample_pct(mut self, pct: u8) -> Self {
        self.default_sample_pct = pct.clamp(1, 100);
        self
    }

    /// Check the dialect and plan the run without touching any table.
    pub fn plan(&self, options: &BuildOptions) -> BuildResult<RunPlan> {
        if self.engine.dialect() != self.dialect.kind() {
            return Err(BuildError::DialectMismatch {
                configured: self.dialect.kind().to_string(),
                engine: self.engine.engine_name().to_string(),
                engine_dialect: self.engine.dialect().to_string(),
            });
        }
        plan_run(self.definitions, options, self.dialect.as_ref(), &self.validator)
    }

    pub fn run(&self, options: &BuildOptions) -> BuildResult<RunReport> {
        self.run_with_observer(options, &SilentObserver)
    }

    /// Build every selected table.
    ///
    /// Errors are configuration-time aborts only; table failures, skips,
    /// cancellation and engine loss are reported in the [`RunReport`].
    pub fn run_with_observer(
        &self,
        options: &BuildOptions,
        observer: &dyn BuildObserver,
    ) -> BuildResult<RunReport> {
        let started_at = Utc::now();
        let start_time = Instant::now();
        let plan = self.plan(options)?;
        let run_id = options.run_id.clone().unwrap_or_else(new_run_id);

        log::info!(
            "Run {}: building {} tables with the {} engine",
            run_id,
            plan.order.len(),
            self.engine.engine_name()
        );
        observer.run_started(&run_id, &plan.order);

        // Failed or skipped table -> the failed table at the root of it
        let mut blocked: HashMap<TableName, TableName> = HashMap::new();
        let mut tables = Vec::with_capacity(plan.order.len());
        let mut cancelled = false;
        let mut aborted = None;

        for name in &plan.order {
            if aborted.is_some() || cancelled {
                tables.push(TableResult::not_run(name.clone()));
                continue;
            }
            if self.cancel.is_cancelled() {
                log::warn!("Run {} cancelled before '{}'", run_id, name);
                cancelled = true;
                tables.push(TableResult::not_run(name.clone()));
                continue;
            }

            let root_cause = plan
                .dag
                .dependencies(name)
                .iter()
                .find_map(|dep| blocked.get(dep).cloned());

            let result = match root_cause {
                Some(upstream) => self.skip_table(&run_id, name, upstream, observer)?,
                None => {
                    let (result, fatal) =
                        self.build_table(&run_id, name, &plan, options, observer);
                    if let Some(err) = fatal {
                        log::error!("Aborting run {}: {}", run_id, err);
                        aborted = Some(err.to_string());
                    }
                    result
                }
            };

            match result.status {
                TableStatus::Failed => {
                    blocked.insert(name.clone(), name.clone());
                }
                TableStatus::Skipped => {
                    if let Some(upstream) = &result.upstream {
                        blocked.insert(name.clone(), upstream.clone());
                    }
                }
                TableStatus::Succeeded | TableStatus::NotRun => {}
            }
            observer.table_finished(&result);
            tables.push(result);
        }

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            tables,
            cancelled,
            aborted,
        };
        log::info!(
            "Run {} finished: {} succeeded, {} failed, {} skipped",
            report.run_id,
            report.succeeded_count(),
            report.failed_count(),
            report.skipped_count()
        );
        Ok(report)
    }

    fn skip_table(
        &self,
        run_id: &str,
        name: &TableName,
        upstream: TableName,
        observer: &dyn BuildObserver,
    ) -> BuildResult<TableResult> {
        let mut machine = TableStateMachine::new(name.clone());
        machine.transition(TableState::Skipped)?;
        observer.state_changed(name, TableState::Pending, TableState::Skipped);

        let reason = format!("upstream '{}' failed", upstream);
        log::warn!("Skipping '{}': {}", name, reason);
        let record = BuildRecordDraft::open(run_id, name.clone())
            .finalize(BuildOutcome::Skipped, Some(reason.clone()));

        let mut result = TableResult::blank(name.clone(), TableStatus::Skipped, machine.path());
        result.reason = Some(reason);
        result.upstream = Some(upstream);
        self.persist_record(&record, &mut result.warnings);
        Ok(result)
    }

    /// Run one table to a terminal state. The second value is set when the
    /// failure also ends the run.
    fn build_table(
        &self,
        run_id: &str,
        name: &TableName,
        plan: &RunPlan,
        options: &BuildOptions,
        observer: &dyn BuildObserver,
    ) -> (TableResult, Option<BuildError>) {
        let mut machine = TableStateMachine::new(name.clone());
        let mut draft = BuildRecordDraft::open(run_id, name.clone());

        match self.run_steps(&mut machine, &mut draft, plan, options, observer) {
            Ok(written) => {
                let record = draft.finalize(BuildOutcome::Succeeded, None);
                let mut warnings = written.warnings;
                self.persist_record(&record, &mut warnings);
                if let Err(e) = self.registry.save_schema(name, run_id, &written.schema) {
                    log::warn!("Could not save schema of '{}': {}", name, e);
                    warnings.push(format!("schema not saved: {}", e));
                }
                if let Err(e) = self.advance(&mut machine, observer) {
                    return self.fail(machine, record, e, observer);
                }
                log::info!(
                    "Built '{}': {} rows ({}) in {}ms",
                    name,
                    record.rows_written,
                    record.write_mode.unwrap_or_default(),
                    record.duration_ms
                );
                let mut result = table_result(&record, TableStatus::Succeeded, machine.path());
                result.warnings = warnings;
                (result, None)
            }
            Err(err) => {
                let record = draft.finalize(BuildOutcome::Failed, Some(step_reason(&err)));
                self.fail(machine, record, err, observer)
            }
        }
    }

    /// Move a table to `failed` and persist its record.
    fn fail(
        &self,
        mut machine: TableStateMachine,
        record: BuildRecord,
        err: StepError,
        observer: &dyn BuildObserver,
    ) -> (TableResult, Option<BuildError>) {
        let failed_in = machine.state();
        let reason = step_reason(&err);
        log::error!("'{}' failed while {}: {}", machine.table(), failed_in, reason);

        if !machine.state().is_terminal() {
            let from = machine.state();
            if machine.transition(TableState::Failed).is_ok() {
                observer.state_changed(machine.table(), from, TableState::Failed);
            }
        }

        let mut result = table_result(&record, TableStatus::Failed, machine.path());
        result.failed_in = Some(failed_in);
        result.reason = Some(reason);
        self.persist_record(&record, &mut result.warnings);

        let fatal = match err {
            StepError::Run(e) => Some(e),
            StepError::Table { .. } => None,
        };
        (result, fatal)
    }

    /// Step one state along the success path.
    fn advance(
        &self,
        machine: &mut TableStateMachine,
        observer: &dyn BuildObserver,
    ) -> Result<TableState, StepError> {
        let from = machine.state();
        let to = machine.advance()?;
        observer.state_changed(machine.table(), from, to);
        Ok(to)
    }

    /// `pending` through `persisting`. Returns at `persisting` with the
    /// schema that was written.
    fn run_steps(
        &self,
        machine: &mut TableStateMachine,
        draft: &mut BuildRecordDraft,
        plan: &RunPlan,
        options: &BuildOptions,
        observer: &dyn BuildObserver,
    ) -> Result<Written, StepError> {
        let name = machine.table().clone();
        let def = self
            .definitions
            .table(&name)
            .ok_or_else(|| StepError::table(TableState::Pending, "definition not found"))?;
        let constraints = plan.constraints.get(&name).map(Vec::as_slice).unwrap_or(&[]);

        self.advance(machine, observer)?; // compiling
        if let Some(reason) = plan.compile_errors.get(&name) {
            return Err(StepError::table(TableState::Compiling, reason.clone()));
        }
        let logical = plan
            .plans
            .get(&name)
            .ok_or_else(|| StepError::table(TableState::Compiling, "table was not planned"))?;
        let query = CompiledQuery::from_plan(logical.clone(), self.dialect.as_ref())
            .map_err(|e| StepError::table(TableState::Compiling, e.to_string()))?;

        self.advance(machine, observer)?; // executing
        log::debug!("Executing '{}':\n{}", name, query.sql);
        let data = self
            .engine
            .execute(&query.sql)
            .map_err(|e| StepError::from_db(TableState::Executing, e))?;
        if let Some(ts) = &def.timestamp_field {
            draft.set_data_timestamp_max(data.max_datetime(ts));
        }

        self.advance(machine, observer)?; // validating
        let mut warnings = Vec::new();
        if options.skip_quality {
            log::debug!("Quality gate skipped for '{}'", name);
        } else {
            let report = self.validate(def, &data, constraints)?;
            for warning in report.warnings() {
                let line = format!(
                    "{}: expected {}, got {}",
                    warning.id, warning.expected, warning.actual
                );
                log::warn!("'{}' constraint warning: {}", name, line);
                warnings.push(line);
            }
            let blocked = report.failure_summary();
            draft.set_constraint_results(report.into_results());
            if let Some(summary) = blocked {
                return Err(StepError::table(TableState::Validating, summary));
            }
        }

        self.advance(machine, observer)?; // writing
        let schema = data.schema();
        let previous = match self.registry.latest_schema(&name) {
            Ok(previous) => previous,
            Err(e) => {
                log::warn!(
                    "Could not read previous schema of '{}', treating as first build: {}",
                    name,
                    e
                );
                None
            }
        };
        let evolution = SchemaEvolution::detect(previous.as_ref(), &schema);
        let mode = self.write_mode(def, options, &evolution);
        let merge_keys = def.effective_merge_keys();
        let rows = self
            .writer
            .write(&name, &data, mode, merge_keys)
            .map_err(|e| StepError::from_db(TableState::Writing, e))?;
        draft.set_write(mode, rows);
        draft.set_schema_changes(evolution.changes);
        if def.online {
            if let Err(e) = self.publish_online(def, &data, mode) {
                log::warn!("Could not publish '{}' online: {}", name, e);
                warnings.push(format!("online table not updated: {}", e));
            }
        }

        self.advance(machine, observer)?; // persisting
        Ok(Written { schema, warnings })
    }

    /// Evaluate constraints in declaration order. Column constraints see the
    /// sample; table constraints (row count, staleness) see every row.
    fn validate(
        &self,
        def: &FeatureTableDefinition,
        data: &TableData,
        constraints: &[Constraint],
    ) -> Result<QualityReport, StepError> {
        let pct = def.sample_pct.unwrap_or(self.default_sample_pct);
        let sample = (pct < 100).then(|| data.sample(pct));
        if let Some(sample) = &sample {
            log::debug!(
                "Validating '{}' on {} of {} rows",
                def.name,
                sample.num_rows(),
                data.num_rows()
            );
        }

        let mut results = Vec::with_capacity(constraints.len());
        for constraint in constraints {
            let input = match (&constraint.target, &sample) {
                (ConstraintTarget::Column(_), Some(sample)) => sample,
                _ => data,
            };
            let evaluated = self
                .validator
                .validate(input, std::slice::from_ref(constraint))
                .map_err(|e| StepError::table(TableState::Validating, e.to_string()))?;
            results.extend(evaluated);
        }
        Ok(QualityReport::new(results))
    }

    /// Declared mode, forced to `overwrite` by a full refresh or by a schema
    /// change that previously written rows cannot absorb.
    fn write_mode(
        &self,
        def: &FeatureTableDefinition,
        options: &BuildOptions,
        evolution: &SchemaEvolution,
    ) -> WriteMode {
        if options.full_refresh {
            return WriteMode::Overwrite;
        }
        if evolution.requires_backfill() && def.write_mode != WriteMode::Overwrite {
            let changes: Vec<String> = evolution.changes.iter().map(|c| c.description()).collect();
            log::warn!(
                "Schema of '{}' changed ({}); rebuilding with overwrite instead of {}",
                def.name,
                changes.join(", "),
                def.write_mode
            );
            return WriteMode::Overwrite;
        }
        def.write_mode
    }

    /// Write the newest row of each entity to the online table. Rows of
    /// entities absent from this build stay as they were, unless the offline
    /// table was rebuilt.
    fn publish_online(
        &self,
        def: &FeatureTableDefinition,
        data: &TableData,
        offline_mode: WriteMode,
    ) -> Result<u64, String> {
        let keys = &def.entity.join_keys;
        let latest = data
            .latest_by(keys, def.timestamp_field.as_deref())
            .map_err(|e| e.to_string())?;
        let mode = match offline_mode {
            WriteMode::Overwrite => WriteMode::Overwrite,
            WriteMode::Append | WriteMode::Upsert => WriteMode::Upsert,
        };
        let table = online_table_name(&def.name);
        let rows = self
            .writer
            .write(&table, &latest, mode, keys)
            .map_err(|e| e.to_string())?;
        log::debug!("Published {} entities of '{}' to '{}'", rows, def.name, table);
        Ok(rows)
    }

    fn persist_record(&self, record: &BuildRecord, warnings: &mut Vec<String>) {
        if let Err(e) = self.registry.record_build(record) {
            log::warn!("Could not record build of '{}': {}", record.table, e);
            warnings.push(format!("build record not saved: {}", e));
        }
    }
}

fn step_reason(err: &StepError) -> String {
    match err {
        StepError::Table { reason, .. } => reason.clone(),
        StepError::Run(e) => e.to_string(),
    }
}

fn table_result(record: &BuildRecord, status: TableStatus, states: Vec<TableState>) -> TableResult {
    let mut result = TableResult::blank(record.table.clone(), status, states);
    result.write_mode = record.write_mode;
    result.rows_written = record.rows_written;
    result.duration_ms = record.duration_ms;
    result.constraint_results = record.constraint_results.clone();
    result.schema_changes = record.schema_changes.clone();
    result
}

/// Name of the table holding the latest features of each entity.
pub fn online_table_name(table: &TableName) -> String {
    format!("{}_online", table)
}
