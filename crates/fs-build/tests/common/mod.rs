//! In-process collaborators for orchestrator scenarios.
#![allow(dead_code)]

use fs_core::{
    BuildOutcome, BuildRecord, Column, DefinitionSet, DialectKind, FeatureTableDefinition,
    LogicalType, ScalarValue, SchemaField, SchemaSnapshot, SourceDefinition, SourceFormat,
    SourceName, TableData, TableName, WriteMode,
};
use fs_db::{ComputeEngine, DbError, DbResult, TableWriter};
use fs_meta::{MetaError, MetaResult, Registry};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

pub fn name(s: &str) -> TableName {
    TableName::try_new(s).unwrap()
}

fn source(name: &str, fields: Vec<SchemaField>) -> SourceDefinition {
    SourceDefinition {
        name: SourceName::try_new(name).unwrap(),
        path: format!("{name}.parquet"),
        format: SourceFormat::Parquet,
        schema: Some(fields),
    }
}

pub fn table(yaml: &str) -> FeatureTableDefinition {
    serde_yaml::from_str(yaml).unwrap()
}

/// `a` (events) -> `b` -> `c`, plus `d` (clicks) on its own.
///
/// `a_checks` is spliced into the `amount` column of `a`.
pub fn chain(a_checks: &str) -> DefinitionSet {
    chain_with(
        table(&format!(
            "name: a\nfrom: {{ source: events }}\nentity: {{ name: user, join_keys: [user_id] }}\ncolumns:\n  - {{ name: amount{a_checks} }}"
        )),
        vec![],
    )
}

/// The `chain` graph with its own definition of `a` and some extra tables.
pub fn chain_with(a: FeatureTableDefinition, extra: Vec<FeatureTableDefinition>) -> DefinitionSet {
    let mut tables = vec![
        a,
        table("name: b\nfrom: { table: a }\nentity: { name: user, join_keys: [user_id] }\ncolumns:\n  - name: amount"),
        table("name: c\nfrom: { table: b }\nentity: { name: user, join_keys: [user_id] }"),
        table("name: d\nfrom: { source: clicks }\nentity: { name: user, join_keys: [user_id] }\ncolumns:\n  - name: clicks"),
    ];
    tables.extend(extra);
    DefinitionSet::new(
        vec![
            source(
                "events",
                vec![
                    SchemaField::new("user_id", LogicalType::Int64),
                    SchemaField::new("amount", LogicalType::Float64),
                    SchemaField::new("event_ts", LogicalType::Datetime),
                ],
            ),
            source(
                "clicks",
                vec![
                    SchemaField::new("user_id", LogicalType::Int64),
                    SchemaField::new("clicks", LogicalType::Int64),
                ],
            ),
        ],
        tables,
    )
    .unwrap()
}

pub fn ints(name: &str, values: &[i64]) -> Column {
    Column::new(
        name,
        LogicalType::Int64,
        values.iter().map(|v| ScalarValue::Int(*v)).collect(),
    )
}

pub fn floats(name: &str, values: &[f64]) -> Column {
    Column::new(
        name,
        LogicalType::Float64,
        values.iter().map(|v| ScalarValue::Float(*v)).collect(),
    )
}

pub fn data(columns: Vec<Column>) -> TableData {
    TableData::new(columns).unwrap()
}

enum Response {
    Rows(TableData),
    Fail(String),
    Poisoned,
}

/// Engine answering by the relation a query reads.
#[derive(Default)]
pub struct FakeEngine {
    responses: Mutex<HashMap<String, Response>>,
    executed: Mutex<Vec<String>>,
}

impl FakeEngine {
    /// Engine serving the healthy `chain` fixture.
    pub fn for_chain(amounts: &[f64]) -> Self {
        let users: Vec<i64> = (1..=amounts.len() as i64).collect();
        let engine = Self::default();
        let rows = data(vec![ints("user_id", &users), floats("amount", amounts)]);
        engine.respond("events", rows.clone());
        engine.respond("a", rows.clone());
        engine.respond("b", data(vec![ints("user_id", &users)]));
        engine.respond(
            "clicks",
            data(vec![ints("user_id", &users), ints("clicks", &users)]),
        );
        engine
    }

    pub fn respond(&self, relation: &str, rows: TableData) {
        self.responses
            .lock()
            .unwrap()
            .insert(relation.to_string(), Response::Rows(rows));
    }

    pub fn fail(&self, relation: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(relation.to_string(), Response::Fail(message.to_string()));
    }

    pub fn poison(&self, relation: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(relation.to_string(), Response::Poisoned);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

impl ComputeEngine for FakeEngine {
    fn engine_name(&self) -> &'static str {
        "fake"
    }

    fn dialect(&self) -> DialectKind {
        DialectKind::DuckDb
    }

    fn register_source(&self, _name: &str, _path: &Path, _format: SourceFormat) -> DbResult<()> {
        Ok(())
    }

    fn describe(&self, relation: &str) -> DbResult<SchemaSnapshot> {
        Err(DbError::TableNotFound(relation.to_string()))
    }

    fn execute(&self, sql: &str) -> DbResult<TableData> {
        self.executed.lock().unwrap().push(sql.to_string());
        let responses = self.responses.lock().unwrap();
        let hit = responses
            .iter()
            .find(|(relation, _)| sql.contains(&format!("FROM \"{relation}\"")));
        match hit {
            Some((_, Response::Rows(rows))) => Ok(rows.clone()),
            Some((_, Response::Fail(message))) => Err(DbError::ExecutionError(message.clone())),
            Some((relation, Response::Poisoned)) => {
                Err(DbError::MutexPoisoned(format!("lost while reading {relation}")))
            }
            None => Err(DbError::ExecutionError(format!("no response for:\n{sql}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Write {
    pub table: String,
    pub mode: WriteMode,
    pub rows: u64,
    pub merge_keys: Vec<String>,
}

/// Writer remembering every write.
#[derive(Default)]
pub struct FakeWriter {
    writes: Mutex<Vec<Write>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeWriter {
    pub fn fail_table(&self, table: &str) {
        self.failing.lock().unwrap().insert(table.to_string());
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn written_tables(&self) -> Vec<String> {
        self.writes().into_iter().map(|w| w.table).collect()
    }

    pub fn mode_of(&self, table: &str) -> Option<WriteMode> {
        self.writes()
            .into_iter()
            .find(|w| w.table == table)
            .map(|w| w.mode)
    }
}

impl TableWriter for FakeWriter {
    fn write(
        &self,
        table: &str,
        data: &TableData,
        mode: WriteMode,
        merge_keys: &[String],
    ) -> DbResult<u64> {
        if self.failing.lock().unwrap().contains(table) {
            return Err(DbError::InvalidWrite {
                table: table.to_string(),
                message: "disk full".to_string(),
            });
        }
        let rows = data.num_rows() as u64;
        self.writes.lock().unwrap().push(Write {
            table: table.to_string(),
            mode,
            rows,
            merge_keys: merge_keys.to_vec(),
        });
        Ok(rows)
    }

    fn table_exists(&self, table: &str) -> DbResult<bool> {
        Ok(self.written_tables().iter().any(|t| t == table))
    }
}

/// Registry held in memory, optionally refusing reads or writes.
#[derive(Default)]
pub struct FakeRegistry {
    pub(crate) records: Mutex<Vec<BuildRecord>>,
    pub(crate) schemas: Mutex<HashMap<TableName, SchemaSnapshot>>,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl FakeRegistry {
    pub fn with_schema(self, table: &str, schema: SchemaSnapshot) -> Self {
        self.schemas.lock().unwrap().insert(name(table), schema);
        self
    }

    pub fn records(&self) -> Vec<BuildRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn outcome_of(&self, table: &str) -> Option<BuildOutcome> {
        self.records()
            .into_iter()
            .find(|r| r.table == table)
            .map(|r| r.outcome)
    }

    pub fn schema_of(&self, table: &str) -> Option<SchemaSnapshot> {
        self.schemas.lock().unwrap().get(table).cloned()
    }
}

impl Registry for FakeRegistry {
    fn record_build(&self, record: &BuildRecord) -> MetaResult<()> {
        if self.fail_writes {
            return Err(MetaError::QueryError("registry is read-only".to_string()));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn latest_schema(&self, table: &TableName) -> MetaResult<Option<SchemaSnapshot>> {
        if self.fail_reads {
            return Err(MetaError::ConnectionError("registry offline".to_string()));
        }
        Ok(self.schemas.lock().unwrap().get(table).cloned())
    }

    fn save_schema(
        &self,
        table: &TableName,
        _run_id: &str,
        schema: &SchemaSnapshot,
    ) -> MetaResult<()> {
        if self.fail_writes {
            return Err(MetaError::QueryError("registry is read-only".to_string()));
        }
        self.schemas
            .lock()
            .unwrap()
            .insert(table.clone(), schema.clone());
        Ok(())
    }

    fn latest_records(&self) -> MetaResult<HashMap<TableName, BuildRecord>> {
        Ok(self
            .records()
            .into_iter()
            .filter(BuildRecord::succeeded)
            .map(|r| (r.table.clone(), r))
            .collect())
    }
}
