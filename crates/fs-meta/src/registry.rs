//! The registry collaborator driven by the build orchestrator.

use crate::connection::MetaDb;
use crate::error::MetaResult;
use crate::{query, record};
use fs_core::{BuildRecord, SchemaSnapshot, TableName};
use std::collections::HashMap;

/// Long-term store of build history.
///
/// The orchestrator treats every write as best-effort and every schema read
/// failure as "no previous schema".
pub trait Registry: Send + Sync {
    /// Persist a finalized build record together with its constraint results.
    fn record_build(&self, record: &BuildRecord) -> MetaResult<()>;

    /// Schema written by the most recent successful build of `table`.
    fn latest_schema(&self, table: &TableName) -> MetaResult<Option<SchemaSnapshot>>;

    /// Store the schema a build produced.
    fn save_schema(
        &self,
        table: &TableName,
        run_id: &str,
        schema: &SchemaSnapshot,
    ) -> MetaResult<()>;

    /// Most recent successful build record of every table.
    fn latest_records(&self) -> MetaResult<HashMap<TableName, BuildRecord>>;
}

impl Registry for MetaDb {
    fn record_build(&self, build: &BuildRecord) -> MetaResult<()> {
        self.transaction(|conn| record::insert_build_record(conn, build).map(|_| ()))
    }

    fn latest_schema(&self, table: &TableName) -> MetaResult<Option<SchemaSnapshot>> {
        self.with_conn(|conn| query::latest_schema(conn, table))
    }

    fn save_schema(
        &self,
        table: &TableName,
        run_id: &str,
        schema: &SchemaSnapshot,
    ) -> MetaResult<()> {
        self.with_conn(|conn| record::insert_schema_snapshot(conn, table, run_id, schema))
    }

    fn latest_records(&self) -> MetaResult<HashMap<TableName, BuildRecord>> {
        self.with_conn(query::latest_successful_records)
    }
}

/// Registry used when `registry.enabled` is false: stores nothing and
/// remembers nothing, so every build looks like a first build.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRegistry;

impl Registry for NullRegistry {
    fn record_build(&self, _record: &BuildRecord) -> MetaResult<()> {
        Ok(())
    }

    fn latest_schema(&self, _table: &TableName) -> MetaResult<Option<SchemaSnapshot>> {
        Ok(None)
    }

    fn save_schema(
        &self,
        _table: &TableName,
        _run_id: &str,
        _schema: &SchemaSnapshot,
    ) -> MetaResult<()> {
        Ok(())
    }

    fn latest_records(&self) -> MetaResult<HashMap<TableName, BuildRecord>> {
        Ok(HashMap::new())
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
