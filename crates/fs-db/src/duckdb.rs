//! DuckDB compute engine and table writer

use crate::convert::{duckdb_type, logical_type, sql_literal, to_scalar};
use crate::error::{DbError, DbResult};
use crate::traits::{ComputeEngine, TableWriter};
use duckdb::types::Value;
use duckdb::Connection;
use fs_core::sql_utils::{quote_ident, quote_ident_list, string_literal};
use fs_core::{
    diff_schemas, Column, DialectKind, FieldChangeKind, SchemaField, SchemaSnapshot,
    SourceFormat, TableData, WriteMode,
};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Rows per INSERT statement when writing
const INSERT_BATCH_ROWS: usize = 500;

const STAGE_PREFIX: &str = "__fstore_stage_";

/// DuckDB backend: executes compiled queries and stores feature tables in
/// the same database, so downstream tables can read upstream ones.
pub struct DuckDbBackend {
    conn: Mutex<Connection>,
}

impl DuckDbBackend {
    /// Create a new in-memory DuckDB connection
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create a new DuckDB connection from a file path
    pub fn from_path(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DbError::ConnectionError(format!("{}: {}", parent.display(), e))
            })?;
        }
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create from path string (handles :memory: special case)
    pub fn new(path: &str) -> DbResult<Self> {
        if path == ":memory:" {
            Self::in_memory()
        } else {
            Self::from_path(Path::new(path))
        }
    }

    fn lock(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DbError::MutexPoisoned(e.to_string()))
    }

    /// Execute one or more statements that return no rows
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(sql)
            .map_err(|e| DbError::ExecutionError(format!("{}: {}", e, sql)))
    }

    /// Run `body` inside BEGIN / COMMIT, rolling back on error.
    fn with_transaction<F, T>(conn: &Connection, body: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        conn.execute_batch("BEGIN TRANSACTION")?;
        let result = body(conn);
        match &result {
            Ok(_) => {
                if let Err(e) = conn.execute_batch("COMMIT") {
                    let _ = conn.execute_batch("ROLLBACK");
                    return Err(DbError::ExecutionError(format!("COMMIT failed: {}", e)));
                }
            }
            Err(_) => {
                let _ = conn.execute_batch("ROLLBACK");
            }
        }
        result
    }

    fn relation_exists_with(conn: &Connection, name: &str) -> DbResult<bool> {
        let sql = format!(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = 'main' AND table_name = {}",
            string_literal(name)
        );
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// Column names and types of the rows a statement produces.
    fn describe_with(conn: &Connection, describe_sql: &str) -> DbResult<SchemaSnapshot> {
        let mut stmt = conn.prepare(describe_sql)?;
        let pairs: Vec<(String, String)> = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        let fields = pairs
            .into_iter()
            .map(|(name, type_name)| {
                let dtype = logical_type(&name, &type_name)?;
                Ok(SchemaField::new(&name, dtype))
            })
            .collect::<DbResult<Vec<_>>>()?;
        Ok(SchemaSnapshot::new(fields))
    }

    fn create_table(
        conn: &Connection,
        table: &str,
        data: &TableData,
        replace: bool,
    ) -> DbResult<()> {
        let columns: Vec<String> = data
            .columns()
            .iter()
            .map(|c| format!("{} {}", quote_ident(&c.name), duckdb_type(c.dtype)))
            .collect();
        let create = if replace {
            "CREATE OR REPLACE TABLE"
        } else {
            "CREATE TABLE IF NOT EXISTS"
        };
        conn.execute_batch(&format!(
            "{} {} ({})",
            create,
            quote_ident(table),
            columns.join(", ")
        ))?;
        Ok(())
    }

    /// Widen stored columns whose type the new result has widened, so rows
    /// written by earlier builds and the new rows share one column type.
    fn widen_columns(conn: &Connection, table: &str, data: &TableData) -> DbResult<()> {
        if !Self::relation_exists_with(conn, table)? {
            return Ok(());
        }
        let stored = Self::describe_with(conn, &format!("DESCRIBE {}", quote_ident(table)))?;
        for change in diff_schemas(&stored, &data.schema()) {
            let (FieldChangeKind::Widened, Some(new_type)) = (change.kind, change.new_type) else {
                continue;
            };
            log::debug!(
                "Widening '{}.{}' to {}",
                table,
                change.name,
                duckdb_type(new_type)
            );
            conn.execute_batch(&format!(
                "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                quote_ident(table),
                quote_ident(&change.name),
                duckdb_type(new_type)
            ))?;
        }
        Ok(())
    }

    fn insert_rows(conn: &Connection, table: &str, data: &TableData) -> DbResult<u64> {
        let names: Vec<&str> = data.columns().iter().map(|c| c.name.as_str()).collect();
        let prefix = format!(
            "INSERT INTO {} ({}) VALUES ",
            quote_ident(table),
            quote_ident_list(&names)
        );
        let rows = data.num_rows();
        let mut start = 0;
        while start < rows {
            let end = (start + INSERT_BATCH_ROWS).min(rows);
            let tuples: Vec<String> = (start..end)
                .map(|i| {
                    let values: Vec<String> = data.row(i).into_iter().map(sql_literal).collect();
                    format!("({})", values.join(", "))
                })
                .collect();
            conn.execute_batch(&format!("{}{}", prefix, tuples.join(", ")))?;
            start = end;
        }
        Ok(rows as u64)
    }

    fn upsert(
        conn: &Connection,
        table: &str,
        data: &TableData,
        merge_keys: &[String],
    ) -> DbResult<u64> {
        if merge_keys.is_empty() {
            return Err(DbError::InvalidWrite {
                table: table.to_string(),
                message: "upsert requires merge keys".to_string(),
            });
        }
        if let Some(missing) = merge_keys.iter().find(|k| data.column(k).is_none()) {
            return Err(DbError::InvalidWrite {
                table: table.to_string(),
                message: format!("merge key '{}' is not a column of the result", missing),
            });
        }

        let stage = format!("{}{}", STAGE_PREFIX, table);
        Self::widen_columns(conn, table, data)?;
        Self::create_table(conn, table, data, false)?;
        Self::create_table(conn, &stage, data, true)?;
        Self::insert_rows(conn, &stage, data)?;

        let matches: Vec<String> = merge_keys
            .iter()
            .map(|k| {
                let k = quote_ident(k);
                format!("{t}.{k} = {s}.{k}", t = quote_ident(table), s = quote_ident(&stage), k = k)
            })
            .collect();
        let replaced = conn.execute(
            &format!(
                "DELETE FROM {} USING {} WHERE {}",
                quote_ident(table),
                quote_ident(&stage),
                matches.join(" AND ")
            ),
            [],
        )?;
        log::debug!("Upsert into '{}' replaced {} existing rows", table, replaced);

        let names: Vec<&str> = data.columns().iter().map(|c| c.name.as_str()).collect();
        let columns = quote_ident_list(&names);
        conn.execute_batch(&format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}; DROP TABLE {}",
            quote_ident(table),
            columns,
            columns,
            quote_ident(&stage),
            quote_ident(&stage)
        ))?;
        Ok(data.num_rows() as u64)
    }
}

impl ComputeEngine for DuckDbBackend {
    fn engine_name(&self) -> &'static str {
        "duckdb"
    }

    fn dialect(&self) -> DialectKind {
        DialectKind::DuckDb
    }

    fn register_source(&self, name: &str, path: &Path, format: SourceFormat) -> DbResult<()> {
        let location = path.display().to_string();
        let has_glob = location.contains('*');
        if !has_glob && !path.exists() {
            return Err(DbError::SourceNotFound {
                name: name.to_string(),
                path: location,
            });
        }
        let reader = match format {
            SourceFormat::Parquet => "read_parquet",
            SourceFormat::Csv => "read_csv_auto",
        };
        let sql = format!(
            "CREATE OR REPLACE VIEW {} AS SELECT * FROM {}({})",
            quote_ident(name),
            reader,
            string_literal(&location)
        );
        log::debug!("Registering source '{}' from {}", name, location);
        self.execute_batch(&sql)
    }

    fn describe(&self, relation: &str) -> DbResult<SchemaSnapshot> {
        let conn = self.lock()?;
        if !Self::relation_exists_with(&conn, relation)? {
            return Err(DbError::TableNotFound(relation.to_string()));
        }
        Self::describe_with(&conn, &format!("DESCRIBE {}", quote_ident(relation)))
    }

    fn execute(&self, sql: &str) -> DbResult<TableData> {
        let conn = self.lock()?;
        let schema = Self::describe_with(&conn, &format!("DESCRIBE SELECT * FROM ({})", sql))?;

        // Width comes from DESCRIBE: DuckDB panics on column_count() before
        // the statement has run.
        let width = schema.len();
        let mut stmt = conn.prepare(sql)?;
        let raw_rows: Vec<Vec<Value>> = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut columns: Vec<Column> = schema
            .fields()
            .iter()
            .map(|f| Column::new(&f.name, f.dtype, Vec::with_capacity(raw_rows.len())))
            .collect();
        for row in raw_rows {
            for (column, value) in columns.iter_mut().zip(row) {
                column.values.push(to_scalar(value)?);
            }
        }
        TableData::new(columns).map_err(|e| DbError::ConversionError(e.to_string()))
    }
}

impl TableWriter for DuckDbBackend {
    fn write(
        &self,
        table: &str,
        data: &TableData,
        mode: WriteMode,
        merge_keys: &[String],
    ) -> DbResult<u64> {
        if data.num_columns() == 0 {
            return Err(DbError::InvalidWrite {
                table: table.to_string(),
                message: "result has no columns".to_string(),
            });
        }
        let conn = self.lock()?;
        let rows = Self::with_transaction(&conn, |conn| match mode {
            WriteMode::Overwrite => {
                Self::create_table(conn, table, data, true)?;
                Self::insert_rows(conn, table, data)
            }
            WriteMode::Append => {
                Self::widen_columns(conn, table, data)?;
                Self::create_table(conn, table, data, false)?;
                Self::insert_rows(conn, table, data)
            }
            WriteMode::Upsert => Self::upsert(conn, table, data, merge_keys),
        })?;
        log::debug!("Wrote {} rows to '{}' ({})", rows, table, mode);
        Ok(rows)
    }

    fn table_exists(&self, table: &str) -> DbResult<bool> {
        let conn = self.lock()?;
        Self::relation_exists_with(&conn, table)
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
