//! SQL dialect abstraction

use fs_core::sql_utils::quote_ident;
use fs_core::types::Interval;
use fs_core::{DialectKind, LogicalType};
use sqlparser::dialect::{
    Dialect, DuckDbDialect as SqlParserDuckDb, SnowflakeDialect as SqlParserSnowflake,
};

/// Trait for SQL dialect implementations
pub trait SqlDialect: Send + Sync {
    /// Get the underlying sqlparser dialect
    fn parser_dialect(&self) -> &dyn Dialect;

    /// Which configured dialect this is
    fn kind(&self) -> DialectKind;

    /// Get the dialect name
    fn name(&self) -> &'static str;

    /// Quote an identifier for this dialect
    fn quote_ident(&self, ident: &str) -> String {
        quote_ident(ident)
    }

    /// SQL type used to CAST to a logical type
    fn type_name(&self, ty: LogicalType) -> &'static str;

    /// Predicate selecting rows whose timestamp falls inside a trailing window
    fn window_predicate(&self, ts_column: &str, window: Interval) -> String;

    /// Aggregate call restricted to rows matching `predicate`.
    ///
    /// `function` is the SQL aggregate name (`SUM`, `COUNT`, ...) and
    /// `argument` the already-quoted input column.
    fn filtered_aggregate(
        &self,
        function: &str,
        distinct: bool,
        argument: &str,
        predicate: Option<&str>,
    ) -> String;

    /// Value of `column` on the row with the newest `ts_column`
    fn latest_value(&self, column: &str, ts_column: &str) -> String;

    /// Lowercase names of functions this dialect cannot execute
    fn unsupported_functions(&self) -> &'static [&'static str];

    /// Whether a function (case-insensitive) can be rendered
    fn supports_function(&self, name: &str) -> bool {
        let lower = name.to_ascii_lowercase();
        !self.unsupported_functions().contains(&lower.as_str())
    }
}

/// Create the dialect implementation for a configured dialect kind
pub fn dialect_for(kind: DialectKind) -> Box<dyn SqlDialect> {
    match kind {
        DialectKind::DuckDb => Box::new(DuckDbDialect::new()),
        DialectKind::Snowflake => Box::new(SnowflakeDialect::new()),
    }
}

fn distinct_prefix(distinct: bool) -> &'static str {
    if distinct {
        "DISTINCT "
    } else {
        ""
    }
}

/// DuckDB SQL dialect
pub struct DuckDbDialect {
    dialect: SqlParserDuckDb,
}

impl DuckDbDialect {
    /// Create a new DuckDB dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserDuckDb {},
        }
    }
}

impl Default for DuckDbDialect {
    fn default() -> Self {
        Self::new()
    }
}

const DUCKDB_UNSUPPORTED: &[&str] = &[
    "iff",
    "div0",
    "zeroifnull",
    "dateadd",
    "array_construct",
    "parse_json",
    "to_variant",
];

impl SqlDialect for DuckDbDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DialectKind {
        DialectKind::DuckDb
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn type_name(&self, ty: LogicalType) -> &'static str {
        match ty {
            LogicalType::Bool => "BOOLEAN",
            LogicalType::Int8 => "TINYINT",
            LogicalType::Int16 => "SMALLINT",
            LogicalType::Int32 => "INTEGER",
            LogicalType::Int64 => "BIGINT",
            LogicalType::Uint8 => "UTINYINT",
            LogicalType::Uint16 => "USMALLINT",
            LogicalType::Uint32 => "UINTEGER",
            LogicalType::Uint64 => "UBIGINT",
            LogicalType::Float32 => "FLOAT",
            LogicalType::Float64 => "DOUBLE",
            LogicalType::String => "VARCHAR",
            LogicalType::Date => "DATE",
            LogicalType::Datetime => "TIMESTAMP",
        }
    }

    fn window_predicate(&self, ts_column: &str, window: Interval) -> String {
        let (unit, count) = window.unit_and_count();
        format!(
            "{} >= CAST(now() AS TIMESTAMP) - INTERVAL '{} {}'",
            ts_column,
            count,
            unit.as_str()
        )
    }

    fn filtered_aggregate(
        &self,
        function: &str,
        distinct: bool,
        argument: &str,
        predicate: Option<&str>,
    ) -> String {
        let call = format!("{}({}{})", function, distinct_prefix(distinct), argument);
        match predicate {
            Some(p) => format!("{} FILTER (WHERE {})", call, p),
            None => call,
        }
    }

    fn latest_value(&self, column: &str, ts_column: &str) -> String {
        format!("arg_max({}, {})", column, ts_column)
    }

    fn unsupported_functions(&self) -> &'static [&'static str] {
        DUCKDB_UNSUPPORTED
    }
}

/// Snowflake SQL dialect
pub struct SnowflakeDialect {
    dialect: SqlParserSnowflake,
}

impl SnowflakeDialect {
    /// Create a new Snowflake dialect
    pub fn new() -> Self {
        Self {
            dialect: SqlParserSnowflake {},
        }
    }
}

impl Default for SnowflakeDialect {
    fn default() -> Self {
        Self::new()
    }
}

const SNOWFLAKE_UNSUPPORTED: &[&str] = &[
    "arg_max",
    "arg_min",
    "list_value",
    "list_transform",
    "list_filter",
    "struct_pack",
    "strftime",
    "epoch_ms",
    "regexp_full_match",
];

impl SqlDialect for SnowflakeDialect {
    fn parser_dialect(&self) -> &dyn Dialect {
        &self.dialect
    }

    fn kind(&self) -> DialectKind {
        DialectKind::Snowflake
    }

    fn name(&self) -> &'static str {
        "snowflake"
    }

    fn type_name(&self, ty: LogicalType) -> &'static str {
        match ty {
            LogicalType::Bool => "BOOLEAN",
            LogicalType::Int8 | LogicalType::Int16 | LogicalType::Int32 | LogicalType::Int64 => {
                "NUMBER(38, 0)"
            }
            LogicalType::Uint8
            | LogicalType::Uint16
            | LogicalType::Uint32
            | LogicalType::Uint64 => "NUMBER(20, 0)",
            LogicalType::Float32 | LogicalType::Float64 => "DOUBLE",
            LogicalType::String => "VARCHAR",
            LogicalType::Date => "DATE",
            LogicalType::Datetime => "TIMESTAMP_NTZ",
        }
    }

    fn window_predicate(&self, ts_column: &str, window: Interval) -> String {
        let (unit, count) = window.unit_and_count();
        format!(
            "{} >= DATEADD({}, -{}, CURRENT_TIMESTAMP()::TIMESTAMP_NTZ)",
            ts_column,
            unit.as_str(),
            count
        )
    }

    fn filtered_aggregate(
        &self,
        function: &str,
        distinct: bool,
        argument: &str,
        predicate: Option<&str>,
    ) -> String {
        let input = match predicate {
            Some(p) => format!("CASE WHEN {} THEN {} END", p, argument),
            None => argument.to_string(),
        };
        format!("{}({}{})", function, distinct_prefix(distinct), input)
    }

    fn latest_value(&self, column: &str, ts_column: &str) -> String {
        format!("MAX_BY({}, {})", column, ts_column)
    }

    fn unsupported_functions(&self) -> &'static [&'static str] {
        SNOWFLAKE_UNSUPPORTED
    }
}

#[cfg(test)]
#[path = "dialect_test.rs"]
mod tests;
