//! Conversions between DuckDB values/types and the logical model.

use crate::error::{DbError, DbResult};
use chrono::{DateTime, NaiveDate};
use duckdb::types::{TimeUnit, Value};
use fs_core::sql_utils::string_literal;
use fs_core::{LogicalType, ScalarValue};

/// DuckDB column type used to store a logical type.
pub(crate) fn duckdb_type(ty: LogicalType) -> &'static str {
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

/// Logical type of a DuckDB column type as reported by `DESCRIBE`.
pub(crate) fn logical_type(column: &str, type_name: &str) -> DbResult<LogicalType> {
    let upper = type_name.trim().to_ascii_uppercase();
    let ty = match upper.as_str() {
        "BOOLEAN" | "BOOL" => LogicalType::Bool,
        "TINYINT" | "INT1" => LogicalType::Int8,
        "SMALLINT" | "INT2" => LogicalType::Int16,
        "INTEGER" | "INT" | "INT4" => LogicalType::Int32,
        // SUM over integers yields HUGEINT; values are narrowed on fetch
        "BIGINT" | "INT8" | "HUGEINT" => LogicalType::Int64,
        "UTINYINT" => LogicalType::Uint8,
        "USMALLINT" => LogicalType::Uint16,
        "UINTEGER" => LogicalType::Uint32,
        "UBIGINT" => LogicalType::Uint64,
        "FLOAT" | "REAL" | "FLOAT4" => LogicalType::Float32,
        "DOUBLE" | "FLOAT8" => LogicalType::Float64,
        "VARCHAR" | "TEXT" | "STRING" => LogicalType::String,
        "DATE" => LogicalType::Date,
        "TIMESTAMP" | "DATETIME" | "TIMESTAMP_S" | "TIMESTAMP_MS" | "TIMESTAMP_NS"
        | "TIMESTAMP WITH TIME ZONE" | "TIMESTAMPTZ" => LogicalType::Datetime,
        other if other.starts_with("DECIMAL") || other.starts_with("NUMERIC") => {
            LogicalType::Float64
        }
        _ => {
            return Err(DbError::UnsupportedType {
                column: column.to_string(),
                type_name: type_name.to_string(),
            })
        }
    };
    Ok(ty)
}

/// 1970-01-01
fn epoch() -> NaiveDate {
    NaiveDate::default()
}

fn to_micros(unit: TimeUnit, value: i64) -> i64 {
    match unit {
        TimeUnit::Second => value.saturating_mul(1_000_000),
        TimeUnit::Millisecond => value.saturating_mul(1_000),
        TimeUnit::Microsecond => value,
        TimeUnit::Nanosecond => value / 1_000,
    }
}

/// Convert a fetched DuckDB value into a scalar.
pub(crate) fn to_scalar(value: Value) -> DbResult<ScalarValue> {
    let scalar = match value {
        Value::Null => ScalarValue::Null,
        Value::Boolean(b) => ScalarValue::Bool(b),
        Value::TinyInt(v) => ScalarValue::Int(v.into()),
        Value::SmallInt(v) => ScalarValue::Int(v.into()),
        Value::Int(v) => ScalarValue::Int(v.into()),
        Value::BigInt(v) => ScalarValue::Int(v),
        Value::HugeInt(v) => ScalarValue::Int(i64::try_from(v).map_err(|_| {
            DbError::ConversionError(format!("HUGEINT {} does not fit in int64", v))
        })?),
        Value::UTinyInt(v) => ScalarValue::UInt(v.into()),
        Value::USmallInt(v) => ScalarValue::UInt(v.into()),
        Value::UInt(v) => ScalarValue::UInt(v.into()),
        Value::UBigInt(v) => ScalarValue::UInt(v),
        Value::Float(v) => ScalarValue::Float(v.into()),
        Value::Double(v) => ScalarValue::Float(v),
        Value::Decimal(d) => {
            let text = d.to_string();
            ScalarValue::Float(text.parse().map_err(|_| {
                DbError::ConversionError(format!("DECIMAL {} is not a valid float", text))
            })?)
        }
        Value::Text(s) => ScalarValue::Str(s),
        Value::Date32(days) => ScalarValue::Date(
            epoch()
                .checked_add_signed(chrono::Duration::days(days.into()))
                .ok_or_else(|| DbError::ConversionError(format!("DATE out of range: {}", days)))?,
        ),
        Value::Timestamp(unit, v) => {
            let micros = to_micros(unit, v);
            ScalarValue::Datetime(
                DateTime::from_timestamp_micros(micros)
                    .ok_or_else(|| {
                        DbError::ConversionError(format!("TIMESTAMP out of range: {}", micros))
                    })?
                    .naive_utc(),
            )
        }
        other => {
            return Err(DbError::ConversionError(format!(
                "unsupported value {:?}",
                other
            )))
        }
    };
    Ok(scalar)
}

/// SQL literal for a scalar, typed so DuckDB does not have to guess.
pub(crate) fn sql_literal(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Null => "NULL".to_string(),
        ScalarValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        ScalarValue::Int(v) => v.to_string(),
        ScalarValue::UInt(v) => v.to_string(),
        ScalarValue::Float(v) if v.is_finite() => format!("{:?}", v),
        ScalarValue::Float(v) => format!("CAST('{}' AS DOUBLE)", v),
        ScalarValue::Str(s) => string_literal(s),
        ScalarValue::Date(d) => format!("DATE '{}'", d.format("%Y-%m-%d")),
        ScalarValue::Datetime(ts) => format!("TIMESTAMP '{}'", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
    }
}

#[cfg(test)]
#[path = "convert_test.rs"]
mod tests;
