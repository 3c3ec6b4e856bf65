//! Typed columnar result sets produced by the compute engine.

use crate::error::{CoreError, CoreResult};
use crate::schema::{SchemaField, SchemaSnapshot};
use crate::types::LogicalType;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Date(NaiveDate),
    Datetime(NaiveDateTime),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Numeric view of the value. Non-numeric values yield `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::UInt(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Temporal view of the value; dates are promoted to midnight.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            ScalarValue::Datetime(ts) => Some(*ts),
            ScalarValue::Date(d) => d.and_hms_opt(0, 0, 0),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => f.write_str("NULL"),
            ScalarValue::Bool(v) => write!(f, "{v}"),
            ScalarValue::Int(v) => write!(f, "{v}"),
            ScalarValue::UInt(v) => write!(f, "{v}"),
            ScalarValue::Float(v) => write!(f, "{v}"),
            ScalarValue::Str(s) => write!(f, "'{s}'"),
            ScalarValue::Date(d) => write!(f, "{d}"),
            ScalarValue::Datetime(ts) => write!(f, "{ts}"),
        }
    }
}

/// A named, typed column of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub dtype: LogicalType,
    pub values: Vec<ScalarValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, dtype: LogicalType, values: Vec<ScalarValue>) -> Self {
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Iterator over non-null values.
    pub fn non_null(&self) -> impl Iterator<Item = &ScalarValue> {
        self.values.iter().filter(|v| !v.is_null())
    }
}

/// A columnar result set. All columns have the same length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableData {
    columns: Vec<Column>,
}

impl TableData {
    /// Build a result set, rejecting ragged or duplicate columns.
    pub fn new(columns: Vec<Column>) -> CoreResult<Self> {
        if let Some(first) = columns.first() {
            let expected = first.len();
            if let Some(bad) = columns.iter().find(|c| c.len() != expected) {
                return Err(CoreError::InvalidData {
                    message: format!(
                        "column '{}' has {} rows, expected {}",
                        bad.name,
                        bad.len(),
                        expected
                    ),
                });
            }
        }
        for (i, col) in columns.iter().enumerate() {
            if columns[..i].iter().any(|c| c.name == col.name) {
                return Err(CoreError::InvalidData {
                    message: format!("duplicate column '{}'", col.name),
                });
            }
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Values of row `index`, in column order.
    pub fn row(&self, index: usize) -> Vec<&ScalarValue> {
        self.columns.iter().map(|c| &c.values[index]).collect()
    }

    /// Schema of this result set, in column order.
    pub fn schema(&self) -> SchemaSnapshot {
        SchemaSnapshot::new(
            self.columns
                .iter()
                .map(|c| SchemaField::new(&c.name, c.dtype))
                .collect(),
        )
    }

    /// Newest timestamp in a temporal column.
    pub fn max_datetime(&self, column: &str) -> Option<NaiveDateTime> {
        self.column(column)?
            .values
            .iter()
            .filter_map(ScalarValue::as_datetime)
            .max()
    }

    /// Deterministic stride sample keeping `pct` percent of the rows
    /// (at least one row when the data is non-empty).
    pub fn sample(&self, pct: u8) -> TableData {
        let n = self.num_rows();
        if pct >= 100 || n == 0 {
            return self.clone();
        }
        let size = ((n * usize::from(pct)) / 100).max(1);
        let indices: Vec<usize> = (0..size).map(|i| i * n / size).collect();
        self.take(&indices)
    }

    /// One row per distinct `keys` value: the row with the newest `timestamp`
    /// (the first of any tie), or the last row when there is no timestamp.
    /// Entities keep the order of their first appearance.
    pub fn latest_by(&self, keys: &[String], timestamp: Option<&str>) -> CoreResult<TableData> {
        let key_columns = keys
            .iter()
            .map(|k| self.column(k).ok_or_else(|| missing_column(k)))
            .collect::<CoreResult<Vec<_>>>()?;
        let ts_column = timestamp
            .map(|ts| self.column(ts).ok_or_else(|| missing_column(ts)))
            .transpose()?;

        let mut slots: HashMap<Vec<String>, usize> = HashMap::new();
        let mut picked: Vec<usize> = Vec::new();
        for row in 0..self.num_rows() {
            let key: Vec<String> = key_columns
                .iter()
                .map(|c| c.values[row].to_string())
                .collect();
            match slots.get(&key) {
                Some(&slot) => {
                    let newer = ts_column.map_or(true, |c| {
                        c.values[row].as_datetime() > c.values[picked[slot]].as_datetime()
                    });
                    if newer {
                        picked[slot] = row;
                    }
                }
                None => {
                    slots.insert(key, picked.len());
                    picked.push(row);
                }
            }
        }
        Ok(self.take(&picked))
    }

    fn take(&self, indices: &[usize]) -> TableData {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                dtype: c.dtype,
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        TableData { columns }
    }
}

fn missing_column(name: &str) -> CoreError {
    CoreError::InvalidData {
        message: format!("column '{}' not found", name),
    }
}

#[cfg(test)]
#[path = "data_test.rs"]
mod tests;
