//! Logical column types and duration literals.

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical type of a column, independent of any SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    String,
    Date,
    #[serde(alias = "timestamp")]
    Datetime,
}

impl LogicalType {
    /// Canonical lowercase name, as written in table definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalType::Bool => "bool",
            LogicalType::Int8 => "int8",
            LogicalType::Int16 => "int16",
            LogicalType::Int32 => "int32",
            LogicalType::Int64 => "int64",
            LogicalType::Uint8 => "uint8",
            LogicalType::Uint16 => "uint16",
            LogicalType::Uint32 => "uint32",
            LogicalType::Uint64 => "uint64",
            LogicalType::Float32 => "float32",
            LogicalType::Float64 => "float64",
            LogicalType::String => "string",
            LogicalType::Date => "date",
            LogicalType::Datetime => "datetime",
        }
    }

    pub fn is_signed_int(&self) -> bool {
        matches!(
            self,
            LogicalType::Int8 | LogicalType::Int16 | LogicalType::Int32 | LogicalType::Int64
        )
    }

    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            LogicalType::Uint8 | LogicalType::Uint16 | LogicalType::Uint32 | LogicalType::Uint64
        )
    }

    pub fn is_integer(&self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    pub fn is_float(&self) -> bool {
        matches!(self, LogicalType::Float32 | LogicalType::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, LogicalType::Date | LogicalType::Datetime)
    }

    /// Types whose values can be enumerated in an `allowed_values` set.
    pub fn is_categorical(&self) -> bool {
        matches!(self, LogicalType::Bool | LogicalType::String) || self.is_integer()
    }

    /// Bit width of numeric types, `None` for everything else.
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            LogicalType::Int8 | LogicalType::Uint8 => Some(8),
            LogicalType::Int16 | LogicalType::Uint16 => Some(16),
            LogicalType::Int32 | LogicalType::Uint32 | LogicalType::Float32 => Some(32),
            LogicalType::Int64 | LogicalType::Uint64 | LogicalType::Float64 => Some(64),
            _ => None,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogicalType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s.trim().to_ascii_lowercase().as_str() {
            "bool" | "boolean" => LogicalType::Bool,
            "int8" => LogicalType::Int8,
            "int16" => LogicalType::Int16,
            "int32" | "int" => LogicalType::Int32,
            "int64" => LogicalType::Int64,
            "uint8" => LogicalType::Uint8,
            "uint16" => LogicalType::Uint16,
            "uint32" => LogicalType::Uint32,
            "uint64" => LogicalType::Uint64,
            "float32" => LogicalType::Float32,
            "float64" | "float" | "double" => LogicalType::Float64,
            "string" | "str" => LogicalType::String,
            "date" => LogicalType::Date,
            "datetime" | "timestamp" => LogicalType::Datetime,
            _ => {
                return Err(CoreError::UnknownType {
                    name: s.to_string(),
                })
            }
        };
        Ok(ty)
    }
}

/// Unit used when rendering an [`Interval`] into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Day,
    Hour,
    Minute,
    Second,
}

impl IntervalUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Day => "day",
            IntervalUnit::Hour => "hour",
            IntervalUnit::Minute => "minute",
            IntervalUnit::Second => "second",
        }
    }

    fn suffix(&self) -> char {
        match self {
            IntervalUnit::Day => 'd',
            IntervalUnit::Hour => 'h',
            IntervalUnit::Minute => 'm',
            IntervalUnit::Second => 's',
        }
    }

    fn seconds(&self) -> u64 {
        match self {
            IntervalUnit::Day => 86_400,
            IntervalUnit::Hour => 3_600,
            IntervalUnit::Minute => 60,
            IntervalUnit::Second => 1,
        }
    }
}

/// A positive duration written as `<n><unit>` (`90d`, `6h`, `30m`, `45s`).
///
/// Used for aggregation windows and SLA staleness bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Interval {
    seconds: u64,
}

impl Interval {
    pub fn from_secs(seconds: u64) -> Self {
        Self { seconds }
    }

    pub fn days(n: u64) -> Self {
        Self::from_secs(n * IntervalUnit::Day.seconds())
    }

    pub fn hours(n: u64) -> Self {
        Self::from_secs(n * IntervalUnit::Hour.seconds())
    }

    pub fn as_secs(&self) -> u64 {
        self.seconds
    }

    pub fn to_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::try_from(self.seconds).unwrap_or(i64::MAX))
    }

    /// Largest unit that divides the interval exactly, with its count.
    pub fn unit_and_count(&self) -> (IntervalUnit, u64) {
        for unit in [IntervalUnit::Day, IntervalUnit::Hour, IntervalUnit::Minute] {
            if self.seconds % unit.seconds() == 0 {
                return (unit, self.seconds / unit.seconds());
            }
        }
        (IntervalUnit::Second, self.seconds)
    }
}

impl FromStr for Interval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || CoreError::InvalidDuration {
            value: s.to_string(),
        };
        let trimmed = s.trim();
        let unit = match trimmed.chars().last() {
            Some('d') => IntervalUnit::Day,
            Some('h') => IntervalUnit::Hour,
            Some('m') => IntervalUnit::Minute,
            Some('s') => IntervalUnit::Second,
            _ => return Err(invalid()),
        };
        let count: u64 = trimmed[..trimmed.len() - 1]
            .parse()
            .map_err(|_| invalid())?;
        if count == 0 {
            return Err(invalid());
        }
        let seconds = count.checked_mul(unit.seconds()).ok_or_else(invalid)?;
        Ok(Self { seconds })
    }
}

impl TryFrom<String> for Interval {
    type Error = CoreError;

    fn try_from(s: String) -> CoreResult<Self> {
        s.parse()
    }
}

impl From<Interval> for String {
    fn from(i: Interval) -> Self {
        i.to_string()
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (unit, count) = self.unit_and_count();
        write!(f, "{}{}", count, unit.suffix())
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
