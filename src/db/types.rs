//! Query result types for threshold-monitor.
//!
//! Defines the raw tabular result returned by a driver and the normalized
//! records a monitoring query produces.

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the result of executing a SQL query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column metadata for the result set.
    pub columns: Vec<ColumnInfo>,

    /// Rows of data, in the order the warehouse returned them.
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Creates a new empty query result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query result with the given columns and rows.
    pub fn with_data(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Returns true if the result set is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Converts the rows into monitoring records.
    ///
    /// Column names are matched case-insensitively, so drivers that report
    /// `ID`, `VALUE`, `DIFFERENCE` work the same as lower-case ones.
    pub fn into_records(self) -> Result<Vec<Record>> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.name.to_lowercase())
            .collect();
        let position = |wanted: &str| {
            names.iter().position(|n| n == wanted).ok_or_else(|| {
                MonitorError::query(format!("result is missing column '{wanted}'"))
            })
        };
        let id = position("id")?;
        let value = position("value")?;
        let difference = position("difference")?;
        let width = names.len();

        self.rows
            .into_iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() < width {
                    return Err(MonitorError::query(format!(
                        "row {} has {} values for {} columns",
                        i + 1,
                        row.len(),
                        width
                    )));
                }
                Ok(Record {
                    id: row[id].clone(),
                    value: row[value].clone(),
                    difference: row[difference].clone(),
                })
            })
            .collect()
    }
}

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name, as reported by the warehouse.
    pub name: String,

    /// Column data type.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// A row of data from a query result.
pub type Row = Vec<Value>;

/// One row that exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Value,
    pub value: Value,
    /// `value - threshold`.
    pub difference: Value,
}

impl Record {
    /// Creates a record from anything convertible to values.
    pub fn new(
        id: impl Into<Value>,
        value: impl Into<Value>,
        difference: impl Into<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            difference: difference.into(),
        }
    }
}

/// Represents a single value from a database query.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub enum Value {
    /// NULL value.
    #[default]
    Null,

    /// Boolean value.
    Bool(bool),

    /// Signed integer (up to i64).
    Int(i64),

    /// Floating point number.
    Float(f64),

    /// Text/string value.
    String(String),
}

impl Value {
    /// Returns true if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts the value to its natural string representation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

/// Formats a float in shortest round-trip form.
///
/// Integral values keep a trailing `.0` (`200.0`). Magnitudes below `1e-4` or
/// from `1e16` up switch to exponent notation with a signed two-digit
/// exponent (`1e-05`, `2.5e+20`).
pub fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "nan".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = f.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return format_exponent(f);
    }
    if f.fract() == 0.0 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn format_exponent(f: f64) -> String {
    let formatted = format!("{f:e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}
