//! Typed tabular results.
//!
//! The fixed column-type vocabulary, the cell value union, and the `Table`
//! container that mock takes and providers exchange.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{RelayError, RelayResult};

/// The fixed vocabulary of semantic column types a CSV type line may name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    DateTime,
    #[default]
    String,
}

impl ColumnType {
    /// Parse a type name from a CSV type line. Blank or unrecognized names
    /// default to `String`.
    pub fn parse_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bool" => ColumnType::Bool,
            "int8" => ColumnType::Int8,
            "int16" => ColumnType::Int16,
            "int32" => ColumnType::Int32,
            "int64" => ColumnType::Int64,
            "float32" => ColumnType::Float32,
            "float64" => ColumnType::Float64,
            "datetime" => ColumnType::DateTime,
            _ => ColumnType::String,
        }
    }

    /// The canonical name of this type.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int8 => "int8",
            ColumnType::Int16 => "int16",
            ColumnType::Int32 => "int32",
            ColumnType::Int64 => "int64",
            ColumnType::Float32 => "float32",
            ColumnType::Float64 => "float64",
            ColumnType::DateTime => "datetime",
            ColumnType::String => "string",
        }
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Missing value
    Null,
    /// Boolean
    Bool(bool),
    /// 8-bit integer
    Int8(i8),
    /// 16-bit integer
    Int16(i16),
    /// 32-bit integer
    Int32(i32),
    /// 64-bit integer
    Int64(i64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// Date and time, no timezone
    DateTime(NaiveDateTime),
    /// Text
    String(String),
}

impl CellValue {
    /// Parse a raw field into the given column type. Returns `None` when the
    /// field does not parse; callers turn that into a `DataConversion` error.
    pub fn parse(ty: ColumnType, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        match ty {
            ColumnType::Bool => match trimmed.to_ascii_lowercase().as_str() {
                "true" => Some(CellValue::Bool(true)),
                "false" => Some(CellValue::Bool(false)),
                _ => None,
            },
            ColumnType::Int8 => trimmed.parse().ok().map(CellValue::Int8),
            ColumnType::Int16 => trimmed.parse().ok().map(CellValue::Int16),
            ColumnType::Int32 => trimmed.parse().ok().map(CellValue::Int32),
            ColumnType::Int64 => trimmed.parse().ok().map(CellValue::Int64),
            ColumnType::Float32 => trimmed.parse().ok().map(CellValue::Float32),
            ColumnType::Float64 => trimmed.parse().ok().map(CellValue::Float64),
            ColumnType::DateTime => parse_datetime(trimmed).map(CellValue::DateTime),
            ColumnType::String => Some(CellValue::String(raw.to_string())),
        }
    }

    /// The column type this value belongs to, `None` for `Null`.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            CellValue::Null => None,
            CellValue::Bool(_) => Some(ColumnType::Bool),
            CellValue::Int8(_) => Some(ColumnType::Int8),
            CellValue::Int16(_) => Some(ColumnType::Int16),
            CellValue::Int32(_) => Some(ColumnType::Int32),
            CellValue::Int64(_) => Some(ColumnType::Int64),
            CellValue::Float32(_) => Some(ColumnType::Float32),
            CellValue::Float64(_) => Some(ColumnType::Float64),
            CellValue::DateTime(_) => Some(ColumnType::DateTime),
            CellValue::String(_) => Some(ColumnType::String),
        }
    }
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Null => write!(f, "NULL"),
            CellValue::Bool(v) => write!(f, "{}", v),
            CellValue::Int8(v) => write!(f, "{}", v),
            CellValue::Int16(v) => write!(f, "{}", v),
            CellValue::Int32(v) => write!(f, "{}", v),
            CellValue::Int64(v) => write!(f, "{}", v),
            CellValue::Float32(v) => write!(f, "{}", v),
            CellValue::Float64(v) => write!(f, "{}", v),
            CellValue::DateTime(v) => write!(f, "{}", v),
            CellValue::String(v) => write!(f, "{}", v),
        }
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        CellValue::Int32(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int64(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float64(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::String(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::String(v)
    }
}

/// One column of a [`Table`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
}

/// An ordered, typed tabular result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column definition.
    pub fn add_column(&mut self, name: impl Into<String>, ty: ColumnType) {
        self.columns.push(Column {
            name: name.into(),
            ty,
        });
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append one row. The row must have exactly one cell per column.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> RelayResult<()> {
        if row.len() != self.columns.len() {
            return Err(RelayError::definition(format!(
                "row has {} cells but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// The cell at `(row, column)`, if present.
    pub fn value(&self, row: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// The first column of the first row: the scalar view of this table.
    pub fn scalar(&self) -> Option<CellValue> {
        self.value(0, 0).cloned()
    }

    /// A forward-only reader over a copy of this table's rows.
    pub fn reader(&self) -> RowReader {
        self.clone().into_reader()
    }

    /// Consume the table into a forward-only row reader.
    pub fn into_reader(self) -> RowReader {
        RowReader {
            columns: self.columns,
            rows: self.rows.into_iter(),
        }
    }
}

/// A forward-only iterator over the rows of a [`Table`].
#[derive(Debug)]
pub struct RowReader {
    columns: Vec<Column>,
    rows: std::vec::IntoIter<Vec<CellValue>>,
}

impl RowReader {
    /// A reader with no columns and no rows.
    pub fn empty() -> Self {
        Table::new().into_reader()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Rows not yet consumed.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl Iterator for RowReader {
    type Item = Vec<CellValue>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next()
    }
}
