//! Provider-shaped tables.
//!
//! Adapters translate wire payloads into a `RawFrame`: named columns plus rows of
//! loosely typed `Field`s. Normalization (see `schema`) projects a frame onto one
//! of the fixed output schemas.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Float(f64),
    Int(i64),
    Text(String),
}

impl Field {
    /// Numeric view of the cell; text is parsed, everything else is `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Field::Float(v) => Some(*v),
            Field::Int(v) => Some(*v as f64),
            Field::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    /// Float cell that maps NaN to `Null`.
    pub fn float(v: f64) -> Self {
        if v.is_nan() {
            Field::Null
        } else {
            Field::Float(v)
        }
    }

    pub fn opt_float(v: Option<f64>) -> Self {
        v.map_or(Field::Null, Field::float)
    }

    pub fn opt_int(v: Option<i64>) -> Self {
        v.map_or(Field::Null, Field::Int)
    }

    pub fn opt_text(v: Option<impl Into<String>>) -> Self {
        v.map_or(Field::Null, |s| Field::Text(s.into()))
    }
}

/// CSV cell rendering. `Null` renders as an empty cell.
impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Null => Ok(()),
            Field::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Field::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Field::Float(v) => write!(f, "{v}"),
            Field::Int(v) => write!(f, "{v}"),
            Field::Text(s) => f.write_str(s),
        }
    }
}

/// Column-named table as returned by a source adapter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Field>>,
}

impl RawFrame {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Short rows are padded with `Null`, long rows truncated,
    /// so every row has exactly one cell per column.
    pub fn push_row(&mut self, mut row: Vec<Field>) {
        row.resize(self.columns.len(), Field::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Field>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<Field>> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, matched case-insensitively and ignoring
    /// surrounding whitespace.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.trim().eq_ignore_ascii_case(name.trim()))
    }
}
