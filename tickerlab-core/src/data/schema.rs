//! Fixed output schemas and normalization.
//!
//! Every persisted file has one of three headers. Price-like sources (Yahoo,
//! Polygon, synthetic) share `PRICE`, so downstream readers never branch on source.

use super::frame::{Field, RawFrame};
use super::provider::DataError;

/// Static description of one normalized output.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    pub name: &'static str,
    /// Columns the adapter frame must carry.
    pub required: &'static [&'static str],
    /// Header of the persisted file, in order.
    pub output: &'static [&'static str],
    derive_log_returns: bool,
}

pub static PRICE: Schema = Schema {
    name: "price",
    required: &["DATE", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"],
    output: &["DATE", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME", "LOG_RETURNS"],
    derive_log_returns: true,
};

pub static INTEREST: Schema = Schema {
    name: "interest",
    required: &["DATE", "INTEREST"],
    output: &["DATE", "INTEREST"],
    derive_log_returns: false,
};

pub static MESSAGES: Schema = Schema {
    name: "messages",
    required: &[
        "ID",
        "BODY",
        "CREATED_AT",
        "USER_USERNAME",
        "USER_ID",
        "SYMBOLS",
        "SENTIMENT",
    ],
    output: &[
        "ID",
        "BODY",
        "CREATED_AT",
        "USER_USERNAME",
        "USER_ID",
        "SYMBOLS",
        "SENTIMENT",
    ],
    derive_log_returns: false,
};

impl Schema {
    /// Required columns absent from `frame`, in schema order.
    pub fn missing_columns(&self, frame: &RawFrame) -> Vec<String> {
        self.required
            .iter()
            .filter(|col| frame.column_index(col).is_none())
            .map(|col| col.to_string())
            .collect()
    }

    /// Validate and project a frame onto this schema.
    ///
    /// Missing columns win over emptiness: a frame without `CLOSE` is a
    /// schema mismatch even when it has no rows.
    pub fn normalize(&'static self, ticker: &str, frame: RawFrame) -> Result<RecordSet, DataError> {
        let missing = self.missing_columns(&frame);
        if !missing.is_empty() {
            return Err(DataError::SchemaMismatch { missing });
        }
        if frame.is_empty() {
            return Err(DataError::no_data(ticker));
        }

        let indices: Vec<usize> = self
            .required
            .iter()
            .filter_map(|col| frame.column_index(col))
            .collect();

        let mut rows: Vec<Vec<Field>> = frame
            .into_rows()
            .into_iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        if self.derive_log_returns {
            append_log_returns(&mut rows, close_position(self));
        }

        Ok(RecordSet { schema: self, rows })
    }
}

fn close_position(schema: &Schema) -> usize {
    schema
        .required
        .iter()
        .position(|c| *c == "CLOSE")
        .unwrap_or(schema.required.len() - 1)
}

/// ln(close_t / close_{t-1}); null for the first row, for missing closes and
/// for non-finite ratios.
fn append_log_returns(rows: &mut [Vec<Field>], close_idx: usize) {
    let mut prev_close: Option<f64> = None;
    for row in rows.iter_mut() {
        let close = row[close_idx].as_f64().filter(|c| c.is_finite());
        let log_return = match (prev_close, close) {
            (Some(prev), Some(cur)) => {
                let r = (cur / prev).ln();
                if r.is_finite() {
                    Field::Float(r)
                } else {
                    Field::Null
                }
            }
            _ => Field::Null,
        };
        row.push(log_return);
        prev_close = close;
    }
}

/// Normalized rows ready to persist. The header is the schema's output header.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSet {
    schema: &'static Schema,
    rows: Vec<Vec<Field>>,
}

impl RecordSet {
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn header(&self) -> &'static [&'static str] {
        self.schema.output
    }

    pub fn rows(&self) -> &[Vec<Field>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of one output column.
    pub fn column(&self, name: &str) -> Option<Vec<&Field>> {
        let idx = self.schema.output.iter().position(|c| *c == name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }
}
