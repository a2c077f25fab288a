//! Source adapter trait and structured error types.
//!
//! The SourceAdapter trait abstracts over data providers (Yahoo Finance, Polygon,
//! Google Trends, StockTwits, synthetic) so the orchestrator can fan a universe out
//! across any of them and tests can substitute deterministic stubs.

use super::frame::RawFrame;
use super::schema::{Schema, INTEREST, MESSAGES, PRICE};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Inclusive calendar date range. `start <= end` is assumed, not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether `date` falls inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

/// Which provider a record set came from.
///
/// The kind fixes both the output schema and the file tag used in
/// `{ticker}_{tag}.csv`, which downstream consumers rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    YahooFinance,
    Polygon,
    GoogleTrends,
    StockTwits,
    Synthetic,
}

impl SourceKind {
    pub const ALL: [SourceKind; 5] = [
        SourceKind::YahooFinance,
        SourceKind::Polygon,
        SourceKind::GoogleTrends,
        SourceKind::StockTwits,
        SourceKind::Synthetic,
    ];

    /// File tag: `AAPL_yahoo_finance.csv`.
    pub fn file_tag(&self) -> &'static str {
        match self {
            SourceKind::YahooFinance => "yahoo_finance",
            SourceKind::Polygon => "polygon",
            SourceKind::GoogleTrends => "google_trends",
            SourceKind::StockTwits => "stocktwits",
            SourceKind::Synthetic => "synthetic",
        }
    }

    /// Normalized schema for this source.
    pub fn schema(&self) -> &'static Schema {
        match self {
            SourceKind::YahooFinance | SourceKind::Polygon | SourceKind::Synthetic => &PRICE,
            SourceKind::GoogleTrends => &INTEREST,
            SourceKind::StockTwits => &MESSAGES,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.file_tag() == s)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_tag())
    }
}

/// Closed taxonomy of task failures.
///
/// `Cancelled` and `Panicked` are produced by the orchestrator, never by adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Provider returned an empty result.
    NoData,
    /// Transport, HTTP status or malformed payload.
    ProviderError,
    /// Expected columns absent from the provider response.
    SchemaMismatch,
    /// Persistence step failed.
    IoFailure,
    /// Task never started because the batch was cancelled.
    Cancelled,
    /// Adapter or persistence step panicked.
    Panicked,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::NoData => "no_data",
            FailureKind::ProviderError => "provider_error",
            FailureKind::SchemaMismatch => "schema_mismatch",
            FailureKind::IoFailure => "io_failure",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// Structured error types for data operations.
///
/// These are designed to be displayable in log lines and the run report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataError {
    #[error("no data returned for '{ticker}'")]
    NoData { ticker: String },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("missing columns: {}", missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error("I/O failure: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Map to the failure taxonomy surfaced in task outcomes.
    pub fn kind(&self) -> FailureKind {
        match self {
            DataError::NoData { .. } => FailureKind::NoData,
            DataError::NetworkUnreachable(_)
            | DataError::HttpStatus { .. }
            | DataError::ResponseFormatChanged(_)
            | DataError::Config(_) => FailureKind::ProviderError,
            DataError::SchemaMismatch { .. } => FailureKind::SchemaMismatch,
            DataError::Io(_) => FailureKind::IoFailure,
        }
    }

    pub fn no_data(ticker: &str) -> Self {
        DataError::NoData {
            ticker: ticker.to_string(),
        }
    }
}

/// Trait for data providers.
///
/// Implementations own their parameter shapes (multiplier/timespan, timeframe,
/// message limit) and translate one provider's wire format into a `RawFrame`
/// whose column names already follow the target schema. Validation and derived
/// columns happen above this trait.
pub trait SourceAdapter: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Human-readable name of this adapter.
    fn name(&self) -> &str {
        self.kind().file_tag()
    }

    /// Fetch one ticker over an inclusive date range.
    fn fetch(&self, ticker: &str, range: DateRange) -> Result<RawFrame, DataError>;
}
