//! JSON run report (`collection_report.json`).

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tickerlab_core::data::persist::write_bytes_atomic;
use tickerlab_core::data::{FailureKind, SourceKind};

use crate::task::TaskOutcome;

pub const REPORT_FILE: &str = "collection_report.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_secs: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub max_workers: usize,
    pub sources: Vec<SourceKind>,
    pub tickers: usize,
    pub tasks: usize,
    pub persisted: usize,
    pub failed: usize,
    pub failures_by_kind: BTreeMap<FailureKind, usize>,
    /// Every outcome, in task order.
    pub outcomes: Vec<TaskOutcome>,
}

/// Count failed outcomes per kind.
pub fn failures_by_kind(outcomes: &[TaskOutcome]) -> BTreeMap<FailureKind, usize> {
    let mut counts = BTreeMap::new();
    for kind in outcomes.iter().filter_map(TaskOutcome::failure_kind) {
        *counts.entry(kind).or_insert(0) += 1;
    }
    counts
}

pub fn write_report(path: &Path, report: &CollectionReport) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialize collection report")?;
    write_bytes_atomic(path, json.as_bytes())
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(())
}
