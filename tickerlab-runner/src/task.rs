//! Task units and their outcomes.
//!
//! A task is one (ticker, adapter, range) fetch-and-persist attempt. Running a
//! task never returns an error: every failure is folded into a `TaskOutcome`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tickerlab_core::data::{
    output_path, write_atomic, DataError, DateRange, FailureKind, SourceAdapter, SourceKind,
    Universe,
};
use tracing::{info, warn};

/// One independent fetch-and-persist job.
#[derive(Clone)]
pub struct TaskUnit {
    /// Submission index; also the outcome slot.
    pub index: usize,
    /// Position of the ticker occurrence in the universe. Shared by every
    /// adapter's task for that occurrence.
    pub universe_index: usize,
    pub ticker: String,
    pub adapter: Arc<dyn SourceAdapter>,
    pub range: DateRange,
    pub output_path: PathBuf,
}

impl TaskUnit {
    pub fn source(&self) -> SourceKind {
        self.adapter.kind()
    }
}

impl fmt::Debug for TaskUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskUnit")
            .field("index", &self.index)
            .field("universe_index", &self.universe_index)
            .field("ticker", &self.ticker)
            .field("adapter", &self.adapter.name())
            .field("range", &self.range)
            .field("output_path", &self.output_path)
            .finish()
    }
}

/// Why a task failed: an enumerated kind plus a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub detail: String,
}

impl From<&DataError> for FailureReason {
    fn from(err: &DataError) -> Self {
        Self {
            kind: err.kind(),
            detail: err.to_string(),
        }
    }
}

/// Terminal state of one task. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Persisted {
        ticker: String,
        source: SourceKind,
        rows: usize,
        path: PathBuf,
    },
    Failed {
        ticker: String,
        source: SourceKind,
        reason: FailureReason,
    },
}

impl TaskOutcome {
    pub fn failed(task: &TaskUnit, kind: FailureKind, detail: impl Into<String>) -> Self {
        TaskOutcome::Failed {
            ticker: task.ticker.clone(),
            source: task.source(),
            reason: FailureReason {
                kind,
                detail: detail.into(),
            },
        }
    }

    pub fn ticker(&self) -> &str {
        match self {
            TaskOutcome::Persisted { ticker, .. } | TaskOutcome::Failed { ticker, .. } => ticker,
        }
    }

    pub fn source(&self) -> SourceKind {
        match self {
            TaskOutcome::Persisted { source, .. } | TaskOutcome::Failed { source, .. } => *source,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }

    /// `None` for persisted outcomes.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            TaskOutcome::Persisted { .. } => None,
            TaskOutcome::Failed { reason, .. } => Some(reason.kind),
        }
    }

    /// One log line per outcome: info for persisted, warn for failed.
    pub fn log(&self) {
        match self {
            TaskOutcome::Persisted {
                ticker,
                source,
                rows,
                path,
            } => info!(ticker = %ticker, source = %source, rows, path = %path.display(), "persisted"),
            TaskOutcome::Failed {
                ticker,
                source,
                reason,
            } => warn!(
                ticker = %ticker,
                source = %source,
                kind = %reason.kind,
                detail = %reason.detail,
                "task failed"
            ),
        }
    }
}

/// Expand universe x adapters into tasks, universe-major. Duplicate tickers
/// yield duplicate tasks with the same destination.
pub fn plan_tasks(
    universe: &Universe,
    adapters: &[Arc<dyn SourceAdapter>],
    range: DateRange,
    output_dir: &Path,
) -> Vec<TaskUnit> {
    universe
        .tickers()
        .iter()
        .enumerate()
        .flat_map(|(universe_index, ticker)| {
            adapters
                .iter()
                .map(move |adapter| (universe_index, ticker, adapter))
        })
        .enumerate()
        .map(|(index, (universe_index, ticker, adapter))| TaskUnit {
            index,
            universe_index,
            ticker: ticker.clone(),
            adapter: Arc::clone(adapter),
            range,
            output_path: output_path(output_dir, ticker, adapter.kind()),
        })
        .collect()
}

/// Fetch, validate against the source's schema, and write atomically.
pub fn execute(task: &TaskUnit) -> TaskOutcome {
    match fetch_and_persist(task) {
        Ok(rows) => TaskOutcome::Persisted {
            ticker: task.ticker.clone(),
            source: task.source(),
            rows,
            path: task.output_path.clone(),
        },
        Err(err) => TaskOutcome::Failed {
            ticker: task.ticker.clone(),
            source: task.source(),
            reason: FailureReason::from(&err),
        },
    }
}

fn fetch_and_persist(task: &TaskUnit) -> Result<usize, DataError> {
    let frame = task.adapter.fetch(&task.ticker, task.range)?;
    let records = task.source().schema().normalize(&task.ticker, frame)?;
    write_atomic(&task.output_path, &records)
}
