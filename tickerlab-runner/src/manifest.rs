//! Failed-tickers manifest.
//!
//! A newline-delimited list of the universe entries with at least one failed
//! task, in universe order. An entry that failed on several sources is listed
//! once. The file only exists when something failed, and it is a valid
//! universe file, so `--universe collected_data/failed_tickers.txt` retries
//! exactly the failed entries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tickerlab_core::data::{write_lines_atomic, DataError};
use tracing::{debug, info};

use crate::task::{TaskOutcome, TaskUnit};

pub const MANIFEST_FILE: &str = "failed_tickers.txt";

/// One ticker per universe occurrence with at least one failed task, in
/// universe order. `outcomes[i]` belongs to `tasks[i]`. A ticker repeated in
/// the universe is listed once per failed occurrence.
pub fn failed_tickers<'a>(tasks: &'a [TaskUnit], outcomes: &[TaskOutcome]) -> Vec<&'a str> {
    let failed: BTreeMap<usize, &str> = tasks
        .iter()
        .zip(outcomes)
        .filter(|(_, outcome)| outcome.is_failed())
        .map(|(task, _)| (task.universe_index, task.ticker.as_str()))
        .collect();
    failed.into_values().collect()
}

/// Write `{dir}/failed_tickers.txt` atomically when any task failed; otherwise
/// remove a manifest left by an earlier run. Returns the path when written.
pub fn write_manifest(
    dir: &Path,
    tasks: &[TaskUnit],
    outcomes: &[TaskOutcome],
) -> Result<Option<PathBuf>, DataError> {
    let path = dir.join(MANIFEST_FILE);
    let failed = failed_tickers(tasks, outcomes);

    if failed.is_empty() {
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed stale manifest"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DataError::Io(format!(
                    "remove stale manifest {}: {e}",
                    path.display()
                )))
            }
        }
        return Ok(None);
    }

    write_lines_atomic(&path, &failed)?;
    info!(path = %path.display(), failed = failed.len(), "wrote failed-tickers manifest");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::plan_tasks;
    use chrono::NaiveDate;
    use std::sync::Arc;
    use tickerlab_core::data::{DateRange, FailureKind, SourceAdapter, SyntheticAdapter, Universe};

    /// Tasks for `tickers` against `sources` adapters each.
    fn tasks(tickers: &[&str], sources: usize) -> Vec<TaskUnit> {
        let adapters: Vec<Arc<dyn SourceAdapter>> = (0..sources)
            .map(|_| Arc::new(SyntheticAdapter::new()) as Arc<dyn SourceAdapter>)
            .collect();
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        plan_tasks(
            &Universe::new(tickers.iter().copied()),
            &adapters,
            DateRange::new(day, day),
            Path::new("out"),
        )
    }

    /// Outcomes for `tasks`, failing the task indices in `failing`.
    fn outcomes(tasks: &[TaskUnit], failing: &[usize]) -> Vec<TaskOutcome> {
        tasks
            .iter()
            .map(|t| {
                if failing.contains(&t.index) {
                    TaskOutcome::failed(t, FailureKind::NoData, "")
                } else {
                    TaskOutcome::Persisted {
                        ticker: t.ticker.clone(),
                        source: t.source(),
                        rows: 10,
                        path: t.output_path.clone(),
                    }
                }
            })
            .collect()
    }

    #[test]
    fn manifest_lists_failures_in_universe_order() {
        let dir = tempfile::tempdir().unwrap();
        let ts = tasks(&["ZZZ", "AAPL", "BAD", "ZZZ"], 1);
        let path = write_manifest(dir.path(), &ts, &outcomes(&ts, &[0, 2, 3]))
            .unwrap()
            .unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "ZZZ\nBAD\nZZZ");
    }

    #[test]
    fn ticker_failing_on_several_sources_is_listed_once() {
        // Two sources per ticker: BAD fails on both, MSFT on the second only.
        let ts = tasks(&["BAD", "AAPL", "MSFT"], 2);
        let outs = outcomes(&ts, &[0, 1, 5]);
        assert_eq!(failed_tickers(&ts, &outs), vec!["BAD", "MSFT"]);
    }

    #[test]
    fn duplicated_universe_entry_is_listed_per_occurrence() {
        let ts = tasks(&["BAD", "BAD"], 2);
        let outs = outcomes(&ts, &[0, 1, 2, 3]);
        assert_eq!(failed_tickers(&ts, &outs), vec!["BAD", "BAD"]);
    }

    #[test]
    fn no_failures_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let ts = tasks(&["AAPL"], 1);
        assert_eq!(write_manifest(dir.path(), &ts, &outcomes(&ts, &[])).unwrap(), None);
        assert!(!dir.path().join(MANIFEST_FILE).exists());
    }

    #[test]
    fn clean_run_removes_stale_manifest() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "OLD").unwrap();
        let ts = tasks(&["AAPL"], 1);
        write_manifest(dir.path(), &ts, &outcomes(&ts, &[])).unwrap();
        assert!(!dir.path().join(MANIFEST_FILE).exists());
    }
}
