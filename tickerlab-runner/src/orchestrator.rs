//! Collection entry point.
//!
//! `run_collection` turns a universe and a set of adapters into tasks, runs them
//! on the worker pool, and writes the manifest and the run report. Individual
//! task failures never surface as an error here; only problems with the run
//! itself (output directory, pool, report) do.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tickerlab_core::data::{SourceAdapter, Universe};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::config::CollectConfig;
use crate::manifest::{failed_tickers, write_manifest};
use crate::pool::WorkerPool;
use crate::report::{failures_by_kind, write_report, CollectionReport, REPORT_FILE};
use crate::task::{execute, plan_tasks, TaskOutcome};

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct CollectionSummary {
    /// One outcome per task, in task order.
    pub outcomes: Vec<TaskOutcome>,
    /// Manifest contents: one ticker per universe entry with a failed task.
    pub failed_tickers: Vec<String>,
    /// Set only when at least one task failed.
    pub manifest_path: Option<PathBuf>,
    pub report_path: PathBuf,
    pub elapsed: Duration,
}

impl CollectionSummary {
    pub fn persisted(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }
}

/// Run one collection batch.
pub fn run_collection(
    config: &CollectConfig,
    universe: &Universe,
    adapters: &[Arc<dyn SourceAdapter>],
    cancel: &CancelToken,
) -> Result<CollectionSummary> {
    config.validate().context("Invalid collection config")?;

    let started_at = Utc::now();
    let clock = Instant::now();

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let duplicates = universe.duplicates();
    if !duplicates.is_empty() {
        warn!(
            count = duplicates.len(),
            tickers = %duplicates.join(","),
            "universe contains duplicate tickers; each occurrence runs as its own task"
        );
    }

    let tasks = plan_tasks(universe, adapters, config.range(), &config.output_dir);
    info!(
        tickers = universe.len(),
        sources = adapters.len(),
        tasks = tasks.len(),
        max_workers = config.max_workers,
        range = %config.range(),
        "starting collection"
    );

    let pool = WorkerPool::new(config.max_workers)
        .context("Failed to start worker pool")?
        .with_throttle(config.throttle());
    let outcomes = pool
        .run(&tasks, cancel, execute)
        .context("Outcome collection incomplete")?;

    let manifest_path =
        write_manifest(&config.output_dir, &tasks, &outcomes).context("Failed to write manifest")?;
    let failed_tickers: Vec<String> = failed_tickers(&tasks, &outcomes)
        .into_iter()
        .map(str::to_string)
        .collect();

    let elapsed = clock.elapsed();
    let failures = failures_by_kind(&outcomes);
    let failed: usize = failures.values().sum();
    let report = CollectionReport {
        started_at,
        finished_at: Utc::now(),
        duration_secs: elapsed.as_secs_f64(),
        start_date: config.start_date,
        end_date: config.end_date,
        max_workers: config.max_workers,
        sources: adapters.iter().map(|a| a.kind()).collect(),
        tickers: universe.len(),
        tasks: outcomes.len(),
        persisted: outcomes.len() - failed,
        failed,
        failures_by_kind: failures,
        outcomes,
    };
    let report_path = config.output_dir.join(REPORT_FILE);
    write_report(&report_path, &report)?;

    info!(
        persisted = report.persisted,
        failed = report.failed,
        elapsed_secs = format_args!("{:.1}", report.duration_secs),
        "collection finished"
    );

    Ok(CollectionSummary {
        outcomes: report.outcomes,
        failed_tickers,
        manifest_path,
        report_path,
        elapsed,
    })
}
