//! Bounded worker pool.
//!
//! Tasks run on a private rayon pool with exactly `max_workers` threads, so at
//! most `max_workers` tasks are in flight at once. Each task is wrapped so that
//! a panic becomes a `Failed(Panicked)` outcome instead of tearing down the
//! batch, and a cancelled batch turns every not-yet-started task into
//! `Failed(Cancelled)`. `run` returns only after the scope has joined every
//! spawned task.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tickerlab_core::data::FailureKind;
use tracing::{debug, error};

use crate::cancel::CancelToken;
use crate::collector::{CollectorError, OutcomeCollector};
use crate::task::{TaskOutcome, TaskUnit};
use crate::throttle::Throttle;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("max_workers must be at least 1")]
    NoWorkers,

    #[error("failed to build worker pool: {0}")]
    Build(String),
}

pub struct WorkerPool {
    pool: rayon::ThreadPool,
    max_workers: usize,
    throttle: Throttle,
}

impl WorkerPool {
    /// Pool with `max_workers` threads and no inter-task delay.
    pub fn new(max_workers: usize) -> Result<Self, PoolError> {
        if max_workers == 0 {
            return Err(PoolError::NoWorkers);
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(max_workers)
            .thread_name(|i| format!("collect-worker-{i}"))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;
        Ok(Self {
            pool,
            max_workers,
            throttle: Throttle::none(),
        })
    }

    pub fn with_throttle(mut self, throttle: Throttle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run every task exactly once and return one outcome per task, in task
    /// order. Completion order is unspecified.
    pub fn run<F>(
        &self,
        tasks: &[TaskUnit],
        cancel: &CancelToken,
        execute: F,
    ) -> Result<Vec<TaskOutcome>, CollectorError>
    where
        F: Fn(&TaskUnit) -> TaskOutcome + Sync,
    {
        let collector = OutcomeCollector::new(tasks.len());
        let throttle = self.throttle;

        self.pool.scope_fifo(|scope| {
            for (slot, task) in tasks.iter().enumerate() {
                let collector = &collector;
                let execute = &execute;
                scope.spawn_fifo(move |_| {
                    let outcome = run_isolated(task, cancel, execute);
                    let executed = outcome.failure_kind() != Some(FailureKind::Cancelled);
                    outcome.log();
                    if let Err(err) = collector.record(slot, outcome) {
                        error!(index = task.index, ticker = %task.ticker, error = %err, "outcome not recorded");
                    }
                    if executed {
                        throttle.pause(cancel);
                    }
                });
            }
        });

        collector.into_outcomes()
    }
}

/// Run one task with cancellation and panic isolation.
fn run_isolated<F>(task: &TaskUnit, cancel: &CancelToken, execute: &F) -> TaskOutcome
where
    F: Fn(&TaskUnit) -> TaskOutcome + Sync,
{
    if cancel.is_cancelled() {
        return TaskOutcome::failed(task, FailureKind::Cancelled, "batch cancelled before start");
    }
    debug!(index = task.index, ticker = %task.ticker, source = %task.source(), "task started");
    match panic::catch_unwind(AssertUnwindSafe(|| execute(task))) {
        Ok(outcome) => outcome,
        Err(payload) => {
            TaskOutcome::failed(task, FailureKind::Panicked, panic_message(payload.as_ref()))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
