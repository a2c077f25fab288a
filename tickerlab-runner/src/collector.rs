//! Outcome collection.
//!
//! One slot per task, behind a mutex. Workers record into their own slot, so
//! arrival order never matters. The full set can only be read by consuming the
//! collector, which the pool does after its scope has joined every worker.

use std::sync::Mutex;
use thiserror::Error;
use tracing::error;

use crate::task::TaskOutcome;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectorError {
    #[error("outcome index {index} out of range for {len} tasks")]
    OutOfRange { index: usize, len: usize },

    #[error("task {index} reported more than one outcome")]
    Duplicate { index: usize },

    #[error("{} task(s) produced no outcome: {indices:?}", indices.len())]
    Missing { indices: Vec<usize> },
}

#[derive(Debug)]
pub struct OutcomeCollector {
    slots: Mutex<Vec<Option<TaskOutcome>>>,
}

impl OutcomeCollector {
    pub fn new(task_count: usize) -> Self {
        Self {
            slots: Mutex::new(vec![None; task_count]),
        }
    }

    /// Store the outcome for task `index`. A second outcome for the same slot
    /// is rejected and the first one kept.
    pub fn record(&self, index: usize, outcome: TaskOutcome) -> Result<(), CollectorError> {
        // A poisoned lock only means another worker panicked while holding it;
        // slots are written whole, so the data is still consistent.
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let len = slots.len();
        let slot = slots
            .get_mut(index)
            .ok_or(CollectorError::OutOfRange { index, len })?;
        if slot.is_some() {
            error!(index, ticker = outcome.ticker(), "duplicate outcome rejected");
            return Err(CollectorError::Duplicate { index });
        }
        *slot = Some(outcome);
        Ok(())
    }

    /// Number of slots filled so far.
    pub fn recorded(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.iter().filter(|s| s.is_some()).count()
    }

    /// All outcomes in task order.
    pub fn into_outcomes(self) -> Result<Vec<TaskOutcome>, CollectorError> {
        let slots = self.slots.into_inner().unwrap_or_else(|e| e.into_inner());
        let missing: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| i)
            .collect();
        if !missing.is_empty() {
            return Err(CollectorError::Missing { indices: missing });
        }
        Ok(slots.into_iter().flatten().collect())
    }
}
