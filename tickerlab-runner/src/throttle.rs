//! Randomized inter-task delay.
//!
//! After finishing a task a worker pauses for a uniformly random duration
//! before picking up the next one. This spreads requests against the shared
//! providers; it has no bearing on correctness.

use rand::Rng;
use std::time::{Duration, Instant};

use crate::cancel::CancelToken;

/// Slice used while sleeping so a cancelled batch does not wait out a full pause.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    min: Duration,
    max: Duration,
}

impl Throttle {
    /// Bounds are reordered if given inverted.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// No pause at all. Used by tests and `--min-delay-ms 0 --max-delay-ms 0`.
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub fn is_none(&self) -> bool {
        self.max.is_zero()
    }

    pub fn sample(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        rand::thread_rng().gen_range(self.min..=self.max)
    }

    /// Sleep for one sampled delay, returning early once `cancel` fires.
    pub fn pause(&self, cancel: &CancelToken) {
        let delay = self.sample();
        if delay.is_zero() {
            return;
        }
        let until = Instant::now() + delay;
        while !cancel.is_cancelled() {
            let now = Instant::now();
            if now >= until {
                break;
            }
            std::thread::sleep((until - now).min(SLEEP_SLICE));
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(3))
    }
}
