//! Work execution collaborator.
//!
//! The engine does not know what "work" is; an executor supplies it. The
//! bundled implementations simulate work for demos and tests; production
//! code plugs in the real thing.

use std::thread;
use std::time::Duration;

use rand::Rng;

use super::WorkItem;

/// Executes one work item, returning the elapsed duration to report to load
/// accounting.
///
/// Called from dispatch worker threads; implementations may block.
pub trait WorkExecutor: Send + Sync + 'static {
    /// Perform the work for `item` and return how long it took.
    fn execute(&self, item: &WorkItem) -> Duration;
}

/// Sleeps for a uniformly random duration within a configured range,
/// defaulting to 500-1500 ms per item.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedWork {
    min: Duration,
    max: Duration,
}

impl SimulatedWork {
    /// Create a simulator sleeping between `min` and `max` per item.
    #[must_use]
    pub const fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1500))
    }
}

impl WorkExecutor for SimulatedWork {
    fn execute(&self, _item: &WorkItem) -> Duration {
        let span = self.max.saturating_sub(self.min);
        let jitter = if span.is_zero() {
            Duration::ZERO
        } else {
            let extra = rand::rng().random_range(0..=span.as_millis());
            Duration::from_millis(u64::try_from(extra).unwrap_or(u64::MAX))
        };
        let duration = self.min + jitter;
        thread::sleep(duration);
        duration
    }
}

/// Reports a fixed duration without sleeping. For tests and benches.
#[derive(Debug, Clone, Copy)]
pub struct FixedWork {
    duration: Duration,
}

impl FixedWork {
    /// Create an executor that reports `duration` for every item.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl WorkExecutor for FixedWork {
    fn execute(&self, _item: &WorkItem) -> Duration {
        self.duration
    }
}
