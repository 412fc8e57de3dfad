//! Pluggable failure-injection policies.
//!
//! The dispatch loop asks the policy before every unit selection whether a
//! resource unit should spontaneously fail, modeling hardware faults that
//! surface during dispatch. Keeping the decision behind a trait lets tests
//! script deterministic failure sequences instead of relying on randomness.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rand::Rng;

/// Decides whether a resource unit fails ahead of a dispatch.
pub trait FailurePolicy: Send + Sync + 'static {
    /// Return the id of a unit to fail, or `None` for no failure this time.
    /// `unit_count` is the total number of units in the pool.
    fn next_failure(&self, unit_count: u32) -> Option<u32>;
}

/// Fails a uniformly random unit with a fixed per-dispatch probability.
#[derive(Debug, Clone, Copy)]
pub struct RandomFailures {
    probability: f64,
}

impl RandomFailures {
    /// Create a policy with the given per-dispatch failure probability.
    #[must_use]
    pub const fn new(probability: f64) -> Self {
        Self { probability }
    }
}

impl FailurePolicy for RandomFailures {
    fn next_failure(&self, unit_count: u32) -> Option<u32> {
        if unit_count == 0 || self.probability <= 0.0 {
            return None;
        }
        let mut rng = rand::rng();
        if rng.random_bool(self.probability.min(1.0)) {
            Some(rng.random_range(0..unit_count))
        } else {
            None
        }
    }
}

/// Never injects failures. Useful for deterministic integration tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFailures;

impl FailurePolicy for NoFailures {
    fn next_failure(&self, _unit_count: u32) -> Option<u32> {
        None
    }
}

/// Replays a scripted sequence of decisions, then stops injecting.
pub struct ScriptedFailures {
    script: Mutex<VecDeque<Option<u32>>>,
}

impl ScriptedFailures {
    /// Create a policy replaying `decisions` in order, one per dispatch.
    #[must_use]
    pub fn new(decisions: Vec<Option<u32>>) -> Self {
        Self {
            script: Mutex::new(decisions.into()),
        }
    }
}

impl FailurePolicy for ScriptedFailures {
    fn next_failure(&self, _unit_count: u32) -> Option<u32> {
        self.script.lock().pop_front().flatten()
    }
}
