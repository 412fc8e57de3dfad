//! Resource unit tracking with failure and repair.

use std::collections::BTreeMap;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use rand::Rng;
use tracing::{debug, info, warn};

use super::DispatchError;

/// Per-unit state, owned exclusively by the pool and mutated only under its
/// internal lock.
struct UnitState {
    healthy: bool,
    active: u32,
}

/// Read-only view of a unit, for observability and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitSnapshot {
    /// Unit identifier.
    pub id: u32,
    /// Whether the unit is eligible for selection.
    pub healthy: bool,
    /// Number of items currently assigned to the unit.
    pub active_count: u32,
}

struct PoolInner {
    units: BTreeMap<u32, UnitState>,
}

impl PoolInner {
    fn any_healthy(&self) -> bool {
        self.units.values().any(|unit| unit.healthy)
    }
}

/// Fixed set of named resource units with health flags and in-flight counters.
///
/// Routing reads and all mutations happen under one internal lock so that
/// unit selection never races a concurrent fail or repair.
pub struct ResourcePool {
    inner: Mutex<PoolInner>,
    /// Signaled when a unit becomes healthy again.
    recovered: Condvar,
}

impl ResourcePool {
    /// Create a pool of `unit_count` healthy units with ids `0..unit_count`.
    #[must_use]
    pub fn new(unit_count: u32) -> Self {
        let units = (0..unit_count)
            .map(|id| {
                (
                    id,
                    UnitState {
                        healthy: true,
                        active: 0,
                    },
                )
            })
            .collect();
        Self {
            inner: Mutex::new(PoolInner { units }),
            recovered: Condvar::new(),
        }
    }

    /// Select one healthy unit uniformly at random and increment its
    /// in-flight counter.
    ///
    /// Returns `None` when every unit is unhealthy. That is a signaled
    /// condition, not an error: the caller requeues the item and retries.
    pub fn acquire_unit(&self) -> Option<u32> {
        let mut inner = self.inner.lock();
        let healthy: Vec<u32> = inner
            .units
            .iter()
            .filter(|(_, unit)| unit.healthy)
            .map(|(id, _)| *id)
            .collect();
        if healthy.is_empty() {
            return None;
        }
        let chosen = healthy[rand::rng().random_range(0..healthy.len())];
        if let Some(unit) = inner.units.get_mut(&chosen) {
            unit.active += 1;
        }
        Some(chosen)
    }

    /// Decrement a unit's in-flight counter, floored at zero.
    ///
    /// A release on an already-zero or already-failed unit is a no-op, not an
    /// error: it indicates the unit was failed (and its count captured) while
    /// this item was still in flight.
    pub fn release_unit(&self, unit_id: u32) {
        let mut inner = self.inner.lock();
        if let Some(unit) = inner.units.get_mut(&unit_id) {
            unit.active = unit.active.saturating_sub(1);
        }
    }

    /// Mark a unit failed, capturing and zeroing its in-flight count.
    ///
    /// Returns the captured count; the caller is responsible for re-submitting
    /// that many replacement items with fresh parameters (in-flight work lost
    /// to a failure comes back as new demand, a deliberate simplification).
    /// Failing an already-failed unit is a logged no-op returning 0.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownUnit`] for an id outside the pool.
    pub fn fail(&self, unit_id: u32) -> Result<u32, DispatchError> {
        let mut inner = self.inner.lock();
        let unit = inner
            .units
            .get_mut(&unit_id)
            .ok_or(DispatchError::UnknownUnit(unit_id))?;
        if !unit.healthy {
            debug!(unit_id, "fail requested on already-failed unit");
            return Ok(0);
        }
        unit.healthy = false;
        let redirected = unit.active;
        unit.active = 0;
        drop(inner);
        warn!(unit_id, redirected, "resource unit failed");
        Ok(redirected)
    }

    /// Mark a unit healthy again. Repairing a healthy unit is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownUnit`] for an id outside the pool.
    pub fn repair(&self, unit_id: u32) -> Result<(), DispatchError> {
        let mut inner = self.inner.lock();
        let unit = inner
            .units
            .get_mut(&unit_id)
            .ok_or(DispatchError::UnknownUnit(unit_id))?;
        if unit.healthy {
            debug!(unit_id, "repair requested on healthy unit");
            return Ok(());
        }
        unit.healthy = true;
        drop(inner);
        info!(unit_id, "resource unit repaired");
        self.recovered.notify_all();
        Ok(())
    }

    /// Wait until some unit is healthy, bounded by `timeout`.
    ///
    /// Returns `true` if a healthy unit exists when the wait ends. Used by
    /// dispatch workers after requeueing on exhaustion, instead of a fixed
    /// backoff sleep.
    pub fn wait_for_capacity(&self, timeout: Duration) -> bool {
        let mut inner = self.inner.lock();
        if inner.any_healthy() {
            return true;
        }
        let _ = self.recovered.wait_for(&mut inner, timeout);
        inner.any_healthy()
    }

    /// Snapshot of a single unit's state.
    #[must_use]
    pub fn unit(&self, unit_id: u32) -> Option<UnitSnapshot> {
        let inner = self.inner.lock();
        inner.units.get(&unit_id).map(|unit| UnitSnapshot {
            id: unit_id,
            healthy: unit.healthy,
            active_count: unit.active,
        })
    }

    /// Ids of all units in the pool.
    #[must_use]
    pub fn unit_ids(&self) -> Vec<u32> {
        self.inner.lock().units.keys().copied().collect()
    }

    /// Number of currently healthy units.
    #[must_use]
    pub fn healthy_count(&self) -> u32 {
        let inner = self.inner.lock();
        u32::try_from(inner.units.values().filter(|unit| unit.healthy).count())
            .unwrap_or(u32::MAX)
    }
}
