//! Load accounting and elastic capacity control.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use super::CapacityGate;

/// Capacity adjustment made by [`LoadController::record_completion`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapacityChange {
    /// One extra permit was granted; `extras` now outstanding.
    Granted {
        /// Extra permits outstanding after the grant.
        extras: u32,
    },
    /// One previously granted extra permit was withdrawn; `extras` remain.
    Withdrawn {
        /// Extra permits still outstanding after the withdrawal.
        extras: u32,
    },
}

/// Observes completed work and resizes the capacity gate in response.
///
/// Load is a single bounded scalar in `[0, max_load]`, updated only by
/// completed work. Above the high watermark the controller grants extra
/// permits up to a cap; below the low watermark it withdraws them again,
/// never dipping below the base capacity and never blocking traffic.
pub struct LoadController {
    load: AtomicU32,
    /// Extra permits currently granted above base capacity. Guarded by a
    /// mutex so concurrent completions cannot double-grant past the cap.
    extras: Mutex<u32>,
    max_load: u32,
    high_watermark: u32,
    low_watermark: u32,
    max_extra_permits: u32,
}

impl LoadController {
    /// Create a controller with the given clamps and watermarks.
    #[must_use]
    pub const fn new(
        max_load: u32,
        high_watermark: u32,
        low_watermark: u32,
        max_extra_permits: u32,
    ) -> Self {
        Self {
            load: AtomicU32::new(0),
            extras: Mutex::new(0),
            max_load,
            high_watermark,
            low_watermark,
            max_extra_permits,
        }
    }

    /// Record a completed item's duration, updating load and adjusting gate
    /// capacity when a watermark is crossed.
    ///
    /// Load grows by `duration_ms / 10` and saturates at `max_load`. A failed
    /// withdrawal (no slack right now) is skipped and retried on a later
    /// completion rather than blocking.
    pub fn record_completion(&self, duration: Duration, gate: &CapacityGate) -> Option<CapacityChange> {
        let delta = u32::try_from(duration.as_millis() / 10).unwrap_or(u32::MAX);
        let mut current = self.load.load(Ordering::Acquire);
        loop {
            let next = current.saturating_add(delta).min(self.max_load);
            match self.load.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    current = next;
                    break;
                }
                Err(actual) => current = actual,
            }
        }

        let mut extras = self.extras.lock();
        if current > self.high_watermark && *extras < self.max_extra_permits {
            gate.grant(1);
            *extras += 1;
            info!(load = current, extras = *extras, "high load: extra capacity granted");
            return Some(CapacityChange::Granted { extras: *extras });
        }
        if current < self.low_watermark && *extras > 0 && gate.withdraw(1) == 1 {
            *extras -= 1;
            info!(load = current, extras = *extras, "low load: extra capacity withdrawn");
            return Some(CapacityChange::Withdrawn { extras: *extras });
        }
        None
    }

    /// Current load in `[0, max_load]`.
    #[must_use]
    pub fn load(&self) -> u32 {
        self.load.load(Ordering::Acquire)
    }

    /// Extra permits currently granted above base capacity.
    #[must_use]
    pub fn extra_permits(&self) -> u32 {
        *self.extras.lock()
    }
}
