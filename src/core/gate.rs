//! Counting admission gate bounding concurrent in-service items.

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Counting gate equivalent to a semaphore, with explicit resize operations.
///
/// Workers hold one permit per in-flight item. Capacity changes are expressed
/// as [`grant`](Self::grant) (release-without-matching-acquire) and
/// [`withdraw`](Self::withdraw) (acquire-without-matching-release over current
/// slack), preserving the invariant that a resize never revokes a permit
/// already held.
pub struct CapacityGate {
    permits: Mutex<u32>,
    available: Condvar,
}

impl CapacityGate {
    /// Create a gate with an initial number of permits.
    #[must_use]
    pub fn new(permits: u32) -> Self {
        Self {
            permits: Mutex::new(permits),
            available: Condvar::new(),
        }
    }

    /// Acquire one permit, blocking while none are available.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Acquire one permit without blocking. Returns `false` when none are
    /// available.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Return one permit and wake one blocked acquirer. Never blocks.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        drop(permits);
        self.available.notify_one();
    }

    /// Grow capacity by `n` permits.
    pub fn grant(&self, n: u32) {
        let mut permits = self.permits.lock();
        *permits += n;
        drop(permits);
        self.available.notify_all();
        debug!(granted = n, "gate capacity granted");
    }

    /// Shrink capacity by consuming up to `n` permits of currently available
    /// slack, returning how many were actually withdrawn.
    ///
    /// Never blocks and never touches a permit a worker is holding; a caller
    /// that gets back less than `n` retries on a later completion.
    pub fn withdraw(&self, n: u32) -> u32 {
        let mut permits = self.permits.lock();
        let taken = n.min(*permits);
        *permits -= taken;
        drop(permits);
        if taken > 0 {
            debug!(withdrawn = taken, "gate capacity withdrawn");
        }
        taken
    }

    /// Number of permits currently available (not held by workers).
    #[must_use]
    pub fn permits(&self) -> u32 {
        *self.permits.lock()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_acquire_release_round_trip() {
        let gate = CapacityGate::new(2);
        gate.acquire();
        gate.acquire();
        assert_eq!(gate.permits(), 0);
        assert!(!gate.try_acquire());
        gate.release();
        assert!(gate.try_acquire());
    }

    #[test]
    fn test_blocked_acquire_woken_by_release() {
        let gate = Arc::new(CapacityGate::new(0));
        let gate2 = Arc::clone(&gate);

        let handle = thread::spawn(move || {
            gate2.acquire();
        });
        thread::sleep(Duration::from_millis(50));
        gate.release();
        handle.join().unwrap();
        assert_eq!(gate.permits(), 0);
    }

    #[test]
    fn test_grant_and_withdraw() {
        let gate = CapacityGate::new(4);
        gate.grant(3);
        assert_eq!(gate.permits(), 7);

        assert_eq!(gate.withdraw(3), 3);
        assert_eq!(gate.permits(), 4);

        // Withdrawing more than the available slack takes only what exists.
        gate.acquire();
        gate.acquire();
        gate.acquire();
        gate.acquire();
        assert_eq!(gate.withdraw(2), 0);
    }

    #[test]
    fn test_concurrent_holders_never_exceed_permits() {
        let gate = Arc::new(CapacityGate::new(3));
        let in_flight = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut handles = Vec::new();
        for _ in 0..12 {
            let gate = Arc::clone(&gate);
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            handles.push(thread::spawn(move || {
                gate.acquire();
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(10));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                gate.release();
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.permits(), 3);
    }
}
