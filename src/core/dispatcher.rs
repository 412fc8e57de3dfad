//! Dispatch engine: worker-thread loop plus the producer and admin API.
//!
//! Each worker pulls the highest-priority item from the shared queue,
//! acquires a capacity permit, selects a healthy resource unit, executes the
//! item through the [`WorkExecutor`] collaborator, and reports the completion
//! to the load controller. Resource exhaustion requeues the item; emergency
//! mode sheds low-priority non-critical items after admission.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;

use super::{
    CapacityChange, CapacityGate, DispatchError, DispatchEvent, EventKind, EventSink,
    FailurePolicy, LoadController, Priority, PriorityQueue, ResourcePool, SystemContext,
    WorkExecutor, WorkItem,
};

/// State shared between the engine handle and its worker threads.
struct EngineShared {
    config: EngineConfig,
    queue: PriorityQueue,
    pool: ResourcePool,
    gate: CapacityGate,
    load: LoadController,
    ctx: SystemContext,
    executor: Arc<dyn WorkExecutor>,
    failures: Arc<dyn FailurePolicy>,
    events: Option<Arc<dyn EventSink>>,
    next_id: AtomicU64,
}

impl EngineShared {
    fn record(&self, event: DispatchEvent) {
        if let Some(sink) = &self.events {
            sink.record(event);
        }
    }

    fn submit_item(&self, priority: Priority, critical: bool, id: Option<u64>) -> u64 {
        let id = id.unwrap_or_else(|| self.next_id.fetch_add(1, Ordering::Relaxed));
        let item = WorkItem::new(id, priority, critical);
        debug!(
            item_id = id,
            priority = priority.get(),
            critical,
            "item submitted"
        );
        self.record(DispatchEvent::new(EventKind::Submitted).with_item(&item));
        self.queue.push(item);
        id
    }

    /// Fail a unit and convert its in-flight work into fresh demand: one
    /// replacement item per lost assignment, with freshly randomized
    /// priority and criticality.
    fn fail_and_redirect(&self, unit_id: u32) -> Result<u32, DispatchError> {
        let redirected = self.pool.fail(unit_id)?;
        self.record(DispatchEvent::new(EventKind::UnitFailed).with_unit(unit_id));
        if redirected > 0 {
            warn!(unit_id, redirected, "redirecting in-flight work back to the queue");
            let mut rng = rand::rng();
            for _ in 0..redirected {
                let priority =
                    Priority::new(rng.random_range(1..=5)).unwrap_or(Priority::LOWEST);
                let critical = rng.random_bool(0.1);
                self.submit_item(priority, critical, None);
            }
        }
        Ok(redirected)
    }

    /// Per-worker dispatch loop. Exits once the queue is closed and drained.
    fn worker_loop(&self, worker_id: usize) {
        debug!(worker_id, "dispatch worker started");

        while let Some(item) = self.queue.pop_highest() {
            self.gate.acquire();

            // Chaos injection surfaces here, mid-dispatch, so failures land
            // while work is in flight rather than on a timer.
            if let Some(unit_id) = self.failures.next_failure(self.config.unit_count) {
                if let Err(e) = self.fail_and_redirect(unit_id) {
                    error!(worker_id, unit_id, error = %e, "failure injection skipped");
                }
            }

            let Some(unit_id) = self.pool.acquire_unit() else {
                // Transient exhaustion: put the item back untouched and wait
                // for a repair instead of surfacing a failure.
                self.gate.release();
                info!(
                    worker_id,
                    item_id = item.id,
                    priority = item.priority.get(),
                    critical = item.critical,
                    "no healthy unit available, item requeued"
                );
                self.record(DispatchEvent::new(EventKind::Requeued).with_item(&item));
                self.queue.push(item);
                self.pool.wait_for_capacity(self.config.retry_backoff());
                continue;
            };

            if self.ctx.is_emergency() {
                if !item.critical && item.priority.get() > self.config.emergency_drop_threshold {
                    // Deliberate shed path: the permit and unit were already
                    // consumed for this item; hand both back unexecuted.
                    self.pool.release_unit(unit_id);
                    self.gate.release();
                    warn!(
                        worker_id,
                        item_id = item.id,
                        priority = item.priority.get(),
                        "emergency mode: item dropped"
                    );
                    self.record(
                        DispatchEvent::new(EventKind::EmergencyDropped)
                            .with_item(&item)
                            .with_unit(unit_id)
                            .with_load(self.load.load()),
                    );
                    continue;
                }
                if item.critical {
                    info!(worker_id, item_id = item.id, "emergency mode: critical item expedited");
                    self.record(DispatchEvent::new(EventKind::CriticalExpedited).with_item(&item));
                }
            }

            info!(
                worker_id,
                item_id = item.id,
                priority = item.priority.get(),
                critical = item.critical,
                unit_id,
                "executing item"
            );
            self.record(
                DispatchEvent::new(EventKind::Started)
                    .with_item(&item)
                    .with_unit(unit_id),
            );

            let elapsed = self.executor.execute(&item);

            self.pool.release_unit(unit_id);
            match self.load.record_completion(elapsed, &self.gate) {
                Some(CapacityChange::Granted { .. }) => {
                    self.record(DispatchEvent::new(EventKind::CapacityGranted).with_load(self.load.load()));
                }
                Some(CapacityChange::Withdrawn { .. }) => {
                    self.record(DispatchEvent::new(EventKind::CapacityWithdrawn).with_load(self.load.load()));
                }
                None => {}
            }
            self.gate.release();

            self.record(
                DispatchEvent::new(EventKind::Completed)
                    .with_item(&item)
                    .with_unit(unit_id)
                    .with_load(self.load.load()),
            );
        }

        debug!(worker_id, "dispatch worker exiting");
    }
}

/// Concurrent priority-dispatch engine.
///
/// Owns the queue, resource pool, capacity gate, load controller, and the
/// worker threads tying them together. Constructed through
/// [`EngineBuilder`](crate::builders::EngineBuilder); one lifecycle per
/// instance (`start` once, `stop` once).
pub struct DispatchEngine {
    shared: Arc<EngineShared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DispatchEngine {
    pub(crate) fn from_parts(
        config: EngineConfig,
        executor: Arc<dyn WorkExecutor>,
        failures: Arc<dyn FailurePolicy>,
        events: Option<Arc<dyn EventSink>>,
    ) -> Self {
        let shared = EngineShared {
            queue: PriorityQueue::new(),
            pool: ResourcePool::new(config.unit_count),
            gate: CapacityGate::new(config.base_capacity),
            load: LoadController::new(
                config.max_load,
                config.high_watermark,
                config.low_watermark,
                config.max_extra_permits,
            ),
            ctx: SystemContext::new(),
            executor,
            failures,
            events,
            next_id: AtomicU64::new(1),
            config,
        };
        Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Submit a work item.
    ///
    /// When `id` is `None` a unique id is assigned monotonically, starting
    /// at 1. Caller-supplied ids are taken as-is.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidPriority`] when `priority` is outside
    /// `1..=5`.
    pub fn submit(
        &self,
        priority: u8,
        critical: bool,
        id: Option<u64>,
    ) -> Result<u64, DispatchError> {
        let priority = Priority::new(priority)?;
        Ok(self.shared.submit_item(priority, critical, id))
    }

    /// Administratively fail a resource unit, redirecting its in-flight work
    /// back to the queue as replacement items. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownUnit`] for an id outside the pool.
    pub fn fail_resource(&self, unit_id: u32) -> Result<u32, DispatchError> {
        self.shared.fail_and_redirect(unit_id)
    }

    /// Repair a resource unit, making it eligible for selection again.
    /// Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownUnit`] for an id outside the pool.
    pub fn repair_resource(&self, unit_id: u32) -> Result<(), DispatchError> {
        self.shared.pool.repair(unit_id)?;
        self.shared
            .record(DispatchEvent::new(EventKind::UnitRepaired).with_unit(unit_id));
        Ok(())
    }

    /// Repair every unit in the pool.
    pub fn repair_all(&self) {
        for unit_id in self.shared.pool.unit_ids() {
            // Ids come from the pool itself, so repair cannot miss.
            if self.shared.pool.repair(unit_id).is_ok() {
                self.shared
                    .record(DispatchEvent::new(EventKind::UnitRepaired).with_unit(unit_id));
            }
        }
    }

    /// Enable emergency mode: non-critical items with priority numerically
    /// worse than the configured threshold are dropped after admission.
    pub fn trigger_emergency(&self) {
        self.shared.ctx.set_emergency(true);
        self.shared.record(
            DispatchEvent::new(EventKind::EmergencySet).with_load(self.shared.load.load()),
        );
    }

    /// Clear emergency mode. Never invoked automatically.
    pub fn clear_emergency(&self) {
        self.shared.ctx.set_emergency(false);
        self.shared.record(
            DispatchEvent::new(EventKind::EmergencyCleared).with_load(self.shared.load.load()),
        );
    }

    /// Start the worker threads.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::AlreadyStarted`] on a second call, or
    /// [`DispatchError::Spawn`] if a thread cannot be created.
    pub fn start(&self) -> Result<(), DispatchError> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Err(DispatchError::AlreadyStarted);
        }
        for worker_id in 0..self.shared.config.worker_count {
            let shared = Arc::clone(&self.shared);
            let handle = thread::Builder::new()
                .name(format!("dispatch-worker-{worker_id}"))
                .spawn(move || shared.worker_loop(worker_id))?;
            workers.push(handle);
        }
        info!(
            worker_count = self.shared.config.worker_count,
            unit_count = self.shared.config.unit_count,
            base_capacity = self.shared.config.base_capacity,
            "dispatch engine started"
        );
        Ok(())
    }

    /// Stop the engine, blocking until all workers have exited.
    ///
    /// Workers finish their in-flight items and drain the queue before
    /// exiting; blocked dequeues are woken to observe the shutdown.
    pub fn stop(&self) {
        self.shared.ctx.begin_shutdown();
        self.shared.queue.close();
        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("dispatch worker panicked during shutdown");
            }
        }
        info!("dispatch engine stopped");
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.len()
    }

    /// Current system load.
    #[must_use]
    pub fn current_load(&self) -> u32 {
        self.shared.load.load()
    }

    /// Whether emergency mode is active.
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.shared.ctx.is_emergency()
    }

    /// Permits currently available on the capacity gate.
    #[must_use]
    pub fn available_permits(&self) -> u32 {
        self.shared.gate.permits()
    }

    /// Extra permits currently granted above base capacity.
    #[must_use]
    pub fn extra_permits(&self) -> u32 {
        self.shared.load.extra_permits()
    }
}

impl Drop for DispatchEngine {
    fn drop(&mut self) {
        // Signal shutdown but do not join here; explicit stop() is the
        // graceful path. Detached workers exit once the queue drains.
        if !self.shared.ctx.is_shutting_down() && !self.workers.lock().is_empty() {
            self.shared.ctx.begin_shutdown();
            self.shared.queue.close();
            debug!("engine dropped without explicit stop; workers detached");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::builders::EngineBuilder;
    use crate::core::{FixedWork, NoFailures};

    fn quiet_engine() -> DispatchEngine {
        EngineBuilder::new(EngineConfig::default())
            .with_executor(Arc::new(FixedWork::new(Duration::from_millis(10))))
            .with_failure_policy(Arc::new(NoFailures))
            .build()
            .unwrap()
    }

    #[test]
    fn test_submit_assigns_monotonic_ids() {
        let engine = quiet_engine();
        assert_eq!(engine.submit(3, false, None).unwrap(), 1);
        assert_eq!(engine.submit(3, false, None).unwrap(), 2);
        assert_eq!(engine.submit(3, false, Some(99)).unwrap(), 99);
        assert_eq!(engine.submit(3, false, None).unwrap(), 3);
        assert_eq!(engine.pending(), 4);
    }

    #[test]
    fn test_submit_rejects_invalid_priority() {
        let engine = quiet_engine();
        assert!(matches!(
            engine.submit(0, false, None),
            Err(DispatchError::InvalidPriority(0))
        ));
        assert!(matches!(
            engine.submit(6, true, None),
            Err(DispatchError::InvalidPriority(6))
        ));
    }

    #[test]
    fn test_start_twice_errors() {
        let engine = quiet_engine();
        engine.start().unwrap();
        assert!(matches!(engine.start(), Err(DispatchError::AlreadyStarted)));
        engine.stop();
    }

    #[test]
    fn test_fail_resource_unknown_unit() {
        let engine = quiet_engine();
        assert!(matches!(
            engine.fail_resource(42),
            Err(DispatchError::UnknownUnit(42))
        ));
    }

    #[test]
    fn test_fail_resource_requeues_in_flight_count() {
        let engine = quiet_engine();
        // Route all selections to unit 0, then give it in-flight work.
        for unit_id in 1..engine.shared.config.unit_count {
            engine.shared.pool.fail(unit_id).unwrap();
        }
        for _ in 0..3 {
            assert_eq!(engine.shared.pool.acquire_unit(), Some(0));
        }

        let redirected = engine.fail_resource(0).unwrap();
        assert_eq!(redirected, 3);
        assert_eq!(engine.pending(), 3);
        // Second fail is a no-op and adds nothing.
        assert_eq!(engine.fail_resource(0).unwrap(), 0);
        assert_eq!(engine.pending(), 3);
    }

    #[test]
    fn test_emergency_flag_round_trip() {
        let engine = quiet_engine();
        assert!(!engine.is_emergency());
        engine.trigger_emergency();
        assert!(engine.is_emergency());
        engine.clear_emergency();
        assert!(!engine.is_emergency());
    }
}
