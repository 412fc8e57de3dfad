//! Structured dispatch events and sink abstraction.
//!
//! Every dispatch decision, failure, repair, emergency drop, and capacity
//! change is reported as a [`DispatchEvent`]. Events go to `tracing` plus an
//! optional [`EventSink`], so callers can route them to any backend.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;

use super::WorkItem;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An item entered the queue.
    Submitted,
    /// A worker began executing an item on a unit.
    Started,
    /// An item finished executing.
    Completed,
    /// An item was pushed back because no healthy unit was available.
    Requeued,
    /// A resource unit failed; its in-flight work was redirected.
    UnitFailed,
    /// A resource unit was repaired.
    UnitRepaired,
    /// A low-priority non-critical item was dropped under emergency mode.
    EmergencyDropped,
    /// A critical item was expedited under emergency mode.
    CriticalExpedited,
    /// The load controller granted an extra permit.
    CapacityGranted,
    /// The load controller withdrew an extra permit.
    CapacityWithdrawn,
    /// Emergency mode was enabled.
    EmergencySet,
    /// Emergency mode was cleared.
    EmergencyCleared,
}

/// One structured observability record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    /// Event kind.
    pub kind: EventKind,
    /// Item id, when the event concerns an item.
    pub item_id: Option<u64>,
    /// Item priority, when applicable.
    pub priority: Option<u8>,
    /// Item criticality, when applicable.
    pub critical: Option<bool>,
    /// Resource unit id, when applicable.
    pub unit_id: Option<u32>,
    /// Current system load, when applicable.
    pub load: Option<u32>,
    /// Timestamp in milliseconds since epoch.
    pub at_ms: u128,
}

impl DispatchEvent {
    /// Start building an event of the given kind, stamped with now.
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            item_id: None,
            priority: None,
            critical: None,
            unit_id: None,
            load: None,
            at_ms: now_ms(),
        }
    }

    /// Attach the item's id, priority, and criticality.
    #[must_use]
    pub const fn with_item(mut self, item: &WorkItem) -> Self {
        self.item_id = Some(item.id);
        self.priority = Some(item.priority.get());
        self.critical = Some(item.critical);
        self
    }

    /// Attach a resource unit id.
    #[must_use]
    pub const fn with_unit(mut self, unit_id: u32) -> Self {
        self.unit_id = Some(unit_id);
        self
    }

    /// Attach the current load reading.
    #[must_use]
    pub const fn with_load(mut self, load: u32) -> Self {
        self.load = Some(load);
        self
    }
}

/// Destination for dispatch events.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: DispatchEvent);
}

/// Bounded in-memory sink for tests and development.
pub struct InMemoryEventSink {
    events: Mutex<VecDeque<DispatchEvent>>,
    max_events: usize,
}

impl InMemoryEventSink {
    /// Create a sink retaining at most `max_events`, oldest evicted first.
    /// A zero bound discards every event.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(max_events.min(1024))),
            max_events,
        }
    }

    /// Snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Count events of one kind.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.kind == kind)
            .count()
    }
}

impl EventSink for InMemoryEventSink {
    fn record(&self, event: DispatchEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        while events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Priority;

    #[test]
    fn test_builder_attaches_fields() {
        let item = WorkItem::new(7, Priority::new(2).unwrap(), true);
        let event = DispatchEvent::new(EventKind::Started)
            .with_item(&item)
            .with_unit(3)
            .with_load(42);

        assert_eq!(event.kind, EventKind::Started);
        assert_eq!(event.item_id, Some(7));
        assert_eq!(event.priority, Some(2));
        assert_eq!(event.critical, Some(true));
        assert_eq!(event.unit_id, Some(3));
        assert_eq!(event.load, Some(42));
    }

    #[test]
    fn test_in_memory_sink_bounds_retention() {
        let sink = InMemoryEventSink::new(2);
        sink.record(DispatchEvent::new(EventKind::Submitted));
        sink.record(DispatchEvent::new(EventKind::Started));
        sink.record(DispatchEvent::new(EventKind::Completed));

        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Started);
        assert_eq!(events[1].kind, EventKind::Completed);
    }

    #[test]
    fn test_zero_capacity_sink_retains_nothing() {
        let sink = InMemoryEventSink::new(0);
        sink.record(DispatchEvent::new(EventKind::Submitted));
        sink.record(DispatchEvent::new(EventKind::Completed));

        assert!(sink.events().is_empty());
        assert_eq!(sink.count(EventKind::Submitted), 0);
    }

    #[test]
    fn test_event_serializes_to_json() {
        let event = DispatchEvent::new(EventKind::EmergencyDropped).with_load(90);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"emergency_dropped\""));
        assert!(json.contains("\"load\":90"));
    }
}
