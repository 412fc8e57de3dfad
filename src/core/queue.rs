//! Shared priority queue with blocking dequeue and critical-item preemption.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use parking_lot::{Condvar, Mutex};

use super::WorkItem;

/// Wrapper making [`WorkItem`] orderable for the max-heap: critical items
/// dominate non-critical ones outright, then lower numeric priority wins.
/// Ties are broken arbitrarily; insertion order is not guaranteed.
struct QueuedItem {
    item: WorkItem,
}

impl PartialEq for QueuedItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedItem {}

impl PartialOrd for QueuedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item
            .critical
            .cmp(&other.item.critical)
            .then_with(|| other.item.priority.get().cmp(&self.item.priority.get()))
    }
}

struct QueueInner {
    heap: BinaryHeap<QueuedItem>,
    closed: bool,
}

/// Unbounded priority queue shared by producers and dispatch workers.
///
/// `push` is O(log n); `pop_highest` blocks until an item is available.
/// Capacity is intentionally unbounded: bounded admission happens downstream
/// via the capacity gate and emergency filtering, and the queue itself never
/// drops an item.
pub struct PriorityQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
}

impl PriorityQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Insert an item and wake one blocked worker.
    pub fn push(&self, item: WorkItem) {
        let mut inner = self.inner.lock();
        inner.heap.push(QueuedItem { item });
        drop(inner);
        self.available.notify_one();
    }

    /// Remove and return the highest-ordered item, blocking while the queue
    /// is empty.
    ///
    /// Returns `None` only once the queue has been closed **and** drained, so
    /// items enqueued before shutdown are still served. Every blocked caller
    /// is woken by [`close`](Self::close).
    pub fn pop_highest(&self) -> Option<WorkItem> {
        let mut inner = self.inner.lock();
        loop {
            if let Some(entry) = inner.heap.pop() {
                return Some(entry.item);
            }
            if inner.closed {
                return None;
            }
            self.available.wait(&mut inner);
        }
    }

    /// Non-blocking emptiness check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().heap.len()
    }

    /// Close the queue for shutdown, waking all blocked workers.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        inner.closed = true;
        drop(inner);
        self.available.notify_all();
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::core::Priority;

    fn item(id: u64, priority: u8, critical: bool) -> WorkItem {
        WorkItem::new(id, Priority::new(priority).unwrap(), critical)
    }

    #[test]
    fn test_lower_numeric_priority_dequeues_first() {
        let q = PriorityQueue::new();
        q.push(item(1, 4, false));
        q.push(item(2, 2, false));
        q.push(item(3, 5, false));

        assert_eq!(q.pop_highest().unwrap().id, 2);
        assert_eq!(q.pop_highest().unwrap().id, 1);
        assert_eq!(q.pop_highest().unwrap().id, 3);
    }

    #[test]
    fn test_critical_dominates_numeric_priority() {
        let q = PriorityQueue::new();
        q.push(item(1, 1, false));
        q.push(item(2, 5, true));

        // Critical priority-5 beats non-critical priority-1.
        assert_eq!(q.pop_highest().unwrap().id, 2);
        assert_eq!(q.pop_highest().unwrap().id, 1);
    }

    #[test]
    fn test_mixed_submission_scenario() {
        // Non-critical priorities [5,1,3,1,4], then one critical priority-5.
        // Expected order: critical first, then 1, 1, 3, 4, 5.
        let q = PriorityQueue::new();
        for (id, priority) in [(1, 5), (2, 1), (3, 3), (4, 1), (5, 4)] {
            q.push(item(id, priority, false));
        }
        q.push(item(6, 5, true));

        assert_eq!(q.pop_highest().unwrap().id, 6);
        let first = q.pop_highest().unwrap();
        let second = q.pop_highest().unwrap();
        // The two priority-1 items come out in arbitrary relative order.
        let mut pair = [first.id, second.id];
        pair.sort_unstable();
        assert_eq!(pair, [2, 4]);
        assert_eq!(q.pop_highest().unwrap().id, 3);
        assert_eq!(q.pop_highest().unwrap().id, 5);
        assert_eq!(q.pop_highest().unwrap().id, 1);
    }

    #[test]
    fn test_blocked_pop_woken_by_push() {
        let q = Arc::new(PriorityQueue::new());
        let q2 = Arc::clone(&q);

        let handle = thread::spawn(move || q2.pop_highest());
        thread::sleep(Duration::from_millis(50));
        q.push(item(7, 3, false));

        let popped = handle.join().unwrap();
        assert_eq!(popped.unwrap().id, 7);
    }

    #[test]
    fn test_close_wakes_blocked_pop() {
        let q = Arc::new(PriorityQueue::new());
        let q2 = Arc::clone(&q);

        let handle = thread::spawn(move || q2.pop_highest());
        thread::sleep(Duration::from_millis(50));
        q.close();

        assert!(handle.join().unwrap().is_none());
    }

    #[test]
    fn test_close_drains_remaining_items() {
        let q = PriorityQueue::new();
        q.push(item(1, 2, false));
        q.push(item(2, 1, false));
        q.close();

        // Closed but not empty: items are still served, in order.
        assert_eq!(q.pop_highest().unwrap().id, 2);
        assert_eq!(q.pop_highest().unwrap().id, 1);
        assert!(q.pop_highest().is_none());
    }

    #[test]
    fn test_len_and_is_empty() {
        let q = PriorityQueue::new();
        assert!(q.is_empty());
        q.push(item(1, 3, false));
        q.push(item(2, 3, true));
        assert_eq!(q.len(), 2);
        assert!(!q.is_empty());
    }
}
