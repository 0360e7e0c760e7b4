//! A priority queue ordered by due time, with optional durable mirroring.
//!
//! Ordering is deliberately coarse: due times are compared at whole-second
//! granularity, and items due in the same second come out in insertion order.
//! That keeps runs reproducible when many steps land on the same instant.
//!
//! The queue keeps a side index keyed by each item's sync id. The index is
//! what gets mirrored to storage, so its size must track the heap's; if the
//! two ever diverge the queue marks itself inconsistent and stays that way.
//! Processing continues regardless, the flag only drives reporting.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use time::OffsetDateTime;
use wardflow_core::metrics::{MetricsSink, names};
use wardflow_core::{CoreError, Result};
use wardflow_store::{ItemSyncer, SyncedItem};

/// Gauge label value for queues holding pathway events.
pub const EVENT_ITEM_TYPE: &str = "event";
/// Gauge label value for queues holding outbound messages.
pub const MESSAGE_ITEM_TYPE: &str = "message";
/// Gauge label value for mirrored patient records.
pub const PATIENT_ITEM_TYPE: &str = "patient";

/// An item that can wait in a [`TimeOrderedQueue`].
pub trait QueueItem: SyncedItem + Clone {
    /// The instant at which the item becomes due for processing.
    fn due_time(&self) -> OffsetDateTime;
}

/// Heap entry ordered by (due second, insertion sequence), earliest first.
struct HeapEntry<T> {
    key: (i64, u64),
    item: T,
}

impl<T> PartialEq for HeapEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<T> Eq for HeapEntry<T> {}

impl<T> PartialOrd for HeapEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for HeapEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so the smallest key surfaces first in the max-heap.
        other.key.cmp(&self.key)
    }
}

struct Inner<T> {
    heap: BinaryHeap<HeapEntry<T>>,
    index: HashSet<String>,
    next_seq: u64,
    consistent: bool,
}

/// A thread-safe queue that releases items in due-time order.
///
/// When built with a syncer, every put is written through and every get is
/// deleted from storage, so the mirror always holds exactly the pending
/// items. Mirror failures are logged and do not interrupt the simulation.
pub struct TimeOrderedQueue<T> {
    inner: Mutex<Inner<T>>,
    item_type: &'static str,
    syncer: Option<Arc<dyn ItemSyncer<T>>>,
    metrics: Arc<dyn MetricsSink>,
}

impl<T: QueueItem> TimeOrderedQueue<T> {
    /// Creates a queue with no durable mirror.
    pub fn new(item_type: &'static str, metrics: Arc<dyn MetricsSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                index: HashSet::new(),
                next_seq: 0,
                consistent: true,
            }),
            item_type,
            syncer: None,
            metrics,
        }
    }

    /// Creates a queue that mirrors every mutation to the syncer.
    ///
    /// The queue starts empty; call [`Self::load_from_syncer`] to replay
    /// previously persisted items. A load failure leaves the queue usable.
    pub fn with_syncer(
        item_type: &'static str,
        syncer: Arc<dyn ItemSyncer<T>>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let mut queue = Self::new(item_type, metrics);
        queue.syncer = Some(syncer);
        queue
    }

    /// Replays every item held by the syncer into the queue and returns how
    /// many were loaded. Replayed items are not written back to storage.
    pub fn load_from_syncer(&self) -> Result<usize> {
        let Some(syncer) = self.syncer.as_ref() else {
            return Err(CoreError::configuration(
                "item syncer not set; cannot load from the syncer",
            ));
        };
        let items = syncer.load_all()?;
        let count = items.len();
        for item in items {
            self.put_internal(item, false);
        }
        Ok(count)
    }

    /// Adds an item to the queue and, when mirroring, to storage.
    ///
    /// Mirror write failures are logged rather than returned: a broken mirror
    /// must not stall the simulation.
    pub fn put(&self, item: T) {
        self.put_internal(item, true);
    }

    fn put_internal(&self, item: T, persist: bool) {
        if persist {
            if let Some(syncer) = self.syncer.as_ref() {
                if let Err(e) = syncer.write(&item) {
                    tracing::error!(item_type = self.item_type, error = %e, "Cannot persist item");
                }
            }
        }
        let id = item.sync_id();
        let due_secs = item.due_time().unix_timestamp();
        let mut inner = self.inner.lock();
        let key = (due_secs, inner.next_seq);
        inner.next_seq += 1;
        inner.heap.push(HeapEntry { key, item });
        if !inner.index.insert(id.clone()) {
            tracing::warn!(key = %id, "Key collision, elements can be lost");
        }
        if inner.heap.len() != inner.index.len() && inner.consistent {
            tracing::warn!(
                heap = inner.heap.len(),
                index = inner.index.len(),
                "Queues out of sync after put"
            );
            inner.consistent = false;
        } else {
            self.metrics
                .gauge_add(names::PENDING_ITEMS, &[("item_type", self.item_type)], 1.0);
        }
    }

    /// Removes and returns the earliest item.
    ///
    /// Note that the returned item is not necessarily due yet; callers that
    /// only want due items should [`Self::peek`] first.
    pub fn get(&self) -> Result<T> {
        let mut inner = self.inner.lock();
        let Some(entry) = inner.heap.pop() else {
            return Err(CoreError::EmptyQueue);
        };
        if let Some(syncer) = self.syncer.as_ref() {
            if let Err(e) = syncer.delete(&entry.item) {
                tracing::error!(item_type = self.item_type, error = %e, "Cannot delete item from the syncer");
            }
        }
        let id = entry.item.sync_id();
        if !inner.index.remove(&id) {
            tracing::warn!(key = %id, "Elements out of sync: asked to remove an item that was not present");
        } else {
            self.metrics
                .gauge_add(names::PENDING_ITEMS, &[("item_type", self.item_type)], -1.0);
        }
        if inner.heap.len() != inner.index.len() && inner.consistent {
            tracing::warn!(
                heap = inner.heap.len(),
                index = inner.index.len(),
                "Queues out of sync after get"
            );
            inner.consistent = false;
        }
        Ok(entry.item)
    }

    /// Returns a copy of the earliest item without removing it.
    pub fn peek(&self) -> Option<T> {
        self.inner.lock().heap.peek().map(|entry| entry.item.clone())
    }

    /// Number of distinct pending items, as tracked by the side index.
    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().heap.is_empty()
    }

    /// Whether the heap and the side index have always agreed. Once false it
    /// never becomes true again.
    pub fn is_consistent(&self) -> bool {
        self.inner.lock().consistent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::datetime;
    use wardflow_core::{NullSink, RecordingSink};
    use wardflow_store::InMemorySyncer;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Ticket {
        id: String,
        due: OffsetDateTime,
    }

    impl SyncedItem for Ticket {
        fn sync_id(&self) -> String {
            self.id.clone()
        }
    }

    impl QueueItem for Ticket {
        fn due_time(&self) -> OffsetDateTime {
            self.due
        }
    }

    fn ticket(id: &str, due: OffsetDateTime) -> Ticket {
        Ticket {
            id: id.to_string(),
            due,
        }
    }

    fn queue() -> TimeOrderedQueue<Ticket> {
        TimeOrderedQueue::new(EVENT_ITEM_TYPE, Arc::new(NullSink))
    }

    #[test]
    fn test_get_returns_items_in_due_time_order() {
        let q = queue();
        q.put(ticket("late", datetime!(2024-05-01 12:30:00 UTC)));
        q.put(ticket("early", datetime!(2024-05-01 09:00:00 UTC)));
        q.put(ticket("middle", datetime!(2024-05-01 10:15:00 UTC)));

        assert_eq!(q.get().unwrap().id, "early");
        assert_eq!(q.get().unwrap().id, "middle");
        assert_eq!(q.get().unwrap().id, "late");
    }

    #[test]
    fn test_items_due_same_second_keep_insertion_order() {
        let q = queue();
        // Sub-second differences must not reorder: comparison is whole-second.
        q.put(ticket("first", datetime!(2024-05-01 09:00:00.900 UTC)));
        q.put(ticket("second", datetime!(2024-05-01 09:00:00.100 UTC)));
        q.put(ticket("third", datetime!(2024-05-01 09:00:00.500 UTC)));

        assert_eq!(q.get().unwrap().id, "first");
        assert_eq!(q.get().unwrap().id, "second");
        assert_eq!(q.get().unwrap().id, "third");
    }

    #[test]
    fn test_get_on_empty_queue_errors() {
        let q = queue();
        let err = q.get().unwrap_err();
        assert!(err.is_queue_error());
        assert_eq!(err.to_string(), "queue is empty");
    }

    #[test]
    fn test_peek_does_not_remove() {
        let q = queue();
        q.put(ticket("only", datetime!(2024-05-01 09:00:00 UTC)));

        assert_eq!(q.peek().unwrap().id, "only");
        assert_eq!(q.len(), 1);
        assert_eq!(q.get().unwrap().id, "only");
        assert!(q.peek().is_none());
    }

    #[test]
    fn test_len_and_is_empty() {
        let q = queue();
        assert!(q.is_empty());
        assert_eq!(q.len(), 0);

        q.put(ticket("a", datetime!(2024-05-01 09:00:00 UTC)));
        q.put(ticket("b", datetime!(2024-05-01 10:00:00 UTC)));
        assert!(!q.is_empty());
        assert_eq!(q.len(), 2);

        q.get().unwrap();
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_put_writes_through_and_get_deletes() {
        let syncer = InMemorySyncer::new();
        let q = TimeOrderedQueue::with_syncer(
            EVENT_ITEM_TYPE,
            Arc::new(syncer.clone()),
            Arc::new(NullSink),
        );

        q.put(ticket("a", datetime!(2024-05-01 09:00:00 UTC)));
        q.put(ticket("b", datetime!(2024-05-01 10:00:00 UTC)));
        assert_eq!(syncer.len(), 2);

        q.get().unwrap();
        assert_eq!(syncer.len(), 1);
    }

    #[test]
    fn test_load_from_syncer_rebuilds_time_order() {
        let syncer: InMemorySyncer<Ticket> = InMemorySyncer::new();
        let original = TimeOrderedQueue::with_syncer(
            EVENT_ITEM_TYPE,
            Arc::new(syncer.clone()),
            Arc::new(NullSink),
        );
        original.put(ticket("late", datetime!(2024-05-01 12:00:00 UTC)));
        original.put(ticket("early", datetime!(2024-05-01 09:00:00 UTC)));

        // A fresh queue over the same storage picks up where the old one left off.
        let restarted = TimeOrderedQueue::with_syncer(
            EVENT_ITEM_TYPE,
            Arc::new(syncer.clone()),
            Arc::new(NullSink),
        );
        assert_eq!(restarted.load_from_syncer().unwrap(), 2);
        assert_eq!(restarted.len(), 2);
        assert_eq!(restarted.get().unwrap().id, "early");
        assert_eq!(restarted.get().unwrap().id, "late");
        // Replay must not write back, so the mirror still reflects the gets.
        assert_eq!(syncer.len(), 0);
    }

    #[test]
    fn test_load_without_syncer_errors() {
        let q = queue();
        let err = q.load_from_syncer().unwrap_err();
        assert!(err.to_string().contains("item syncer not set"));
    }

    #[test]
    fn test_key_collision_marks_queue_inconsistent() {
        let q = queue();
        q.put(ticket("dup", datetime!(2024-05-01 09:00:00 UTC)));
        assert!(q.is_consistent());

        q.put(ticket("dup", datetime!(2024-05-01 10:00:00 UTC)));
        assert!(!q.is_consistent());
        // The heap kept both entries but the index collapsed to one.
        assert_eq!(q.len(), 1);
        assert!(q.get().is_ok());
        assert!(q.get().is_ok());
        assert!(q.get().is_err());
    }

    #[test]
    fn test_inconsistency_is_permanent() {
        let q = queue();
        q.put(ticket("dup", datetime!(2024-05-01 09:00:00 UTC)));
        q.put(ticket("dup", datetime!(2024-05-01 10:00:00 UTC)));
        assert!(!q.is_consistent());

        // Draining and refilling with distinct keys does not restore the flag.
        while q.get().is_ok() {}
        q.put(ticket("fresh", datetime!(2024-05-01 11:00:00 UTC)));
        assert!(!q.is_consistent());
    }

    #[test]
    fn test_pending_items_gauge_tracks_depth() {
        let sink = Arc::new(RecordingSink::new());
        let q: TimeOrderedQueue<Ticket> =
            TimeOrderedQueue::new(MESSAGE_ITEM_TYPE, Arc::clone(&sink) as _);

        q.put(ticket("a", datetime!(2024-05-01 09:00:00 UTC)));
        q.put(ticket("b", datetime!(2024-05-01 10:00:00 UTC)));
        assert_eq!(
            sink.gauge(names::PENDING_ITEMS, &[("item_type", "message")]),
            2.0
        );

        q.get().unwrap();
        assert_eq!(
            sink.gauge(names::PENDING_ITEMS, &[("item_type", "message")]),
            1.0
        );
    }
}
