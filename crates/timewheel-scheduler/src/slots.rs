//! Slot store: the circular buffer of per-tick queues plus the id index.
//!
//! Task state lives in one arena keyed by id. Each slot is a FIFO of ids into
//! that arena, so a task can never diverge between its slot and the index.
//! Only the scheduler loop touches a `SlotStore`.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use timewheel_core::{Result, TimeWheelError};

use crate::task::{Callback, Task, TaskId};

/// Arena entry: the task plus where it currently sits in the wheel.
struct Entry {
    task: Task,
    slot: usize,
    circle: u64,
}

/// A callback that came due during a tick.
pub(crate) struct Due {
    pub id: TaskId,
    pub callback: Callback,
}

pub(crate) struct SlotStore {
    interval: Duration,
    slots: Vec<VecDeque<TaskId>>,
    entries: HashMap<TaskId, Entry>,
    cursor: usize,
    max_slot_depth: usize,
}

impl SlotStore {
    pub fn new(interval: Duration, slot_count: usize) -> Result<Self> {
        if interval.is_zero() {
            return Err(TimeWheelError::invalid_argument("interval must be > 0"));
        }
        if slot_count == 0 {
            return Err(TimeWheelError::invalid_argument("slot count must be > 0"));
        }
        Ok(Self {
            interval,
            slots: (0..slot_count).map(|_| VecDeque::new()).collect(),
            entries: HashMap::new(),
            cursor: 0,
            max_slot_depth: 0,
        })
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of tasks currently scheduled.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.entries.contains_key(id)
    }

    #[cfg(test)]
    pub fn slot_len(&self, pos: usize) -> usize {
        self.slots.get(pos).map_or(0, VecDeque::len)
    }

    pub fn max_slot_depth(&self) -> usize {
        self.max_slot_depth
    }

    /// Slot and rotation count for `delay` measured from the current cursor.
    pub fn position_and_circle(&self, delay: Duration) -> (usize, u64) {
        let ticks = u64::try_from(delay.as_nanos() / self.interval.as_nanos()).unwrap_or(u64::MAX);
        let slot_count = self.slots.len() as u64;
        let circle = ticks / slot_count;
        let pos = (self.cursor as u64 + ticks % slot_count) % slot_count;
        (pos as usize, circle)
    }

    /// Append `task` to the tail of its target slot and index it by id.
    ///
    /// A task already present under the same id is replaced.
    pub fn insert(&mut self, task: Task) {
        if self.contains(task.id()) {
            self.remove(task.id());
        }
        let (slot, circle) = self.position_and_circle(task.delay());
        self.enqueue(task, slot, circle);
    }

    /// Cancel by id. Returns `false` when the id is unknown (already fired or removed).
    ///
    /// The index gives the slot in O(1); removing from that slot is a linear scan.
    pub fn remove(&mut self, id: &TaskId) -> bool {
        let Some(entry) = self.entries.get(id) else {
            return false;
        };
        let queue = &mut self.slots[entry.slot];
        if let Some(idx) = queue.iter().position(|queued| queued == id) {
            queue.remove(idx);
        }
        self.entries.remove(id);
        true
    }

    /// Process the slot under the cursor, then advance the cursor by one.
    ///
    /// Returns the callbacks that came due, in FIFO enqueue order.
    pub fn advance(&mut self) -> Vec<Due> {
        let pos = self.cursor;
        let queue = std::mem::take(&mut self.slots[pos]);
        self.max_slot_depth = self.max_slot_depth.max(queue.len());

        let mut kept = VecDeque::with_capacity(queue.len());
        let mut due = Vec::new();
        let mut rearm = Vec::new();

        for id in queue {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            if entry.circle > 0 {
                entry.circle -= 1;
                kept.push_back(id);
                continue;
            }
            due.push(Due {
                id: id.clone(),
                callback: entry.task.callback().clone(),
            });
            if entry.task.repeat() {
                rearm.push(id);
            } else {
                self.entries.remove(&id);
            }
        }
        self.slots[pos] = kept;

        for id in rearm {
            if let Some(entry) = self.entries.remove(&id) {
                let (slot, mut circle) = self.position_and_circle(entry.task.delay());
                // This tick already passed the slot under the cursor.
                if slot == pos {
                    circle = circle.saturating_sub(1);
                }
                self.enqueue(entry.task, slot, circle);
            }
        }

        self.cursor = (pos + 1) % self.slots.len();
        due
    }

    fn enqueue(&mut self, task: Task, slot: usize, circle: u64) {
        self.slots[slot].push_back(task.id().clone());
        self.entries.insert(task.id().clone(), Entry { task, slot, circle });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn task(id: &str, delay_ms: u64, repeat: bool) -> Task {
        Task::new(id.into(), ms(delay_ms), repeat, Arc::new(|| {}))
    }

    fn ids(due: &[Due]) -> Vec<&str> {
        due.iter().map(|d| d.id.as_str()).collect()
    }

    /// Drive `n` ticks and return the 1-based tick numbers on which `id` fired.
    fn fire_ticks(store: &mut SlotStore, id: &str, n: usize) -> Vec<usize> {
        (1..=n)
            .filter(|_| store.advance().iter().any(|d| d.id.as_str() == id))
            .collect()
    }

    #[test]
    fn test_rejects_invalid_geometry() {
        assert!(matches!(
            SlotStore::new(Duration::ZERO, 8),
            Err(TimeWheelError::InvalidArgument(_))
        ));
        assert!(matches!(
            SlotStore::new(ms(10), 0),
            Err(TimeWheelError::InvalidArgument(_))
        ));
        let store = SlotStore::new(ms(10), 8).unwrap();
        assert_eq!(store.slot_count(), 8);
        assert!(store.is_empty());
        assert!((0..8).all(|pos| store.slot_len(pos) == 0));
    }

    #[test]
    fn test_position_and_circle() {
        let mut store = SlotStore::new(ms(10), 2).unwrap();
        assert_eq!(store.position_and_circle(ms(30)), (1, 1));
        assert_eq!(store.position_and_circle(ms(20)), (0, 1));
        assert_eq!(store.position_and_circle(ms(10)), (1, 0));
        // Partial ticks truncate.
        assert_eq!(store.position_and_circle(ms(39)), (1, 1));

        store.advance();
        assert_eq!(store.cursor(), 1);
        assert_eq!(store.position_and_circle(ms(30)), (0, 1));
    }

    #[test]
    fn test_multi_rotation_delay_fires_after_delay() {
        // interval=10ms, 2 slots, delay=30ms: 3 ticks, one full rotation to wait out.
        let mut store = SlotStore::new(ms(10), 2).unwrap();
        store.insert(task("a", 30, false));
        assert_eq!(fire_ticks(&mut store, "a", 10), vec![4]);
        assert!(store.is_empty());
    }

    #[test]
    fn test_fires_after_at_least_delay_ticks() {
        for slot_count in [1, 2, 3, 7, 64] {
            for delay_ticks in 1..20u64 {
                let mut store = SlotStore::new(ms(10), slot_count).unwrap();
                // Start from an arbitrary cursor.
                for _ in 0..5 {
                    store.advance();
                }
                store.insert(task("t", delay_ticks * 10, false));
                let fired = fire_ticks(&mut store, "t", 64);
                assert_eq!(fired, vec![delay_ticks as usize + 1], "slots={slot_count} ticks={delay_ticks}");
            }
        }
    }

    #[test]
    fn test_fifo_order_within_slot() {
        let mut store = SlotStore::new(ms(10), 16).unwrap();
        store.insert(task("first", 20, false));
        store.insert(task("second", 20, false));
        store.insert(task("third", 20, false));
        assert_eq!(store.slot_len(2), 3);

        assert!(store.advance().is_empty());
        assert!(store.advance().is_empty());
        let due = store.advance();
        assert_eq!(ids(&due), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut store = SlotStore::new(ms(10), 8).unwrap();
        store.insert(task("a", 30, false));
        store.insert(task("b", 30, false));
        assert!(store.remove(&"a".into()));
        assert!(!store.remove(&"a".into()));
        assert!(!store.remove(&"missing".into()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.slot_len(3), 1);

        let fired: Vec<String> = (0..10)
            .flat_map(|_| store.advance())
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(fired, vec!["b".to_string()]);
    }

    #[test]
    fn test_remove_after_fire_is_noop() {
        let mut store = SlotStore::new(ms(10), 8).unwrap();
        store.insert(task("a", 10, false));
        store.advance();
        let due = store.advance();
        assert_eq!(ids(&due), vec!["a"]);
        assert!(!store.remove(&"a".into()));
    }

    #[test]
    fn test_repeat_period_matches_delay() {
        // 60ms repeat on a 10ms wheel fires every 6 ticks after the first.
        let mut store = SlotStore::new(ms(10), 3600).unwrap();
        store.insert(task("r", 60, true));
        let fired = fire_ticks(&mut store, "r", 62);
        assert_eq!(fired, vec![7, 13, 19, 25, 31, 37, 43, 49, 55, 61]);
        assert!(store.contains(&"r".into()));
    }

    #[test]
    fn test_repeat_period_when_delay_is_whole_rotations() {
        // Delay equal to one or two full rotations lands back on the slot being scanned.
        for (slots, delay_ms) in [(4, 40), (4, 80), (3, 60), (1, 10), (1, 30)] {
            let mut store = SlotStore::new(ms(10), slots).unwrap();
            store.insert(task("r", delay_ms, true));
            let period = (delay_ms / 10) as usize;
            let fired = fire_ticks(&mut store, "r", period * 4 + 1);
            let expected: Vec<usize> = (0..4).map(|k| period + 1 + k * period).collect();
            assert_eq!(fired, expected, "slots={slots} delay={delay_ms}");
        }
    }

    #[test]
    fn test_remove_repeating_task() {
        let mut store = SlotStore::new(ms(10), 8).unwrap();
        store.insert(task("r", 20, true));
        assert_eq!(fire_ticks(&mut store, "r", 3), vec![3]);
        assert!(store.remove(&"r".into()));
        assert!(fire_ticks(&mut store, "r", 20).is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_same_id_replaces() {
        let mut store = SlotStore::new(ms(10), 8).unwrap();
        store.insert(task("a", 50, false));
        store.advance();
        store.insert(task("a", 50, false));
        assert_eq!(store.len(), 1);
        assert_eq!((0..8).map(|p| store.slot_len(p)).sum::<usize>(), 1);
        // Countdown restarted from the second insert (cursor 1).
        assert_eq!(fire_ticks(&mut store, "a", 10), vec![6]);
    }

    #[test]
    fn test_due_callbacks_are_the_scheduled_ones() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut store = SlotStore::new(ms(10), 4).unwrap();
        store.insert(Task::new(
            "c".into(),
            ms(10),
            false,
            Arc::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        ));
        store.advance();
        for due in store.advance() {
            (due.callback)();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tracks_max_slot_depth() {
        let mut store = SlotStore::new(ms(10), 4).unwrap();
        for i in 0..5 {
            store.insert(task(&format!("t{i}"), 10, false));
        }
        assert_eq!(store.max_slot_depth(), 0);
        store.advance();
        store.advance();
        assert_eq!(store.max_slot_depth(), 5);
    }
}
