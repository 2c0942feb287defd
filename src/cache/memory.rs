//! Memory tier (L1): bounded, FIFO-evicting, in-process map.
//!
//! Entries are kept in a hash map of key → slot index plus an
//! arena-allocated doubly linked list recording write order. Insert,
//! evict-oldest and move-to-end are all O(1). Order changes only on
//! writes: re-inserting an existing key moves it to the back, reading it
//! does not (FIFO, not LRU).
//!
//! The map and the order list live behind one mutex, so an insert and the
//! eviction it triggers are a single atomic step.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::telemetry;
use crate::types::StoredValue;

/// Default memory tier capacity (entries).
pub const DEFAULT_MEMORY_TIER_CAPACITY: usize = 1_000;

struct Slot {
    key: String,
    value: StoredValue,
    size_bytes: usize,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Default)]
struct Inner {
    index: HashMap<String, usize>,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    size_bytes: usize,
}

impl Inner {
    fn slot(&self, idx: usize) -> &Slot {
        self.slots[idx].as_ref().expect("indexed slot is occupied")
    }

    fn slot_mut(&mut self, idx: usize) -> &mut Slot {
        self.slots[idx].as_mut().expect("indexed slot is occupied")
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = {
            let s = self.slot(idx);
            (s.prev, s.next)
        };
        match prev {
            Some(p) => self.slot_mut(p).next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slot_mut(n).prev = prev,
            None => self.tail = prev,
        }
        let s = self.slot_mut(idx);
        s.prev = None;
        s.next = None;
    }

    fn push_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        {
            let s = self.slot_mut(idx);
            s.prev = old_tail;
            s.next = None;
        }
        match old_tail {
            Some(t) => self.slot_mut(t).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    fn allocate(&mut self, slot: Slot) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(slot);
                idx
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    fn replace_at(&mut self, idx: usize, value: StoredValue, size_bytes: usize) {
        let old_size = {
            let slot = self.slot_mut(idx);
            slot.value = value;
            std::mem::replace(&mut slot.size_bytes, size_bytes)
        };
        self.size_bytes = self.size_bytes - old_size + size_bytes;
        self.unlink(idx);
        self.push_back(idx);
    }

    fn remove_at(&mut self, idx: usize) -> Slot {
        self.unlink(idx);
        let slot = self.slots[idx].take().expect("indexed slot is occupied");
        self.free.push(idx);
        self.index.remove(&slot.key);
        self.size_bytes -= slot.size_bytes;
        slot
    }
}

/// Bounded FIFO map used only for small-tier keys.
///
/// Entries carry no TTL. A resident entry keeps answering reads after the
/// remote copy has expired, until it is evicted, overwritten or cleared.
/// Deployments with short per-operation TTLs should size the tier small or
/// call [`CacheEngine::invalidate_memory_tier`](crate::CacheEngine::invalidate_memory_tier)
/// on a schedule.
pub struct MemoryTier {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MemoryTier {
    /// Create a tier holding at most `capacity` entries. Zero disables it.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Look up a key without changing eviction order.
    pub fn get(&self, key: &str) -> Option<StoredValue> {
        let inner = self.inner.lock();
        inner
            .index
            .get(key)
            .map(|&idx| inner.slot(idx).value.clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().index.contains_key(key)
    }

    /// Insert or replace `key`, moving it to the back of the eviction order.
    ///
    /// Returns the key evicted to make room, if any.
    pub fn insert(&self, key: impl Into<String>, value: StoredValue) -> Option<String> {
        if self.capacity == 0 {
            return None;
        }
        let key = key.into();
        let size_bytes = key.len() + value.estimated_size();
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.index.get(&key) {
            inner.replace_at(idx, value, size_bytes);
            return None;
        }

        let evicted = if inner.index.len() >= self.capacity {
            inner.head.map(|head| inner.remove_at(head).key)
        } else {
            None
        };

        let idx = inner.allocate(Slot {
            key: key.clone(),
            value,
            size_bytes,
            prev: None,
            next: None,
        });
        inner.push_back(idx);
        inner.index.insert(key, idx);
        inner.size_bytes += size_bytes;
        drop(inner);

        if let Some(ref old) = evicted {
            metrics::counter!(telemetry::MEMORY_TIER_EVICTIONS_TOTAL).increment(1);
            debug!(key = %old, "evicted oldest memory tier entry");
        }
        evicted
    }

    /// Replace the value of a resident key and move it to the back.
    ///
    /// Absent keys are left absent. Returns whether a replacement happened.
    pub fn replace_if_present(&self, key: &str, value: StoredValue) -> bool {
        let size_bytes = key.len() + value.estimated_size();
        let mut inner = self.inner.lock();
        match inner.index.get(key).copied() {
            Some(idx) => {
                inner.replace_at(idx, value, size_bytes);
                true
            }
            None => false,
        }
    }

    /// Remove a key, returning its value.
    pub fn remove(&self, key: &str) -> Option<StoredValue> {
        let mut inner = self.inner.lock();
        let idx = inner.index.get(key).copied()?;
        Some(inner.remove_at(idx).value)
    }

    /// Drop every entry, returning how many were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.index.len();
        *inner = Inner::default();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Estimated bytes held (keys plus serialized values).
    pub fn size_bytes(&self) -> usize {
        self.inner.lock().size_bytes
    }

    /// Keys in eviction order, oldest first.
    pub fn keys(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut keys = Vec::with_capacity(inner.index.len());
        let mut cursor = inner.head;
        while let Some(idx) = cursor {
            let slot = inner.slot(idx);
            keys.push(slot.key.clone());
            cursor = slot.next;
        }
        keys
    }
}

impl Default for MemoryTier {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_TIER_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(n: i64) -> StoredValue {
        StoredValue::new(json!({ "n": n }), "op", 1)
    }

    #[test]
    fn slots_are_reused_after_removal() {
        let tier = MemoryTier::new(2);
        tier.insert("a", value(1));
        tier.insert("b", value(2));
        tier.remove("a");
        tier.insert("c", value(3));
        assert_eq!(tier.inner.lock().slots.len(), 2);
        assert_eq!(tier.keys(), vec!["b", "c"]);
    }

    #[test]
    fn size_accounting_tracks_replacements() {
        let tier = MemoryTier::new(4);
        tier.insert("a", value(1));
        let before = tier.size_bytes();
        tier.insert("a", StoredValue::new(json!("x".repeat(100)), "op", 1));
        assert!(tier.size_bytes() > before);
        tier.remove("a");
        assert_eq!(tier.size_bytes(), 0);
    }

    #[test]
    fn replace_if_present_never_seeds() {
        let tier = MemoryTier::new(2);
        assert!(!tier.replace_if_present("a", value(1)));
        assert!(tier.is_empty());

        tier.insert("a", value(1));
        tier.insert("b", value(2));
        assert!(tier.replace_if_present("a", value(3)));
        assert_eq!(tier.keys(), vec!["b", "a"]);
        assert_eq!(tier.get("a").and_then(|v| v.get("n").cloned()), Some(json!(3)));
        assert_eq!(tier.len(), 2);
    }

    #[test]
    fn zero_capacity_disables_tier() {
        let tier = MemoryTier::new(0);
        assert_eq!(tier.insert("a", value(1)), None);
        assert!(tier.is_empty());
    }

    #[test]
    fn single_slot_tier_replaces_on_insert() {
        let tier = MemoryTier::new(1);
        tier.insert("a", value(1));
        assert_eq!(tier.insert("b", value(2)), Some("a".to_string()));
        assert_eq!(tier.keys(), vec!["b"]);
        assert!(tier.get("a").is_none());
    }
}
