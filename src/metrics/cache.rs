//! Bounded key cache with deferred-visible eviction.

use crate::core::error::{MetricsError, Result};
use rustc_hash::FxHashMap;
use std::hash::Hash;

/// LRU-bounded map from opaque key to attribute bag.
///
/// Eviction is deferred-visible: when an insert pushes the cache over
/// capacity, the least-recently-used entry moves to a holding area instead
/// of being dropped. Lookups and key iteration see the holding area too, so
/// a snapshot built at the end of a batch is never missing an entry that a
/// later span in the same batch displaced. [`KeyCache::sweep`] discards the
/// holding area after the emit.
#[derive(Debug)]
pub struct KeyCache<K, V> {
    capacity: usize,
    tick: u64,
    active: FxHashMap<K, Entry<V>>,
    evicted: FxHashMap<K, V>,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    last_used: u64,
}

impl<K: Hash + Eq + Clone, V> KeyCache<K, V> {
    /// Creates a cache holding at most `capacity` active entries.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(MetricsError::config(
                "must provide a positive cache capacity",
            ));
        }
        Ok(KeyCache {
            capacity,
            tick: 0,
            active: FxHashMap::default(),
            evicted: FxHashMap::default(),
        })
    }

    /// Inserts the value if the key is absent, marking it most recently
    /// used. Returns true when the key was already present (in either set);
    /// the existing value and its recency are left untouched.
    pub fn contains_or_add(&mut self, key: K, value: V) -> bool {
        if self.active.contains_key(&key) || self.evicted.contains_key(&key) {
            return true;
        }

        if self.active.len() >= self.capacity {
            self.evict_lru();
        }

        self.tick += 1;
        self.active.insert(
            key,
            Entry {
                value,
                last_used: self.tick,
            },
        );
        false
    }

    /// Looks up a value in the active set or the holding area. Active hits
    /// refresh recency.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if let Some(entry) = self.active.get_mut(key) {
            self.tick += 1;
            entry.last_used = self.tick;
        }
        if let Some(entry) = self.active.get(key) {
            return Some(&entry.value);
        }
        self.evicted.get(key)
    }

    /// Iterates keys across the active set and the holding area.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.active.keys().chain(self.evicted.keys())
    }

    /// Discards the holding area.
    pub fn sweep(&mut self) {
        self.evicted.clear();
    }

    /// Empties both the active set and the holding area.
    pub fn purge(&mut self) {
        self.active.clear();
        self.evicted.clear();
        self.tick = 0;
    }

    /// Number of active entries.
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    /// Number of entries parked in the holding area.
    pub fn held_len(&self) -> usize {
        self.evicted.len()
    }

    /// Returns true when both sets are empty.
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.evicted.is_empty()
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .active
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            if let Some(entry) = self.active.remove(&key) {
                self.evicted.insert(key, entry.value);
            }
        }
    }
}
