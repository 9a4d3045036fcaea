//! A thin wrapper over [`lru::LruCache`] that surfaces the evicted entry
//! on insert, so callers holding secret material (sessions, signing-key
//! caches, dedup entries) can dispose of it instead of letting it drop
//! silently mid-collection.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// A capacity-bounded map with LRU eviction.
///
/// `insert` returns the evicted `(key, value)` pair when the map was at
/// capacity, `None` otherwise (including the common case of updating an
/// existing key in place).
pub struct BoundedMap<K: Eq + Hash, V> {
    inner: LruCache<K, V>,
    capacity: usize,
}

impl<K: Eq + Hash, V> BoundedMap<K, V> {
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity > 0");
        Self {
            inner: LruCache::new(cap),
            capacity,
        }
    }

    /// Insert `key -> value`, evicting the least-recently-used entry if the
    /// map is full. Returns the evicted pair, if any.
    pub fn insert(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.inner.push(key, value)
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Evict and return the single least-recently-used entry, if any.
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        self.inner.pop_lru()
    }

    pub fn clear(&mut self) -> Vec<(K, V)> {
        let mut drained = Vec::with_capacity(self.inner.len());
        while let Some(pair) = self.inner.pop_lru() {
            drained.push(pair);
        }
        drained
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.inner.iter()
    }

    /// Remove entries that fail `keep`, returning the removed pairs so the
    /// caller can dispose any owned secret material.
    pub fn retain_evicting<F: Fn(&K, &V) -> bool>(&mut self, keep: F) -> Vec<(K, V)>
    where
        K: Clone,
    {
        let stale: Vec<K> = self
            .inner
            .iter()
            .filter(|(k, v)| !keep(k, v))
            .map(|(k, _)| k.clone())
            .collect();
        stale
            .into_iter()
            .filter_map(|k| self.inner.pop(&k).map(|v| (k, v)))
            .collect()
    }
}
