//! Fixed-capacity LRU cache.
//!
//! [`BoundedCache`] is not synchronized. Callers that share one across
//! threads wrap it in a mutex, as `ClutStore` does for all of its caches.
//!
//! ```rust
//! use clut_core::BoundedCache;
//!
//! let mut cache = BoundedCache::new(2);
//! cache.set("a", 1);
//! cache.set("b", 2);
//! cache.get(&"a");          // "a" is now the most recently used
//! cache.set("c", 3);        // evicts "b"
//! assert_eq!(cache.get(&"b"), None);
//! assert_eq!(cache.get(&"a"), Some(&1));
//! ```

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Key/value cache evicting the least recently used entry when full.
///
/// Both [`get`](Self::get) and [`set`](Self::set) count as a use.
#[derive(Debug, Clone)]
pub struct BoundedCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, (V, u64)>,
    order: BTreeMap<u64, K>,
}

impl<K: Eq + Hash + Clone, V> BoundedCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (at least 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            tick: 0,
            entries: HashMap::new(),
            order: BTreeMap::new(),
        }
    }

    fn touch(&mut self, key: &K) {
        self.tick += 1;
        let tick = self.tick;
        if let Some((_, used)) = self.entries.get_mut(key) {
            self.order.remove(used);
            *used = tick;
            self.order.insert(tick, key.clone());
        }
    }

    /// Looks up `key`, marking it as recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        if !self.entries.contains_key(key) {
            return None;
        }
        self.touch(key);
        self.entries.get(key).map(|(v, _)| v)
    }

    /// Inserts or replaces `key`, evicting the oldest entry if full.
    pub fn set(&mut self, key: K, value: V) {
        if let Some(slot) = self.entries.get_mut(&key) {
            slot.0 = value;
            self.touch(&key);
            return;
        }

        while self.entries.len() >= self.capacity {
            let Some((_, oldest)) = self.order.pop_first() else {
                break;
            };
            self.entries.remove(&oldest);
        }

        self.tick += 1;
        self.order.insert(self.tick, key.clone());
        self.entries.insert(key, (value, self.tick));
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let (value, used) = self.entries.remove(key)?;
        self.order.remove(&used);
        Some(value)
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = BoundedCache::new(3);
        for k in 0..3 {
            cache.set(k, k * 10);
        }
        assert_eq!(cache.get(&0), Some(&0));
        cache.set(3, 30);

        assert_eq!(cache.get(&1), None);
        assert_eq!(cache.get(&0), Some(&0));
        assert_eq!(cache.get(&2), Some(&20));
        assert_eq!(cache.get(&3), Some(&30));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_insertion_order_without_reads() {
        let mut cache = BoundedCache::new(2);
        cache.set("x", 1);
        cache.set("y", 2);
        cache.set("z", 3);
        assert!(cache.get(&"x").is_none());
        assert!(cache.get(&"y").is_some());
    }

    #[test]
    fn test_replace_refreshes() {
        let mut cache = BoundedCache::new(2);
        cache.set(1, "a");
        cache.set(2, "b");
        cache.set(1, "c");
        cache.set(3, "d");
        assert_eq!(cache.get(&1), Some(&"c"));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_clear_and_remove() {
        let mut cache = BoundedCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.set(1, 1);
        assert_eq!(cache.remove(&1), Some(1));
        cache.set(2, 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
