//! Backing store for the markup cache maps

use dashmap::DashMap;
use std::hash::Hash;

/// Key/value store behind one of the cache maps.
///
/// All operations are atomic with respect to each other; `put_if_absent`
/// is what makes concurrent loads of the same markup agree on one result.
pub trait CacheStore<K, V>: Send + Sync {
    fn get(&self, key: &K) -> Option<V>;

    fn contains_key(&self, key: &K) -> bool;

    fn put(&self, key: K, value: V);

    /// Store `value` unless the key is already present. Returns whichever
    /// value ends up stored.
    fn put_if_absent(&self, key: K, value: V) -> V;

    fn remove(&self, key: &K) -> Option<V>;

    /// Snapshot of the keys; safe to iterate while the store is modified
    fn keys(&self) -> Vec<K>;

    fn size(&self) -> usize;

    fn clear(&self);

    /// Release resources. The default store has none.
    fn shutdown(&self) {
        self.clear();
    }
}

/// Concurrent hash map store
#[derive(Debug)]
pub struct DashMapStore<K: Eq + Hash, V> {
    map: DashMap<K, V>,
}

impl<K: Eq + Hash, V> DashMapStore<K, V> {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

impl<K: Eq + Hash, V> Default for DashMapStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> CacheStore<K, V> for DashMapStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    fn contains_key(&self, key: &K) -> bool {
        self.map.contains_key(key)
    }

    fn put(&self, key: K, value: V) {
        self.map.insert(key, value);
    }

    fn put_if_absent(&self, key: K, value: V) -> V {
        self.map.entry(key).or_insert(value).value().clone()
    }

    fn remove(&self, key: &K) -> Option<V> {
        self.map.remove(key).map(|(_, value)| value)
    }

    fn keys(&self) -> Vec<K> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    fn size(&self) -> usize {
        self.map.len()
    }

    fn clear(&self) {
        self.map.clear();
    }
}
