//! The ordered map contract consumed by the registry

use super::errors::KvResult;

/// A durable, ordered key-value map.
///
/// Reads are served from memory and cannot fail. Writes return the previous
/// value and fail only when the backend cannot make the change durable; a
/// failed write leaves the visible contents unchanged.
pub trait OrderedMap<K, V>: Send + Sync {
    /// Returns a copy of the value stored under `key`.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or replaces the value under `key`.
    fn insert(&mut self, key: K, value: V) -> KvResult<Option<V>>;

    /// Removes `key`. Removing an absent key is a no-op.
    fn remove(&mut self, key: &K) -> KvResult<Option<V>>;

    /// Number of live entries.
    fn len(&self) -> usize;

    /// Entries in ascending key order.
    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_>;

    fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keys in ascending order, detached from the map.
    fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.iter().map(|(k, _)| k.clone()).collect()
    }
}
