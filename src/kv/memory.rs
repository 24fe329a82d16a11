//! In-memory region backed by a `BTreeMap`

use std::collections::BTreeMap;

use super::errors::KvResult;
use super::map::OrderedMap;

/// Volatile ordered map. Never fails.
#[derive(Debug, Clone)]
pub struct MemoryMap<K, V> {
    entries: BTreeMap<K, V>,
}

impl<K: Ord, V> MemoryMap<K, V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K, V> OrderedMap<K, V> for MemoryMap<K, V>
where
    K: Ord + Clone + Send + Sync,
    V: Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) -> KvResult<Option<V>> {
        Ok(self.entries.insert(key, value))
    }

    fn remove(&mut self, key: &K) -> KvResult<Option<V>> {
        Ok(self.entries.remove(key))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&K, &V)> + '_> {
        Box::new(self.entries.iter())
    }

    fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }
}
