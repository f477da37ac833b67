//! Unbounded in-memory cache.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::SnapshotCache;
use crate::types::Hash;

/// In-memory tree hash → snapshot map with no eviction.
///
/// TTL arguments are accepted and ignored.
pub struct MemoryCache<S> {
    entries: RwLock<HashMap<Hash, Arc<S>>>,
}

impl<S> MemoryCache<S> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached snapshots.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<S> Default for MemoryCache<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync> SnapshotCache<S> for MemoryCache<S> {
    fn get(&self, key: &Hash) -> Option<Arc<S>> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: Hash, snapshot: Arc<S>, _ttl: Option<Duration>) {
        self.entries.write().insert(key, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let cache = MemoryCache::new();
        let key = Hash::from_bytes(b"prefix");

        assert!(cache.get(&key).is_none());
        cache.set(key, Arc::new(vec![1, 2, 3]), None);
        assert_eq!(*cache.get(&key).unwrap(), vec![1, 2, 3]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ttl_ignored() {
        let cache = MemoryCache::new();
        let key = Hash::from_bytes(b"prefix");

        cache.set(key, Arc::new("value"), Some(Duration::ZERO));
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = MemoryCache::new();
        cache.set(Hash::from_bytes(b"a"), Arc::new(1), None);
        cache.set(Hash::from_bytes(b"b"), Arc::new(2), None);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
