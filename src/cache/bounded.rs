//! Size-bounded cache with optional expiry.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::SnapshotCache;
use crate::error::{ChainError, Result};
use crate::types::Hash;

struct CachedSnapshot<S> {
    snapshot: Arc<S>,
    expires_at: Option<Instant>,
}

/// LRU cache of snapshots.
///
/// Holds at most `capacity` entries; the least recently used one is evicted
/// on overflow. Entries written with a TTL read as absent once it elapses
/// and are dropped on that access.
pub struct LruSnapshotCache<S> {
    entries: Mutex<LruCache<Hash, CachedSnapshot<S>>>,
}

impl<S> LruSnapshotCache<S> {
    /// Create a cache holding at most `capacity` snapshots.
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            ChainError::InvalidConfig("cache capacity must be non-zero".into())
        })?;

        Ok(Self {
            entries: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }
}

impl<S: Send + Sync> SnapshotCache<S> for LruSnapshotCache<S> {
    fn get(&self, key: &Hash) -> Option<Arc<S>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => entry
                .expires_at
                .is_some_and(|deadline| Instant::now() >= deadline),
        };

        if expired {
            entries.pop(key);
            return None;
        }
        entries.get(key).map(|entry| Arc::clone(&entry.snapshot))
    }

    fn set(&self, key: Hash, snapshot: Arc<S>, ttl: Option<Duration>) {
        let expires_at = ttl.and_then(|ttl| Instant::now().checked_add(ttl));
        self.entries.lock().put(
            key,
            CachedSnapshot {
                snapshot,
                expires_at,
            },
        );
    }
}
