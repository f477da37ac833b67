//! Snapshot cache keyed by tree hash.
//!
//! The evaluator only needs `get` and `set`; eviction and expiry are the
//! backend's business. Two backends ship with the crate:
//!
//! - [`MemoryCache`]: unbounded map, ignores TTL. Grows for the lifetime
//!   of the chain.
//! - [`LruSnapshotCache`]: bounded by entry count, honors TTL.

mod bounded;
mod memory;

pub use bounded::LruSnapshotCache;
pub use memory::MemoryCache;

use crate::types::Hash;
use std::sync::Arc;
use std::time::Duration;

/// Pluggable key → snapshot store.
///
/// Keys are content-derived, so concurrent writers for the same key always
/// carry equal snapshots and `set` may simply overwrite.
pub trait SnapshotCache<S>: Send + Sync {
    /// Fetch the snapshot stored under `key`, if present and live.
    fn get(&self, key: &Hash) -> Option<Arc<S>>;

    /// Store `snapshot` under `key`. `ttl` is a hint; backends may ignore it.
    fn set(&self, key: Hash, snapshot: Arc<S>, ttl: Option<Duration>);
}
