//! Replay of operations over a base snapshot with prefix memoization.
//!
//! Each prefix of a sorted operation list is identified by its tree hash.
//! When a cache is attached, the evaluator walks backwards from the full
//! chain to the empty prefix looking for the longest prefix already
//! computed, then applies the remaining operations forward, caching every
//! new intermediate snapshot under its tree hash.
//!
//! Cache correctness relies on transforms being deterministic: the cache
//! trusts that equal tree hashes mean equal snapshots and never re-checks.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::cache::SnapshotCache;
use crate::error::{ChainError, Result, TransformError};
use crate::hashing::{hash_serialize, tree_hash, ContentHasher};
use crate::transforms::{Transform, TransformRegistry};
use crate::types::{Hash, Operation};

/// Cache backend plus the TTL to attach to every write.
pub struct CacheHandle<'a, S> {
    pub store: &'a dyn SnapshotCache<S>,
    pub ttl: Option<Duration>,
}

impl<S> Clone for CacheHandle<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S> Copy for CacheHandle<'_, S> {}

/// Result of an evaluation along with how much work it took.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation<S> {
    /// Snapshot after every operation.
    pub snapshot: S,

    /// Hash of the base snapshot.
    pub base_hash: Hash,

    /// Length of the cached prefix evaluation resumed from (0 = base).
    pub resumed_from: usize,

    /// Number of transforms invoked.
    pub applied: usize,
}

/// Snapshot currently at the head of the replay.
enum Current<'b, S> {
    Base(&'b S),
    Shared(Arc<S>),
    Owned(S),
}

impl<S: Clone> Current<'_, S> {
    fn get(&self) -> &S {
        match self {
            Current::Base(snap) => *snap,
            Current::Shared(snap) => snap.as_ref(),
            Current::Owned(snap) => snap,
        }
    }

    fn into_owned(self) -> S {
        match self {
            Current::Base(snap) => snap.clone(),
            Current::Shared(snap) => Arc::try_unwrap(snap).unwrap_or_else(|shared| (*shared).clone()),
            Current::Owned(snap) => snap,
        }
    }
}

/// Applies transforms to a base snapshot, optionally through a cache.
pub struct Evaluator<'a, S> {
    transforms: &'a TransformRegistry<S>,
    hasher: &'a dyn ContentHasher,
    cache: Option<CacheHandle<'a, S>>,
}

impl<'a, S> Evaluator<'a, S>
where
    S: Clone + Serialize + Send + Sync,
{
    /// Evaluator without a cache.
    pub fn new(transforms: &'a TransformRegistry<S>, hasher: &'a dyn ContentHasher) -> Self {
        Self {
            transforms,
            hasher,
            cache: None,
        }
    }

    /// Read from and write to `store`, tagging writes with `ttl`.
    pub fn with_cache(mut self, store: &'a dyn SnapshotCache<S>, ttl: Option<Duration>) -> Self {
        self.cache = Some(CacheHandle { store, ttl });
        self
    }

    /// Replay `operations` over `base`.
    ///
    /// Fails with [`ChainError::AsyncTransform`] if an operation maps to an
    /// async transform; use [`evaluate_async`](Self::evaluate_async) then.
    pub fn evaluate(&self, base: &S, operations: &[Operation]) -> Result<S> {
        self.evaluate_detailed(base, operations)
            .map(|evaluation| evaluation.snapshot)
    }

    /// Like [`evaluate`](Self::evaluate), also reporting cache reuse.
    pub fn evaluate_detailed(&self, base: &S, operations: &[Operation]) -> Result<Evaluation<S>> {
        let base_hash = hash_serialize(self.hasher, base)?;
        let (mut current, resumed_from) = self.resume_point(base, &base_hash, operations)?;

        for (index, operation) in operations.iter().enumerate().skip(resumed_from) {
            let result = match self.transforms.get(&operation.action)? {
                Transform::Sync(f) => f(current.get().clone(), operation.data()),
                Transform::Async(_) => {
                    return Err(ChainError::AsyncTransform(operation.action.clone()))
                }
            };
            let snapshot = self.check(result, operation, index)?;
            current = self.advance(operations, &base_hash, index + 1, snapshot)?;
        }

        Ok(Evaluation {
            snapshot: current.into_owned(),
            base_hash,
            resumed_from,
            applied: operations.len() - resumed_from,
        })
    }

    /// Replay `operations` over `base`, awaiting async transforms.
    ///
    /// Operations still run strictly one after another.
    pub async fn evaluate_async(&self, base: &S, operations: &[Operation]) -> Result<S> {
        self.evaluate_detailed_async(base, operations)
            .await
            .map(|evaluation| evaluation.snapshot)
    }

    /// Like [`evaluate_async`](Self::evaluate_async), also reporting cache reuse.
    pub async fn evaluate_detailed_async(
        &self,
        base: &S,
        operations: &[Operation],
    ) -> Result<Evaluation<S>> {
        let base_hash = hash_serialize(self.hasher, base)?;
        let (mut current, resumed_from) = self.resume_point(base, &base_hash, operations)?;

        for (index, operation) in operations.iter().enumerate().skip(resumed_from) {
            let result = match self.transforms.get(&operation.action)? {
                Transform::Sync(f) => f(current.get().clone(), operation.data()),
                Transform::Async(f) => f(current.get().clone(), operation.data.clone()).await,
            };
            let snapshot = self.check(result, operation, index)?;
            current = self.advance(operations, &base_hash, index + 1, snapshot)?;
        }

        Ok(Evaluation {
            snapshot: current.into_owned(),
            base_hash,
            resumed_from,
            applied: operations.len() - resumed_from,
        })
    }

    /// Longest cached prefix, scanning from the full chain down to empty.
    fn resume_point<'b>(
        &self,
        base: &'b S,
        base_hash: &Hash,
        operations: &[Operation],
    ) -> Result<(Current<'b, S>, usize)> {
        let Some(cache) = self.cache else {
            return Ok((Current::Base(base), 0));
        };

        for index in (0..=operations.len()).rev() {
            let key = tree_hash(operations, base_hash, index, self.hasher)?;
            if let Some(snapshot) = cache.store.get(&key) {
                debug!(
                    resume_index = index,
                    total = operations.len(),
                    "Resuming from cached prefix"
                );
                return Ok((Current::Shared(snapshot), index));
            }
        }

        debug!(total = operations.len(), "No cached prefix, replaying from base");
        Ok((Current::Base(base), 0))
    }

    fn check(
        &self,
        result: std::result::Result<S, TransformError>,
        operation: &Operation,
        index: usize,
    ) -> Result<S> {
        result.map_err(|source| {
            warn!(action = %operation.action, index, error = %source, "Transform failed");
            ChainError::Transform {
                action: operation.action.clone(),
                index,
                source,
            }
        })
    }

    /// Cache the snapshot for the prefix of length `prefix_len` and make it current.
    fn advance<'b>(
        &self,
        operations: &[Operation],
        base_hash: &Hash,
        prefix_len: usize,
        snapshot: S,
    ) -> Result<Current<'b, S>> {
        trace!(
            action = %operations[prefix_len - 1].action,
            prefix_len,
            "Applied operation"
        );

        let Some(cache) = self.cache else {
            return Ok(Current::Owned(snapshot));
        };

        let key = tree_hash(operations, base_hash, prefix_len, self.hasher)?;
        let snapshot = Arc::new(snapshot);
        cache.store.set(key, Arc::clone(&snapshot), cache.ttl);
        Ok(Current::Shared(snapshot))
    }
}
