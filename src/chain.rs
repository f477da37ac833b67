//! Main OperationChain struct tying all components together.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::cache::{LruSnapshotCache, MemoryCache, SnapshotCache};
use crate::error::Result;
use crate::evaluator::{Evaluation, Evaluator};
use crate::hashing::{hash_serialize, tree_hash, ContentHasher, Sha256Hasher};
use crate::operations::{normalize, normalize_all, sort_operations};
use crate::transforms::TransformRegistry;
use crate::types::{Hash, Operation, OperationInput};

/// Chain configuration.
#[derive(Clone, Debug, Default)]
pub struct ChainConfig {
    /// Maximum cached snapshots. `None` keeps every snapshot (unbounded).
    pub cache_capacity: Option<usize>,

    /// TTL passed with every cache write. The unbounded cache ignores it.
    pub cache_ttl: Option<Duration>,
}

/// An immutable base snapshot plus an ordered, growing list of operations.
///
/// Operations are kept sorted by timestamp; ties keep insertion order.
/// Evaluation replays them over the base, reusing cached prefixes.
pub struct OperationChain<S> {
    base: Arc<S>,
    base_hash: Hash,
    transforms: TransformRegistry<S>,
    operations: Vec<Operation>,
    cache: Arc<dyn SnapshotCache<S>>,
    hasher: Arc<dyn ContentHasher>,
    config: ChainConfig,
}

impl<S> OperationChain<S>
where
    S: Clone + Serialize + Send + Sync + 'static,
{
    /// Create a chain with the default configuration.
    pub fn new<I>(base: S, transforms: TransformRegistry<S>, initial: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<OperationInput>,
    {
        Self::with_config(base, transforms, initial, ChainConfig::default())
    }

    /// Create a chain with explicit configuration.
    pub fn with_config<I>(
        base: S,
        transforms: TransformRegistry<S>,
        initial: I,
        config: ChainConfig,
    ) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<OperationInput>,
    {
        let cache: Arc<dyn SnapshotCache<S>> = match config.cache_capacity {
            Some(capacity) => Arc::new(LruSnapshotCache::<S>::new(capacity)?),
            None => Arc::new(MemoryCache::<S>::new()),
        };
        let hasher: Arc<dyn ContentHasher> = Arc::new(Sha256Hasher);
        let base_hash = hash_serialize(hasher.as_ref(), &base)?;

        let mut chain = Self {
            base: Arc::new(base),
            base_hash,
            transforms,
            operations: Vec::new(),
            cache,
            hasher,
            config,
        };
        chain.insert_operations(initial)?;

        debug!(
            base_hash = %chain.base_hash,
            operations = chain.operations.len(),
            actions = chain.transforms.len(),
            "Created operation chain"
        );
        Ok(chain)
    }

    /// Use a different cache backend.
    ///
    /// The backend may be shared between chains; keys include the base hash,
    /// so chains over different bases never collide.
    pub fn with_cache(mut self, cache: Arc<dyn SnapshotCache<S>>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a different hash function, rehashing the base and every operation.
    pub fn with_hasher(mut self, hasher: Arc<dyn ContentHasher>) -> Result<Self> {
        self.base_hash = hash_serialize(hasher.as_ref(), self.base.as_ref())?;
        let inputs: Vec<OperationInput> = self
            .operations
            .iter()
            .map(|op| OperationInput::Structured {
                action: op.action.clone(),
                data: op.data().cloned(),
                timestamp: Some(op.timestamp),
            })
            .collect();
        self.operations = normalize_all(inputs, hasher.as_ref())?;
        self.hasher = hasher;
        Ok(self)
    }

    /// Record one operation.
    pub fn insert_operation(&mut self, input: impl Into<OperationInput>) -> Result<()> {
        let operation = normalize(input.into(), self.hasher.as_ref())?;
        self.operations.push(operation);
        sort_operations(&mut self.operations);
        Ok(())
    }

    /// Record several operations.
    ///
    /// Nothing is inserted if any input fails to normalize.
    pub fn insert_operations<I>(&mut self, inputs: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: Into<OperationInput>,
    {
        let processed = normalize_all(inputs, self.hasher.as_ref())?;
        if processed.is_empty() {
            return Ok(());
        }
        self.operations.extend(processed);
        sort_operations(&mut self.operations);
        Ok(())
    }

    /// Compute the current snapshot.
    ///
    /// With `use_cache`, cached prefixes are reused and new ones recorded.
    pub fn eval(&self, use_cache: bool) -> Result<S> {
        self.evaluator(use_cache)
            .evaluate(&self.base, &self.operations)
    }

    /// Like [`eval`](Self::eval), also reporting cache reuse.
    pub fn eval_detailed(&self, use_cache: bool) -> Result<Evaluation<S>> {
        self.evaluator(use_cache)
            .evaluate_detailed(&self.base, &self.operations)
    }

    /// Compute the current snapshot, awaiting async transforms.
    pub async fn eval_async(&self, use_cache: bool) -> Result<S> {
        self.evaluator(use_cache)
            .evaluate_async(&self.base, &self.operations)
            .await
    }

    /// Async form of [`eval_detailed`](Self::eval_detailed).
    pub async fn eval_detailed_async(&self, use_cache: bool) -> Result<Evaluation<S>> {
        self.evaluator(use_cache)
            .evaluate_detailed_async(&self.base, &self.operations)
            .await
    }

    /// Tree hash of the first `index` operations.
    pub fn tree_hash(&self, index: usize) -> Result<Hash> {
        tree_hash(&self.operations, &self.base_hash, index, self.hasher.as_ref())
    }

    /// Tree hash of the whole chain.
    pub fn head_hash(&self) -> Result<Hash> {
        self.tree_hash(self.operations.len())
    }

    pub fn base(&self) -> &S {
        &self.base
    }

    pub fn base_hash(&self) -> Hash {
        self.base_hash
    }

    /// Operations in evaluation order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn transforms(&self) -> &TransformRegistry<S> {
        &self.transforms
    }

    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    fn evaluator(&self, use_cache: bool) -> Evaluator<'_, S> {
        let evaluator = Evaluator::new(&self.transforms, self.hasher.as_ref());
        if use_cache {
            evaluator.with_cache(self.cache.as_ref(), self.config.cache_ttl)
        } else {
            evaluator
        }
    }
}

impl<S> fmt::Debug for OperationChain<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationChain")
            .field("base_hash", &self.base_hash)
            .field("operations", &self.operations.len())
            .field("transforms", &self.transforms)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;
    use serde_json::json;

    fn counter() -> TransformRegistry<i64> {
        TransformRegistry::new()
            .with("inc", |n, _| Ok(n + 1))
            .with("double", |n, _| Ok(n * 2))
    }

    #[test]
    fn test_initial_operations_sorted() {
        let chain = OperationChain::new(
            1,
            counter(),
            vec![
                OperationInput::new("double").at(Timestamp(2)),
                OperationInput::new("inc").at(Timestamp(1)),
            ],
        )
        .unwrap();

        let actions: Vec<&str> = chain.operations().iter().map(|op| op.action.as_str()).collect();
        assert_eq!(actions, vec!["inc", "double"]);
        assert_eq!(chain.eval(true).unwrap(), 4);
    }

    #[test]
    fn test_head_hash_tracks_operations() {
        let mut chain = OperationChain::new(0, counter(), Vec::<OperationInput>::new()).unwrap();
        let empty = chain.head_hash().unwrap();
        assert_eq!(empty, chain.tree_hash(0).unwrap());

        chain.insert_operation("inc").unwrap();
        assert_ne!(chain.head_hash().unwrap(), empty);
        assert_eq!(chain.tree_hash(0).unwrap(), empty);
    }

    #[test]
    fn test_with_hasher_propagates_errors() {
        let mut chain = OperationChain::new(0, counter(), Vec::<OperationInput>::new()).unwrap();
        chain.insert_operation("inc").unwrap();

        struct Rejecting;
        impl ContentHasher for Rejecting {
            fn hash_value(&self, _: &serde_json::Value) -> Result<Hash> {
                Err(crate::ChainError::Hashing("rejected".into()))
            }
        }

        let result = chain.with_hasher(Arc::new(Rejecting));
        assert!(result.is_err());
    }

    #[test]
    fn test_with_hasher_rehashes() {
        struct Prefixed;
        impl ContentHasher for Prefixed {
            fn hash_value(&self, value: &serde_json::Value) -> Result<Hash> {
                Sha256Hasher.hash_value(&json!({ "salt": 1, "value": value }))
            }
        }

        let chain = OperationChain::new(0, counter(), ["inc"]).unwrap();
        let default_hash = chain.operations()[0].hash;
        let timestamp = chain.operations()[0].timestamp;

        let chain = chain.with_hasher(Arc::new(Prefixed)).unwrap();
        assert_ne!(chain.operations()[0].hash, default_hash);
        assert_eq!(chain.operations()[0].timestamp, timestamp);
        assert_eq!(chain.eval(true).unwrap(), 1);
    }

    #[test]
    fn test_zero_capacity_config_rejected() {
        let result = OperationChain::with_config(
            0,
            counter(),
            Vec::<OperationInput>::new(),
            ChainConfig {
                cache_capacity: Some(0),
                ..Default::default()
            },
        );
        assert!(matches!(result, Err(crate::ChainError::InvalidConfig(_))));
    }
}
