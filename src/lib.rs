//! # Operation Chain
//!
//! Event-sourced state evaluation: record operations instead of resulting
//! states, and recompute the current state on demand from an immutable base.
//!
//! ## Core Concepts
//!
//! - **Operations**: Named transformations with an optional JSON payload and
//!   a logical timestamp, content-hashed over `{action, data}`
//! - **Transforms**: Caller-registered functions implementing each action
//! - **Tree hashes**: Cumulative hashes identifying the state after any
//!   prefix of the sorted operation list
//! - **Cache**: Snapshots keyed by tree hash, so re-evaluation resumes from
//!   the longest prefix already computed
//!
//! ## Example
//!
//! ```
//! use opchain::{OperationChain, OperationInput, Timestamp, TransformRegistry};
//! use serde_json::json;
//!
//! let transforms = TransformRegistry::<i64>::new()
//!     .with("add", |n: i64, data| Ok(n + data.and_then(|d| d.as_i64()).unwrap_or(1)))
//!     .with("double", |n: i64, _| Ok(n * 2));
//!
//! let mut chain = OperationChain::new(1, transforms, ["double"])?;
//! assert_eq!(chain.eval(true)?, 2);
//!
//! // Sorts before "double", so the whole chain is replayed.
//! chain.insert_operation(OperationInput::new("add").data(json!(4)).at(Timestamp(0)))?;
//! assert_eq!(chain.eval(true)?, 10);
//! # Ok::<(), opchain::ChainError>(())
//! ```

pub mod cache;
pub mod chain;
pub mod error;
pub mod evaluator;
pub mod hashing;
pub mod operations;
pub mod transforms;
pub mod types;

// Re-exports
pub use cache::{LruSnapshotCache, MemoryCache, SnapshotCache};
pub use chain::{ChainConfig, OperationChain};
pub use error::{ChainError, Result, TransformError};
pub use evaluator::{CacheHandle, Evaluation, Evaluator};
pub use hashing::{hash_serialize, tree_hash, ContentHasher, Sha256Hasher};
pub use operations::{normalize, normalize_all, sort_operations};
pub use transforms::{Transform, TransformFuture, TransformRegistry, TransformResult};
pub use types::*;
