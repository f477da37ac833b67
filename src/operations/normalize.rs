//! Canonical operation records.

use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::Result;
use crate::hashing::ContentHasher;
use crate::types::{Hash, Operation, OperationInput, Timestamp};

/// Normalize a single input into a canonical operation.
///
/// The registry is not consulted here; unknown actions surface at
/// evaluation time.
pub fn normalize(input: OperationInput, hasher: &dyn ContentHasher) -> Result<Operation> {
    match input {
        OperationInput::Action(action) => {
            let hash = hasher.hash_value(&json!({ "action": action }))?;
            Ok(Operation {
                action,
                data: None,
                timestamp: Timestamp::now(),
                hash,
            })
        }

        OperationInput::Structured {
            action,
            data,
            timestamp,
        } => {
            let hash = operation_hash(&action, data.as_ref(), hasher)?;
            Ok(Operation {
                action,
                data: data.map(Arc::new),
                timestamp: timestamp.unwrap_or_else(Timestamp::now),
                hash,
            })
        }
    }
}

/// Normalize a batch of inputs, preserving their order.
pub fn normalize_all<I>(inputs: I, hasher: &dyn ContentHasher) -> Result<Vec<Operation>>
where
    I: IntoIterator,
    I::Item: Into<OperationInput>,
{
    inputs
        .into_iter()
        .map(|input| normalize(input.into(), hasher))
        .collect()
}

/// Stable sort by timestamp; equal timestamps keep insertion order.
pub fn sort_operations(operations: &mut [Operation]) {
    operations.sort_by_key(|op| op.timestamp);
}

fn operation_hash(action: &str, data: Option<&Value>, hasher: &dyn ContentHasher) -> Result<Hash> {
    match data {
        // Without a payload the structured form hashes like a bare action.
        None => hasher.hash_value(&json!({ "action": action })),
        Some(data) => hasher.hash_value(&json!({ "action": action, "data": data })),
    }
}
