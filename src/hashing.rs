//! Structural content hashing and tree hashes.
//!
//! Every hash in a chain (operation, base snapshot, prefix) goes through a
//! [`ContentHasher`]. Hashes are computed over `serde_json::Value`s so that
//! two inputs with equal structure always produce equal digests, regardless
//! of the key order they were built with.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::types::{Hash, Operation};

/// A stable, structure-based hash function.
///
/// Implementations must be deterministic across calls and must map
/// structurally equal values to equal digests.
pub trait ContentHasher: Send + Sync {
    /// Hash a JSON value.
    fn hash_value(&self, value: &Value) -> Result<Hash>;
}

/// Serialize `value` to JSON and hash it with `hasher`.
pub fn hash_serialize<T: Serialize + ?Sized>(hasher: &dyn ContentHasher, value: &T) -> Result<Hash> {
    let value = serde_json::to_value(value)?;
    hasher.hash_value(&value)
}

/// Default hasher: SHA-256 over canonical JSON (object keys sorted).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash_value(&self, value: &Value) -> Result<Hash> {
        let mut buf = Vec::with_capacity(128);
        write_canonical(value, &mut buf)?;
        Ok(Hash::from_bytes(&buf))
    }
}

/// Write `value` as compact JSON with object keys in sorted order.
///
/// Sorting here keeps digests stable even when `serde_json` is built with
/// `preserve_order`.
fn write_canonical(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Array(items) => {
            buf.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                write_canonical(item, buf)?;
            }
            buf.push(b']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            buf.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    buf.push(b',');
                }
                serde_json::to_writer(&mut *buf, key)?;
                buf.push(b':');
                write_canonical(item, buf)?;
            }
            buf.push(b'}');
        }
        scalar => serde_json::to_writer(&mut *buf, scalar)?,
    }
    Ok(())
}

/// Hash identifying the state after the first `index` operations.
///
/// `index` past the end is clamped to the chain length.
pub fn tree_hash(
    operations: &[Operation],
    base_hash: &Hash,
    index: usize,
    hasher: &dyn ContentHasher,
) -> Result<Hash> {
    let end = index.min(operations.len());
    let operation_hashes: Vec<String> = operations[..end]
        .iter()
        .map(|op| op.hash.to_hex())
        .collect();

    hasher.hash_value(&json!({
        "baseHash": base_hash.to_hex(),
        "operations": operation_hashes,
    }))
}
