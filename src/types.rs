//! Core types for operation chains.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// Content hash (SHA-256).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    /// Compute hash from bytes.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Hash(hasher.finalize().into())
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Hash(arr))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({}...)", &self.to_hex()[..8])
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Microseconds since Unix epoch. Orders operations within a chain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current wall-clock time.
    pub fn now() -> Self {
        let duration = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Timestamp(duration.as_micros() as i64)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Timestamp(value)
    }
}

/// A canonical, content-hashed operation.
///
/// `hash` covers `action` and `data` only, so the same logical operation
/// recorded at two different times hashes the same.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// Name of the transform to apply.
    pub action: String,

    /// Immutable payload handed to the transform.
    pub data: Option<Arc<Value>>,

    /// Logical time used for ordering.
    pub timestamp: Timestamp,

    /// Content hash of `{action, data}`.
    pub hash: Hash,
}

impl Operation {
    /// Payload as a plain reference.
    pub fn data(&self) -> Option<&Value> {
        self.data.as_deref()
    }
}

/// Caller-supplied operation, before normalization.
#[derive(Clone, Debug, PartialEq)]
pub enum OperationInput {
    /// Bare action name with no payload, stamped at normalization time.
    Action(String),

    /// Action with optional payload and timestamp.
    Structured {
        action: String,
        data: Option<Value>,
        timestamp: Option<Timestamp>,
    },
}

impl OperationInput {
    /// Start a structured input for `action`.
    pub fn new(action: impl Into<String>) -> Self {
        OperationInput::Structured {
            action: action.into(),
            data: None,
            timestamp: None,
        }
    }

    /// Attach a JSON payload.
    pub fn data(self, value: Value) -> Self {
        let (action, _, timestamp) = self.into_parts();
        OperationInput::Structured {
            action,
            data: Some(value),
            timestamp,
        }
    }

    /// Attach any serializable payload.
    pub fn try_data(self, value: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value)?;
        Ok(self.data(value))
    }

    /// Pin the logical timestamp.
    pub fn at(self, timestamp: Timestamp) -> Self {
        let (action, data, _) = self.into_parts();
        OperationInput::Structured {
            action,
            data,
            timestamp: Some(timestamp),
        }
    }

    /// Action name this input refers to.
    pub fn action(&self) -> &str {
        match self {
            OperationInput::Action(action) => action,
            OperationInput::Structured { action, .. } => action,
        }
    }

    fn into_parts(self) -> (String, Option<Value>, Option<Timestamp>) {
        match self {
            OperationInput::Action(action) => (action, None, None),
            OperationInput::Structured {
                action,
                data,
                timestamp,
            } => (action, data, timestamp),
        }
    }
}

impl From<&str> for OperationInput {
    fn from(action: &str) -> Self {
        OperationInput::Action(action.to_string())
    }
}

impl From<String> for OperationInput {
    fn from(action: String) -> Self {
        OperationInput::Action(action)
    }
}
