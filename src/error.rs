//! Error types for operation chains.

use thiserror::Error;

/// Error returned by a transform function.
pub type TransformError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for chain operations.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Transform '{action}' failed at operation {index}: {source}")]
    Transform {
        action: String,
        index: usize,
        #[source]
        source: TransformError,
    },

    #[error("Hashing error: {0}")]
    Hashing(String),

    #[error("Action '{0}' is async and requires async evaluation")]
    AsyncTransform(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Hashing(e.to_string())
    }
}

/// Result type for chain operations.
pub type Result<T> = std::result::Result<T, ChainError>;
