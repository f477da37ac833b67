//! Operation normalization.
//!
//! Caller inputs (bare action names or structured options) become canonical
//! [`Operation`](crate::types::Operation) records with a content hash.

mod normalize;

pub use normalize::{normalize, normalize_all, sort_operations};
