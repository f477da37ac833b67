//! Transform registry.
//!
//! Maps action names to the functions that implement them. Lookups happen
//! once per operation at evaluation time.

mod registry;

pub use registry::{Transform, TransformFuture, TransformRegistry, TransformResult};
