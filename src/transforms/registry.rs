//! Named transform functions.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::{ChainError, Result, TransformError};

/// Result of applying one transform.
pub type TransformResult<S> = std::result::Result<S, TransformError>;

/// Boxed future produced by an async transform.
pub type TransformFuture<S> = Pin<Box<dyn Future<Output = TransformResult<S>> + Send>>;

type SyncFn<S> = Arc<dyn Fn(S, Option<&Value>) -> TransformResult<S> + Send + Sync>;
type AsyncFn<S> = Arc<dyn Fn(S, Option<Arc<Value>>) -> TransformFuture<S> + Send + Sync>;

/// A registered transform.
///
/// Each receives an owned clone of the current snapshot, so mutating it in
/// place is fine.
pub enum Transform<S> {
    Sync(SyncFn<S>),
    Async(AsyncFn<S>),
}

impl<S> Transform<S> {
    /// Whether this transform needs async evaluation.
    pub fn is_async(&self) -> bool {
        matches!(self, Transform::Async(_))
    }
}

impl<S> Clone for Transform<S> {
    fn clone(&self) -> Self {
        match self {
            Transform::Sync(f) => Transform::Sync(Arc::clone(f)),
            Transform::Async(f) => Transform::Async(Arc::clone(f)),
        }
    }
}

impl<S> fmt::Debug for Transform<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Sync(_) => f.write_str("Transform::Sync"),
            Transform::Async(_) => f.write_str("Transform::Async"),
        }
    }
}

/// Action name → transform.
pub struct TransformRegistry<S> {
    transforms: HashMap<String, Transform<S>>,
}

impl<S> TransformRegistry<S> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    /// Register a synchronous transform, replacing any previous one.
    pub fn register<F>(&mut self, action: impl Into<String>, f: F)
    where
        F: Fn(S, Option<&Value>) -> TransformResult<S> + Send + Sync + 'static,
    {
        self.transforms
            .insert(action.into(), Transform::Sync(Arc::new(f)));
    }

    /// Register an async transform, replacing any previous one.
    pub fn register_async<F, Fut>(&mut self, action: impl Into<String>, f: F)
    where
        S: 'static,
        F: Fn(S, Option<Arc<Value>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransformResult<S>> + Send + 'static,
    {
        let boxed: AsyncFn<S> = Arc::new(move |snap, data| -> TransformFuture<S> {
            Box::pin(f(snap, data))
        });
        self.transforms.insert(action.into(), Transform::Async(boxed));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with<F>(mut self, action: impl Into<String>, f: F) -> Self
    where
        F: Fn(S, Option<&Value>) -> TransformResult<S> + Send + Sync + 'static,
    {
        self.register(action, f);
        self
    }

    /// Builder form of [`register_async`](Self::register_async).
    pub fn with_async<F, Fut>(mut self, action: impl Into<String>, f: F) -> Self
    where
        S: 'static,
        F: Fn(S, Option<Arc<Value>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TransformResult<S>> + Send + 'static,
    {
        self.register_async(action, f);
        self
    }

    /// Look up the transform for `action`.
    pub fn get(&self, action: &str) -> Result<&Transform<S>> {
        self.transforms
            .get(action)
            .ok_or_else(|| ChainError::UnknownAction(action.to_string()))
    }

    /// Check if an action is registered.
    pub fn contains(&self, action: &str) -> bool {
        self.transforms.contains_key(action)
    }

    /// Registered action names, sorted.
    pub fn actions(&self) -> Vec<&str> {
        let mut actions: Vec<&str> = self.transforms.keys().map(String::as_str).collect();
        actions.sort_unstable();
        actions
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }
}

impl<S> Default for TransformRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for TransformRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            transforms: self.transforms.clone(),
        }
    }
}

impl<S> fmt::Debug for TransformRegistry<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("actions", &self.actions())
            .finish()
    }
}
