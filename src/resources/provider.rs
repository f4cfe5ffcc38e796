//! Resource providers - how a shared resource is built and torn down

use std::sync::Arc;

use crate::error::BoxError;

/// Builds and tears down resources of type `T` for a [`super::ResourceRegistry`]
pub trait ResourceProvider<T>: Send + Sync {
    /// Build the resource for an identity. `key` is the optional sub-key.
    fn create(&self, key: Option<&str>) -> Result<T, BoxError>;

    /// Tear down a resource after its last holder released it.
    /// Called exactly once per constructed resource.
    fn destroy(&self, resource: Arc<T>) {
        drop(resource);
    }
}

/// Provider backed by a constructor closure
pub struct FnProvider<F> {
    create: F,
}

impl<F> FnProvider<F> {
    pub fn new(create: F) -> Self {
        Self { create }
    }
}

impl<T, F> ResourceProvider<T> for FnProvider<F>
where
    F: Fn(Option<&str>) -> Result<T, BoxError> + Send + Sync,
{
    fn create(&self, key: Option<&str>) -> Result<T, BoxError> {
        (self.create)(key)
    }
}
