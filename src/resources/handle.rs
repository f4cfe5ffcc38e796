//! Counted leases on shared resources

use std::fmt;
use std::sync::Arc;

use log::warn;

use super::registry::{ResourceId, ResourceRegistry};
use crate::error::ResourceError;

/// A counted lease on a shared resource owned by a [`ResourceRegistry`]
///
/// Releasing is guaranteed: a handle that is dropped while still held releases
/// itself. An explicit second [`release`](Self::release) reports a usage error
/// and never decrements the count again.
pub struct ResourceHandle<T: Send + Sync + 'static> {
    id: ResourceId,
    resource: Option<Arc<T>>,
    registry: ResourceRegistry,
}

impl<T: Send + Sync + 'static> ResourceHandle<T> {
    pub(crate) fn new(id: ResourceId, resource: Arc<T>, registry: ResourceRegistry) -> Self {
        Self {
            id,
            resource: Some(resource),
            registry,
        }
    }

    /// The leased resource, or `None` once released
    pub fn resource(&self) -> Option<&T> {
        self.resource.as_deref()
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn is_released(&self) -> bool {
        self.resource.is_none()
    }

    /// Give the lease back to the registry
    pub fn release(&mut self) -> Result<(), ResourceError> {
        match self.resource.take() {
            Some(resource) => {
                drop(resource);
                self.registry.release_holder::<T>(&self.id);
                Ok(())
            }
            None => {
                warn!("Handle to {} released twice", self.id);
                Err(ResourceError::DoubleRelease {
                    resource: self.id.clone(),
                })
            }
        }
    }
}

impl<T: Send + Sync + 'static> Drop for ResourceHandle<T> {
    fn drop(&mut self) {
        if self.resource.is_some() {
            let _ = self.release();
        }
    }
}

impl<T: Send + Sync + 'static> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("released", &self.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct InputSource;

    #[test]
    fn test_double_release_is_usage_error() {
        let registry = ResourceRegistry::new();
        registry.register_fn::<InputSource, _>(|_| Ok(InputSource));

        let mut handle = registry.acquire::<InputSource>(None).unwrap();
        let _other = registry.acquire::<InputSource>(None).unwrap();

        handle.release().unwrap();
        assert!(handle.is_released());
        assert!(handle.resource().is_none());

        let err = handle.release().unwrap_err();
        assert!(matches!(err, ResourceError::DoubleRelease { .. }));
        // The second release did not steal the other holder's count
        assert_eq!(registry.ref_count::<InputSource>(None), 1);
    }

    #[test]
    fn test_drop_releases_held_handle() {
        let registry = ResourceRegistry::new();
        registry.register_fn::<InputSource, _>(|_| Ok(InputSource));

        {
            let _handle = registry.acquire::<InputSource>(Some("window-3")).unwrap();
            assert!(registry.is_alive::<InputSource>(Some("window-3")));
        }
        assert!(!registry.is_alive::<InputSource>(Some("window-3")));
    }

    #[test]
    fn test_drop_after_explicit_release_is_silent() {
        let registry = ResourceRegistry::new();
        registry.register_fn::<InputSource, _>(|_| Ok(InputSource));

        let keep = registry.acquire::<InputSource>(None).unwrap();
        let mut handle = registry.acquire::<InputSource>(None).unwrap();
        handle.release().unwrap();
        drop(handle);

        assert_eq!(registry.ref_count::<InputSource>(None), 1);
        drop(keep);
    }
}
