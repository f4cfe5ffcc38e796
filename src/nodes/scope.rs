//! Node scope - resource and instance ownership for one live node
//!
//! A node acquires its shared resources through its scope while it is being
//! constructed and registers the single-instance helpers it owns. Stopping the
//! scope (explicitly or by dropping it) retires the helpers and releases every
//! handle, in reverse acquisition order.

use std::any::Any;
use std::sync::Arc;

use log::warn;

use super::path::NodePath;
use crate::error::ResourceError;
use crate::hotswap::StopInstance;
use crate::logging::{LoggerFactory, NodeLogger};
use crate::resources::{ResourceHandle, ResourceId, ResourceRegistry};

/// A handle held by a scope, with its type erased
trait HeldResource: Send + Sync {
    fn id(&self) -> &ResourceId;
    fn release_held(&mut self) -> Result<(), ResourceError>;
    fn as_any(&self) -> &dyn Any;
}

impl<T: Send + Sync + 'static> HeldResource for ResourceHandle<T> {
    fn id(&self) -> &ResourceId {
        ResourceHandle::id(self)
    }

    fn release_held(&mut self) -> Result<(), ResourceError> {
        self.release()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Owns everything a live node holds on to
pub struct NodeScope {
    path: NodePath,
    registry: ResourceRegistry,
    logger: Option<NodeLogger>,
    handles: Vec<Box<dyn HeldResource>>,
    helpers: Vec<Arc<dyn StopInstance>>,
    stopped: bool,
}

impl NodeScope {
    pub fn new(path: NodePath, registry: ResourceRegistry) -> Self {
        Self {
            path,
            registry,
            logger: None,
            handles: Vec::new(),
            helpers: Vec::new(),
            stopped: false,
        }
    }

    /// Scope on the process-wide registry
    pub fn global(path: NodePath) -> Self {
        Self::new(path, ResourceRegistry::global().clone())
    }

    /// Report usage errors through a logger addressed by this node's path
    pub fn with_logger(mut self, factory: &LoggerFactory) -> Self {
        self.logger = Some(factory.create_logger(None, Some(&self.path)));
        self
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn logger(&self) -> Option<&NodeLogger> {
        self.logger.as_ref()
    }

    fn report(&self, message: impl std::fmt::Display) {
        match &self.logger {
            Some(logger) => logger.error(message),
            None => warn!("{}: {}", self.path, message),
        }
    }

    /// Acquire a shared resource for the lifetime of this node
    pub fn acquire<T>(&mut self, key: Option<&str>) -> Result<&T, ResourceError>
    where
        T: Send + Sync + 'static,
    {
        let handle = match self.registry.acquire::<T>(key) {
            Ok(handle) => handle,
            Err(err) => {
                self.report(&err);
                return Err(err);
            }
        };
        self.handles.push(Box::new(handle));
        self.resource::<T>(key)
            .ok_or_else(|| ResourceError::ProviderTypeMismatch {
                resource: ResourceId::new::<T>(key),
            })
    }

    /// Run a batch of acquisitions; if any fails, release everything the batch
    /// acquired so the node holds nothing partial
    pub fn acquire_all<F>(&mut self, acquire: F) -> Result<(), ResourceError>
    where
        F: FnOnce(&mut Self) -> Result<(), ResourceError>,
    {
        let mark = self.handles.len();
        let result = acquire(self);
        if result.is_err() {
            while self.handles.len() > mark {
                if let Some(mut handle) = self.handles.pop() {
                    if let Err(err) = handle.release_held() {
                        self.report(&err);
                    }
                }
            }
        }
        result
    }

    /// A resource held by this scope
    pub fn resource<T: Send + Sync + 'static>(&self, key: Option<&str>) -> Option<&T> {
        let id = ResourceId::new::<T>(key);
        self.handles
            .iter()
            .rev()
            .filter(|handle| handle.id() == &id)
            .find_map(|handle| handle.as_any().downcast_ref::<ResourceHandle<T>>())
            .and_then(ResourceHandle::resource)
    }

    /// Release one resource before the node stops.
    /// Releasing something this scope does not hold (never acquired, or already
    /// released) is reported as [`ResourceError::NotHeld`].
    pub fn release<T: Send + Sync + 'static>(&mut self, key: Option<&str>) -> Result<(), ResourceError> {
        let id = ResourceId::new::<T>(key);
        let Some(index) = self.handles.iter().rposition(|handle| handle.id() == &id) else {
            let err = ResourceError::NotHeld { resource: id };
            self.report(&err);
            return Err(err);
        };
        let mut handle = self.handles.remove(index);
        handle.release_held()
    }

    /// Register a helper to be stopped together with the node
    pub fn register_helper(&mut self, helper: Arc<dyn StopInstance>) {
        self.helpers.push(helper);
    }

    /// Number of handles currently held
    pub fn held(&self) -> usize {
        self.handles.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Retire helpers, then release handles in reverse acquisition order
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;

        while let Some(helper) = self.helpers.pop() {
            helper.stop_instance();
        }
        while let Some(mut handle) = self.handles.pop() {
            if let Err(err) = handle.release_held() {
                self.report(&err);
            }
        }
    }
}

impl Drop for NodeScope {
    fn drop(&mut self) {
        self.stop();
    }
}
