//! Reference-counted registry of process-wide shared resources
//!
//! Resources are identified by their Rust type plus an optional sub-key (for
//! example a window id). The first `acquire` of an identity builds the resource
//! through the provider registered for its type; later acquisitions share it. The
//! last release tears it down through the same provider, exactly once.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use lazy_static::lazy_static;
use log::{debug, warn};

use super::handle::ResourceHandle;
use super::provider::{FnProvider, ResourceProvider};
use crate::error::{BoxError, ResourceError};

/// Identity of a shared resource: its type and an optional sub-key
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    type_id: TypeId,
    type_name: &'static str,
    key: Option<String>,
}

impl ResourceId {
    pub fn new<T: 'static>(key: Option<&str>) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            key: key.map(str::to_string),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}[{}]", self.type_name, key),
            None => write!(f, "{}", self.type_name),
        }
    }
}

impl fmt::Debug for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId({})", self)
    }
}

type SharedResource = Arc<dyn Any + Send + Sync>;

/// State of one resource identity
enum Slot {
    /// A provider is building the resource on the given thread; other acquirers wait.
    Constructing(ThreadId),
    Live { resource: SharedResource, holders: usize },
}

#[derive(Default)]
struct RegistryState {
    /// `Arc<dyn ResourceProvider<T>>` per resource type, erased
    providers: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    slots: HashMap<ResourceId, Slot>,
}

#[derive(Default)]
struct RegistryInner {
    state: Mutex<RegistryState>,
    constructed: Condvar,
}

/// Registry issuing counted leases on shared resources
///
/// Cloning the registry is cheap; clones share the same resource table.
#[derive(Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
}

lazy_static! {
    static ref GLOBAL_REGISTRY: ResourceRegistry = ResourceRegistry::new();
}

/// Removes a `Constructing` slot if construction never completed (error or panic)
struct ConstructionGuard<'a> {
    registry: &'a ResourceRegistry,
    id: &'a ResourceId,
    armed: bool,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.registry.lock();
            if matches!(state.slots.get(self.id), Some(Slot::Constructing(_))) {
                state.slots.remove(self.id);
            }
            drop(state);
            self.registry.inner.constructed.notify_all();
        }
    }
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry used by nodes that do not carry their own
    pub fn global() -> &'static ResourceRegistry {
        &GLOBAL_REGISTRY
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the provider that builds and tears down resources of type `T`.
    /// Replaces any previous provider; a live resource is torn down by whichever
    /// provider is registered when its last holder releases it.
    pub fn register_provider<T, P>(&self, provider: P)
    where
        T: Send + Sync + 'static,
        P: ResourceProvider<T> + 'static,
    {
        let provider: Arc<dyn ResourceProvider<T>> = Arc::new(provider);
        self.lock()
            .providers
            .insert(TypeId::of::<T>(), Box::new(provider));
        debug!("Registered resource provider for {}", type_name::<T>());
    }

    /// Register a closure as the constructor for resources of type `T`
    pub fn register_fn<T, F>(&self, create: F)
    where
        T: Send + Sync + 'static,
        F: Fn(Option<&str>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.register_provider::<T, _>(FnProvider::new(create));
    }

    fn provider<T: Send + Sync + 'static>(
        state: &RegistryState,
        id: &ResourceId,
    ) -> Result<Arc<dyn ResourceProvider<T>>, ResourceError> {
        let erased = state
            .providers
            .get(&TypeId::of::<T>())
            .ok_or_else(|| ResourceError::ProviderMissing { resource: id.clone() })?;
        erased
            .downcast_ref::<Arc<dyn ResourceProvider<T>>>()
            .cloned()
            .ok_or_else(|| ResourceError::ProviderTypeMismatch { resource: id.clone() })
    }

    /// Acquire a lease on the resource identified by `T` and `key`.
    ///
    /// Builds the resource if no live instance exists. A failing constructor leaves
    /// no entry behind and the error is returned to the caller.
    pub fn acquire<T>(&self, key: Option<&str>) -> Result<ResourceHandle<T>, ResourceError>
    where
        T: Send + Sync + 'static,
    {
        let id = ResourceId::new::<T>(key);

        let provider = {
            let mut state = self.lock();
            loop {
                let pending = match state.slots.get_mut(&id) {
                    Some(Slot::Live { resource, holders }) => {
                        let resource = Arc::clone(resource)
                            .downcast::<T>()
                            .map_err(|_| ResourceError::ProviderTypeMismatch { resource: id.clone() })?;
                        *holders += 1;
                        debug!("Acquired {} (holders: {})", id, holders);
                        return Ok(ResourceHandle::new(id, resource, self.clone()));
                    }
                    Some(Slot::Constructing(builder)) if *builder == thread::current().id() => {
                        warn!("Provider for {} acquired its own resource", id);
                        return Err(ResourceError::SelfAcquisition { resource: id });
                    }
                    Some(Slot::Constructing(_)) => true,
                    None => false,
                };
                if !pending {
                    break;
                }
                state = self
                    .inner
                    .constructed
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            let provider = Self::provider::<T>(&state, &id)?;
            state.slots.insert(id.clone(), Slot::Constructing(thread::current().id()));
            provider
        };

        // Construction runs unlocked so providers may acquire their own dependencies.
        let mut guard = ConstructionGuard {
            registry: self,
            id: &id,
            armed: true,
        };
        let resource = match provider.create(id.key()) {
            Ok(resource) => Arc::new(resource),
            Err(source) => {
                warn!("Failed to construct {}: {}", id, source);
                drop(guard);
                return Err(ResourceError::Acquisition { resource: id, source });
            }
        };

        {
            let mut state = self.lock();
            state.slots.insert(
                id.clone(),
                Slot::Live {
                    resource: Arc::clone(&resource) as SharedResource,
                    holders: 1,
                },
            );
        }
        guard.armed = false;
        drop(guard);
        self.inner.constructed.notify_all();

        debug!("Constructed {}", id);
        Ok(ResourceHandle::new(id, resource, self.clone()))
    }

    /// Release a handle. Equivalent to [`ResourceHandle::release`].
    pub fn release<T>(&self, handle: &mut ResourceHandle<T>) -> Result<(), ResourceError>
    where
        T: Send + Sync + 'static,
    {
        handle.release()
    }

    /// Drop one holder of `id`; tears the resource down when it was the last.
    ///
    /// The decrement and the last-holder check happen under the same lock, so only
    /// one release can ever observe the count reaching zero.
    pub(crate) fn release_holder<T>(&self, id: &ResourceId)
    where
        T: Send + Sync + 'static,
    {
        let teardown = {
            let mut state = self.lock();
            let last = match state.slots.get_mut(id) {
                Some(Slot::Live { holders, .. }) => {
                    *holders -= 1;
                    debug!("Released {} (holders: {})", id, holders);
                    *holders == 0
                }
                _ => {
                    warn!("Release of {} found no live entry", id);
                    false
                }
            };
            if last {
                match state.slots.remove(id) {
                    Some(Slot::Live { resource, .. }) => {
                        Some((resource, Self::provider::<T>(&state, id).ok()))
                    }
                    _ => None,
                }
            } else {
                None
            }
        };

        if let Some((resource, provider)) = teardown {
            match (resource.downcast::<T>(), provider) {
                (Ok(resource), Some(provider)) => provider.destroy(resource),
                (Ok(resource), None) => drop(resource),
                (Err(_), _) => warn!("Live entry for {} held an unexpected type", id),
            }
            debug!("Tore down {}", id);
        }
    }

    /// Number of live leases on the identity, 0 when it is not alive
    pub fn ref_count<T: 'static>(&self, key: Option<&str>) -> usize {
        match self.lock().slots.get(&ResourceId::new::<T>(key)) {
            Some(Slot::Live { holders, .. }) => *holders,
            _ => 0,
        }
    }

    pub fn is_alive<T: 'static>(&self, key: Option<&str>) -> bool {
        self.ref_count::<T>(key) > 0
    }

    /// Snapshot of every live identity with its holder count
    pub fn live_resources(&self) -> Vec<(ResourceId, usize)> {
        let mut live: Vec<(ResourceId, usize)> = self
            .lock()
            .slots
            .iter()
            .filter_map(|(id, slot)| match slot {
                Slot::Live { holders, .. } => Some((id.clone(), *holders)),
                Slot::Constructing(_) => None,
            })
            .collect();
        live.sort_by(|a, b| a.0.to_string().cmp(&b.0.to_string()));
        live
    }
}
