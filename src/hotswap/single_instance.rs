//! Per-node singleton instances with an explicit stop policy
//!
//! A node that must keep object identity across graph edits holds one
//! [`SingleInstanceHelper`]. The helper runs the producer lazily, hands the same
//! instance back until a forced replacement or a stop, and retires the old
//! instance according to the policy recorded when it was produced.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::InstanceError;

/// What happens to a cached instance when its owner stops or replaces it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopPolicy {
    /// Detach and hand the instance back; never disposed by the helper
    Keep,
    /// Detach and drop the helper's reference without disposing
    Release,
    /// Dispose the instance, then drop the reference
    ReleaseAndDispose,
}

/// Explicit teardown for instances retired with [`StopPolicy::ReleaseAndDispose`]
pub trait Dispose {
    fn dispose(&self);
}

/// Outcome of retiring an instance
pub enum Retirement<T> {
    /// The instance survives and belongs to the caller now
    Kept(Arc<T>),
    Released,
    Disposed,
}

impl<T> Retirement<T> {
    pub fn policy(&self) -> StopPolicy {
        match self {
            Retirement::Kept(_) => StopPolicy::Keep,
            Retirement::Released => StopPolicy::Release,
            Retirement::Disposed => StopPolicy::ReleaseAndDispose,
        }
    }
}

impl<T> fmt::Debug for Retirement<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Retirement::Kept(_) => write!(f, "Kept"),
            Retirement::Released => write!(f, "Released"),
            Retirement::Disposed => write!(f, "Disposed"),
        }
    }
}

/// Helper state machine: `Empty -> Holding -> (retire) -> Empty | Holding`
enum InstanceState<T> {
    Empty,
    Holding {
        instance: Arc<T>,
        policy: StopPolicy,
        id: Uuid,
    },
}

/// Caches at most one instance per owning node
pub struct SingleInstanceHelper<T: Dispose> {
    label: String,
    state: Mutex<InstanceState<T>>,
    /// Serializes producers across threads
    production: Mutex<()>,
    /// Thread currently running a producer, for reentrancy detection
    producer_thread: Mutex<Option<ThreadId>>,
}

/// Clears the producer thread marker on every exit path
struct ProducerMarker<'a> {
    slot: &'a Mutex<Option<ThreadId>>,
}

impl Drop for ProducerMarker<'_> {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Dispose> SingleInstanceHelper<T> {
    /// Create an empty helper; `label` names the owner in diagnostics
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            state: Mutex::new(InstanceState::Empty),
            production: Mutex::new(()),
            producer_thread: Mutex::new(None),
        }
    }

    /// Get the cached instance, producing one if needed.
    ///
    /// With `force_new_instance` false and an instance cached, the producer is not
    /// called. Otherwise the producer runs exactly once; on success the previous
    /// instance is retired per the policy recorded with it and the new one is
    /// installed with `on_stop`. A failing producer leaves the helper unchanged.
    ///
    /// A previous instance retired under [`StopPolicy::Keep`] is not returned here;
    /// callers that need it back use [`get_instance_retiring`](Self::get_instance_retiring).
    pub fn get_instance<E>(
        &self,
        force_new_instance: bool,
        producer: impl FnOnce() -> Result<T, E>,
        on_stop: StopPolicy,
    ) -> Result<Arc<T>, InstanceError<E>> {
        self.get_instance_retiring(force_new_instance, producer, on_stop)
            .map(|(instance, _)| instance)
    }

    /// [`get_instance`](Self::get_instance) that also reports how the previous
    /// instance was retired, if one was replaced
    pub fn get_instance_retiring<E>(
        &self,
        force_new_instance: bool,
        producer: impl FnOnce() -> Result<T, E>,
        on_stop: StopPolicy,
    ) -> Result<(Arc<T>, Option<Retirement<T>>), InstanceError<E>> {
        let current = thread::current().id();
        if *lock(&self.producer_thread) == Some(current) {
            return Err(InstanceError::Reentrant);
        }

        if !force_new_instance {
            if let Some(instance) = self.current() {
                return Ok((instance, None));
            }
        }

        let _production = lock(&self.production);
        if !force_new_instance {
            // Another thread may have produced while we waited
            if let Some(instance) = self.current() {
                return Ok((instance, None));
            }
        }

        let produced = {
            *lock(&self.producer_thread) = Some(current);
            let _marker = ProducerMarker {
                slot: &self.producer_thread,
            };
            producer().map_err(InstanceError::Producer)?
        };

        // The previous instance is retired before its successor is installed
        let previous = std::mem::replace(&mut *lock(&self.state), InstanceState::Empty);
        let retirement = self.retire(previous);

        let instance = Arc::new(produced);
        let id = Uuid::new_v4();
        *lock(&self.state) = InstanceState::Holding {
            instance: Arc::clone(&instance),
            policy: on_stop,
            id,
        };
        debug!("{}: produced instance {} ({:?})", self.label, id, on_stop);

        Ok((instance, retirement))
    }

    /// Retire the cached instance because the owning node stopped
    pub fn stop(&self) -> Option<Retirement<T>> {
        let previous = std::mem::replace(&mut *lock(&self.state), InstanceState::Empty);
        self.retire(previous)
    }

    fn retire(&self, state: InstanceState<T>) -> Option<Retirement<T>> {
        let InstanceState::Holding { instance, policy, id } = state else {
            return None;
        };
        let retirement = match policy {
            StopPolicy::Keep => Retirement::Kept(instance),
            StopPolicy::Release => Retirement::Released,
            StopPolicy::ReleaseAndDispose => {
                instance.dispose();
                Retirement::Disposed
            }
        };
        debug!("{}: retired instance {} ({:?})", self.label, id, retirement);
        Some(retirement)
    }

    /// The cached instance, if any
    pub fn current(&self) -> Option<Arc<T>> {
        match &*lock(&self.state) {
            InstanceState::Holding { instance, .. } => Some(Arc::clone(instance)),
            InstanceState::Empty => None,
        }
    }

    /// Stop policy recorded with the cached instance
    pub fn policy(&self) -> Option<StopPolicy> {
        match &*lock(&self.state) {
            InstanceState::Holding { policy, .. } => Some(*policy),
            InstanceState::Empty => None,
        }
    }

    pub fn is_holding(&self) -> bool {
        matches!(&*lock(&self.state), InstanceState::Holding { .. })
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl<T: Dispose> Drop for SingleInstanceHelper<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Type-erased stop hook, so a node scope can stop helpers of any instance type
pub trait StopInstance: Send + Sync {
    fn stop_instance(&self);
}

impl<T: Dispose + Send + Sync> StopInstance for SingleInstanceHelper<T> {
    fn stop_instance(&self) {
        self.stop();
    }
}
