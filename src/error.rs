//! Error types for the session subsystem
//!
//! Usage errors (double release, hard-cast mismatch, unconfigured recorder) surface
//! immediately to the caller. Soft-cast failures are never errors; see
//! [`crate::hotswap::CastOutcome`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::resources::ResourceId;

/// Boxed error produced by resource constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the resource handle registry
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The provider failed to construct the resource. Nothing was registered.
    #[error("failed to acquire resource {resource}: {source}")]
    Acquisition {
        resource: ResourceId,
        #[source]
        source: BoxError,
    },

    /// A handle was released a second time.
    #[error("handle to {resource} was already released")]
    DoubleRelease { resource: ResourceId },

    /// No provider has been registered for the requested resource type.
    #[error("no provider registered for resource {resource}")]
    ProviderMissing { resource: ResourceId },

    /// A registered provider or live entry holds a different type than requested.
    #[error("registry entry for {resource} holds a different type")]
    ProviderTypeMismatch { resource: ResourceId },

    /// A provider requested the resource it is currently constructing.
    #[error("provider for {resource} acquired its own resource during construction")]
    SelfAcquisition { resource: ResourceId },

    /// A node released a resource it does not hold.
    #[error("node does not hold {resource}")]
    NotHeld { resource: ResourceId },
}

/// Errors raised by the hot-swap adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The caller asserted layout compatibility that does not hold.
    #[error("hard cast mismatch: expected {expected}, found {found}")]
    HardCastMismatch { expected: String, found: String },

    /// A stored object carries a different number of values than its shape has members.
    #[error("object of shape {shape} carries {found} values for {expected} members")]
    LayoutMismatch {
        shape: String,
        expected: usize,
        found: usize,
    },
}

/// Errors raised by [`crate::hotswap::SingleInstanceHelper`]
#[derive(Debug, Error)]
pub enum InstanceError<E> {
    /// The producer failed; the helper state is unchanged.
    #[error("instance producer failed: {0}")]
    Producer(E),

    /// The producer tried to request an instance from the helper it is producing for.
    #[error("producer re-entered its own single-instance helper")]
    Reentrant,
}

/// Errors raised by the global log recorder slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("log recorder is not configured yet")]
    NotConfigured,

    #[error("log recorder is already configured")]
    AlreadyConfigured,
}

/// Errors raised while loading or saving session configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Umbrella error for callers that mix concerns, such as node constructors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Cast(#[from] CastError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ResourceError {
    /// The resource identity this error refers to
    pub fn resource(&self) -> &ResourceId {
        match self {
            ResourceError::Acquisition { resource, .. }
            | ResourceError::DoubleRelease { resource }
            | ResourceError::ProviderMissing { resource }
            | ResourceError::ProviderTypeMismatch { resource }
            | ResourceError::SelfAcquisition { resource }
            | ResourceError::NotHeld { resource } => resource,
        }
    }

    /// Whether this error indicates a broken invariant in the hosting framework
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            ResourceError::DoubleRelease { .. }
                | ResourceError::ProviderTypeMismatch { .. }
                | ResourceError::SelfAcquisition { .. }
                | ResourceError::NotHeld { .. }
        )
    }
}
