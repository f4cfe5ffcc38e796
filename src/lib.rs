//! Nodle session core
//!
//! Resource handles and hot-swap continuity for live node graphs: counted leases
//! on shared resources, per-node singleton instances with stop policies, structural
//! adaptation of state across type versions, and node-addressed logging.

pub mod config;
pub mod error;
pub mod hotswap;
pub mod logging;
pub mod nodes;
pub mod resources;

// Re-export commonly used types
pub use config::SessionConfig;
pub use error::{CastError, ConfigError, InstanceError, RecorderError, ResourceError, SessionError};
pub use hotswap::{
    CastOutcome, DataType, Dispose, DynObject, HotSwapAdapter, HotSwapState, Member, NodeData, Shape,
    SingleInstanceHelper, StopPolicy,
};
pub use logging::{LoggerFactory, NodeLogger};
pub use nodes::{NodeId, NodePath, NodeScope};
pub use resources::{ResourceHandle, ResourceId, ResourceProvider, ResourceRegistry};
