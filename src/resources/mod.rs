//! Resource handle registry - counted leases on process-wide shared resources

pub mod gpu;
pub mod handle;
pub mod provider;
pub mod registry;

pub use gpu::{RenderDevice, RenderDeviceProvider};
pub use handle::ResourceHandle;
pub use provider::{FnProvider, ResourceProvider};
pub use registry::{ResourceId, ResourceRegistry};
