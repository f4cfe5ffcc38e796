//! Node identity and lifecycle ownership

pub mod path;
pub mod scope;

pub use path::{NodeId, NodePath};
pub use scope::NodeScope;
