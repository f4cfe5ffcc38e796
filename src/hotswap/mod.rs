//! Hot-swap continuity - carrying state and singleton instances across recompiles

pub mod adapter;
pub mod filter;
pub mod shape;
pub mod single_instance;
pub mod value;

pub use adapter::{AdaptationPlan, AdapterOptions, CastOutcome, HotSwapAdapter, MatchRule};
pub use filter::FilterByType;
pub use shape::{Conversion, DataType, Member, Shape, ShapeKey};
pub use single_instance::{Dispose, Retirement, SingleInstanceHelper, StopInstance, StopPolicy};
pub use value::{DynObject, HotSwapState, NodeData};
