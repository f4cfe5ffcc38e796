//! Dynamic values carried across a hot-swap

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::shape::{Conversion, DataType, Shape};
use crate::error::CastError;

/// Value types flowing through node state and ports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeData {
    // Basic types
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    Boolean(bool),
    String(String),

    // Complex types
    Matrix4([[f32; 4]; 4]),
    Color([f32; 4]),
    FilePath(String),

    // Collections
    FloatArray(Vec<f32>),
    Vec3Array(Vec<[f32; 3]>),
    StringArray(Vec<String>),

    /// Instance of a user state type
    Object(DynObject),

    // Special
    None,
}

impl NodeData {
    /// The data type this value carries, `None` for the empty value
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            NodeData::Float(_) => DataType::Float,
            NodeData::Vec2(_) => DataType::Vec2,
            NodeData::Vec3(_) => DataType::Vec3,
            NodeData::Vec4(_) => DataType::Vec4,
            NodeData::Int(_) => DataType::Int,
            NodeData::Boolean(_) => DataType::Boolean,
            NodeData::String(_) => DataType::String,
            NodeData::Matrix4(_) => DataType::Matrix4,
            NodeData::Color(_) => DataType::Color,
            NodeData::FilePath(_) => DataType::FilePath,
            NodeData::FloatArray(_) => DataType::FloatArray,
            NodeData::Vec3Array(_) => DataType::Vec3Array,
            NodeData::StringArray(_) => DataType::StringArray,
            NodeData::Object(object) => DataType::Object(object.shape().name.clone()),
            NodeData::None => return None,
        })
    }

    pub fn as_object(&self) -> Option<&DynObject> {
        match self {
            NodeData::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            NodeData::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            NodeData::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            NodeData::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NodeData::String(value) | NodeData::FilePath(value) => Some(value),
            _ => None,
        }
    }

    pub(crate) fn convert(&self, conversion: Conversion) -> NodeData {
        match (conversion, self) {
            (Conversion::IntToFloat, NodeData::Int(value)) => NodeData::Float(*value as f32),
            (Conversion::FilePathToString, NodeData::FilePath(path)) => NodeData::String(path.clone()),
            _ => self.clone(),
        }
    }
}

/// An instance of a state type, described by its shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredObject")]
pub struct DynObject {
    shape: Arc<Shape>,
    values: Vec<NodeData>,
}

/// Serialized form of a [`DynObject`], checked against its shape on load
#[derive(Deserialize)]
struct StoredObject {
    shape: Arc<Shape>,
    values: Vec<NodeData>,
}

impl TryFrom<StoredObject> for DynObject {
    type Error = CastError;

    fn try_from(stored: StoredObject) -> Result<Self, Self::Error> {
        if stored.values.len() != stored.shape.members.len() {
            return Err(CastError::LayoutMismatch {
                shape: stored.shape.to_string(),
                expected: stored.shape.members.len(),
                found: stored.values.len(),
            });
        }
        Ok(Self {
            shape: stored.shape,
            values: stored.values,
        })
    }
}

impl DynObject {
    /// New instance with every member at its default (`None` for required members)
    pub fn new(shape: Arc<Shape>) -> Self {
        let values = shape
            .members
            .iter()
            .map(|m| m.default.clone().unwrap_or(NodeData::None))
            .collect();
        Self { shape, values }
    }

    pub(crate) fn from_parts(shape: Arc<Shape>, values: Vec<NodeData>) -> Self {
        debug_assert_eq!(shape.members.len(), values.len());
        Self { shape, values }
    }

    /// Builder-style member assignment; unknown names are ignored
    pub fn with(mut self, name: &str, value: NodeData) -> Self {
        self.set(name, value);
        self
    }

    /// Set a member by name. Returns false if the shape has no such member.
    pub fn set(&mut self, name: &str, value: NodeData) -> bool {
        match self.shape.index_of(name).and_then(|index| self.values.get_mut(index)) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&NodeData> {
        self.shape.index_of(name).and_then(|index| self.values.get(index))
    }

    pub fn shape(&self) -> &Arc<Shape> {
        &self.shape
    }

    pub fn values(&self) -> &[NodeData] {
        &self.values
    }

    pub(crate) fn into_values(self) -> Vec<NodeData> {
        self.values
    }
}

/// Rust state types that can be carried across a hot-swap
///
/// Implementors describe their current member layout and convert to and from
/// the dynamic form. `from_object` receives an object already adapted to
/// [`shape`](Self::shape) and returns `None` only if a value is unusable.
pub trait HotSwapState: Sized {
    fn shape() -> Arc<Shape>;

    fn to_object(&self) -> DynObject;

    fn from_object(object: &DynObject) -> Option<Self>;
}
