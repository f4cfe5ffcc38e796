//! Shape descriptors - the member layout of a state type at one version

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::value::NodeData;

/// Data types a shape member can declare
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Float,
    Int,
    Vec2,
    Vec3,
    Vec4,
    Boolean,
    String,
    Color,
    Matrix4,
    FilePath,
    FloatArray,
    Vec3Array,
    StringArray,
    /// Nested object, identified by shape name
    Object(String),
    /// Accepts any value
    Any,
}

/// How a value moves from a source member into a target member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Identity,
    IntToFloat,
    FilePathToString,
}

impl DataType {
    /// How a value of this type can be assigned to `target`, if at all
    pub fn assignment_to(&self, target: &DataType) -> Option<Conversion> {
        match (self, target) {
            (_, DataType::Any) => Some(Conversion::Identity),
            (DataType::Int, DataType::Float) => Some(Conversion::IntToFloat),
            (DataType::FilePath, DataType::String) => Some(Conversion::FilePathToString),
            (source, target) if source == target => Some(Conversion::Identity),
            _ => None,
        }
    }

    pub fn is_assignable_to(&self, target: &DataType) -> bool {
        self.assignment_to(target).is_some()
    }

    /// Get a human-readable name for this data type
    pub fn name(&self) -> &str {
        match self {
            DataType::Float => "Float",
            DataType::Int => "Int",
            DataType::Vec2 => "Vec2",
            DataType::Vec3 => "Vec3",
            DataType::Vec4 => "Vec4",
            DataType::Boolean => "Boolean",
            DataType::String => "String",
            DataType::Color => "Color",
            DataType::Matrix4 => "Matrix4",
            DataType::FilePath => "FilePath",
            DataType::FloatArray => "FloatArray",
            DataType::Vec3Array => "Vec3Array",
            DataType::StringArray => "StringArray",
            DataType::Object(name) => name,
            DataType::Any => "Any",
        }
    }
}

/// One member of a shape. A member without a default is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub default: Option<NodeData>,
}

impl Member {
    pub fn required(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, data_type: DataType, default: NodeData) -> Self {
        Self {
            name: name.into(),
            data_type,
            default: Some(default),
        }
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }
}

/// Identifies one shape version for plan caching
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShapeKey {
    pub name: String,
    pub version: u32,
    /// Hash over member names, types and defaults, so two layouts published under
    /// the same name and version never share a cached plan
    pub fingerprint: u64,
}

/// Member layout of a state type at one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub name: String,
    pub version: u32,
    pub members: Vec<Member>,
}

impl Shape {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
            members: Vec::new(),
        }
    }

    /// Builder-style member addition
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    pub fn key(&self) -> ShapeKey {
        let mut hasher = DefaultHasher::new();
        for member in &self.members {
            member.name.hash(&mut hasher);
            member.data_type.hash(&mut hasher);
            member.is_required().hash(&mut hasher);
            // NodeData holds floats, so defaults are hashed through their JSON form
            if let Ok(default) = serde_json::to_vec(&member.default) {
                default.hash(&mut hasher);
            }
        }
        ShapeKey {
            name: self.name.clone(),
            version: self.version,
            fingerprint: hasher.finish(),
        }
    }

    /// Same member names and types in the same order
    pub fn same_layout(&self, other: &Shape) -> bool {
        self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(&other.members)
                .all(|(a, b)| a.name == b.name && a.data_type == b.data_type)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@v{} {{", self.name, self.version)?;
        for (index, member) in self.members.iter().enumerate() {
            if index > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", member.name, member.data_type.name())?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignability() {
        assert!(DataType::Float.is_assignable_to(&DataType::Float));
        assert!(DataType::Int.is_assignable_to(&DataType::Float));
        assert!(!DataType::Float.is_assignable_to(&DataType::Int));
        assert!(DataType::Vec3.is_assignable_to(&DataType::Any));
        assert!(DataType::FilePath.is_assignable_to(&DataType::String));
        assert!(!DataType::String.is_assignable_to(&DataType::FilePath));
        assert!(DataType::Object("Light".into()).is_assignable_to(&DataType::Object("Light".into())));
        assert!(!DataType::Object("Light".into()).is_assignable_to(&DataType::Object("Mesh".into())));
    }

    #[test]
    fn test_shape_keys_track_layout() {
        let v1 = Shape::new("Light", 1).with_member(Member::required("intensity", DataType::Float));
        let same = v1.clone();
        let retyped = Shape::new("Light", 1).with_member(Member::required("intensity", DataType::Int));

        assert_eq!(v1.key(), same.key());
        assert_ne!(v1.key(), retyped.key());

        let defaulted = Shape::new("Light", 1).with_member(Member::optional(
            "intensity",
            DataType::Float,
            NodeData::Float(1.0),
        ));
        let redefaulted = Shape::new("Light", 1).with_member(Member::optional(
            "intensity",
            DataType::Float,
            NodeData::Float(2.0),
        ));
        assert_ne!(defaulted.key(), redefaulted.key());
        assert_ne!(defaulted.key(), v1.key());
        assert!(v1.same_layout(&same));
        assert!(!v1.same_layout(&retyped));
    }

    #[test]
    fn test_shape_display() {
        let shape = Shape::new("Light", 2)
            .with_member(Member::required("intensity", DataType::Float))
            .with_member(Member::optional("color", DataType::Color, NodeData::Color([1.0; 4])));
        assert_eq!(shape.to_string(), "Light@v2 { intensity: Float, color: Color }");
        assert!(shape.member("color").is_some_and(|m| !m.is_required()));
        assert_eq!(shape.index_of("color"), Some(1));
    }
}
