//! Node paths - the address of a node inside the live graph

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node
pub type NodeId = usize;

/// Ordered sequence of node ids, outermost (root) first.
///
/// Used as the addressing key for log category inference and for
/// diagnostics that target a whole subtree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodePath {
    ids: Vec<NodeId>,
}

impl NodePath {
    /// Create a path from root-first ids
    pub fn new(ids: impl Into<Vec<NodeId>>) -> Self {
        Self { ids: ids.into() }
    }

    /// Path containing only a root node
    pub fn root(id: NodeId) -> Self {
        Self { ids: vec![id] }
    }

    /// Path of a child node nested inside this one
    pub fn child(&self, id: NodeId) -> Self {
        let mut ids = self.ids.clone();
        ids.push(id);
        Self { ids }
    }

    /// Path of the enclosing node, if any
    pub fn parent(&self) -> Option<NodePath> {
        if self.ids.len() > 1 {
            Some(Self {
                ids: self.ids[..self.ids.len() - 1].to_vec(),
            })
        } else {
            None
        }
    }

    /// The innermost node id
    pub fn leaf(&self) -> Option<NodeId> {
        self.ids.last().copied()
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Check if `other` lies inside the subtree rooted at this path (inclusive)
    pub fn is_ancestor_of(&self, other: &NodePath) -> bool {
        !self.ids.is_empty()
            && other.ids.len() >= self.ids.len()
            && other.ids[..self.ids.len()] == self.ids[..]
    }

    /// All ids except the outermost one, innermost first
    pub fn without_root(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.ids.iter().skip(1).rev().copied()
    }

    /// Log category for messages emitted on behalf of this node
    pub fn category(&self) -> String {
        let mut category = String::from("nodes");
        for id in &self.ids {
            category.push_str("::");
            category.push_str(&id.to_string());
        }
        category
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ids.is_empty() {
            return write!(f, "/");
        }
        for id in &self.ids {
            write!(f, "/{}", id)?;
        }
        Ok(())
    }
}

impl From<Vec<NodeId>> for NodePath {
    fn from(ids: Vec<NodeId>) -> Self {
        Self::new(ids)
    }
}
