//! Physical Tree
//!
//! The rendered tree is owned by the embedder. The composition layer only
//! needs a handful of primitives from it, captured by [`PhysicalBackend`].
//! [`PhysicalLinks`] is the in-memory implementation used when there is no
//! host tree to drive.

use std::collections::HashMap;
use std::fmt;

use crate::NodeId;

/// Primitive operations on the rendered tree
pub trait PhysicalBackend: fmt::Debug {
    /// Rendered parent of a node
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Rendered children of a node, in order
    fn children(&self, node: NodeId) -> Vec<NodeId>;

    /// Rendered child at `index`
    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId>;

    /// Insert `node` under `parent` before `reference` (append when `None`
    /// or when `reference` is not a child of `parent`). A node that is
    /// already attached somewhere is moved.
    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>);

    /// Detach `node` from `parent`; no-op if it is not a child.
    fn remove_child(&mut self, parent: NodeId, node: NodeId);
}

/// In-memory rendered tree keyed by node identity
#[derive(Debug, Default)]
pub struct PhysicalLinks {
    parents: HashMap<NodeId, NodeId>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl PhysicalLinks {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attached nodes
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Check if no node is attached
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

impl PhysicalBackend for PhysicalLinks {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents.get(&node).copied()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.children.get(&node).cloned().unwrap_or_default()
    }

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.children.get(&node)?.get(index).copied()
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        if let Some(old) = self.parents.get(&node).copied() {
            self.remove_child(old, node);
        }
        let siblings = self.children.entry(parent).or_default();
        let pos = reference
            .and_then(|r| siblings.iter().position(|&c| c == r))
            .unwrap_or(siblings.len());
        siblings.insert(pos, node);
        self.parents.insert(node, parent);
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) {
        if self.parents.get(&node) != Some(&parent) {
            return;
        }
        self.parents.remove(&node);
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|&c| c != node);
        }
    }
}
