//! Logical Tree Store
//!
//! Authored parent/child linkage, independent of where nodes are rendered.
//! A container's logical children are recorded lazily: until the first
//! recorded mutation, its physical children (those not claimed by another
//! logical parent) stand in for them.

use std::collections::HashMap;

use crate::NodeId;
use crate::physical::PhysicalBackend;

/// Logical parent/child maps
#[derive(Debug, Default)]
pub(crate) struct LogicalTree {
    parents: HashMap<NodeId, Option<NodeId>>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

impl LogicalTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn parent(&self, node: NodeId, physical: &dyn PhysicalBackend) -> Option<NodeId> {
        match self.parents.get(&node) {
            Some(parent) => *parent,
            None => physical.parent(node),
        }
    }

    pub(crate) fn children(&self, container: NodeId, physical: &dyn PhysicalBackend) -> Vec<NodeId> {
        match self.children.get(&container) {
            Some(children) => children.clone(),
            None => physical
                .children(container)
                .into_iter()
                .filter(|c| self.claims(container, *c))
                .collect(),
        }
    }

    pub(crate) fn first_child(&self, container: NodeId, physical: &dyn PhysicalBackend) -> Option<NodeId> {
        match self.children.get(&container) {
            Some(children) => children.first().copied(),
            None => self.children(container, physical).first().copied(),
        }
    }

    pub(crate) fn last_child(&self, container: NodeId, physical: &dyn PhysicalBackend) -> Option<NodeId> {
        match self.children.get(&container) {
            Some(children) => children.last().copied(),
            None => self.children(container, physical).last().copied(),
        }
    }

    pub(crate) fn next_sibling(&self, node: NodeId, physical: &dyn PhysicalBackend) -> Option<NodeId> {
        let parent = self.parent(node, physical)?;
        let siblings = self.children(parent, physical);
        let pos = siblings.iter().position(|&c| c == node)?;
        siblings.get(pos + 1).copied()
    }

    pub(crate) fn previous_sibling(&self, node: NodeId, physical: &dyn PhysicalBackend) -> Option<NodeId> {
        let parent = self.parent(node, physical)?;
        let siblings = self.children(parent, physical);
        let pos = siblings.iter().position(|&c| c == node)?;
        pos.checked_sub(1).and_then(|p| siblings.get(p).copied())
    }

    /// Record `container`'s current children if nothing is recorded yet.
    pub(crate) fn ensure_recorded(&mut self, container: NodeId, physical: &dyn PhysicalBackend) {
        if self.children.contains_key(&container) {
            return;
        }
        let children = self.children(container, physical);
        for &child in &children {
            self.parents.insert(child, Some(container));
        }
        self.children.insert(container, children);
    }

    /// Mark `node` as a logical root (no parent) with no children.
    pub(crate) fn record_root(&mut self, node: NodeId) {
        self.parents.insert(node, None);
        self.children.entry(node).or_default();
    }

    /// Splice `node` into `container` before `reference` (append when absent).
    pub(crate) fn record_insert_before(
        &mut self,
        node: NodeId,
        container: NodeId,
        reference: Option<NodeId>,
        physical: &dyn PhysicalBackend,
    ) {
        debug_assert!(
            self.parent(node, physical).is_none(),
            "node must be unlinked before insertion"
        );
        self.ensure_recorded(container, physical);
        let children = self.children.entry(container).or_default();
        let pos = reference
            .and_then(|r| children.iter().position(|&c| c == r))
            .unwrap_or(children.len());
        children.insert(pos, node);
        self.parents.insert(node, Some(container));
    }

    /// Unlink `node` from `parent`.
    pub(crate) fn record_remove_child(
        &mut self,
        node: NodeId,
        parent: NodeId,
        physical: &dyn PhysicalBackend,
    ) {
        self.ensure_recorded(parent, physical);
        if let Some(children) = self.children.get_mut(&parent) {
            children.retain(|&c| c != node);
        }
        self.parents.insert(node, None);
    }

    fn claims(&self, container: NodeId, child: NodeId) -> bool {
        match self.parents.get(&child) {
            Some(parent) => *parent == Some(container),
            None => true,
        }
    }
}
