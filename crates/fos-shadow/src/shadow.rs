//! Shadow Scopes
//!
//! A shadow scope is the state attached to one shadow root: its host, its
//! [`Distributor`] and the slot elements found in its subtree.

use crate::distributor::Distributor;
use crate::node::Node;
use crate::tree::ShadowTree;
use crate::{DomError, DomResult, NodeId};

/// Composition state of one shadow root
#[derive(Debug, Clone)]
pub struct ShadowScope {
    host: NodeId,
    root: NodeId,
    distributor: Distributor,
    /// Slots in tree order, valid while `slots_dirty` is false
    pub(crate) slots: Vec<NodeId>,
    pub(crate) slots_dirty: bool,
    pub(crate) passes: u64,
}

impl ShadowScope {
    fn new(host: NodeId, root: NodeId) -> Self {
        Self {
            host,
            root,
            distributor: Distributor::new(root),
            slots: Vec::new(),
            slots_dirty: true,
            passes: 0,
        }
    }

    pub fn host(&self) -> NodeId {
        self.host
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Slots found by the latest rescan
    pub fn slots(&self) -> &[NodeId] {
        &self.slots
    }

    pub fn distributor(&self) -> &Distributor {
        &self.distributor
    }

    /// Number of distribution passes that ran with at least one slot
    pub fn distribution_passes(&self) -> u64 {
        self.passes
    }
}

impl ShadowTree {
    /// Attach a shadow root to `host`.
    ///
    /// The host's current children become its light children: they stay
    /// logical children but leave the rendered tree until a slot takes them.
    pub fn attach_shadow(&mut self, host: NodeId) -> DomResult<NodeId> {
        self.check(host)?;
        let Some(element) = self.node(host).as_element() else {
            return Err(DomError::NotSupported);
        };
        if element.shadow_root.is_some() {
            return Err(DomError::AlreadyAttached);
        }

        let root = self.alloc(Node::shadow_root(host));
        if let Some(element) = self.node_mut(host).as_element_mut() {
            element.shadow_root = Some(root);
        }

        self.logical.ensure_recorded(host, self.physical.as_ref());
        self.logical.record_root(root);
        for child in self.physical.children(host) {
            self.physical.remove_child(host, child);
        }
        self.scopes.insert(root, ShadowScope::new(host, root));

        tracing::debug!(?host, ?root, "attached shadow root");
        Ok(root)
    }

    /// Slots of a scope, rescanning the subtree when the set is stale
    pub(crate) fn scope_slots(&mut self, root: NodeId) -> Vec<NodeId> {
        let dirty = match self.scopes.get(&root) {
            Some(scope) => scope.slots_dirty,
            None => return Vec::new(),
        };
        if dirty {
            let tag = self.config.slot_tag.clone();
            let slots = self.query(
                root,
                |_, node| node.as_element().is_some_and(|e| e.name == tag),
                false,
            );
            for &slot in &slots {
                self.logical.ensure_recorded(slot, self.physical.as_ref());
                if let Some(parent) = self.parent_node(slot) {
                    self.logical.ensure_recorded(parent, self.physical.as_ref());
                }
            }
            if let Some(scope) = self.scopes.get_mut(&root) {
                scope.slots = slots;
                scope.slots_dirty = false;
            }
        }
        self.scopes
            .get(&root)
            .map(|scope| scope.slots.clone())
            .unwrap_or_default()
    }

    /// Whether a scope currently owns at least one slot
    pub(crate) fn scope_has_slots(&mut self, root: NodeId) -> bool {
        !self.scope_slots(root).is_empty()
    }

    pub(crate) fn mark_slots_dirty(&mut self, root: NodeId) {
        if let Some(scope) = self.scopes.get_mut(&root) {
            scope.slots_dirty = true;
        }
    }
}
