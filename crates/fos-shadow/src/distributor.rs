//! Slot Distribution
//!
//! Partitions a host's logical children among the slots of its shadow
//! scope. Distribution is purely logical: it fills each slot's
//! [`SlotAssignment`] and sets the `assigned_slot` back-references. Moving
//! nodes in the physical tree is left to the composition pass that follows.

use std::collections::HashSet;

use crate::NodeId;
use crate::tree::ShadowTree;

/// Per-slot assignment record
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotAssignment {
    /// Direct matches (or fallback children) of the latest pass
    pub(crate) assigned: Vec<NodeId>,
    /// `assigned` with nested slots expanded recursively
    pub(crate) distributed: Vec<NodeId>,
    /// Assigned nodes of the pass before the latest one
    pub(crate) previous: Vec<NodeId>,
}

impl SlotAssignment {
    pub fn assigned(&self) -> &[NodeId] {
        &self.assigned
    }

    pub fn distributed(&self) -> &[NodeId] {
        &self.distributed
    }

    pub fn previous(&self) -> &[NodeId] {
        &self.previous
    }
}

/// Result of one distribution pass
#[derive(Debug, Default)]
pub(crate) struct DistributionOutcome {
    /// Scopes whose host holds one of this scope's slots
    pub dirty_roots: Vec<NodeId>,
    /// Slots whose assignment changed, in declaration order
    pub slot_changes: Vec<NodeId>,
}

/// Distribution engine of one shadow scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distributor {
    root: NodeId,
}

impl Distributor {
    pub(crate) fn new(root: NodeId) -> Self {
        Self { root }
    }

    /// Shadow root this distributor works for
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Run one pass. No-op when the scope owns no slots.
    pub(crate) fn distribute(&self, tree: &mut ShadowTree) -> DistributionOutcome {
        let mut outcome = DistributionOutcome::default();
        let slots = tree.scope_slots(self.root);
        let Some(host) = tree.host(self.root) else {
            return outcome;
        };
        if slots.is_empty() {
            return outcome;
        }

        let mut pool: Vec<Option<NodeId>> =
            tree.child_nodes(host).into_iter().map(Some).collect();
        let pool_size = pool.len();

        for &slot in &slots {
            if distribute_slot(tree, slot, &mut pool) {
                outcome.slot_changes.push(slot);
            }
            // A slot that is itself a light child of another host feeds
            // that host's distribution.
            let hosted = tree
                .parent_node(slot)
                .and_then(|parent| tree.shadow_root(parent))
                .filter(|&root| root != self.root);
            if let Some(root) = hosted {
                if tree.scope_has_slots(root) && !outcome.dirty_roots.contains(&root) {
                    outcome.dirty_roots.push(root);
                }
            }
        }

        for &slot in &slots {
            let distributed = flatten(tree, slot);
            if let Some(record) = tree.node_mut(slot).slot_assignment.as_mut() {
                record.distributed = distributed;
            }
        }

        let mut undistributed = 0;
        for node in pool.into_iter().flatten() {
            tree.node_mut(node).assigned_slot = None;
            tree.undistribute_node(node);
            undistributed += 1;
        }

        tracing::debug!(
            root = ?self.root,
            slots = slots.len(),
            pool = pool_size,
            undistributed,
            changed = outcome.slot_changes.len(),
            "distributed shadow scope"
        );
        outcome
    }
}

/// Trimmed `slot` attribute of a pool candidate; non-elements use "".
fn slot_name_of(tree: &ShadowTree, node: NodeId) -> String {
    tree.slot(node).map(str::trim).unwrap_or("").to_string()
}

/// Assign matching pool entries (or fallback children) to `slot`.
/// Returns whether the slot needs a change notification.
fn distribute_slot(tree: &mut ShadowTree, slot: NodeId, pool: &mut [Option<NodeId>]) -> bool {
    let previous = tree
        .node_mut(slot)
        .slot_assignment
        .take()
        .map(|record| record.assigned)
        .unwrap_or_default();
    for &node in &previous {
        let node = tree.node_mut(node);
        node.prev_assigned_slot = node.assigned_slot;
        if node.assigned_slot == Some(slot) {
            node.assigned_slot = None;
        }
    }

    let name = tree
        .get_attribute(slot, "name")
        .map(str::trim)
        .unwrap_or("")
        .to_string();
    let mut assigned = Vec::new();
    let mut needs_notify = false;

    for entry in pool.iter_mut() {
        let Some(node) = *entry else {
            continue;
        };
        if slot_name_of(tree, node) != name {
            continue;
        }
        needs_notify |= assign(tree, node, slot);
        assigned.push(node);
        *entry = None;
    }

    if assigned.is_empty() {
        for node in tree.child_nodes(slot) {
            needs_notify |= assign(tree, node, slot);
            assigned.push(node);
        }
    }

    for &node in &previous {
        tree.node_mut(node).prev_assigned_slot = None;
    }
    if assigned.len() < previous.len() {
        needs_notify = true;
    }

    tree.node_mut(slot).slot_assignment = Some(SlotAssignment {
        assigned,
        distributed: Vec::new(),
        previous,
    });
    needs_notify
}

/// Link `node` to `slot`; returns true when it came from a different slot.
fn assign(tree: &mut ShadowTree, node: NodeId, slot: NodeId) -> bool {
    let entry = tree.node_mut(node);
    let moved = entry.prev_assigned_slot != Some(slot);
    entry.assigned_slot = Some(slot);
    tree.ensure_distributable(node);
    moved
}

/// Expand nested slots among `slot`'s assigned nodes, in order.
fn flatten(tree: &ShadowTree, slot: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut visiting = HashSet::from([slot]);
    flatten_into(tree, slot, 0, &mut visiting, &mut out);
    out
}

fn flatten_into(
    tree: &ShadowTree,
    slot: NodeId,
    depth: usize,
    visiting: &mut HashSet<NodeId>,
    out: &mut Vec<NodeId>,
) {
    let Some(record) = tree.node(slot).slot_assignment.as_ref() else {
        return;
    };
    for &node in &record.assigned {
        if !tree.is_slot(node) {
            out.push(node);
            continue;
        }
        if depth + 1 > tree.config.max_flatten_depth {
            tracing::warn!(?slot, nested = ?node, "slot flattening depth bound reached");
            continue;
        }
        if !visiting.insert(node) {
            tracing::warn!(?slot, nested = ?node, "slot assigned into itself, skipping");
            continue;
        }
        flatten_into(tree, node, depth + 1, visiting, out);
        visiting.remove(&node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AssignedNodesOptions;

    fn host_with_slots(tree: &mut ShadowTree) -> (NodeId, NodeId, NodeId, NodeId) {
        let host = tree.create_element("x-host");
        tree.append_child(tree.document(), host).unwrap();
        let root = tree.attach_shadow(host).unwrap();
        let named = tree.create_element("slot");
        tree.set_attribute(named, "name", "foo").unwrap();
        let default = tree.create_element("slot");
        tree.append_child(root, named).unwrap();
        tree.append_child(root, default).unwrap();
        (host, root, named, default)
    }

    #[test]
    fn test_pool_order_partition() {
        let mut tree = ShadowTree::new();
        let (host, _root, named, default) = host_with_slots(&mut tree);
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        tree.set_attribute(b, "slot", " foo ").unwrap();
        let c = tree.create_text("c");
        tree.append_child(host, a).unwrap();
        tree.append_child(host, b).unwrap();
        tree.append_child(host, c).unwrap();

        let flat = AssignedNodesOptions::default();
        assert_eq!(tree.assigned_nodes(named, flat), vec![b]);
        assert_eq!(tree.assigned_nodes(default, flat), vec![a, c]);
        assert_eq!(tree.assigned_slot(b), Some(named));
        assert_eq!(tree.assigned_slot(c), Some(default));
    }

    #[test]
    fn test_second_pass_reports_no_changes() {
        let mut tree = ShadowTree::new();
        let (host, root, named, default) = host_with_slots(&mut tree);
        let a = tree.create_element("a");
        tree.append_child(host, a).unwrap();

        let distributor = Distributor::new(root);
        let before = tree.node(default).slot_assignment.clone();
        let outcome = distributor.distribute(&mut tree);
        assert!(outcome.slot_changes.is_empty());
        assert_eq!(
            tree.node(default).slot_assignment.as_ref().map(|r| r.assigned.clone()),
            before.map(|r| r.assigned)
        );
        assert!(tree.assigned_nodes(named, Default::default()).is_empty());
    }

    #[test]
    fn test_unmatched_element_is_marked() {
        let mut tree = ShadowTree::new();
        let host = tree.create_element("x-host");
        tree.append_child(tree.document(), host).unwrap();
        let root = tree.attach_shadow(host).unwrap();
        let slot = tree.create_element("slot");
        tree.set_attribute(slot, "name", "only").unwrap();
        tree.append_child(root, slot).unwrap();

        let stray = tree.create_element("span");
        tree.append_child(host, stray).unwrap();

        assert!(tree.get(stray).unwrap().is_undistributed());
        assert!(tree.has_attribute(stray, "shady-undistributed"));
        assert_eq!(tree.assigned_slot(stray), None);

        tree.set_attribute(stray, "slot", "only").unwrap();
        assert!(!tree.get(stray).unwrap().is_undistributed());
        assert!(!tree.has_attribute(stray, "shady-undistributed"));
        assert_eq!(tree.assigned_slot(stray), Some(slot));
    }
}
