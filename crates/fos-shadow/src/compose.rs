//! Composition
//!
//! Turns distribution results into physical tree shape. After a scope is
//! distributed, its host and every slot parent inside it get their rendered
//! children recomputed from the logical tree and patched in place.

use std::collections::HashSet;

use crate::NodeId;
use crate::events::{Event, EventInit};
use crate::node::NodeData;
use crate::tree::ShadowTree;

impl ShadowTree {
    /// Redistribute and re-render the given scopes plus every scope they
    /// dirty. Each scope runs at most once per call.
    pub(crate) fn update_scopes(&mut self, roots: &[NodeId]) {
        self.batched(|tree| {
            let mut visited = HashSet::new();
            let mut queue: Vec<NodeId> = roots.iter().rev().copied().collect();
            while let Some(root) = queue.pop() {
                if !visited.insert(root) {
                    continue;
                }
                let Some(distributor) = tree.scopes.get(&root).map(|s| s.distributor().clone()) else {
                    continue;
                };
                let outcome = distributor.distribute(tree);
                if let Some(scope) = tree.scopes.get_mut(&root) {
                    if !scope.slots.is_empty() {
                        scope.passes += 1;
                    }
                }
                tree.render_scope(root);
                tree.pending_slot_changes.extend(outcome.slot_changes);
                queue.extend(outcome.dirty_roots.into_iter().rev());
            }
        });
    }

    /// Run `edit` with slotchange delivery held back until the outermost
    /// batch returns. Listeners only ever see a tree whose edit completed.
    pub(crate) fn batched<T>(&mut self, edit: impl FnOnce(&mut Self) -> T) -> T {
        let outermost = !self.updating;
        self.updating = true;
        let result = edit(self);
        if outermost {
            self.updating = false;
            self.drain_slot_changes();
        }
        result
    }

    /// Force redistribution of a scope, rescanning its slots.
    ///
    /// Accepts either the shadow root or its host.
    pub fn distribute(&mut self, node: NodeId) {
        let root = self.shadow_root(node).unwrap_or(node);
        if !self.scopes.contains_key(&root) {
            return;
        }
        self.mark_slots_dirty(root);
        self.update_scopes(&[root]);
    }

    fn drain_slot_changes(&mut self) {
        while let Some(slot) = self.pending_slot_changes.pop_front() {
            self.fire_slot_change(slot);
        }
    }

    /// Notify `slot`, then every slot it is nested into.
    fn fire_slot_change(&mut self, slot: NodeId) {
        let mut seen = HashSet::new();
        let mut current = Some(slot);
        while let Some(slot) = current {
            if !seen.insert(slot) {
                break;
            }
            tracing::trace!(?slot, "slotchange");
            let mut event = Event::new("slotchange", EventInit::default());
            self.dispatch_event(slot.into(), &mut event);
            current = self.assigned_slot(slot);
        }
    }

    fn render_scope(&mut self, root: NodeId) {
        let Some(host) = self.host(root) else {
            return;
        };
        let targets = self.compose_children(host);
        self.update_physical_children(host, &targets);

        let slots = self.scopes.get(&root).map(|s| s.slots.clone()).unwrap_or_default();
        let mut parents = Vec::new();
        for slot in slots {
            let Some(parent) = self.parent_node(slot) else {
                continue;
            };
            if parent != host && parent != root && !self.is_slot(parent) && !parents.contains(&parent) {
                parents.push(parent);
            }
        }
        for parent in parents {
            let targets = self.compose_children(parent);
            self.update_physical_children(parent, &targets);
        }
    }

    /// Rendered children of `container`: its shadow root's children when it
    /// is a host, its own logical children otherwise, with every final
    /// slot replaced by the nodes distributed to it.
    fn compose_children(&self, container: NodeId) -> Vec<NodeId> {
        let source = self.shadow_root(container).unwrap_or(container);
        let mut composed = Vec::new();
        for child in self.child_nodes(source) {
            if !self.is_slot(child) {
                composed.push(child);
                continue;
            }
            if self.assigned_slot(child).is_some() {
                // rendered by the slot it is assigned to
                continue;
            }
            if let Some(record) = &self.node(child).slot_assignment {
                composed.extend(record.distributed.iter().copied());
            }
        }
        composed
    }

    /// Patch the physical children of `container` to match `targets`.
    /// Hidden undistributed elements are left where they are.
    fn update_physical_children(&mut self, container: NodeId, targets: &[NodeId]) {
        for child in self.physical.children(container) {
            if !targets.contains(&child) && !self.is_hidden(child) {
                self.physical.remove_child(container, child);
            }
        }
        for (index, &target) in targets.iter().enumerate() {
            let visible: Vec<NodeId> = self
                .physical
                .children(container)
                .into_iter()
                .filter(|&c| !self.is_hidden(c))
                .collect();
            if visible.get(index) != Some(&target) {
                self.physical.insert_before(container, target, visible.get(index).copied());
            }
        }
        tracing::trace!(?container, children = targets.len(), "recomposed");
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(|n| n.undistributed)
    }

    /// Take a node that no slot wants out of rendering. Elements are hidden
    /// with the reserved attribute; other nodes cannot be styled and are
    /// detached instead.
    pub(crate) fn undistribute_node(&mut self, node: NodeId) {
        if self.is_element(node) {
            let attr = self.config.undistributed_attr.clone();
            let entry = self.node_mut(node);
            entry.undistributed = true;
            if let Some(element) = entry.as_element_mut() {
                element.set_attr(&attr, "");
            }
        } else if let Some(parent) = self.physical.parent(node) {
            self.physical.remove_child(parent, node);
        }
    }

    /// Clear the undistributed marker so the node renders again.
    pub(crate) fn ensure_distributable(&mut self, node: NodeId) {
        let attr = self.config.undistributed_attr.clone();
        let entry = self.node_mut(node);
        if entry.undistributed {
            entry.undistributed = false;
            if let Some(element) = entry.as_element_mut() {
                element.remove_attr(&attr);
            }
        }
    }

    /// First node actually rendered in place of `slot`
    pub(crate) fn first_composed_node(&self, slot: NodeId) -> Option<NodeId> {
        if self.assigned_slot(slot).is_some() {
            return None;
        }
        self.node(slot)
            .slot_assignment
            .as_ref()
            .and_then(|record| record.distributed.first().copied())
    }

    /// Physical reference for inserting before the logical `reference`:
    /// the first following sibling already rendered under `physical_parent`.
    pub(crate) fn rendered_reference(
        &self,
        physical_parent: NodeId,
        reference: Option<NodeId>,
    ) -> Option<NodeId> {
        let mut current = reference;
        while let Some(node) = current {
            if self.is_slot(node) {
                if let Some(first) = self.first_composed_node(node) {
                    return Some(first);
                }
            } else if self.physical.parent(node) == Some(physical_parent) {
                return Some(node);
            }
            current = self.next_sibling(node);
        }
        None
    }

    /// Rendered children, without hidden undistributed elements
    pub fn composed_child_nodes(&self, node: NodeId) -> Vec<NodeId> {
        self.physical
            .children(node)
            .into_iter()
            .filter(|&c| !self.is_hidden(c))
            .collect()
    }

    /// Text of the rendered subtree
    pub fn composed_text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.collect_composed_text(node, &mut out);
        out
    }

    fn collect_composed_text(&self, node: NodeId, out: &mut String) {
        match self.get(node).map(|n| &n.data) {
            Some(NodeData::Text(text)) => out.push_str(text),
            Some(NodeData::Comment(_)) | None => {}
            Some(_) => {
                for child in self.composed_child_nodes(node) {
                    self.collect_composed_text(child, out);
                }
            }
        }
    }
}
