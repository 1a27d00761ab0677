//! Tree Mutation
//!
//! appendChild, insertBefore, removeChild, replaceChild, cloneNode and the
//! ParentNode/ChildNode conveniences. Every edit updates the logical store
//! first, then decides whether distribution has to run. Edits that cannot
//! affect any slot take the fast path and touch the physical tree directly.

use crate::node::{Node, NodeData, NodeKind};
use crate::tree::ShadowTree;
use crate::{DomError, DomResult, NodeId};

/// Entry of a mixed node list for `append`, `before` and friends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeInput {
    /// Existing node of the tree
    Node(NodeId),
    /// Text that becomes a new text node
    Text(String),
}

impl From<NodeId> for NodeInput {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

impl From<&str> for NodeInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for NodeInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Options for [`ShadowTree::get_root_node`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetRootNodeOptions {
    /// Continue through shadow hosts up to the document
    pub composed: bool,
}

/// Owned copy of a subtree, taken before materializing a clone
struct Snapshot {
    data: NodeData,
    children: Vec<Snapshot>,
}

impl ShadowTree {
    /// Append a child node
    pub fn append_child(&mut self, container: NodeId, node: NodeId) -> DomResult<NodeId> {
        self.insert_before(container, node, None)
    }

    /// Insert `node` into `container` before `reference` (append when `None`).
    ///
    /// A fragment inserts its children and is left empty. A node that is
    /// already in the tree is removed from its old parent first.
    pub fn insert_before(
        &mut self,
        container: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.batched(|tree| tree.insert_node(container, node, reference))
    }

    fn insert_node(
        &mut self,
        container: NodeId,
        node: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        self.check(container)?;
        self.check(node)?;
        if let Some(reference) = reference {
            self.check(reference)?;
            if self.parent_node(reference) != Some(container) {
                return Err(DomError::InvalidReference { reference, container });
            }
        }
        self.check_insertion(container, node)?;
        let reference = if reference == Some(node) {
            self.next_sibling(node)
        } else {
            reference
        };

        let is_fragment = self.kind(node) == Some(NodeKind::Fragment);
        let nodes = if is_fragment {
            let children = self.child_nodes(node);
            for &child in &children {
                self.logical.record_remove_child(child, node, self.physical.as_ref());
                self.physical.remove_child(node, child);
            }
            children
        } else {
            if let Some(old_parent) = self.parent_node(node) {
                self.remove_from_parent(old_parent, node);
            }
            vec![node]
        };

        let owner_root = self.owner_shadow_root(container);
        let slot_added = owner_root.is_some() && nodes.iter().any(|&n| self.contains_slot(n));
        if slot_added {
            if let Some(owner) = owner_root {
                self.mark_slots_dirty(owner);
            }
        }

        for &inserted in &nodes {
            self.logical
                .record_insert_before(inserted, container, reference, self.physical.as_ref());
            self.clear_root_memo(inserted);
        }

        // Hosts and slots only ever receive rendered children through
        // composition.
        let hosted = self.shadow_root(container);
        let container_is_slot = self.is_slot(container);
        if hosted.is_none() && !container_is_slot {
            let physical_parent = self.host(container).unwrap_or(container);
            let physical_reference = self.rendered_reference(physical_parent, reference);
            for &inserted in &nodes {
                if owner_root.is_some() && self.is_slot(inserted) {
                    continue;
                }
                self.physical.insert_before(physical_parent, inserted, physical_reference);
            }
        }

        let mut roots = Vec::new();
        if let Some(owner) = owner_root {
            if slot_added || container_is_slot {
                roots.push(owner);
            }
        }
        if let Some(hosted) = hosted {
            if self.scope_has_slots(hosted) {
                roots.push(hosted);
            }
        }
        if !roots.is_empty() {
            self.update_scopes(&roots);
        }

        for &inserted in &nodes {
            self.schedule_observer(container, Some(inserted), None);
        }
        Ok(node)
    }

    /// Remove a child node
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> DomResult<NodeId> {
        self.check(parent)?;
        self.check(node)?;
        if self.parent_node(node) != Some(parent) {
            return Err(DomError::NotAChild { node, parent });
        }
        self.batched(|tree| tree.remove_from_parent(parent, node));
        Ok(node)
    }

    /// Replace `old` with `new` under `parent`, returning `old`
    pub fn replace_child(&mut self, parent: NodeId, new: NodeId, old: NodeId) -> DomResult<NodeId> {
        self.check(parent)?;
        self.check(new)?;
        self.check(old)?;
        if self.parent_node(old) != Some(parent) {
            return Err(DomError::NotAChild { node: old, parent });
        }
        if new == old {
            return Ok(old);
        }
        self.batched(|tree| {
            tree.insert_node(parent, new, Some(old))?;
            tree.remove_child(parent, old)
        })
    }

    fn check_insertion(&self, container: NodeId, node: NodeId) -> DomResult<()> {
        let invalid_node = matches!(self.kind(node), Some(NodeKind::Document)) || self.is_shadow_root(node);
        let invalid_container = matches!(
            self.kind(container),
            Some(NodeKind::Text | NodeKind::Comment)
        );
        if invalid_node || invalid_container || self.is_host_including_ancestor(node, container) {
            return Err(DomError::HierarchyRequest);
        }
        Ok(())
    }

    /// Whether `ancestor` is `node` or an ancestor of it, crossing from
    /// shadow roots to their hosts
    fn is_host_including_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent_node(n).or_else(|| self.host(n));
        }
        false
    }

    fn contains_slot(&self, node: NodeId) -> bool {
        if self.is_slot(node) {
            return true;
        }
        let tag = self.config.slot_tag.as_str();
        !self
            .query(node, |_, n| n.as_element().is_some_and(|e| e.name == tag), true)
            .is_empty()
    }

    /// Unlink `node` from its logical parent and redistribute whatever the
    /// removal affects. The parent must be checked by the caller.
    fn remove_from_parent(&mut self, parent: NodeId, node: NodeId) {
        // Captured before unlinking: the removed subtree no longer has a root.
        let owner_root = self.owner_shadow_root(node);

        let mut slots_removed = false;
        if let Some(owner) = owner_root {
            let mut removed_slots = Vec::new();
            if self.is_slot(node) {
                removed_slots.push(node);
            }
            let tag = self.config.slot_tag.clone();
            removed_slots.extend(self.query(
                node,
                |_, n| n.as_element().is_some_and(|e| e.name == tag),
                false,
            ));
            for &slot in &removed_slots {
                self.release_slot(slot);
            }
            if !removed_slots.is_empty() {
                self.mark_slots_dirty(owner);
                slots_removed = true;
            }
        }

        let parent_is_slot = self.is_slot(parent);
        self.logical.record_remove_child(node, parent, self.physical.as_ref());
        self.clear_root_memo(node);
        if let Some(rendered_parent) = self.physical.parent(node) {
            self.physical.remove_child(rendered_parent, node);
        }
        let entry = self.node_mut(node);
        entry.assigned_slot = None;
        entry.prev_assigned_slot = None;
        self.ensure_distributable(node);

        let mut roots = Vec::new();
        if let Some(owner) = owner_root {
            if slots_removed || parent_is_slot {
                roots.push(owner);
            }
        }
        if let Some(hosted) = self.shadow_root(parent) {
            if self.scope_has_slots(hosted) {
                roots.push(hosted);
            }
        }
        if !roots.is_empty() {
            self.update_scopes(&roots);
        }

        self.schedule_observer(parent, None, Some(node));
    }

    /// Drop a slot's assignment, detaching everything it rendered.
    fn release_slot(&mut self, slot: NodeId) {
        let Some(record) = self.node_mut(slot).slot_assignment.take() else {
            return;
        };
        for &node in &record.distributed {
            if let Some(parent) = self.physical.parent(node) {
                self.physical.remove_child(parent, node);
            }
        }
        for &node in &record.assigned {
            let entry = self.node_mut(node);
            if entry.assigned_slot == Some(slot) {
                entry.assigned_slot = None;
            }
        }
    }

    /// Clone a node, recursing through logical children when `deep`.
    ///
    /// Shadow roots are not cloned, and clones are never marked
    /// undistributed.
    pub fn clone_node(&mut self, node: NodeId, deep: bool) -> DomResult<NodeId> {
        self.check(node)?;
        let snapshot = snapshot(self, node, deep)?;
        self.materialize(snapshot)
    }

    /// Copy a node of another tree into this one
    pub fn import_node(&mut self, source: &ShadowTree, node: NodeId, deep: bool) -> DomResult<NodeId> {
        source.check(node)?;
        let snapshot = snapshot(source, node, deep)?;
        self.materialize(snapshot)
    }

    fn materialize(&mut self, snapshot: Snapshot) -> DomResult<NodeId> {
        let id = self.alloc(Node::with_data(snapshot.data));
        for child in snapshot.children {
            let child = self.materialize(child)?;
            self.append_child(id, child)?;
        }
        Ok(id)
    }

    // --- Attributes and text ---

    /// Set an attribute, redistributing what the change affects
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        self.check(node)?;
        let element = self
            .node_mut(node)
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        element.set_attr(name, value);
        self.batched(|tree| tree.attribute_changed(node, name));
        Ok(())
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<Option<String>> {
        self.check(node)?;
        let element = self
            .node_mut(node)
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        let old = element.remove_attr(name);
        if old.is_some() {
            self.batched(|tree| tree.attribute_changed(node, name));
        }
        Ok(old)
    }

    /// Set the `slot` attribute
    pub fn set_slot(&mut self, node: NodeId, name: &str) -> DomResult<()> {
        self.set_attribute(node, "slot", name)
    }

    fn attribute_changed(&mut self, node: NodeId, name: &str) {
        let mut roots = Vec::new();
        if name == "name" && self.is_slot(node) {
            if let Some(owner) = self.owner_shadow_root(node) {
                roots.push(owner);
            }
        }
        if let Some(hosted) = self.parent_node(node).and_then(|p| self.shadow_root(p)) {
            if self.scope_has_slots(hosted) {
                roots.push(hosted);
            }
        }
        if !roots.is_empty() {
            self.update_scopes(&roots);
        }
    }

    /// Replace the text of a character node, or the children of any other
    /// node with a single text node
    pub fn set_text_content(&mut self, node: NodeId, text: &str) -> DomResult<()> {
        self.check(node)?;
        match &mut self.node_mut(node).data {
            NodeData::Text(data) | NodeData::Comment(data) => {
                *data = text.to_string();
                return Ok(());
            }
            _ => {}
        }
        self.batched(|tree| {
            for child in tree.child_nodes(node) {
                tree.remove_from_parent(node, child);
            }
            if !text.is_empty() {
                let text = tree.create_text(text);
                tree.insert_node(node, text, None)?;
            }
            Ok(())
        })
    }

    // --- ParentNode / ChildNode ---

    /// Turn a mixed node list into one insertable node: the node itself
    /// for a single entry, a fragment holding all of them otherwise.
    pub fn convert_nodes_into_a_node(&mut self, items: Vec<NodeInput>) -> DomResult<Option<NodeId>> {
        self.check_items(&items)?;
        let mut nodes = Vec::with_capacity(items.len());
        for item in items {
            nodes.push(match item {
                NodeInput::Node(id) => id,
                NodeInput::Text(text) => self.create_text(&text),
            });
        }
        match nodes.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            _ => {
                let fragment = self.create_fragment();
                for node in nodes {
                    self.append_child(fragment, node)?;
                }
                Ok(Some(fragment))
            }
        }
    }

    /// Reject lists holding unknown nodes, documents or shadow roots.
    fn check_items(&self, items: &[NodeInput]) -> DomResult<()> {
        for (index, item) in items.iter().enumerate() {
            if let NodeInput::Node(id) = item {
                if self.get(*id).is_none() {
                    return Err(DomError::TypeConversion { index });
                }
            }
        }
        for id in moving_nodes(items) {
            if self.kind(id) == Some(NodeKind::Document) || self.is_shadow_root(id) {
                return Err(DomError::HierarchyRequest);
            }
        }
        Ok(())
    }

    /// Validate a list against the parent it ends up in, so that a bad
    /// entry fails before any earlier entry has been moved.
    fn check_items_for(&self, parent: NodeId, items: &[NodeInput]) -> DomResult<()> {
        self.check_items(items)?;
        if items.is_empty() {
            return Ok(());
        }
        if matches!(self.kind(parent), Some(NodeKind::Text | NodeKind::Comment)) {
            return Err(DomError::HierarchyRequest);
        }
        for id in moving_nodes(items) {
            self.check_insertion(parent, id)?;
        }
        Ok(())
    }

    /// Append nodes or text after the last child
    pub fn append(&mut self, parent: NodeId, items: Vec<NodeInput>) -> DomResult<()> {
        self.check(parent)?;
        self.check_items_for(parent, &items)?;
        self.batched(|tree| {
            if let Some(node) = tree.convert_nodes_into_a_node(items)? {
                tree.insert_node(parent, node, None)?;
            }
            Ok(())
        })
    }

    /// Insert nodes or text before the first child
    pub fn prepend(&mut self, parent: NodeId, items: Vec<NodeInput>) -> DomResult<()> {
        self.check(parent)?;
        self.check_items_for(parent, &items)?;
        self.batched(|tree| {
            if let Some(node) = tree.convert_nodes_into_a_node(items)? {
                let first = tree.first_child(parent);
                tree.insert_node(parent, node, first)?;
            }
            Ok(())
        })
    }

    /// Insert nodes or text before `node`; no-op without a parent
    pub fn before(&mut self, node: NodeId, items: Vec<NodeInput>) -> DomResult<()> {
        self.check(node)?;
        let Some(parent) = self.parent_node(node) else {
            return Ok(());
        };
        self.check_items_for(parent, &items)?;
        let moving = moving_nodes(&items);
        let mut previous = self.previous_sibling(node);
        while let Some(p) = previous.filter(|p| moving.contains(p)) {
            previous = self.previous_sibling(p);
        }
        self.batched(|tree| {
            if let Some(inserted) = tree.convert_nodes_into_a_node(items)? {
                let reference = match previous {
                    Some(p) => tree.next_sibling(p),
                    None => tree.first_child(parent),
                };
                tree.insert_node(parent, inserted, reference)?;
            }
            Ok(())
        })
    }

    /// Insert nodes or text after `node`; no-op without a parent
    pub fn after(&mut self, node: NodeId, items: Vec<NodeInput>) -> DomResult<()> {
        self.check(node)?;
        let Some(parent) = self.parent_node(node) else {
            return Ok(());
        };
        self.check_items_for(parent, &items)?;
        let next = self.viable_next_sibling(node, &moving_nodes(&items));
        self.batched(|tree| {
            if let Some(inserted) = tree.convert_nodes_into_a_node(items)? {
                tree.insert_node(parent, inserted, next)?;
            }
            Ok(())
        })
    }

    /// Replace `node` with nodes or text; no-op without a parent
    pub fn replace_with(&mut self, node: NodeId, items: Vec<NodeInput>) -> DomResult<()> {
        self.check(node)?;
        let Some(parent) = self.parent_node(node) else {
            return Ok(());
        };
        self.check_items_for(parent, &items)?;
        let next = self.viable_next_sibling(node, &moving_nodes(&items));
        self.batched(|tree| {
            let inserted = tree.convert_nodes_into_a_node(items)?;
            if tree.parent_node(node) == Some(parent) {
                match inserted {
                    Some(inserted) => {
                        tree.replace_child(parent, inserted, node)?;
                    }
                    None => {
                        tree.remove_child(parent, node)?;
                    }
                }
            } else if let Some(inserted) = inserted {
                tree.insert_node(parent, inserted, next)?;
            }
            Ok(())
        })
    }

    /// Remove `node` from its parent; no-op without one
    pub fn remove(&mut self, node: NodeId) -> DomResult<()> {
        self.check(node)?;
        if let Some(parent) = self.parent_node(node) {
            self.batched(|tree| tree.remove_from_parent(parent, node));
        }
        Ok(())
    }

    fn viable_next_sibling(&self, node: NodeId, moving: &[NodeId]) -> Option<NodeId> {
        let mut next = self.next_sibling(node);
        while let Some(n) = next.filter(|n| moving.contains(n)) {
            next = self.next_sibling(n);
        }
        next
    }

    // --- Roots ---

    /// Root of the logical tree holding `node`: the nearest shadow root,
    /// the document, or the topmost detached ancestor
    pub fn get_root_node(&self, node: NodeId, options: GetRootNodeOptions) -> NodeId {
        let mut root = self.root_of(node);
        if options.composed {
            while let Some(host) = self.host(root) {
                root = self.root_of(host);
            }
        }
        root
    }

    /// Whether `node` is (shadow-including) connected to the document
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.get_root_node(node, GetRootNodeOptions { composed: true }) == NodeId::ROOT
    }

    pub(crate) fn root_of(&self, node: NodeId) -> NodeId {
        let mut walked = Vec::new();
        let mut current = node;
        let root = loop {
            let Some(entry) = self.get(current) else {
                break current;
            };
            if let Some(memo) = entry.owner_root.get() {
                break memo;
            }
            walked.push(current);
            if entry.host().is_some() {
                break current;
            }
            match self.parent_node(current) {
                Some(parent) => current = parent,
                None => break current,
            }
        };
        // Detached subtrees are not memoized: their root changes on insert.
        if self.root_is_connected(root) {
            for id in walked {
                self.node(id).owner_root.set(Some(root));
            }
        }
        root
    }

    fn root_is_connected(&self, root: NodeId) -> bool {
        match self.host(root) {
            Some(host) => self.is_connected(host),
            None => root == NodeId::ROOT,
        }
    }

    /// Nearest shadow root above `node`, if it lives in a shadow tree
    pub(crate) fn owner_shadow_root(&self, node: NodeId) -> Option<NodeId> {
        let root = self.root_of(node);
        self.is_shadow_root(root).then_some(root)
    }

    fn clear_root_memo(&self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(entry) = self.get(current) {
                entry.owner_root.set(None);
            }
            stack.extend(self.child_nodes(current));
        }
    }
}

fn moving_nodes(items: &[NodeInput]) -> Vec<NodeId> {
    items
        .iter()
        .filter_map(|item| match item {
            NodeInput::Node(id) => Some(*id),
            NodeInput::Text(_) => None,
        })
        .collect()
}

fn snapshot(source: &ShadowTree, node: NodeId, deep: bool) -> DomResult<Snapshot> {
    let data = match &source.node(node).data {
        NodeData::Document => return Err(DomError::NotSupported),
        NodeData::Fragment { .. } => NodeData::Fragment { host: None },
        NodeData::Element(element) => {
            let mut element = element.clone();
            element.shadow_root = None;
            element.remove_attr(&source.config.undistributed_attr);
            NodeData::Element(element)
        }
        other => other.clone(),
    };
    let mut children = Vec::new();
    if deep {
        for child in source.child_nodes(node) {
            children.push(snapshot(source, child, true)?);
        }
    }
    Ok(Snapshot { data, children })
}
