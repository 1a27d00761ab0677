//! Shadow Tree (arena-based allocation)
//!
//! Owns every node plus both linkage stores. All navigation reads the
//! logical tree; the physical backend is only consulted for rendering.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::config::Config;
use crate::listeners::ListenerRegistry;
use crate::logical::LogicalTree;
use crate::node::{Node, NodeData, NodeKind};
use crate::observer::ChildObserver;
use crate::physical::{PhysicalBackend, PhysicalLinks};
use crate::shadow::ShadowScope;
use crate::{DomError, DomResult, NodeId};

/// Options for [`ShadowTree::assigned_nodes`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssignedNodesOptions {
    /// Expand nested slots into their own assigned nodes
    pub flatten: bool,
}

/// Arena-based tree with shadow composition
pub struct ShadowTree {
    pub(crate) nodes: Vec<Node>,
    pub(crate) config: Config,
    pub(crate) logical: LogicalTree,
    pub(crate) physical: Box<dyn PhysicalBackend>,
    /// Shadow scopes keyed by their shadow root
    pub(crate) scopes: HashMap<NodeId, ShadowScope>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) observers: HashMap<NodeId, ChildObserver>,
    pub(crate) pending_flushes: Vec<NodeId>,
    pub(crate) pending_slot_changes: VecDeque<NodeId>,
    pub(crate) updating: bool,
}

impl ShadowTree {
    /// Create a tree holding only a document node
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a tree with custom options
    pub fn with_config(config: Config) -> Self {
        Self::with_backend(config, Box::new(PhysicalLinks::new()))
    }

    /// Create a tree that renders into an embedder-provided backend
    pub fn with_backend(config: Config, physical: Box<dyn PhysicalBackend>) -> Self {
        let mut tree = Self {
            nodes: Vec::new(),
            config,
            logical: LogicalTree::new(),
            physical,
            scopes: HashMap::new(),
            listeners: ListenerRegistry::new(),
            observers: HashMap::new(),
            pending_flushes: Vec::new(),
            pending_slot_changes: VecDeque::new(),
            updating: false,
        };
        let document = tree.alloc(Node::document());
        debug_assert_eq!(document, NodeId::ROOT);
        tree
    }

    /// Composition options
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The document node
    pub fn document(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Rendered tree
    pub fn physical(&self) -> &dyn PhysicalBackend {
        self.physical.as_ref()
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the arena is empty (never true: the document always exists)
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create an element
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(Node::element(tag))
    }

    /// Create a text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.alloc(Node::text(text))
    }

    /// Create a comment node
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.alloc(Node::comment(text))
    }

    /// Create an empty document fragment
    pub fn create_fragment(&mut self) -> NodeId {
        self.alloc(Node::fragment())
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub(crate) fn check(&self, id: NodeId) -> DomResult<()> {
        if id.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(DomError::NotFound(id))
        }
    }

    /// Node by ID; callers must pass a validated ID.
    pub(crate) fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Kind of a node
    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(Node::kind)
    }

    /// Local name of an element
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.get(id)?.as_element().map(|e| e.name.as_str())
    }

    /// Attribute value of an element
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.get(id)?.as_element()?.get_attr(name)
    }

    /// Check if an element carries an attribute
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.get_attribute(id, name).is_some()
    }

    /// Value of the `slot` attribute
    pub fn slot(&self, id: NodeId) -> Option<&str> {
        self.get_attribute(id, "slot")
    }

    // --- Logical navigation ---

    pub fn parent_node(&self, id: NodeId) -> Option<NodeId> {
        self.logical.parent(id, self.physical.as_ref())
    }

    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent_node(id).filter(|&p| self.is_element(p))
    }

    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.logical.children(id, self.physical.as_ref())
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.logical.first_child(id, self.physical.as_ref())
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.logical.last_child(id, self.physical.as_ref())
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.logical.next_sibling(id, self.physical.as_ref())
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.logical.previous_sibling(id, self.physical.as_ref())
    }

    /// Element children
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.child_nodes(id)
            .into_iter()
            .filter(|&c| self.is_element(c))
            .collect()
    }

    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.child_nodes(id).into_iter().find(|&c| self.is_element(c))
    }

    pub fn last_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.child_nodes(id).into_iter().rev().find(|&c| self.is_element(c))
    }

    pub fn child_element_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    pub fn next_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.next_sibling(id);
        while let Some(n) = current {
            if self.is_element(n) {
                return Some(n);
            }
            current = self.next_sibling(n);
        }
        None
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let mut current = self.previous_sibling(id);
        while let Some(n) = current {
            if self.is_element(n) {
                return Some(n);
            }
            current = self.previous_sibling(n);
        }
        None
    }

    /// Concatenated text of the logical subtree (comments skipped)
    pub fn text_content(&self, id: NodeId) -> String {
        let Some(node) = self.get(id) else {
            return String::new();
        };
        match &node.data {
            NodeData::Text(t) | NodeData::Comment(t) => t.clone(),
            _ => {
                let mut out = String::new();
                for child in self.child_nodes(id) {
                    if self.kind(child) != Some(NodeKind::Comment) {
                        out.push_str(&self.text_content(child));
                    }
                }
                out
            }
        }
    }

    /// Whether `ancestor` is `node` or one of its logical ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent_node(n);
        }
        false
    }

    // --- Shadow accessors ---

    pub(crate) fn is_element(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_element)
    }

    /// Whether the node is a slot element
    pub fn is_slot(&self, id: NodeId) -> bool {
        self.local_name(id) == Some(self.config.slot_tag.as_str())
    }

    /// Shadow root attached to a host
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.get(host)?.as_element()?.shadow_root
    }

    /// Host of a shadow root
    pub fn host(&self, root: NodeId) -> Option<NodeId> {
        self.get(root)?.host()
    }

    /// Whether the node is a shadow root
    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        self.host(id).is_some()
    }

    /// Scope owned by a shadow root
    pub fn scope(&self, root: NodeId) -> Option<&ShadowScope> {
        self.scopes.get(&root)
    }

    /// Slot a node is currently assigned to
    pub fn assigned_slot(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.assigned_slot
    }

    /// Nodes assigned to a slot (empty for non-slots)
    pub fn assigned_nodes(&self, slot: NodeId, options: AssignedNodesOptions) -> Vec<NodeId> {
        if !self.is_slot(slot) {
            return Vec::new();
        }
        match &self.node(slot).slot_assignment {
            Some(record) if options.flatten => record.distributed.clone(),
            Some(record) => record.assigned.clone(),
            None => Vec::new(),
        }
    }
}

impl Default for ShadowTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShadowTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowTree")
            .field("nodes", &self.nodes.len())
            .field("scopes", &self.scopes.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tree_has_document() {
        let tree = ShadowTree::new();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.kind(tree.document()), Some(NodeKind::Document));
        assert!(tree.child_nodes(tree.document()).is_empty());
    }

    #[test]
    fn test_navigation() {
        let mut tree = ShadowTree::new();
        let div = tree.create_element("div");
        let a = tree.create_element("a");
        let text = tree.create_text("hi");
        let b = tree.create_element("b");

        tree.append_child(tree.document(), div).unwrap();
        tree.append_child(div, a).unwrap();
        tree.append_child(div, text).unwrap();
        tree.append_child(div, b).unwrap();

        assert_eq!(tree.child_nodes(div), vec![a, text, b]);
        assert_eq!(tree.children(div), vec![a, b]);
        assert_eq!(tree.first_child(div), Some(a));
        assert_eq!(tree.last_child(div), Some(b));
        assert_eq!(tree.next_sibling(a), Some(text));
        assert_eq!(tree.previous_sibling(b), Some(text));
        assert_eq!(tree.next_element_sibling(a), Some(b));
        assert_eq!(tree.previous_element_sibling(b), Some(a));
        assert_eq!(tree.first_element_child(div), Some(a));
        assert_eq!(tree.last_element_child(div), Some(b));
        assert_eq!(tree.child_element_count(div), 2);
        assert_eq!(tree.parent_element(a), Some(div));
        assert_eq!(tree.parent_element(div), None);
        assert_eq!(tree.text_content(div), "hi");
    }

    #[test]
    fn test_get_unknown_node() {
        let tree = ShadowTree::new();
        assert!(tree.get(NodeId(99)).is_none());
        assert_eq!(tree.check(NodeId(99)), Err(DomError::NotFound(NodeId(99))));
    }
}
