//! Tree Node
//!
//! Node payload plus the per-node composition bookkeeping. Linkage
//! (parents, children) is not stored here: the logical store and the
//! physical backend each keep their own maps keyed by [`NodeId`].

use std::cell::Cell;

use crate::NodeId;
use crate::distributor::SlotAssignment;

/// Kind of node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    Comment,
    Fragment,
    Document,
}

/// Tree node
#[derive(Debug)]
pub struct Node {
    /// Node-specific data
    pub data: NodeData,
    /// Slot this node is currently assigned to
    pub(crate) assigned_slot: Option<NodeId>,
    /// Slot the node was assigned to before the running distribution pass
    pub(crate) prev_assigned_slot: Option<NodeId>,
    /// Assignment record, only ever present on slot elements
    pub(crate) slot_assignment: Option<SlotAssignment>,
    /// Memoized root node (set only while connected to the document)
    pub(crate) owner_root: Cell<Option<NodeId>>,
    /// Hidden because no slot took it
    pub(crate) undistributed: bool,
}

impl Node {
    pub(crate) fn with_data(data: NodeData) -> Self {
        Self {
            data,
            assigned_slot: None,
            prev_assigned_slot: None,
            slot_assignment: None,
            owner_root: Cell::new(None),
            undistributed: false,
        }
    }

    /// Create a new element node
    pub fn element(name: &str) -> Self {
        Self::with_data(NodeData::Element(ElementData::new(name)))
    }

    /// Create a new text node
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Text(content.into()))
    }

    /// Create a new comment node
    pub fn comment(content: impl Into<String>) -> Self {
        Self::with_data(NodeData::Comment(content.into()))
    }

    /// Create a document fragment
    pub fn fragment() -> Self {
        Self::with_data(NodeData::Fragment { host: None })
    }

    /// Create the fragment acting as the shadow root of `host`
    pub(crate) fn shadow_root(host: NodeId) -> Self {
        Self::with_data(NodeData::Fragment { host: Some(host) })
    }

    /// Create a document node
    pub fn document() -> Self {
        Self::with_data(NodeData::Document)
    }

    /// Kind of this node
    pub fn kind(&self) -> NodeKind {
        match &self.data {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::Fragment { .. } => NodeKind::Fragment,
            NodeData::Document => NodeKind::Document,
        }
    }

    /// Check if this is an element
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self.data, NodeData::Element(_))
    }

    /// Check if this is text
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    /// Get element data if this is an element
    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get mutable element data
    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match &mut self.data {
            NodeData::Element(e) => Some(e),
            _ => None,
        }
    }

    /// Get text content if this is a text node
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text(t) => Some(t),
            _ => None,
        }
    }

    /// Host element, if this node is a shadow root
    #[inline]
    pub fn host(&self) -> Option<NodeId> {
        match self.data {
            NodeData::Fragment { host } => host,
            _ => None,
        }
    }

    /// Slot this node is assigned to
    pub fn assigned_slot(&self) -> Option<NodeId> {
        self.assigned_slot
    }

    /// Assignment record of a slot after its last distribution pass
    pub fn slot_assignment(&self) -> Option<&SlotAssignment> {
        self.slot_assignment.as_ref()
    }

    /// Whether distribution left this node out of rendering
    pub fn is_undistributed(&self) -> bool {
        self.undistributed
    }
}

/// Node-specific data
#[derive(Debug, Clone)]
pub enum NodeData {
    /// Document root
    Document,
    /// Document fragment; `host` is set when the fragment is a shadow root
    Fragment { host: Option<NodeId> },
    /// Element
    Element(ElementData),
    /// Text content
    Text(String),
    /// Comment
    Comment(String),
}

/// Element-specific data
#[derive(Debug, Clone)]
pub struct ElementData {
    /// Local name (lowercase)
    pub name: String,
    /// Attributes in insertion order
    pub attrs: Vec<Attribute>,
    /// Attached shadow root
    pub(crate) shadow_root: Option<NodeId>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
            shadow_root: None,
        }
    }

    /// Get an attribute value
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Set an attribute
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(attr) = self.attrs.iter_mut().find(|a| a.name == name) {
            attr.value = value;
            return;
        }
        self.attrs.push(Attribute {
            name: name.to_string(),
            value,
        });
    }

    /// Remove an attribute, returning its old value
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }

    /// Value of the `id` attribute
    pub fn id(&self) -> Option<&str> {
        self.get_attr("id")
    }

    /// Whitespace-separated entries of the `class` attribute
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.get_attr("class").unwrap_or("").split_whitespace()
    }

    /// Shadow root attached to this element
    pub fn shadow_root(&self) -> Option<NodeId> {
        self.shadow_root
    }
}

/// Attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_attributes() {
        let mut elem = ElementData::new("DIV");
        assert_eq!(elem.name, "div");

        elem.set_attr("slot", "header");
        elem.set_attr("class", "a  b");
        elem.set_attr("slot", "footer");

        assert_eq!(elem.get_attr("slot"), Some("footer"));
        assert_eq!(elem.attrs.len(), 2);
        assert_eq!(elem.classes().collect::<Vec<_>>(), vec!["a", "b"]);

        assert_eq!(elem.remove_attr("slot"), Some("footer".to_string()));
        assert_eq!(elem.get_attr("slot"), None);
        assert_eq!(elem.remove_attr("slot"), None);
    }

    #[test]
    fn test_node_kinds() {
        assert_eq!(Node::element("p").kind(), NodeKind::Element);
        assert_eq!(Node::text("x").kind(), NodeKind::Text);
        assert_eq!(Node::comment("x").kind(), NodeKind::Comment);
        assert_eq!(Node::fragment().kind(), NodeKind::Fragment);
        assert_eq!(Node::document().kind(), NodeKind::Document);

        let root = Node::shadow_root(NodeId(3));
        assert_eq!(root.host(), Some(NodeId(3)));
        assert_eq!(Node::fragment().host(), None);
    }
}
