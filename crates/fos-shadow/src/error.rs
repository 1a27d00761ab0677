//! DOM operation errors

use crate::NodeId;

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Id does not name a node of this tree
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),

    /// Reference node passed to an insertion is not a child of the container
    #[error("Reference node {reference:?} is not a child of {container:?}")]
    InvalidReference { reference: NodeId, container: NodeId },

    /// Node passed to a removal is not a child of the parent
    #[error("Node {node:?} is not a child of {parent:?}")]
    NotAChild { node: NodeId, parent: NodeId },

    /// Entry of a mixed node list is neither a node of this tree nor text
    #[error("Cannot convert item {index} into a node")]
    TypeConversion { index: usize },

    /// Hierarchy error (e.g., inserting an ancestor)
    #[error("Hierarchy request error")]
    HierarchyRequest,

    /// Operation does not apply to this kind of node
    #[error("Invalid node type")]
    InvalidNodeType,

    /// Element already has a shadow root
    #[error("Element already has a shadow root")]
    AlreadyAttached,

    /// Shadow root cannot be attached to this node
    #[error("Node does not support a shadow root")]
    NotSupported,

    /// Selector could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}
