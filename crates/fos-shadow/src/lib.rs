//! fOS Shadow - Shadow tree composition
//!
//! Slot-based content projection and shadow-scoped event dispatch for
//! trees that have no native shadow support.
//!
//! The crate keeps two trees side by side:
//! - the *logical* tree, which is what authors build and what every
//!   navigation API reads, and
//! - the *physical* (composed) tree, which is what actually renders after
//!   slot distribution.
//!
//! [`ShadowTree`] is the single entry point. Tree edits update the logical
//! store, decide whether distribution must run, redistribute the affected
//! shadow scopes and resynchronize the physical tree before returning.
//! Events dispatched afterwards follow the composed path and see targets
//! retargeted to the listener's scope.

mod config;
mod distributor;
mod error;
mod events;
mod listeners;
mod logical;
mod mutation;
mod node;
mod observer;
mod physical;
mod compose;
mod query;
mod shadow;
mod tree;

pub use config::Config;
pub use distributor::{Distributor, SlotAssignment};
pub use error::{DomError, DomResult};
pub use events::{Event, EventInit, EventPhase, EventTarget, is_always_composed};
pub use listeners::{Listener, ListenerOptions};
pub use mutation::{GetRootNodeOptions, NodeInput};
pub use node::{Attribute, ElementData, Node, NodeData, NodeKind};
pub use observer::{MutationRecord, ObserverHandle};
pub use physical::{PhysicalBackend, PhysicalLinks};
pub use query::{AttributeMatcher, AttributeSelector, Selector, SelectorComponent};
pub use shadow::ShadowScope;
pub use tree::{AssignedNodesOptions, ShadowTree};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Root node ID (the document)
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
