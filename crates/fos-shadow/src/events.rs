//! Event Composition
//!
//! Composed paths across shadow boundaries, target/relatedTarget
//! retargeting and the dispatch pipelines that run listeners over a
//! precomputed path.

use std::collections::HashSet;

use crate::NodeId;
use crate::tree::ShadowTree;

/// Event types that are composed no matter how the event was created
const ALWAYS_COMPOSED: &[&str] = &[
    "blur",
    "focus",
    "focusin",
    "focusout",
    "click",
    "dblclick",
    "mousedown",
    "mouseenter",
    "mouseleave",
    "mousemove",
    "mouseout",
    "mouseover",
    "mouseup",
    "wheel",
    "beforeinput",
    "input",
    "keydown",
    "keyup",
    "keypress",
    "compositionstart",
    "compositionupdate",
    "compositionend",
    "touchstart",
    "touchend",
    "touchmove",
    "touchcancel",
    "pointerover",
    "pointerenter",
    "pointerdown",
    "pointermove",
    "pointerup",
    "pointercancel",
    "pointerout",
    "pointerleave",
    "gotpointercapture",
    "lostpointercapture",
    "dragstart",
    "drag",
    "dragenter",
    "dragleave",
    "dragover",
    "drop",
    "dragend",
    "DOMActivate",
    "DOMFocusIn",
    "DOMFocusOut",
];

/// Non-bubbling types dispatched through the manual per-scope pipeline
const RETARGETED_NON_BUBBLING: &[&str] = &["focus", "blur"];

/// Whether events of this type are composed by default
pub fn is_always_composed(event_type: &str) -> bool {
    ALWAYS_COMPOSED.contains(&event_type)
}

/// Something listeners can be attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    /// A node of the tree
    Node(NodeId),
    /// The global scope above the document
    Global,
}

impl EventTarget {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Self::Node(id) => Some(id),
            Self::Global => None,
        }
    }
}

impl From<NodeId> for EventTarget {
    fn from(id: NodeId) -> Self {
        Self::Node(id)
    }
}

/// Event phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

/// Options for [`Event::new`]
#[derive(Debug, Clone, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    pub related_target: Option<EventTarget>,
}

/// Event being dispatched through the tree
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    cancelable: bool,
    composed: bool,
    /// Node the event was dispatched at
    pub(crate) origin: Option<EventTarget>,
    pub(crate) related_origin: Option<EventTarget>,
    pub(crate) path: Vec<EventTarget>,
    pub(crate) related_path: Vec<EventTarget>,
    pub(crate) current_target: Option<EventTarget>,
    /// `origin` as seen from `current_target`
    pub(crate) target: Option<EventTarget>,
    pub(crate) related_target: Option<EventTarget>,
    pub(crate) phase: EventPhase,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
    pub(crate) default_prevented: bool,
    pub(crate) in_passive_listener: bool,
}

impl Event {
    pub fn new(event_type: &str, init: EventInit) -> Self {
        Self {
            event_type: event_type.to_string(),
            bubbles: init.bubbles,
            cancelable: init.cancelable,
            composed: init.composed,
            origin: None,
            related_origin: init.related_target,
            path: Vec::new(),
            related_path: Vec::new(),
            current_target: None,
            target: None,
            related_target: None,
            phase: EventPhase::None,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
            in_passive_listener: false,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Authored flag, or the type's default for interaction events
    pub fn composed(&self) -> bool {
        self.composed || is_always_composed(&self.event_type)
    }

    /// Target retargeted to the scope of the current listener
    pub fn target(&self) -> Option<EventTarget> {
        self.target
    }

    /// Related target retargeted to the scope of the current listener
    pub fn related_target(&self) -> Option<EventTarget> {
        self.related_target
    }

    pub fn current_target(&self) -> Option<EventTarget> {
        self.current_target
    }

    pub fn event_phase(&self) -> EventPhase {
        self.phase
    }

    /// Path computed when dispatch started, target first
    pub fn composed_path(&self) -> &[EventTarget] {
        &self.path
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped = true;
        self.propagation_stopped = true;
    }

    /// Cancel the default action; ignored for non-cancelable events and
    /// inside passive listeners
    pub fn prevent_default(&mut self) {
        if self.cancelable && !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

impl ShadowTree {
    /// Composed path an event dispatched at `start` travels.
    ///
    /// Assigned nodes step to their slot, shadow roots step to their host
    /// when `composed` (or when the root is not the one `start` lives in),
    /// everything else steps to its logical parent. A path ending at the
    /// document is extended with the global scope.
    pub fn composed_path(&self, start: EventTarget, composed: bool) -> Vec<EventTarget> {
        let EventTarget::Node(start) = start else {
            return vec![EventTarget::Global];
        };
        let start_root = self.root_of(start);
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(start);
        while let Some(node) = current {
            if !seen.insert(node) {
                tracing::warn!(?node, "cycle in composed path");
                break;
            }
            path.push(EventTarget::Node(node));
            current = if let Some(slot) = self.assigned_slot(node) {
                Some(slot)
            } else if let Some(host) = self.host(node).filter(|_| composed || node != start_root) {
                Some(host)
            } else {
                self.parent_node(node)
            };
        }
        if path.last() == Some(&EventTarget::Node(NodeId::ROOT)) {
            path.push(EventTarget::Global);
        }
        path
    }

    /// The shallowest entry of `path` visible from `reference`'s scope
    pub fn retarget(&self, reference: EventTarget, path: &[EventTarget]) -> Option<EventTarget> {
        let reference_path = self.composed_path(reference, true);
        let mut last_root = None;
        let mut root_visible = false;
        for &ancestor in path {
            let root = self.event_root(ancestor);
            if last_root != Some(root) {
                root_visible = reference_path.contains(&root);
                last_root = Some(root);
            }
            let in_shadow = root.node().is_some_and(|r| self.is_shadow_root(r));
            if !in_shadow || root_visible {
                return Some(ancestor);
            }
        }
        None
    }

    fn event_root(&self, target: EventTarget) -> EventTarget {
        match target {
            EventTarget::Node(node) => EventTarget::Node(self.root_of(node)),
            EventTarget::Global => EventTarget::Global,
        }
    }

    /// Dispatch `event` at `target`. Returns false if a listener canceled it.
    pub fn dispatch_event(&mut self, target: EventTarget, event: &mut Event) -> bool {
        event.origin = Some(target);
        event.path = self.composed_path(target, event.composed());
        event.related_path = match event.related_origin {
            Some(related) => self.composed_path(related, true),
            None => Vec::new(),
        };
        event.propagation_stopped = false;
        event.immediate_propagation_stopped = false;
        tracing::trace!(event = %event.event_type, path = event.path.len(), "dispatching");

        if RETARGETED_NON_BUBBLING.contains(&event.event_type.as_str()) {
            self.dispatch_per_scope(event);
        } else {
            self.dispatch_through_path(event);
        }

        event.phase = EventPhase::None;
        event.current_target = None;
        event.target = event.origin.filter(|&t| !self.in_shadow_tree(t));
        event.related_target = event.related_origin.filter(|&t| !self.in_shadow_tree(t));
        !event.default_prevented
    }

    fn in_shadow_tree(&self, target: EventTarget) -> bool {
        target
            .node()
            .is_some_and(|n| self.is_shadow_root(self.root_of(n)))
    }

    /// Point the event at `node` and retarget it for that listener scope.
    fn enter(&self, event: &mut Event, node: EventTarget) {
        event.current_target = Some(node);
        event.target = self.retarget(node, &event.path);
        event.related_target = if event.related_path.is_empty() {
            None
        } else {
            self.retarget(node, &event.related_path)
        };
    }

    /// Capture from the outermost entry down, then the target, then bubble
    /// back up when the event bubbles.
    fn dispatch_through_path(&mut self, event: &mut Event) {
        let path = event.path.clone();
        for &node in path.iter().rev() {
            self.enter(event, node);
            event.phase = if event.target == Some(node) {
                EventPhase::AtTarget
            } else {
                EventPhase::Capturing
            };
            self.invoke_listeners(node, event, true);
            if event.propagation_stopped {
                return;
            }
        }
        for &node in &path {
            self.enter(event, node);
            let at_target = event.target == Some(node);
            if !at_target && !event.bubbles {
                continue;
            }
            event.phase = if at_target {
                EventPhase::AtTarget
            } else {
                EventPhase::Bubbling
            };
            self.invoke_listeners(node, event, false);
            if event.propagation_stopped {
                return;
            }
        }
    }

    /// Pipeline for non-bubbling events that still have to reach every
    /// scope: capture runs everywhere, the bubble pass runs at the target
    /// and then once per host whose shadow root was the last scope notified.
    fn dispatch_per_scope(&mut self, event: &mut Event) {
        let path = event.path.clone();
        event.phase = EventPhase::Capturing;
        for &node in path.iter().rev() {
            self.enter(event, node);
            self.invoke_listeners(node, event, true);
            if event.propagation_stopped {
                return;
            }
        }

        event.phase = EventPhase::AtTarget;
        let mut last_fired_root = None;
        for (index, &node) in path.iter().enumerate() {
            let entering_scope = node
                .node()
                .and_then(|n| self.shadow_root(n))
                .is_some_and(|root| last_fired_root == Some(root));
            if index != 0 && !entering_scope {
                continue;
            }
            self.enter(event, node);
            self.invoke_listeners(node, event, false);
            if let EventTarget::Node(n) = node {
                last_fired_root = Some(self.root_of(n));
            }
            if event.propagation_stopped {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested() -> (ShadowTree, NodeId, NodeId, NodeId, NodeId) {
        let mut tree = ShadowTree::new();
        let outer = tree.create_element("x-outer");
        tree.append_child(tree.document(), outer).unwrap();
        let outer_root = tree.attach_shadow(outer).unwrap();
        let inner = tree.create_element("x-inner");
        tree.append_child(outer_root, inner).unwrap();
        let inner_root = tree.attach_shadow(inner).unwrap();
        let deep = tree.create_element("button");
        tree.append_child(inner_root, deep).unwrap();
        (tree, outer, inner, inner_root, deep)
    }

    #[test]
    fn test_always_composed() {
        assert!(is_always_composed("click"));
        assert!(is_always_composed("DOMFocusIn"));
        assert!(!is_always_composed("slotchange"));
        assert!(!is_always_composed("custom"));

        assert!(Event::new("keydown", EventInit::default()).composed());
        assert!(!Event::new("custom", EventInit::default()).composed());
    }

    #[test]
    fn test_non_composed_path_stops_at_root() {
        let (tree, _outer, _inner, inner_root, deep) = nested();
        let path = tree.composed_path(deep.into(), false);
        assert_eq!(path, vec![EventTarget::Node(deep), EventTarget::Node(inner_root)]);
    }

    #[test]
    fn test_retarget_to_host() {
        let (tree, outer, inner, _inner_root, deep) = nested();
        let path = tree.composed_path(deep.into(), true);

        assert_eq!(tree.retarget(EventTarget::Global, &path), Some(outer.into()));
        assert_eq!(tree.retarget(inner.into(), &path), Some(inner.into()));
        assert_eq!(tree.retarget(deep.into(), &path), Some(deep.into()));
    }

    #[test]
    fn test_prevent_default_respects_cancelable() {
        let mut event = Event::new("x", EventInit::default());
        event.prevent_default();
        assert!(!event.default_prevented());

        let mut event = Event::new("x", EventInit { cancelable: true, ..Default::default() });
        event.in_passive_listener = true;
        event.prevent_default();
        assert!(!event.default_prevented());
        event.in_passive_listener = false;
        event.prevent_default();
        assert!(event.default_prevented());
    }
}
