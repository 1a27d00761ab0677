//! Edge case tests for fos-shadow
//!
//! Error conditions, configuration, custom backends and re-entrant
//! listeners.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fos_shadow::{
    AssignedNodesOptions, Config, DomError, Event, EventInit, EventTarget, Listener,
    ListenerOptions, NodeId, PhysicalBackend, PhysicalLinks, ShadowTree,
};

const FLAT: AssignedNodesOptions = AssignedNodesOptions { flatten: false };
const FLATTEN: AssignedNodesOptions = AssignedNodesOptions { flatten: true };

fn connected_host(tree: &mut ShadowTree) -> (NodeId, NodeId) {
    let host = tree.create_element("x-host");
    tree.append_child(tree.document(), host).unwrap();
    let root = tree.attach_shadow(host).unwrap();
    (host, root)
}

#[test]
fn test_insert_with_foreign_reference_leaves_tree_untouched() {
    let mut tree = ShadowTree::new();
    let div = tree.create_element("div");
    let child = tree.create_element("p");
    tree.append_child(div, child).unwrap();
    let stranger = tree.create_element("span");
    let node = tree.create_element("em");

    let err = tree.insert_before(div, node, Some(stranger)).unwrap_err();
    assert_eq!(err, DomError::InvalidReference { reference: stranger, container: div });
    assert_eq!(tree.child_nodes(div), vec![child]);
    assert_eq!(tree.parent_node(node), None);
}

#[test]
fn test_remove_non_child() {
    let mut tree = ShadowTree::new();
    let div = tree.create_element("div");
    let other = tree.create_element("p");
    assert_eq!(
        tree.remove_child(div, other),
        Err(DomError::NotAChild { node: other, parent: div })
    );
}

#[test]
fn test_conversion_fails_before_mutating() {
    let mut tree = ShadowTree::new();
    let div = tree.create_element("div");

    let mut other = ShadowTree::new();
    let mut foreign = other.document();
    for _ in 0..8 {
        foreign = other.create_element("x");
    }

    let len = tree.len();
    let result = tree.append(div, vec!["text".into(), foreign.into()]);
    assert_eq!(result, Err(DomError::TypeConversion { index: 1 }));
    assert_eq!(tree.len(), len);
    assert!(tree.child_nodes(div).is_empty());
}

#[test]
fn test_hierarchy_errors() {
    let mut tree = ShadowTree::new();
    let (host, root) = connected_host(&mut tree);
    let inner = tree.create_element("div");
    tree.append_child(root, inner).unwrap();

    assert_eq!(tree.append_child(inner, inner), Err(DomError::HierarchyRequest));
    // the host contains its shadow tree
    assert_eq!(tree.append_child(inner, host), Err(DomError::HierarchyRequest));
    assert_eq!(tree.append_child(inner, root), Err(DomError::HierarchyRequest));
    assert_eq!(tree.append_child(inner, tree.document()), Err(DomError::HierarchyRequest));

    let text = tree.create_text("t");
    let p = tree.create_element("p");
    assert_eq!(tree.append_child(text, p), Err(DomError::HierarchyRequest));
}

#[test]
fn test_shadow_attachment_errors() {
    let mut tree = ShadowTree::new();
    let (host, _root) = connected_host(&mut tree);
    assert_eq!(tree.attach_shadow(host), Err(DomError::AlreadyAttached));

    let text = tree.create_text("t");
    assert_eq!(tree.attach_shadow(text), Err(DomError::NotSupported));
}

#[test]
fn test_invalid_selectors() {
    let tree = ShadowTree::new();
    let doc = tree.document();
    for selector in ["", "div p", "div > p", "[attr", ".", "a,"] {
        assert!(
            matches!(tree.query_selector(doc, selector), Err(DomError::InvalidSelector(_))),
            "{selector:?} should be rejected"
        );
    }
}

#[test]
fn test_missing_slot_attributes_mean_default() {
    let mut tree = ShadowTree::new();
    let (host, root) = connected_host(&mut tree);
    let slot = tree.create_element("slot");
    tree.set_attribute(slot, "name", "   ").unwrap();
    tree.append_child(root, slot).unwrap();

    let a = tree.create_element("a");
    let b = tree.create_element("b");
    tree.set_slot(b, "").unwrap();
    let comment = tree.create_comment("c");
    tree.append(host, vec![a.into(), b.into(), comment.into()]).unwrap();

    assert_eq!(tree.assigned_nodes(slot, FLAT), vec![a, b, comment]);
}

#[test]
fn test_scope_without_slots_is_noop() {
    let mut tree = ShadowTree::new();
    let (host, root) = connected_host(&mut tree);
    let light = tree.create_element("p");
    tree.append_child(host, light).unwrap();
    tree.distribute(root);

    assert_eq!(tree.scope(root).unwrap().distribution_passes(), 0);
    assert_eq!(tree.assigned_slot(light), None);
    assert!(!tree.get(light).unwrap().is_undistributed());
    assert!(tree.composed_child_nodes(host).is_empty());
}

#[test]
fn test_flatten_depth_bound() {
    let config = Config { max_flatten_depth: 0, ..Default::default() };
    let mut tree = ShadowTree::with_config(config);
    let (outer, outer_root) = connected_host(&mut tree);
    let inner = tree.create_element("x-inner");
    tree.append_child(outer_root, inner).unwrap();
    let inner_root = tree.attach_shadow(inner).unwrap();
    let s1 = tree.create_element("slot");
    tree.append_child(inner_root, s1).unwrap();
    let s2 = tree.create_element("slot");
    tree.append_child(inner, s2).unwrap();
    let a = tree.create_element("a");
    tree.append_child(outer, a).unwrap();

    assert_eq!(tree.assigned_nodes(s1, FLAT), vec![s2]);
    assert_eq!(tree.assigned_nodes(s2, FLATTEN), vec![a]);
    assert!(tree.assigned_nodes(s1, FLATTEN).is_empty());
}

#[test]
fn test_slot_change_listener_can_mutate_tree() {
    let mut tree = ShadowTree::new();
    let (host, root) = connected_host(&mut tree);
    let slot = tree.create_element("slot");
    tree.append_child(root, slot).unwrap();

    let fired = Rc::new(Cell::new(0));
    let counter = fired.clone();
    let count = Listener::new(move |_, _| counter.set(counter.get() + 1));
    tree.add_event_listener(slot, "slotchange", &count, false);

    let b = tree.create_element("b");
    let grow = Listener::new(move |tree, _| {
        tree.append_child(host, b).unwrap();
    });
    let once = ListenerOptions { once: true, ..Default::default() };
    tree.add_event_listener(slot, "slotchange", &grow, once);

    let a = tree.create_element("a");
    tree.append_child(host, a).unwrap();

    assert_eq!(tree.assigned_nodes(slot, FLAT), vec![a, b]);
    assert_eq!(tree.composed_child_nodes(host), vec![a, b]);
    assert_eq!(fired.get(), 2);
}

#[test]
fn test_slot_change_reaches_enclosing_slot() {
    let mut tree = ShadowTree::new();
    let (outer, outer_root) = connected_host(&mut tree);
    let inner = tree.create_element("x-inner");
    tree.append_child(outer_root, inner).unwrap();
    let inner_root = tree.attach_shadow(inner).unwrap();
    let s1 = tree.create_element("slot");
    tree.append_child(inner_root, s1).unwrap();
    let s2 = tree.create_element("slot");
    tree.append_child(inner, s2).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    for slot in [s1, s2] {
        let log = log.clone();
        let listener = Listener::new(move |_, event| {
            log.borrow_mut().push(event.current_target());
        });
        tree.add_event_listener(slot, "slotchange", &listener, false);
    }

    let a = tree.create_element("a");
    tree.append_child(outer, a).unwrap();

    // s2 changed; its change is reported to s1 as well
    let seen = log.borrow();
    assert!(seen.contains(&Some(EventTarget::Node(s2))));
    assert!(seen.contains(&Some(EventTarget::Node(s1))));
}

#[test]
fn test_focus_runs_per_scope() {
    let mut tree = ShadowTree::new();
    let (outer, outer_root) = connected_host(&mut tree);
    let inner = tree.create_element("x-inner");
    tree.append_child(outer_root, inner).unwrap();
    let inner_root = tree.attach_shadow(inner).unwrap();
    let input = tree.create_element("input");
    tree.append_child(inner_root, input).unwrap();

    let log: Rc<RefCell<Vec<(&'static str, NodeId, Option<EventTarget>)>>> = Rc::default();
    let doc = tree.document();
    for (label, node, capture) in [
        ("capture", doc, true),
        ("bubble", doc, false),
        ("bubble", outer, false),
        ("bubble", inner, false),
        ("bubble", input, false),
    ] {
        let log = log.clone();
        let listener = Listener::new(move |_, event| {
            log.borrow_mut().push((label, node, event.target()));
        });
        tree.add_event_listener(node, "focus", &listener, capture);
    }

    let mut event = Event::new("focus", EventInit::default());
    assert!(event.composed());
    tree.dispatch_event(input.into(), &mut event);

    assert_eq!(
        *log.borrow(),
        vec![
            ("capture", doc, Some(EventTarget::Node(outer))),
            ("bubble", input, Some(EventTarget::Node(input))),
            ("bubble", inner, Some(EventTarget::Node(inner))),
            ("bubble", outer, Some(EventTarget::Node(outer))),
        ]
    );
}

#[test]
fn test_related_target_in_same_scope_stops_bubbling() {
    let mut tree = ShadowTree::new();
    let (_host, root) = connected_host(&mut tree);
    let x = tree.create_element("button");
    let y = tree.create_element("button");
    tree.append(root, vec![x.into(), y.into()]).unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    for node in [root, tree.document()] {
        let calls = calls.clone();
        let listener = Listener::new(move |_, event| {
            calls.borrow_mut().push((node, event.target(), event.related_target()));
        });
        tree.add_event_listener(node, "mouseover", &listener, false);
    }

    let init = EventInit {
        bubbles: true,
        related_target: Some(y.into()),
        ..Default::default()
    };
    tree.dispatch_event(x.into(), &mut Event::new("mouseover", init));

    assert_eq!(
        *calls.borrow(),
        vec![(root, Some(EventTarget::Node(x)), Some(EventTarget::Node(y)))]
    );
}

#[test]
fn test_global_listener_and_cancel() {
    let mut tree = ShadowTree::new();
    let div = tree.create_element("div");
    tree.append_child(tree.document(), div).unwrap();

    let cancel = Listener::new(|_, event| event.prevent_default());
    tree.add_event_listener(EventTarget::Global, "submit", &cancel, false);

    let init = EventInit { bubbles: true, cancelable: true, ..Default::default() };
    let mut event = Event::new("submit", init);
    assert!(!tree.dispatch_event(div.into(), &mut event));
    assert!(event.default_prevented());
    assert_eq!(event.target(), Some(EventTarget::Node(div)));
}

#[test]
fn test_config_from_json() {
    let config: Config = serde_json::from_str(r#"{ "undistributed_attr": "hidden-light" }"#).unwrap();
    assert_eq!(config.slot_tag, "slot");
    assert_eq!(config.max_flatten_depth, 32);
    assert_eq!(
        config.undistributed_style_rule(),
        "[hidden-light] { display: none !important; }"
    );

    let mut tree = ShadowTree::with_config(config);
    let (host, root) = connected_host(&mut tree);
    let slot = tree.create_element("slot");
    tree.set_attribute(slot, "name", "only").unwrap();
    tree.append_child(root, slot).unwrap();
    let a = tree.create_element("a");
    tree.append_child(host, a).unwrap();
    assert!(tree.has_attribute(a, "hidden-light"));
    assert!(!tree.has_attribute(a, "shady-undistributed"));
}

#[test]
fn test_custom_slot_tag() {
    let config = Config { slot_tag: "content".to_string(), ..Default::default() };
    let mut tree = ShadowTree::with_config(config);
    let (host, root) = connected_host(&mut tree);
    let content = tree.create_element("content");
    let slot = tree.create_element("slot");
    tree.append(root, vec![content.into(), slot.into()]).unwrap();
    let a = tree.create_element("a");
    tree.append_child(host, a).unwrap();

    assert!(tree.is_slot(content));
    assert!(!tree.is_slot(slot));
    assert_eq!(tree.assigned_nodes(content, FLAT), vec![a]);
    assert_eq!(tree.composed_child_nodes(host), vec![a, slot]);
}

#[derive(Debug, Default)]
struct CountingBackend {
    links: PhysicalLinks,
    inserts: Rc<Cell<usize>>,
    removals: Rc<Cell<usize>>,
}

impl PhysicalBackend for CountingBackend {
    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.links.parent(node)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.links.children(node)
    }

    fn child_at(&self, node: NodeId, index: usize) -> Option<NodeId> {
        self.links.child_at(node, index)
    }

    fn insert_before(&mut self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.inserts.set(self.inserts.get() + 1);
        self.links.insert_before(parent, node, reference);
    }

    fn remove_child(&mut self, parent: NodeId, node: NodeId) {
        self.removals.set(self.removals.get() + 1);
        self.links.remove_child(parent, node);
    }
}

#[test]
fn test_custom_backend_receives_composition() {
    let backend = CountingBackend::default();
    let inserts = backend.inserts.clone();
    let removals = backend.removals.clone();
    let mut tree = ShadowTree::with_backend(Config::default(), Box::new(backend));

    let host = tree.create_element("x-host");
    tree.append_child(tree.document(), host).unwrap();
    let light = tree.create_element("p");
    tree.append_child(host, light).unwrap();
    assert_eq!(inserts.get(), 2);
    assert_eq!(tree.physical().parent(light), Some(host));

    let root = tree.attach_shadow(host).unwrap();
    assert_eq!(removals.get(), 1);
    assert_eq!(tree.physical().parent(light), None);
    assert_eq!(tree.child_nodes(host), vec![light]);

    let slot = tree.create_element("slot");
    tree.append_child(root, slot).unwrap();
    assert_eq!(tree.physical().parent(light), Some(host));
    assert_eq!(tree.physical().child_at(host, 0), Some(light));
}

#[test]
fn test_observer_sees_light_children() {
    let mut tree = ShadowTree::new();
    let (host, root) = connected_host(&mut tree);
    let slot = tree.create_element("slot");
    tree.append_child(root, slot).unwrap();

    let records = Rc::new(RefCell::new(Vec::new()));
    let sink = records.clone();
    tree.observe_children(host, move |batch| sink.borrow_mut().extend_from_slice(batch));

    let a = tree.create_element("a");
    let b = tree.create_element("b");
    tree.append(host, vec![a.into(), b.into()]).unwrap();
    tree.remove_child(host, a).unwrap();
    assert_eq!(tree.flush_observers(), 1);

    let records = records.borrow();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].added_nodes, vec![a, b]);
    assert_eq!(records[0].removed_nodes, vec![a]);

    // `a` is detached by now, so only `b` stays in the document's scope
    let filtered = tree.filter_mutations(&records, tree.document());
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].added_nodes, vec![b]);
    assert_eq!(filtered[0].removed_nodes, vec![a]);
    assert!(tree.filter_mutations(&records, slot).is_empty());
}

#[test]
fn test_listener_moving_node_during_move() {
    let mut tree = ShadowTree::new();
    let (host, root) = connected_host(&mut tree);
    let slot = tree.create_element("slot");
    tree.append_child(root, slot).unwrap();
    let a = tree.create_element("a");
    tree.append_child(host, a).unwrap();

    let target = tree.create_element("div");
    let elsewhere = tree.create_element("div");
    tree.append(tree.document(), vec![target.into(), elsewhere.into()]).unwrap();

    let steal = Listener::new(move |tree, _| {
        tree.append_child(elsewhere, a).unwrap();
    });
    let once = ListenerOptions { once: true, ..Default::default() };
    tree.add_event_listener(slot, "slotchange", &steal, once);

    // the listener runs once `a` sits under `target`
    tree.append_child(target, a).unwrap();

    assert_eq!(tree.parent_node(a), Some(elsewhere));
    assert_eq!(tree.child_nodes(elsewhere), vec![a]);
    assert!(tree.child_nodes(target).is_empty());
    assert_eq!(tree.physical().parent(a), Some(elsewhere));
    assert!(tree.physical().children(target).is_empty());
    assert!(tree.assigned_nodes(slot, FLAT).is_empty());
}

#[test]
fn test_node_list_validated_before_moving() {
    let mut tree = ShadowTree::new();
    let (_host, root) = connected_host(&mut tree);
    let p = tree.create_element("p");
    let a = tree.create_element("a");
    let div = tree.create_element("div");
    tree.append(p, vec![a.into(), div.into()]).unwrap();
    let doc = tree.document();
    let len = tree.len();

    for bad in [doc, root, p] {
        assert_eq!(
            tree.append(div, vec![a.into(), "t".into(), bad.into()]),
            Err(DomError::HierarchyRequest)
        );
    }
    assert_eq!(tree.before(div, vec![a.into(), p.into()]), Err(DomError::HierarchyRequest));
    assert_eq!(tree.convert_nodes_into_a_node(vec![a.into(), doc.into()]), Err(DomError::HierarchyRequest));

    let text = tree.create_text("t");
    assert_eq!(tree.append(text, vec![a.into()]), Err(DomError::HierarchyRequest));

    assert_eq!(tree.child_nodes(p), vec![a, div]);
    assert!(tree.child_nodes(div).is_empty());
    assert_eq!(tree.len(), len + 1);
}
