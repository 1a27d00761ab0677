//! Event Listeners
//!
//! Registration keyed by (target, type, listener, capture, once, passive)
//! with duplicate suppression, and listener invocation for one path entry.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::events::{Event, EventPhase, EventTarget};
use crate::tree::ShadowTree;

/// Listener options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ListenerOptions {
    pub capture: bool,
    pub once: bool,
    pub passive: bool,
}

impl From<bool> for ListenerOptions {
    /// Capture flag only
    fn from(capture: bool) -> Self {
        Self {
            capture,
            ..Default::default()
        }
    }
}

type Callback = dyn FnMut(&mut ShadowTree, &mut Event);

/// Shared event callback.
///
/// Clones compare equal, so a clone kept by the caller is what removes
/// the registration later.
#[derive(Clone)]
pub struct Listener(Rc<RefCell<Callback>>);

impl Listener {
    pub fn new(callback: impl FnMut(&mut ShadowTree, &mut Event) + 'static) -> Self {
        Self(Rc::new(RefCell::new(callback)))
    }

    fn call(&self, tree: &mut ShadowTree, event: &mut Event) {
        match self.0.try_borrow_mut() {
            Ok(mut callback) => (&mut *callback)(tree, event),
            Err(_) => tracing::warn!(event = %event.event_type(), "listener re-entered, skipping"),
        }
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Listener").field(&Rc::as_ptr(&self.0)).finish()
    }
}

#[derive(Debug, Clone)]
struct Registration {
    id: u64,
    listener: Listener,
    options: ListenerOptions,
}

/// All listeners of a tree
#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    entries: HashMap<(EventTarget, String), Vec<Registration>>,
    next_id: u64,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Returns false if the same registration already exists.
    fn add(&mut self, target: EventTarget, event_type: &str, listener: &Listener, options: ListenerOptions) -> bool {
        let list = self
            .entries
            .entry((target, event_type.to_string()))
            .or_default();
        if list
            .iter()
            .any(|r| r.listener == *listener && r.options == options)
        {
            return false;
        }
        self.next_id += 1;
        list.push(Registration {
            id: self.next_id,
            listener: listener.clone(),
            options,
        });
        true
    }

    fn remove(&mut self, target: EventTarget, event_type: &str, listener: &Listener, options: ListenerOptions) -> bool {
        let key = (target, event_type.to_string());
        let Some(list) = self.entries.get_mut(&key) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| !(r.listener == *listener && r.options == options));
        let removed = list.len() < before;
        if list.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }

    fn remove_id(&mut self, target: EventTarget, event_type: &str, id: u64) {
        let key = (target, event_type.to_string());
        if let Some(list) = self.entries.get_mut(&key) {
            list.retain(|r| r.id != id);
            if list.is_empty() {
                self.entries.remove(&key);
            }
        }
    }

    fn contains_id(&self, target: EventTarget, event_type: &str, id: u64) -> bool {
        self.entries
            .get(&(target, event_type.to_string()))
            .is_some_and(|list| list.iter().any(|r| r.id == id))
    }

    fn matching(&self, target: EventTarget, event_type: &str, capture: bool) -> Vec<Registration> {
        self.entries
            .get(&(target, event_type.to_string()))
            .map(|list| {
                list.iter()
                    .filter(|r| r.options.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ShadowTree {
    /// Register a listener. Registering the same listener with the same
    /// options twice is a no-op; returns whether it was added.
    pub fn add_event_listener(
        &mut self,
        target: impl Into<EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: impl Into<ListenerOptions>,
    ) -> bool {
        self.listeners
            .add(target.into(), event_type, listener, options.into())
    }

    /// Remove a listener registered with exactly these options
    pub fn remove_event_listener(
        &mut self,
        target: impl Into<EventTarget>,
        event_type: &str,
        listener: &Listener,
        options: impl Into<ListenerOptions>,
    ) -> bool {
        self.listeners
            .remove(target.into(), event_type, listener, options.into())
    }

    /// Run the listeners of one path entry for one pass.
    pub(crate) fn invoke_listeners(&mut self, current: EventTarget, event: &mut Event, capture: bool) {
        let event_type = event.event_type().to_string();
        for registration in self.listeners.matching(current, &event_type, capture) {
            // removed by an earlier listener of this entry
            if !self.listeners.contains_id(current, &event_type, registration.id) {
                continue;
            }
            if registration.options.once {
                self.listeners.remove_id(current, &event_type, registration.id);
            }
            if event.phase == EventPhase::Bubbling && event.target == event.related_target {
                event.stop_immediate_propagation();
                return;
            }
            event.in_passive_listener = registration.options.passive;
            registration.listener.call(self, event);
            event.in_passive_listener = false;
            if event.immediate_propagation_stopped {
                return;
            }
        }
    }
}
