//! Child-list Observers
//!
//! Each observed node collects added and removed children until the next
//! [`ShadowTree::flush_observers`] call, which plays the role of a
//! microtask checkpoint. At most one flush is pending per observer.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::NodeId;
use crate::mutation::GetRootNodeOptions;
use crate::tree::ShadowTree;

/// Coalesced child-list change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

type ObserverCallback = Rc<RefCell<dyn FnMut(&[MutationRecord])>>;

/// Returned by [`ShadowTree::observe_children`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverHandle {
    node: NodeId,
    id: u64,
}

impl ObserverHandle {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

/// Pending changes and callbacks of one observed node
#[derive(Default)]
pub(crate) struct ChildObserver {
    scheduled: bool,
    added: Vec<NodeId>,
    removed: Vec<NodeId>,
    callbacks: Vec<(u64, ObserverCallback)>,
    next_id: u64,
}

impl ChildObserver {
    /// Record a change. Returns true when this is the first change since
    /// the last flush, i.e. when a flush has to be scheduled.
    fn schedule(&mut self, added: Option<NodeId>, removed: Option<NodeId>) -> bool {
        self.added.extend(added);
        self.removed.extend(removed);
        !std::mem::replace(&mut self.scheduled, true)
    }

    fn take_records(&mut self, target: NodeId) -> Vec<MutationRecord> {
        if self.added.is_empty() && self.removed.is_empty() {
            return Vec::new();
        }
        vec![MutationRecord {
            target,
            added_nodes: std::mem::take(&mut self.added),
            removed_nodes: std::mem::take(&mut self.removed),
        }]
    }
}

impl fmt::Debug for ChildObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChildObserver")
            .field("scheduled", &self.scheduled)
            .field("added", &self.added)
            .field("removed", &self.removed)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

impl ShadowTree {
    /// Watch the logical children of `node`
    pub fn observe_children(
        &mut self,
        node: NodeId,
        callback: impl FnMut(&[MutationRecord]) + 'static,
    ) -> ObserverHandle {
        let callback: ObserverCallback = Rc::new(RefCell::new(callback));
        let observer = self.observers.entry(node).or_default();
        observer.next_id += 1;
        let id = observer.next_id;
        observer.callbacks.push((id, callback));
        ObserverHandle { node, id }
    }

    /// Drop a callback; the observer goes away with its last callback.
    pub fn unobserve_children(&mut self, handle: ObserverHandle) {
        let Some(observer) = self.observers.get_mut(&handle.node) else {
            return;
        };
        observer.callbacks.retain(|(id, _)| *id != handle.id);
        if observer.callbacks.is_empty() {
            self.observers.remove(&handle.node);
            self.pending_flushes.retain(|&n| n != handle.node);
        }
    }

    /// Take pending records; the next flush then has nothing to deliver.
    pub fn take_records(&mut self, handle: &ObserverHandle) -> Vec<MutationRecord> {
        self.observers
            .get_mut(&handle.node)
            .map(|observer| observer.take_records(handle.node))
            .unwrap_or_default()
    }

    pub(crate) fn schedule_observer(&mut self, node: NodeId, added: Option<NodeId>, removed: Option<NodeId>) {
        if let Some(observer) = self.observers.get_mut(&node) {
            if observer.schedule(added, removed) {
                self.pending_flushes.push(node);
            }
        }
    }

    /// Deliver every scheduled observer's records. Returns the number of
    /// callbacks invoked.
    pub fn flush_observers(&mut self) -> usize {
        let mut delivered = 0;
        for node in std::mem::take(&mut self.pending_flushes) {
            let Some(observer) = self.observers.get_mut(&node) else {
                continue;
            };
            observer.scheduled = false;
            let records = observer.take_records(node);
            if records.is_empty() {
                continue;
            }
            let callbacks: Vec<ObserverCallback> =
                observer.callbacks.iter().map(|(_, cb)| cb.clone()).collect();
            for callback in callbacks {
                match callback.try_borrow_mut() {
                    Ok(mut callback) => {
                        (&mut *callback)(&records);
                        delivered += 1;
                    }
                    Err(_) => tracing::warn!(?node, "observer callback re-entered, skipping"),
                }
            }
        }
        delivered
    }

    /// Keep the records, and added nodes, that belong to `target`'s scope.
    pub fn filter_mutations(&self, records: &[MutationRecord], target: NodeId) -> Vec<MutationRecord> {
        let options = GetRootNodeOptions::default();
        let scope = self.get_root_node(target, options);
        records
            .iter()
            .filter(|record| self.get_root_node(record.target, options) == scope)
            .map(|record| MutationRecord {
                target: record.target,
                added_nodes: record
                    .added_nodes
                    .iter()
                    .copied()
                    .filter(|&n| self.get_root_node(n, options) == scope)
                    .collect(),
                removed_nodes: record.removed_nodes.clone(),
            })
            .filter(|record| !record.added_nodes.is_empty() || !record.removed_nodes.is_empty())
            .collect()
    }
}
