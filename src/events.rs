use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::runtime::Runtime;
use crate::scene::NodeId;

/// Listener callback. Removal is by `Rc` identity, so hold on to the clone
/// you registered if you intend to remove it later.
pub type ListenerCallback = Rc<dyn Fn(&mut Runtime, &Event) -> Result<()>>;

/// Convenience wrapper so call sites read
/// `rt.add_event_listener(node, "click", listener(|rt, ev| ...))`.
pub fn listener(f: impl Fn(&mut Runtime, &Event) -> Result<()> + 'static) -> ListenerCallback {
    Rc::new(f)
}

/// Synthetic event delivered to listeners. Dispatch targets exactly one node;
/// there is no capture or bubble phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub time_stamp_ms: i64,
    /// Number of listeners the dispatch actually invoked.
    pub listeners_invoked: usize,
}

impl Event {
    pub(crate) fn new(event_type: &str, target: NodeId, time_stamp_ms: i64) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            time_stamp_ms,
            listeners_invoked: 0,
        }
    }
}

#[derive(Default, Clone)]
pub(crate) struct ListenerStore {
    pub(crate) map: HashMap<NodeId, HashMap<String, Vec<ListenerCallback>>>,
}

impl ListenerStore {
    pub(crate) fn add(&mut self, node: NodeId, event_type: String, callback: ListenerCallback) {
        self.map
            .entry(node)
            .or_default()
            .entry(event_type)
            .or_default()
            .push(callback);
    }

    pub(crate) fn remove(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: &ListenerCallback,
    ) -> bool {
        let Some(events) = self.map.get_mut(&node) else {
            return false;
        };
        let Some(listeners) = events.get_mut(event_type) else {
            return false;
        };
        let Some(pos) = listeners
            .iter()
            .position(|existing| Rc::ptr_eq(existing, callback))
        else {
            return false;
        };
        listeners.remove(pos);
        if listeners.is_empty() {
            events.remove(event_type);
        }
        if events.is_empty() {
            self.map.remove(&node);
        }
        true
    }

    /// Snapshot of the exact `(node, type)` listener list, in registration
    /// order. Dispatch iterates the snapshot, so mid-dispatch add/remove
    /// cannot affect the current delivery.
    pub(crate) fn snapshot(&self, node: NodeId, event_type: &str) -> Vec<ListenerCallback> {
        self.map
            .get(&node)
            .and_then(|events| events.get(event_type))
            .cloned()
            .unwrap_or_default()
    }
}

impl fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries = self
            .map
            .iter()
            .flat_map(|(node, events)| {
                events
                    .iter()
                    .map(move |(event_type, listeners)| (*node, event_type, listeners.len()))
            })
            .collect::<Vec<_>>();
        entries.sort_by_key(|(node, event_type, _)| (node.0, (*event_type).clone()));
        f.debug_map()
            .entries(
                entries
                    .iter()
                    .map(|(node, event_type, count)| (format!("{node}/{event_type}"), count)),
            )
            .finish()
    }
}

impl Runtime {
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: ListenerCallback,
    ) -> Result<()> {
        self.scene.ensure_node(node)?;
        self.listeners.add(node, event_type.to_string(), callback);
        self.trace_event_line(format!("[event] add_listener {node} type={event_type}"));
        Ok(())
    }

    /// Removes a previously registered listener by callback identity.
    /// Returns `false` when the callback was not registered for that
    /// `(node, type)` pair. Unlike [`Runtime::add_event_listener`], an
    /// unknown node is not an error here: nothing can be registered on one,
    /// so removal is a plain miss, the same policy as cancelling an unknown
    /// timer handle.
    pub fn remove_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: &ListenerCallback,
    ) -> bool {
        let removed = self.listeners.remove(node, event_type, callback);
        self.trace_event_line(format!(
            "[event] remove_listener {node} type={event_type} removed={removed}"
        ));
        removed
    }

    /// Invokes all listeners registered for exactly `(node, event_type)`,
    /// synchronously, in registration order, against a snapshot taken here.
    /// A listener error propagates to the caller (and becomes a
    /// `CallbackFailure` at the turn boundary when dispatch happened inside a
    /// scheduled callback).
    pub fn dispatch_event(&mut self, node: NodeId, event_type: &str) -> Result<Event> {
        self.scene.ensure_node(node)?;
        let mut event = Event::new(event_type, node, self.scheduler.now_ms);
        let snapshot = self.listeners.snapshot(node, event_type);
        self.trace_event_line(format!(
            "[event] dispatch {node} type={event_type} listeners={}",
            snapshot.len()
        ));
        for callback in snapshot {
            callback(self, &event)?;
            event.listeners_invoked += 1;
        }
        Ok(event)
    }
}
