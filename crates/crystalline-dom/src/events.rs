//! DOM Events
//!
//! Event objects, listener storage and the bubbling dispatch path.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::NodeId;

/// Listener callback
pub type EventCallback = Rc<dyn Fn(&Event)>;

/// Listener handle returned by `add_event_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// DOM event
#[derive(Debug)]
pub struct Event {
    event_type: String,
    target: NodeId,
    current_target: Cell<NodeId>,
    bubbles: bool,
    default_prevented: Cell<bool>,
    propagation_stopped: Cell<bool>,
}

impl Event {
    /// Create an event; bubbling follows the event type
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: Cell::new(target),
            bubbles: bubbles(event_type),
            default_prevented: Cell::new(false),
            propagation_stopped: Cell::new(false),
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Node the event was dispatched at
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Node whose listener is currently running
    pub fn current_target(&self) -> NodeId {
        self.current_target.get()
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Prevent default action
    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    /// Check if default was prevented
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Stop propagation
    pub fn stop_propagation(&self) {
        self.propagation_stopped.set(true);
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped.get()
    }

    pub(crate) fn set_current_target(&self, node: NodeId) {
        self.current_target.set(node);
    }
}

/// Check if an event type bubbles
fn bubbles(event_type: &str) -> bool {
    !matches!(
        event_type,
        "focus" | "blur" | "load" | "unload" | "mouseenter" | "mouseleave" | "scroll"
    )
}

struct Listener {
    id: ListenerId,
    event_type: String,
    callback: EventCallback,
}

/// Listeners by target node
#[derive(Default)]
pub(crate) struct ListenerStore {
    by_node: HashMap<NodeId, Vec<Listener>>,
    owners: HashMap<ListenerId, NodeId>,
    next_id: u64,
}

impl ListenerStore {
    pub fn add(&mut self, node: NodeId, event_type: &str, callback: EventCallback) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.by_node.entry(node).or_default().push(Listener {
            id,
            event_type: event_type.to_string(),
            callback,
        });
        self.owners.insert(id, node);
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let Some(node) = self.owners.remove(&id) else {
            return false;
        };
        if let Some(listeners) = self.by_node.get_mut(&node) {
            listeners.retain(|l| l.id != id);
            if listeners.is_empty() {
                self.by_node.remove(&node);
            }
        }
        true
    }

    /// Callbacks for node and event type, in registration order
    pub fn get(&self, node: NodeId, event_type: &str) -> Vec<EventCallback> {
        self.by_node
            .get(&node)
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|l| l.event_type == event_type)
                    .map(|l| Rc::clone(&l.callback))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self, node: NodeId) -> usize {
        self.by_node.get(&node).map(Vec::len).unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.owners.len()
    }
}

impl fmt::Debug for ListenerStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerStore")
            .field("listeners", &self.owners.len())
            .field("nodes", &self.by_node.len())
            .finish()
    }
}
