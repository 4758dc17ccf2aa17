//! DOM Tree (arena-based allocation)
//!
//! Every structural or attribute change goes through `DomTree` so the
//! registered mutation observers see it.

use crate::events::{EventCallback, ListenerStore};
use crate::observer::{MutationObserverInit, MutationRecord, ObserverId, ObserverSet};
use crate::{DomError, DomResult, Event, ListenerId, Node, NodeData, NodeId};

/// Arena-based DOM tree
#[derive(Debug)]
pub struct DomTree {
    nodes: Vec<Node>,
    observers: ObserverSet,
    listeners: ListenerStore,
}

impl DomTree {
    /// Create a new tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
            observers: ObserverSet::default(),
            listeners: ListenerStore::default(),
        }
    }

    /// Document root
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    fn node(&self, id: NodeId) -> DomResult<&Node> {
        self.get(id).ok_or(DomError::NotFound(id))
    }

    /// Number of nodes in the tree (detached nodes included)
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(Node::element(tag_name))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(Node::text(content))
    }

    /// Create a detached comment node
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(Node::comment(content))
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Append a child node, moving it if it already has a parent
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (append when `None`)
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: Option<NodeId>,
    ) -> DomResult<NodeId> {
        if !self.node(parent)?.can_have_children() {
            return Err(DomError::HierarchyRequest);
        }
        if matches!(self.node(child)?.data, NodeData::Document) || self.contains(child, parent) {
            return Err(DomError::HierarchyRequest);
        }
        if let Some(reference) = reference {
            if self.node(reference)?.parent != Some(parent) {
                return Err(DomError::NotAChild);
            }
        }

        if let Some(old_parent) = self.nodes[child.index()].parent {
            self.remove_child(old_parent, child)?;
        }

        let children = &self.nodes[parent.index()].children;
        let index = reference
            .and_then(|r| children.iter().position(|&c| c == r))
            .unwrap_or(children.len());
        let previous_sibling = index.checked_sub(1).map(|i| children[i]);
        let next_sibling = children.get(index).copied();

        self.nodes[parent.index()].children.insert(index, child);
        self.nodes[child.index()].parent = Some(parent);

        tracing::trace!("Inserted {:?} into {:?}", child, parent);
        self.notify(MutationRecord::child_list(
            parent,
            vec![child],
            Vec::new(),
            previous_sibling,
            next_sibling,
        ));
        Ok(child)
    }

    /// Remove a child node; it stays in the arena with its own subtree
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> DomResult<NodeId> {
        if self.node(child)?.parent != Some(parent) {
            return Err(DomError::NotAChild);
        }

        let children = &mut self.nodes[parent.index()].children;
        let index = children
            .iter()
            .position(|&c| c == child)
            .ok_or(DomError::NotAChild)?;
        children.remove(index);
        let previous_sibling = index.checked_sub(1).map(|i| children[i]);
        let next_sibling = children.get(index).copied();
        self.nodes[child.index()].parent = None;

        tracing::trace!("Removed {:?} from {:?}", child, parent);
        self.notify(MutationRecord::child_list(
            parent,
            Vec::new(),
            vec![child],
            previous_sibling,
            next_sibling,
        ));
        Ok(child)
    }

    /// Detach a node from its parent, if it has one
    pub fn detach(&mut self, node: NodeId) -> DomResult<()> {
        if let Some(parent) = self.node(node)?.parent {
            self.remove_child(parent, node)?;
        }
        Ok(())
    }

    /// Parent of a node
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.get(node)?.parent
    }

    /// Children of a node, in document order
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.get(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// All descendants of `root` in document order (root excluded)
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(root).iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().rev().copied());
        }
        out
    }

    /// Element descendants of `root` in document order
    pub fn descendant_elements(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|&id| self.is_element(id))
            .collect()
    }

    /// Inclusive containment: a node contains itself
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        contains_in(&self.nodes, ancestor, node)
    }

    /// Whether the node is reachable from the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.contains(NodeId::ROOT, node)
    }

    // ------------------------------------------------------------------
    // Elements and attributes
    // ------------------------------------------------------------------

    pub fn is_element(&self, node: NodeId) -> bool {
        self.get(node).is_some_and(Node::is_element)
    }

    /// Lowercase tag name of an element
    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.get(node)?.as_element().map(|e| e.tag_name.as_str())
    }

    pub fn get_attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get(node)?.as_element()?.get_attr(name)
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Set an attribute, notifying observers
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) -> DomResult<()> {
        let element = self
            .get_mut(node)
            .ok_or(DomError::NotFound(node))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        let old_value = element.set_attr(name, value);
        let name = name.to_ascii_lowercase();
        self.notify(MutationRecord::attributes(node, &name, old_value));
        Ok(())
    }

    /// Remove an attribute; returns whether it existed
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> DomResult<bool> {
        let element = self
            .get_mut(node)
            .ok_or(DomError::NotFound(node))?
            .as_element_mut()
            .ok_or(DomError::InvalidNodeType)?;
        match element.remove_attr(name) {
            Some(old_value) => {
                let name = name.to_ascii_lowercase();
                self.notify(MutationRecord::attributes(node, &name, Some(old_value)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Replace the content of a text or comment node
    pub fn set_text(&mut self, node: NodeId, content: &str) -> DomResult<()> {
        let old_value = match &mut self.get_mut(node).ok_or(DomError::NotFound(node))?.data {
            NodeData::Text(text) | NodeData::Comment(text) => {
                std::mem::replace(text, content.to_string())
            }
            _ => return Err(DomError::InvalidNodeType),
        };
        self.notify(MutationRecord::character_data(node, Some(old_value)));
        Ok(())
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        if let Some(text) = self.get(node).and_then(Node::as_text) {
            out.push_str(text);
        }
        for id in self.descendants(node) {
            if let Some(text) = self.get(id).and_then(Node::as_text) {
                out.push_str(text);
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Mutation observers
    // ------------------------------------------------------------------

    /// Start observing `target`
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        let id = self.observers.observe(target, options);
        tracing::debug!("Observer {:?} attached to {:?}", id, target);
        id
    }

    /// Stop an observer; pending records are dropped
    pub fn disconnect_observer(&mut self, id: ObserverId) -> bool {
        tracing::debug!("Observer {:?} disconnected", id);
        self.observers.disconnect(id)
    }

    /// Take the records queued for an observer
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(id)
    }

    pub fn has_pending_records(&self, id: ObserverId) -> bool {
        self.observers.has_pending(id)
    }

    fn notify(&mut self, record: MutationRecord) {
        if self.observers.is_empty() {
            return;
        }
        let nodes = &self.nodes;
        self.observers
            .notify(record, |ancestor, node| contains_in(nodes, ancestor, node));
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Register a listener on a node
    pub fn add_event_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        callback: EventCallback,
    ) -> ListenerId {
        self.listeners.add(node, event_type, callback)
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove_event_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    /// Number of listeners on a node
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.listeners.count(node)
    }

    /// Number of listeners in the whole tree
    pub fn total_listeners(&self) -> usize {
        self.listeners.total()
    }

    /// Dispatch an event at `target`, bubbling towards the root
    pub fn dispatch_event(&self, target: NodeId, event_type: &str) -> Event {
        let event = Event::new(event_type, target);
        let mut current = Some(target);

        while let Some(node) = current {
            event.set_current_target(node);
            for callback in self.listeners.get(node, event_type) {
                callback(&event);
            }
            if event.is_propagation_stopped() || !event.bubbles() {
                break;
            }
            current = self.parent(node);
        }

        tracing::trace!("Dispatched {} at {:?}", event_type, target);
        event
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_in(nodes: &[Node], ancestor: NodeId, node: NodeId) -> bool {
    let mut cursor = Some(node);
    while let Some(current) = cursor {
        if current == ancestor {
            return true;
        }
        cursor = nodes.get(current.index()).and_then(|n| n.parent);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_append_and_contains() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        let span = tree.create_element("span");
        tree.append_child(tree.root(), div).unwrap();
        tree.append_child(div, span).unwrap();

        assert!(tree.contains(div, span));
        assert!(tree.contains(span, span));
        assert!(!tree.contains(span, div));
        assert!(tree.is_connected(span));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        tree.append_child(a, b).unwrap();

        assert_eq!(tree.append_child(b, a), Err(DomError::HierarchyRequest));
        assert_eq!(tree.append_child(a, a), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_text_cannot_have_children() {
        let mut tree = DomTree::new();
        let text = tree.create_text("hi");
        let div = tree.create_element("div");
        assert_eq!(tree.append_child(text, div), Err(DomError::HierarchyRequest));
    }

    #[test]
    fn test_descendants_document_order() {
        let mut tree = DomTree::new();
        let a = tree.create_element("a");
        let b = tree.create_element("b");
        let c = tree.create_element("c");
        let d = tree.create_element("d");
        tree.append_child(tree.root(), a).unwrap();
        tree.append_child(a, b).unwrap();
        tree.append_child(b, c).unwrap();
        tree.append_child(a, d).unwrap();

        assert_eq!(tree.descendants(tree.root()), vec![a, b, c, d]);
        assert_eq!(tree.descendants(a), vec![b, c, d]);
    }

    #[test]
    fn test_insert_before() {
        let mut tree = DomTree::new();
        let list = tree.create_element("ul");
        let first = tree.create_element("li");
        let second = tree.create_element("li");
        tree.append_child(list, second).unwrap();
        tree.insert_before(list, first, Some(second)).unwrap();

        assert_eq!(tree.children(list), &[first, second]);
    }

    #[test]
    fn test_move_records_remove_then_add() {
        let mut tree = DomTree::new();
        let a = tree.create_element("div");
        let b = tree.create_element("div");
        let item = tree.create_element("span");
        tree.append_child(tree.root(), a).unwrap();
        tree.append_child(tree.root(), b).unwrap();
        tree.append_child(a, item).unwrap();

        let observer = tree.observe(tree.root(), MutationObserverInit::subtree());
        tree.append_child(b, item).unwrap();

        let records = tree.take_records(observer);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].removed_nodes, vec![item]);
        assert_eq!(records[0].target, a);
        assert_eq!(records[1].added_nodes, vec![item]);
        assert_eq!(records[1].target, b);
    }

    #[test]
    fn test_detached_subtree_not_observed() {
        let mut tree = DomTree::new();
        let host = tree.create_element("div");
        tree.append_child(tree.root(), host).unwrap();
        let observer = tree.observe(host, MutationObserverInit::subtree());

        let loose = tree.create_element("p");
        let child = tree.create_element("b");
        tree.append_child(loose, child).unwrap();
        tree.set_attribute(child, "class", "x").unwrap();
        assert!(!tree.has_pending_records(observer));

        tree.append_child(host, loose).unwrap();
        assert_eq!(tree.take_records(observer).len(), 1);
    }

    #[test]
    fn test_attribute_records() {
        let mut tree = DomTree::new();
        let div = tree.create_element("div");
        tree.append_child(tree.root(), div).unwrap();
        let observer = tree.observe(div, MutationObserverInit {
            attributes: true,
            attribute_old_value: true,
            ..Default::default()
        });

        tree.set_attribute(div, "Data-X", "1").unwrap();
        tree.set_attribute(div, "data-x", "2").unwrap();
        assert!(!tree.remove_attribute(div, "missing").unwrap());
        assert!(tree.remove_attribute(div, "data-x").unwrap());

        let records = tree.take_records(observer);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].attribute_name.as_deref(), Some("data-x"));
        assert_eq!(records[1].old_value.as_deref(), Some("1"));
        assert_eq!(records[2].old_value.as_deref(), Some("2"));
    }

    #[test]
    fn test_dispatch_bubbles() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("span");
        tree.append_child(tree.root(), outer).unwrap();
        tree.append_child(outer, inner).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        tree.add_event_listener(outer, "click", Rc::new(move |event: &Event| {
            log.borrow_mut().push((event.target(), event.current_target()));
        }));

        tree.dispatch_event(inner, "click");
        assert_eq!(*seen.borrow(), vec![(inner, outer)]);
    }

    #[test]
    fn test_dispatch_stop_propagation() {
        let mut tree = DomTree::new();
        let outer = tree.create_element("div");
        let inner = tree.create_element("span");
        tree.append_child(outer, inner).unwrap();

        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        tree.add_event_listener(outer, "click", Rc::new(move |_: &Event| {
            *counter.borrow_mut() += 1;
        }));
        tree.add_event_listener(inner, "click", Rc::new(|event: &Event| event.stop_propagation()));

        let event = tree.dispatch_event(inner, "click");
        assert!(event.is_propagation_stopped());
        assert_eq!(*hits.borrow(), 0);
    }

    #[test]
    fn test_text_content() {
        let mut tree = DomTree::new();
        let p = tree.create_element("p");
        let hello = tree.create_text("Hello, ");
        let b = tree.create_element("b");
        let world = tree.create_text("World");
        tree.append_child(p, hello).unwrap();
        tree.append_child(p, b).unwrap();
        tree.append_child(b, world).unwrap();

        assert_eq!(tree.text_content(p), "Hello, World");
        tree.set_text(world, "Rust").unwrap();
        assert_eq!(tree.text_content(p), "Hello, Rust");
    }
}
