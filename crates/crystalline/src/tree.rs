//! Element tree capability
//!
//! The reconciler and the scoped queries only talk to the document through
//! these traits. `DomTree` implements them; another host can too.

use std::fmt::Debug;

use crystalline_dom::{
    DomTree, EventCallback, ListenerId, MutationObserverInit, MutationRecord, MutationType,
    NodeId, ObserverId, SelectorError,
};

/// Read access to elements plus listener attachment
pub trait ElementTree {
    type Node: Copy + Eq + Debug;
    type Listener: Copy + Eq + Debug;

    /// Lowercase tag name, `None` for non-element nodes
    fn tag_name(&self, node: Self::Node) -> Option<&str>;

    fn attribute(&self, node: Self::Node, name: &str) -> Option<&str>;

    /// Inclusive containment
    fn contains(&self, ancestor: Self::Node, node: Self::Node) -> bool;

    /// Element descendants of `root` in document order
    fn descendant_elements(&self, root: Self::Node) -> Vec<Self::Node>;

    /// Descendants of `root` matching `selector`, in document order
    fn select_all(&self, root: Self::Node, selector: &str) -> Result<Vec<Self::Node>, SelectorError>;

    fn listen(&mut self, node: Self::Node, event: &str, callback: EventCallback) -> Self::Listener;

    /// Detach a listener; returns whether it was attached
    fn unlisten(&mut self, listener: Self::Listener) -> bool;

    fn is_element(&self, node: Self::Node) -> bool {
        self.tag_name(node).is_some()
    }
}

/// A tree that can report its own mutations
pub trait MutationSource: ElementTree {
    type Subscription: Copy + Eq + Debug;

    /// Subscribe to attribute and child-list changes in the subtree of `root`
    fn subscribe(&mut self, root: Self::Node) -> Self::Subscription;

    /// Drain the changes recorded since the last call
    fn take_changes(&mut self, subscription: Self::Subscription) -> Vec<ChangeRecord<Self::Node>>;

    fn unsubscribe(&mut self, subscription: Self::Subscription);
}

/// One change record as seen by the reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord<N> {
    ChildList {
        target: N,
        added: Vec<N>,
        removed: Vec<N>,
    },
    Attributes {
        target: N,
        name: Option<String>,
    },
}

impl<N: Copy> ChangeRecord<N> {
    /// Attribute record with no attribute name, as used for bootstrapping
    pub fn touch(target: N) -> Self {
        Self::Attributes { target, name: None }
    }

    pub fn added(target: N, nodes: Vec<N>) -> Self {
        Self::ChildList {
            target,
            added: nodes,
            removed: Vec::new(),
        }
    }

    pub fn removed(target: N, nodes: Vec<N>) -> Self {
        Self::ChildList {
            target,
            added: Vec::new(),
            removed: nodes,
        }
    }

    pub fn target(&self) -> N {
        match self {
            Self::ChildList { target, .. } | Self::Attributes { target, .. } => *target,
        }
    }
}

impl ChangeRecord<NodeId> {
    /// Convert a DOM mutation record; character data changes are dropped
    pub fn from_mutation(record: MutationRecord) -> Option<Self> {
        match record.mutation_type {
            MutationType::ChildList => Some(Self::ChildList {
                target: record.target,
                added: record.added_nodes,
                removed: record.removed_nodes,
            }),
            MutationType::Attributes => Some(Self::Attributes {
                target: record.target,
                name: record.attribute_name,
            }),
            MutationType::CharacterData => None,
        }
    }
}

impl ElementTree for DomTree {
    type Node = NodeId;
    type Listener = ListenerId;

    fn tag_name(&self, node: NodeId) -> Option<&str> {
        DomTree::tag_name(self, node)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.get_attribute(node, name)
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        DomTree::contains(self, ancestor, node)
    }

    fn descendant_elements(&self, root: NodeId) -> Vec<NodeId> {
        DomTree::descendant_elements(self, root)
    }

    fn select_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        self.query_selector_all(root, selector)
    }

    fn listen(&mut self, node: NodeId, event: &str, callback: EventCallback) -> ListenerId {
        self.add_event_listener(node, event, callback)
    }

    fn unlisten(&mut self, listener: ListenerId) -> bool {
        self.remove_event_listener(listener)
    }
}

impl MutationSource for DomTree {
    type Subscription = ObserverId;

    fn subscribe(&mut self, root: NodeId) -> ObserverId {
        self.observe(root, MutationObserverInit::subtree())
    }

    fn take_changes(&mut self, subscription: ObserverId) -> Vec<ChangeRecord<NodeId>> {
        self.take_records(subscription)
            .into_iter()
            .filter_map(ChangeRecord::from_mutation)
            .collect()
    }

    fn unsubscribe(&mut self, subscription: ObserverId) {
        self.disconnect_observer(subscription);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_yields_change_records() {
        let mut tree = DomTree::new();
        let host = tree.create_element("x-host");
        tree.append_child(tree.root(), host).unwrap();
        let sub = tree.subscribe(host);

        let child = tree.create_element("p");
        let text = tree.create_text("hi");
        tree.append_child(host, child).unwrap();
        tree.append_child(child, text).unwrap();
        tree.set_text(text, "bye").unwrap();
        tree.set_attribute(child, "class", "a").unwrap();

        let changes = tree.take_changes(sub);
        assert_eq!(changes, vec![
            ChangeRecord::added(host, vec![child]),
            ChangeRecord::added(child, vec![text]),
            ChangeRecord::Attributes { target: child, name: Some("class".into()) },
        ]);

        tree.unsubscribe(sub);
        tree.set_attribute(child, "class", "b").unwrap();
        assert!(tree.take_changes(sub).is_empty());
    }

    #[test]
    fn test_text_nodes_are_not_elements() {
        let mut tree = DomTree::new();
        let text = tree.create_text("hi");
        assert!(!ElementTree::is_element(&tree, text));
        assert_eq!(ElementTree::tag_name(&tree, text), None);
    }
}
