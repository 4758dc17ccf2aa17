//! Mutation Observer API
//!
//! Observe DOM changes. Records are queued per observer and handed out in
//! delivery order by `take_records`.

use crate::NodeId;

/// Mutation observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Mutation type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    Attributes,
    CharacterData,
    ChildList,
}

/// Mutation record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub mutation_type: MutationType,
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<String>,
}

impl MutationRecord {
    /// Child list change on `target`
    pub fn child_list(
        target: NodeId,
        added: Vec<NodeId>,
        removed: Vec<NodeId>,
        previous_sibling: Option<NodeId>,
        next_sibling: Option<NodeId>,
    ) -> Self {
        Self {
            mutation_type: MutationType::ChildList,
            target,
            added_nodes: added,
            removed_nodes: removed,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }

    /// Attribute change on `target`
    pub fn attributes(target: NodeId, name: &str, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    /// Text content change on `target`
    pub fn character_data(target: NodeId, old_value: Option<String>) -> Self {
        Self {
            mutation_type: MutationType::CharacterData,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: None,
            old_value,
        }
    }
}

/// Mutation observer options
#[derive(Debug, Clone, Default)]
pub struct MutationObserverInit {
    pub child_list: bool,
    pub attributes: bool,
    pub character_data: bool,
    pub subtree: bool,
    pub attribute_old_value: bool,
    pub character_data_old_value: bool,
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    /// Attributes and child list for the whole subtree
    pub fn subtree() -> Self {
        Self {
            child_list: true,
            attributes: true,
            subtree: true,
            ..Default::default()
        }
    }
}

/// Mutation observer
#[derive(Debug)]
struct MutationObserver {
    id: ObserverId,
    target: NodeId,
    options: MutationObserverInit,
    pending_records: Vec<MutationRecord>,
}

impl MutationObserver {
    /// Check whether this observer wants the record
    fn wants(&self, mutation: &MutationRecord, contains: impl Fn(NodeId, NodeId) -> bool) -> bool {
        let matches_target = if self.options.subtree {
            contains(self.target, mutation.target)
        } else {
            self.target == mutation.target
        };

        let matches_type = match mutation.mutation_type {
            MutationType::Attributes => self.options.attributes,
            MutationType::CharacterData => self.options.character_data,
            MutationType::ChildList => self.options.child_list,
        };

        let passes_filter = match (&self.options.attribute_filter, &mutation.attribute_name) {
            (Some(filter), Some(attr)) if mutation.mutation_type == MutationType::Attributes => {
                filter.iter().any(|f| f.eq_ignore_ascii_case(attr))
            }
            _ => true,
        };

        matches_target && matches_type && passes_filter
    }

    fn record(&mut self, mut mutation: MutationRecord) {
        let keep_old = match mutation.mutation_type {
            MutationType::Attributes => self.options.attribute_old_value,
            MutationType::CharacterData => self.options.character_data_old_value,
            MutationType::ChildList => false,
        };
        if !keep_old {
            mutation.old_value = None;
        }
        self.pending_records.push(mutation);
    }
}

/// All live observers of one tree
#[derive(Debug, Default)]
pub(crate) struct ObserverSet {
    observers: Vec<MutationObserver>,
    next_id: u64,
}

impl ObserverSet {
    /// Observe a target
    pub fn observe(&mut self, target: NodeId, options: MutationObserverInit) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.push(MutationObserver {
            id,
            target,
            options,
            pending_records: Vec::new(),
        });
        id
    }

    /// Stop observing and drop pending records
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|o| o.id != id);
        self.observers.len() < before
    }

    /// Take pending records
    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .iter_mut()
            .find(|o| o.id == id)
            .map(|o| std::mem::take(&mut o.pending_records))
            .unwrap_or_default()
    }

    /// Has pending records
    pub fn has_pending(&self, id: ObserverId) -> bool {
        self.observers
            .iter()
            .any(|o| o.id == id && !o.pending_records.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Notify all observers of a mutation
    pub fn notify(&mut self, mutation: MutationRecord, contains: impl Fn(NodeId, NodeId) -> bool) {
        for observer in &mut self.observers {
            if observer.wants(&mutation, &contains) {
                observer.record(mutation.clone());
            }
        }
    }
}
