//! Installed action bindings of one element instance

use crate::action::ActionDescriptor;

/// Descriptor plus the listener handle it owns
#[derive(Debug, Clone)]
pub struct Binding<N, L> {
    pub descriptor: ActionDescriptor<N>,
    pub listener: L,
}

/// Set of bindings keyed by (node, event, method)
///
/// Insertion order is kept so that teardown detaches listeners in the
/// order they were attached.
#[derive(Debug, Clone)]
pub struct ActionRegistry<N, L> {
    bindings: Vec<Binding<N, L>>,
}

impl<N: Copy + Eq, L: Copy> ActionRegistry<N, L> {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    pub fn contains(&self, node: N, event: &str, name: &str) -> bool {
        self.bindings.iter().any(|b| {
            b.descriptor.node == node && b.descriptor.event == event && b.descriptor.name == name
        })
    }

    /// Insert a binding; returns false and keeps the existing one on duplicates
    pub fn insert(&mut self, descriptor: ActionDescriptor<N>, listener: L) -> bool {
        if self.contains(descriptor.node, &descriptor.event, &descriptor.name) {
            return false;
        }
        self.bindings.push(Binding {
            descriptor,
            listener,
        });
        true
    }

    /// Remove every binding whose node satisfies `pred`
    pub fn drain_where(&mut self, mut pred: impl FnMut(N) -> bool) -> Vec<Binding<N, L>> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.bindings.len());
        for binding in self.bindings.drain(..) {
            if pred(binding.descriptor.node) {
                removed.push(binding);
            } else {
                kept.push(binding);
            }
        }
        self.bindings = kept;
        removed
    }

    /// Remove all bindings
    pub fn clear(&mut self) -> Vec<Binding<N, L>> {
        std::mem::take(&mut self.bindings)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActionDescriptor<N>> {
        self.bindings.iter().map(|b| &b.descriptor)
    }

    pub fn for_node(&self, node: N) -> impl Iterator<Item = &ActionDescriptor<N>> {
        self.iter().filter(move |d| d.node == node)
    }
}

impl<N: Copy + Eq, L: Copy> Default for ActionRegistry<N, L> {
    fn default() -> Self {
        Self::new()
    }
}
