//! Nested instances of the same component

use crate::tree::ElementTree;

/// Roots of nested same-tag instances, in discovery order
#[derive(Debug, Clone)]
pub struct NestedRoots<N> {
    roots: Vec<N>,
}

impl<N: Copy + Eq> NestedRoots<N> {
    pub fn new() -> Self {
        Self { roots: Vec::new() }
    }

    pub fn record(&mut self, root: N) {
        if !self.roots.contains(&root) {
            self.roots.push(root);
        }
    }

    /// Drop a root by identity; returns whether it was present
    pub fn forget(&mut self, root: N) -> bool {
        let before = self.roots.len();
        self.roots.retain(|&r| r != root);
        self.roots.len() != before
    }

    /// Whether `node` is a nested root or lies inside one
    pub fn excludes<T>(&self, tree: &T, node: N) -> bool
    where
        T: ElementTree<Node = N> + ?Sized,
    {
        self.roots.iter().any(|&root| tree.contains(root, node))
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn as_slice(&self) -> &[N] {
        &self.roots
    }
}

impl<N: Copy + Eq> Default for NestedRoots<N> {
    fn default() -> Self {
        Self::new()
    }
}
