//! Crystalline DOM - Document Object Model
//!
//! Arena-backed element tree with mutation observers, event listeners
//! and a small CSS selector engine.

mod node;
mod tree;
mod document;
mod observer;
mod events;
mod selector;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::DomTree;
pub use document::Document;
pub use observer::{MutationObserverInit, MutationRecord, MutationType, ObserverId};
pub use events::{Event, EventCallback, ListenerId};
pub use selector::{Selector, SelectorError};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Document root node ID
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index of this node
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NotFound(NodeId),

    /// Hierarchy error (e.g., inserting an ancestor into its descendant)
    #[error("Hierarchy request error")]
    HierarchyRequest,

    /// Operation needs an element but got another node type
    #[error("Invalid node type")]
    InvalidNodeType,

    /// Node is not a child of the given parent
    #[error("Node is not a child")]
    NotAChild,
}
