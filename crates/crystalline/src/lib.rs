//! Crystalline - declarative actions for custom elements
//!
//! Elements bind DOM events to component methods through a
//! `<tag>-action="[event->]method ..."` attribute on their descendants, and
//! expose named scoped queries. Nested instances of the same element keep
//! their own subtree: the outer instance neither binds nor queries inside it.

mod action;
mod default_action;
mod definition;
mod element;
mod error;
mod manifest;
mod nesting;
mod query;
mod reconciler;
mod registry;
mod tree;

pub use action::{ActionDescriptor, ActionSpec, action_attribute, parse_node, parse_token, parse_value};
pub use default_action::{NodeShape, default_event};
pub use definition::{
    ElementDefinition, ElementDefinitionBuilder, ElementRegistry, Method, MethodTable,
    is_valid_name,
};
pub use element::{CrystallineElement, RenderRoot, SLOT_TEMPLATE};
pub use error::{ElementError, ElementResult};
pub use manifest::{DefineOptions, Manifest, PropertyDecl};
pub use nesting::NestedRoots;
pub use query::{QueryDecl, QueryResult, ScopedQueries, expand_aliases};
pub use reconciler::{
    ActionBinder, BatchQueue, DEFAULT_QUEUE_CAPACITY, Phase, ReconcileReport, Reconciler,
};
pub use registry::{ActionRegistry, Binding};
pub use tree::{ChangeRecord, ElementTree, MutationSource};
