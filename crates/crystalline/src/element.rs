//! Crystalline element instances
//!
//! A `CrystallineElement` ties one definition, one root node and one
//! component value together. `connect` scans the subtree and subscribes to
//! its mutations, `pump` feeds pending mutations to the reconciler, and
//! `disconnect` detaches every listener the instance installed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use crystalline_dom::{DomTree, Event, EventCallback};
use serde_json::Value;

use crate::action::ActionDescriptor;
use crate::definition::ElementDefinition;
use crate::error::ElementError;
use crate::query::QueryResult;
use crate::reconciler::{ActionBinder, Phase, ReconcileReport, Reconciler};
use crate::tree::{ChangeRecord, MutationSource};

/// Template rendered by elements that are not pass-through
pub const SLOT_TEMPLATE: &str = "<slot></slot>";

/// Where an element renders its template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderRoot {
    /// A shadow root attached to the element
    Shadow,
    /// The element itself
    Light,
}

/// Binds action methods to one component instance
///
/// Callbacks hold the component weakly, so a dropped element leaves inert
/// listeners behind rather than keeping its component alive.
struct MethodBinder<'a, C> {
    definition: &'a ElementDefinition<C>,
    component: &'a Rc<RefCell<C>>,
}

impl<N, C: 'static> ActionBinder<N> for MethodBinder<'_, C> {
    fn bind(&self, descriptor: &ActionDescriptor<N>) -> Result<EventCallback, ElementError> {
        let method = self.definition.method(&descriptor.name)?;
        let component: Weak<RefCell<C>> = Rc::downgrade(self.component);
        let tag = self.definition.tag().to_string();
        let name = descriptor.name.clone();

        let callback: EventCallback = Rc::new(move |event: &Event| {
            let Some(component) = component.upgrade() else {
                return;
            };
            match component.try_borrow_mut() {
                Ok(mut component) => method(&mut *component, event),
                Err(_) => tracing::warn!(
                    "<{}> skipped re-entrant {} for {}",
                    tag,
                    event.event_type(),
                    name
                ),
            }
        });
        Ok(callback)
    }
}

/// One instance of a defined element
pub struct CrystallineElement<C: 'static, T: MutationSource = DomTree> {
    definition: Rc<ElementDefinition<C>>,
    root: T::Node,
    component: Rc<RefCell<C>>,
    properties: BTreeMap<String, Value>,
    reconciler: Reconciler<T>,
    subscription: Option<T::Subscription>,
}

impl<C: 'static, T: MutationSource> CrystallineElement<C, T> {
    /// Create an instance with properties set to their declared defaults
    pub fn new(definition: Rc<ElementDefinition<C>>, root: T::Node, component: C) -> Self {
        let reconciler =
            Reconciler::with_queue_capacity(definition.tag(), definition.queue_capacity());
        Self {
            properties: definition.default_properties(),
            definition,
            root,
            component: Rc::new(RefCell::new(component)),
            reconciler,
            subscription: None,
        }
    }

    pub fn definition(&self) -> &ElementDefinition<C> {
        &self.definition
    }

    pub fn tag(&self) -> &str {
        self.definition.tag()
    }

    pub fn root(&self) -> T::Node {
        self.root
    }

    pub fn component(&self) -> &Rc<RefCell<C>> {
        &self.component
    }

    pub fn phase(&self) -> Phase {
        self.reconciler.phase()
    }

    pub fn is_connected(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn reconciler(&self) -> &Reconciler<T> {
        &self.reconciler
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a property, returning the previous value
    pub fn set_property(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(name.to_string(), value.into())
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// Template for the render root, `None` for pass-through elements
    pub fn render(&self) -> Option<&'static str> {
        if self.definition.options().pass_through {
            None
        } else {
            Some(SLOT_TEMPLATE)
        }
    }

    pub fn render_root(&self) -> RenderRoot {
        if self.definition.options().shadow_dom {
            RenderRoot::Shadow
        } else {
            RenderRoot::Light
        }
    }

    /// Scan the subtree, bind actions and start observing mutations
    ///
    /// Connecting an already connected element starts over from a clean
    /// state.
    pub fn connect(&mut self, tree: &mut T) -> ReconcileReport {
        if self.subscription.is_some() {
            self.disconnect(tree);
        }

        tracing::debug!("<{}> connected at {:?}", self.tag(), self.root);
        self.reconciler.reset(tree);
        self.reconciler.begin();

        let binder = MethodBinder {
            definition: &self.definition,
            component: &self.component,
        };
        let report = self.reconciler.process(
            tree,
            self.root,
            vec![ChangeRecord::touch(self.root)],
            &binder,
        );

        self.subscription = Some(tree.subscribe(self.root));
        self.reconciler.mark_observing();
        report
    }

    /// Reconcile the mutations recorded since the last call
    pub fn pump(&mut self, tree: &mut T) -> ReconcileReport {
        let Some(subscription) = self.subscription else {
            return ReconcileReport::default();
        };
        let changes = tree.take_changes(subscription);
        if changes.is_empty() {
            return ReconcileReport::default();
        }
        self.handle_changes(tree, changes)
    }

    /// Reconcile a batch delivered by the host
    pub fn handle_changes(
        &mut self,
        tree: &mut T,
        batch: Vec<ChangeRecord<T::Node>>,
    ) -> ReconcileReport {
        let binder = MethodBinder {
            definition: &self.definition,
            component: &self.component,
        };
        self.reconciler.process(tree, self.root, batch, &binder)
    }

    /// Stop observing and detach every listener; returns how many were detached
    pub fn disconnect(&mut self, tree: &mut T) -> usize {
        if let Some(subscription) = self.subscription.take() {
            tree.unsubscribe(subscription);
        }
        let detached = self.reconciler.reset(tree);
        tracing::debug!("<{}> disconnected, {} listeners detached", self.tag(), detached);
        detached
    }

    /// Evaluate a declared query by `_name` or `name`
    pub fn query(&self, tree: &T, name: &str) -> Option<QueryResult<T::Node>> {
        self.definition
            .queries()
            .evaluate(tree, self.root, self.reconciler.nested_roots(), name)
    }

    pub fn query_one(&self, tree: &T, name: &str) -> Option<T::Node> {
        self.query(tree, name).and_then(QueryResult::into_single)
    }

    pub fn query_all(&self, tree: &T, name: &str) -> Vec<T::Node> {
        self.query(tree, name)
            .map(QueryResult::into_all)
            .unwrap_or_default()
    }
}

impl<C: 'static, T: MutationSource> fmt::Debug for CrystallineElement<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrystallineElement")
            .field("tag", &self.definition.tag())
            .field("root", &self.root)
            .field("properties", &self.properties)
            .field("reconciler", &self.reconciler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::DefineOptions;
    use crystalline_dom::NodeId;
    use serde_json::json;

    #[derive(Default)]
    struct Clicks {
        count: u32,
    }

    fn click(clicks: &mut Clicks, _: &Event) {
        clicks.count += 1;
    }

    fn definition(options: DefineOptions) -> Rc<ElementDefinition<Clicks>> {
        Rc::new(
            ElementDefinition::builder("x-clicks")
                .options(options)
                .property("count", 0)
                .method("click", click)
                .build()
                .unwrap(),
        )
    }

    fn host(tree: &mut DomTree) -> NodeId {
        let root = tree.create_element("x-clicks");
        tree.append_child(tree.root(), root).unwrap();
        root
    }

    #[test]
    fn test_properties_and_rendering() {
        let mut tree = DomTree::new();
        let root = host(&mut tree);
        let mut element: CrystallineElement<Clicks> =
            CrystallineElement::new(definition(DefineOptions::default()), root, Clicks::default());

        assert_eq!(element.property("count"), Some(&json!(0)));
        assert_eq!(element.set_property("count", 4), Some(json!(0)));
        assert_eq!(element.property("count"), Some(&json!(4)));
        assert_eq!(element.render(), Some(SLOT_TEMPLATE));
        assert_eq!(element.render_root(), RenderRoot::Shadow);

        let light = DefineOptions {
            shadow_dom: false,
            pass_through: true,
        };
        let element: CrystallineElement<Clicks> =
            CrystallineElement::new(definition(light), root, Clicks::default());
        assert_eq!(element.render(), None);
        assert_eq!(element.render_root(), RenderRoot::Light);
    }

    #[test]
    fn test_connect_pump_disconnect() {
        let mut tree = DomTree::new();
        let root = host(&mut tree);
        let mut element: CrystallineElement<Clicks> =
            CrystallineElement::new(definition(DefineOptions::default()), root, Clicks::default());

        assert_eq!(element.connect(&mut tree).bound, 0);
        assert!(element.is_connected());
        assert_eq!(element.phase(), Phase::Observing);

        let button = tree.create_element("button");
        tree.set_attribute(button, "x-clicks-action", "click").unwrap();
        tree.append_child(root, button).unwrap();
        assert_eq!(element.pump(&mut tree).bound, 1);
        assert_eq!(element.pump(&mut tree).bound, 0);

        tree.dispatch_event(button, "click");
        assert_eq!(element.component().borrow().count, 1);

        assert_eq!(element.disconnect(&mut tree), 1);
        tree.dispatch_event(button, "click");
        assert_eq!(element.component().borrow().count, 1);
        assert_eq!(element.phase(), Phase::Unobserved);
    }

    #[test]
    fn test_reentrant_dispatch_is_skipped() {
        let mut tree = DomTree::new();
        let root = host(&mut tree);
        tree.set_attribute(root, "x-clicks-action", "click").unwrap();
        let mut element: CrystallineElement<Clicks> =
            CrystallineElement::new(definition(DefineOptions::default()), root, Clicks::default());
        element.connect(&mut tree);

        let guard = element.component().borrow_mut();
        tree.dispatch_event(root, "click");
        drop(guard);
        assert_eq!(element.component().borrow().count, 0);

        tree.dispatch_event(root, "click");
        assert_eq!(element.component().borrow().count, 1);
    }
}
