//! Mutation reconciler
//!
//! Turns batches of change records into attached listeners. Each element
//! instance owns one `Reconciler`; the tree is passed in per call.
//!
//! - On the bootstrap batch every descendant element is scanned.
//! - Added elements are handled as candidates for nesting or binding.
//! - Attribute changes rebind the target, the element root included.
//! - Removed nodes drop their nested-root entry and their listeners.

use std::collections::VecDeque;
use std::fmt;

use crystalline_dom::EventCallback;

use crate::action::{self, ActionDescriptor};
use crate::error::ElementError;
use crate::nesting::NestedRoots;
use crate::registry::ActionRegistry;
use crate::tree::{ChangeRecord, ElementTree};

/// Default number of batches held before coalescing
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Observation phase of an element instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unobserved,
    Bootstrapping,
    Observing,
}

/// Produces the callback for a descriptor
pub trait ActionBinder<N> {
    fn bind(&self, descriptor: &ActionDescriptor<N>) -> Result<EventCallback, ElementError>;
}

impl<N, F> ActionBinder<N> for F
where
    F: Fn(&ActionDescriptor<N>) -> Result<EventCallback, ElementError>,
{
    fn bind(&self, descriptor: &ActionDescriptor<N>) -> Result<EventCallback, ElementError> {
        self(descriptor)
    }
}

/// Outcome of processing one or more batches
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub bound: usize,
    pub detached: usize,
    pub diagnostics: Vec<ElementError>,
}

impl ReconcileReport {
    pub fn merge(&mut self, other: ReconcileReport) {
        self.bound += other.bound;
        self.detached += other.detached;
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Bounded FIFO of change batches
///
/// When full, a new batch is appended to the newest queued batch so no
/// record is lost and record order is kept.
#[derive(Debug, Clone)]
pub struct BatchQueue<R> {
    batches: VecDeque<Vec<R>>,
    capacity: usize,
}

impl<R> BatchQueue<R> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            batches: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, batch: Vec<R>) {
        if batch.is_empty() {
            return;
        }
        if self.batches.len() >= self.capacity {
            if let Some(newest) = self.batches.back_mut() {
                tracing::trace!("Batch queue full, coalescing {} records", batch.len());
                newest.extend(batch);
                return;
            }
        }
        self.batches.push_back(batch);
    }

    pub fn pop(&mut self) -> Option<Vec<R>> {
        self.batches.pop_front()
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.batches.clear();
    }
}

impl<R> Default for BatchQueue<R> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }
}

/// Per-instance binding state
pub struct Reconciler<T: ElementTree + ?Sized> {
    tag: String,
    phase: Phase,
    nested: NestedRoots<T::Node>,
    registry: ActionRegistry<T::Node, T::Listener>,
    queue: BatchQueue<ChangeRecord<T::Node>>,
}

impl<T: ElementTree + ?Sized> Reconciler<T> {
    pub fn new(tag: &str) -> Self {
        Self::with_queue_capacity(tag, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_queue_capacity(tag: &str, capacity: usize) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            phase: Phase::Unobserved,
            nested: NestedRoots::new(),
            registry: ActionRegistry::new(),
            queue: BatchQueue::with_capacity(capacity),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn nested_roots(&self) -> &NestedRoots<T::Node> {
        &self.nested
    }

    pub fn registry(&self) -> &ActionRegistry<T::Node, T::Listener> {
        &self.registry
    }

    /// Enter the bootstrapping phase with empty state
    pub fn begin(&mut self) {
        self.nested.clear();
        self.queue.clear();
        self.phase = Phase::Bootstrapping;
        tracing::debug!("<{}> bootstrapping", self.tag);
    }

    pub fn mark_observing(&mut self) {
        self.phase = Phase::Observing;
    }

    pub fn enqueue(&mut self, batch: Vec<ChangeRecord<T::Node>>) {
        if self.phase == Phase::Unobserved {
            tracing::debug!("<{}> ignoring {} records while unobserved", self.tag, batch.len());
            return;
        }
        self.queue.push(batch);
    }

    /// Enqueue a batch and drain the queue
    pub fn process(
        &mut self,
        tree: &mut T,
        root: T::Node,
        batch: Vec<ChangeRecord<T::Node>>,
        binder: &dyn ActionBinder<T::Node>,
    ) -> ReconcileReport {
        self.enqueue(batch);
        self.drain(tree, root, binder)
    }

    /// Process queued batches in arrival order
    pub fn drain(
        &mut self,
        tree: &mut T,
        root: T::Node,
        binder: &dyn ActionBinder<T::Node>,
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        while let Some(batch) = self.queue.pop() {
            self.process_batch(tree, root, batch, binder, &mut report);
        }
        if report.bound > 0 || report.detached > 0 {
            tracing::debug!(
                "<{}> bound {} detached {} ({} active)",
                self.tag,
                report.bound,
                report.detached,
                self.registry.len()
            );
        }
        report
    }

    /// Detach every listener and return to `Unobserved`
    pub fn reset(&mut self, tree: &mut T) -> usize {
        let bindings = self.registry.clear();
        let detached = bindings.len();
        for binding in bindings {
            tree.unlisten(binding.listener);
        }
        self.nested.clear();
        self.queue.clear();
        self.phase = Phase::Unobserved;
        detached
    }

    fn process_batch(
        &mut self,
        tree: &mut T,
        root: T::Node,
        batch: Vec<ChangeRecord<T::Node>>,
        binder: &dyn ActionBinder<T::Node>,
        report: &mut ReconcileReport,
    ) {
        tracing::trace!("<{}> processing {} records", self.tag, batch.len());

        if self.phase == Phase::Bootstrapping {
            for node in tree.descendant_elements(root) {
                self.handle(tree, node, false, binder, report);
            }
        }

        for record in batch {
            match record {
                ChangeRecord::ChildList { added, removed, .. } => {
                    for node in added {
                        if tree.is_element(node) {
                            self.handle(tree, node, false, binder, report);
                        }
                    }
                    for node in removed {
                        self.handle_removed(tree, root, node, report);
                    }
                }
                ChangeRecord::Attributes { target, .. } => {
                    self.handle(tree, target, true, binder, report);
                }
            }
        }
    }

    fn handle(
        &mut self,
        tree: &mut T,
        node: T::Node,
        include_self: bool,
        binder: &dyn ActionBinder<T::Node>,
        report: &mut ReconcileReport,
    ) {
        let same_tag = match tree.tag_name(node) {
            Some(tag) => tag.eq_ignore_ascii_case(&self.tag),
            None => return,
        };

        if !include_self && same_tag {
            tracing::trace!("<{}> nested root {:?}", self.tag, node);
            self.nested.record(node);
            self.detach_within(tree, node, report);
            return;
        }

        if self.nested.excludes(&*tree, node) {
            tracing::trace!("<{}> skipping {:?} inside nested root", self.tag, node);
            self.detach_within(tree, node, report);
            return;
        }

        for parsed in action::parse_node(&*tree, node, &self.tag) {
            let spec = match parsed {
                Ok(spec) => spec,
                Err(err) => {
                    tracing::warn!("<{}> {}", self.tag, err);
                    report.diagnostics.push(err);
                    continue;
                }
            };

            if self.registry.contains(node, &spec.event, &spec.method) {
                continue;
            }

            let descriptor = ActionDescriptor::new(node, spec);
            match binder.bind(&descriptor) {
                Ok(callback) => {
                    let listener = tree.listen(node, &descriptor.event, callback);
                    tracing::trace!(
                        "<{}> {:?} {}->{}",
                        self.tag,
                        node,
                        descriptor.event,
                        descriptor.name
                    );
                    self.registry.insert(descriptor, listener);
                    report.bound += 1;
                }
                Err(err) => {
                    tracing::warn!("<{}> {}", self.tag, err);
                    report.diagnostics.push(err);
                }
            }
        }
    }

    fn handle_removed(
        &mut self,
        tree: &mut T,
        root: T::Node,
        node: T::Node,
        report: &mut ReconcileReport,
    ) {
        let same_tag = tree
            .tag_name(node)
            .is_some_and(|tag| tag.eq_ignore_ascii_case(&self.tag));
        if same_tag {
            self.nested.forget(node);
        }

        // Moved within the element and outside nested roots, bindings stay
        if tree.contains(root, node) && !self.nested.excludes(&*tree, node) {
            return;
        }

        self.detach_within(tree, node, report);
    }

    /// Detach every binding on `node` or its descendants
    fn detach_within(&mut self, tree: &mut T, node: T::Node, report: &mut ReconcileReport) {
        let removed = self.registry.drain_where(|bound| tree.contains(node, bound));
        for binding in removed {
            tree.unlisten(binding.listener);
            report.detached += 1;
        }
    }
}

impl<T: ElementTree + ?Sized> fmt::Debug for Reconciler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("tag", &self.tag)
            .field("phase", &self.phase)
            .field("nested", &self.nested.as_slice())
            .field("bindings", &self.registry.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}
