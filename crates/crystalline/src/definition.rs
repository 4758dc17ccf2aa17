//! Element definitions and the definition registry

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use crystalline_dom::Event;
use serde_json::Value;

use crate::error::{ElementError, ElementResult};
use crate::manifest::{DefineOptions, Manifest, PropertyDecl};
use crate::query::{QueryDecl, ScopedQueries};
use crate::reconciler::DEFAULT_QUEUE_CAPACITY;

/// A component method callable from an action
pub type Method<C> = fn(&mut C, &Event);

/// Names that can never be custom element names
const RESERVED_NAMES: &[&str] = &[
    "annotation-xml",
    "color-profile",
    "font-face",
    "font-face-src",
    "font-face-uri",
    "font-face-format",
    "font-face-name",
    "missing-glyph",
];

/// Validate a custom element name
pub fn is_valid_name(name: &str) -> bool {
    if !name.contains('-') {
        return false;
    }

    if !name.chars().next().is_some_and(|c| c.is_ascii_lowercase()) {
        return false;
    }

    if name.chars().any(|c| c.is_ascii_uppercase() || c.is_whitespace()) {
        return false;
    }

    !RESERVED_NAMES.contains(&name)
}

/// Method lookup by action name
pub struct MethodTable<C> {
    methods: BTreeMap<String, Method<C>>,
}

impl<C> MethodTable<C> {
    pub fn new() -> Self {
        Self {
            methods: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, method: Method<C>) -> Option<Method<C>> {
        self.methods.insert(name.into(), method)
    }

    pub fn get(&self, name: &str) -> Option<Method<C>> {
        self.methods.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}

impl<C> Default for MethodTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for MethodTable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

/// Everything shared by the instances of one element type
pub struct ElementDefinition<C> {
    tag: String,
    options: DefineOptions,
    properties: BTreeMap<String, PropertyDecl>,
    query_decls: BTreeMap<String, QueryDecl>,
    queries: ScopedQueries,
    methods: MethodTable<C>,
    queue_capacity: usize,
}

impl<C> ElementDefinition<C> {
    pub fn builder(tag: &str) -> ElementDefinitionBuilder<C> {
        ElementDefinitionBuilder::new(tag)
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn options(&self) -> DefineOptions {
        self.options
    }

    pub fn properties(&self) -> &BTreeMap<String, PropertyDecl> {
        &self.properties
    }

    pub fn query_decls(&self) -> &BTreeMap<String, QueryDecl> {
        &self.query_decls
    }

    pub fn queries(&self) -> &ScopedQueries {
        &self.queries
    }

    pub fn methods(&self) -> &MethodTable<C> {
        &self.methods
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Resolve an action method, failing with `UnknownActionMethod`
    pub fn method(&self, name: &str) -> ElementResult<Method<C>> {
        self.methods
            .get(name)
            .ok_or_else(|| ElementError::UnknownActionMethod {
                tag: self.tag.clone(),
                method: name.to_string(),
            })
    }

    /// Initial property values
    pub fn default_properties(&self) -> BTreeMap<String, Value> {
        self.properties
            .iter()
            .map(|(name, decl)| (name.clone(), decl.default.clone()))
            .collect()
    }
}

impl<C> fmt::Debug for ElementDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementDefinition")
            .field("tag", &self.tag)
            .field("options", &self.options)
            .field("properties", &self.properties.keys())
            .field("queries", &self.queries)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for an `ElementDefinition`
pub struct ElementDefinitionBuilder<C> {
    tag: String,
    manifest: Manifest,
    methods: MethodTable<C>,
    queue_capacity: usize,
}

impl<C> ElementDefinitionBuilder<C> {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            manifest: Manifest::default(),
            methods: MethodTable::new(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    pub fn options(mut self, options: DefineOptions) -> Self {
        self.manifest.options = options;
        self
    }

    pub fn shadow_dom(mut self, enabled: bool) -> Self {
        self.manifest.options.shadow_dom = enabled;
        self
    }

    pub fn pass_through(mut self, enabled: bool) -> Self {
        self.manifest.options.pass_through = enabled;
        self
    }

    pub fn property(mut self, name: &str, default: impl Into<Value>) -> Self {
        self.manifest
            .properties
            .insert(name.to_string(), PropertyDecl::with_default(default));
        self
    }

    pub fn query(mut self, name: &str, decl: QueryDecl) -> Self {
        self.manifest.queries.insert(name.to_string(), decl);
        self
    }

    pub fn method(mut self, name: &str, method: Method<C>) -> Self {
        self.methods.insert(name, method);
        self
    }

    /// Take options from the manifest and merge its properties and queries
    pub fn manifest(mut self, manifest: Manifest) -> Self {
        self.manifest.options = manifest.options;
        self.manifest.properties.extend(manifest.properties);
        self.manifest.queries.extend(manifest.queries);
        self
    }

    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn build(self) -> ElementResult<ElementDefinition<C>> {
        if !is_valid_name(&self.tag) {
            return Err(ElementError::InvalidName(self.tag));
        }

        let queries = ScopedQueries::build(&self.tag, &self.manifest.queries)?;

        Ok(ElementDefinition {
            tag: self.tag,
            options: self.manifest.options,
            properties: self.manifest.properties,
            query_decls: self.manifest.queries,
            queries,
            methods: self.methods,
            queue_capacity: self.queue_capacity,
        })
    }
}

/// Defined element types by tag name
#[derive(Default)]
pub struct ElementRegistry {
    definitions: HashMap<String, Rc<dyn Any>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition; each tag can be defined once
    pub fn define<C: 'static>(
        &mut self,
        definition: ElementDefinition<C>,
    ) -> ElementResult<Rc<ElementDefinition<C>>> {
        if self.definitions.contains_key(definition.tag()) {
            return Err(ElementError::AlreadyDefined(definition.tag().to_string()));
        }

        tracing::debug!("Defining <{}>", definition.tag());
        let definition = Rc::new(definition);
        self.definitions
            .insert(definition.tag().to_string(), definition.clone());
        Ok(definition)
    }

    /// Look up a definition for component type `C`
    pub fn get<C: 'static>(&self, tag: &str) -> Option<Rc<ElementDefinition<C>>> {
        let definition = self.definitions.get(tag)?.clone();
        definition.downcast::<ElementDefinition<C>>().ok()
    }

    pub fn is_defined(&self, tag: &str) -> bool {
        self.definitions.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl fmt::Debug for ElementRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.definitions.keys()).finish()
    }
}
