//! Scoped queries
//!
//! Named selectors evaluated against the element's subtree on every access.
//! Matches inside nested instances of the same component are left out.

use std::collections::BTreeMap;

use crystalline_dom::Selector;
use serde::{Deserialize, Serialize};

use crate::error::ElementError;
use crate::nesting::NestedRoots;
use crate::tree::ElementTree;

/// A declared query: one selector, or a one-element array for all matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryDecl {
    Single(String),
    All([String; 1]),
}

impl QueryDecl {
    pub fn single(selector: impl Into<String>) -> Self {
        Self::Single(selector.into())
    }

    pub fn all(selector: impl Into<String>) -> Self {
        Self::All([selector.into()])
    }

    pub fn selector(&self) -> &str {
        match self {
            Self::Single(selector) | Self::All([selector]) => selector,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All(_))
    }
}

/// Replace `@identifier` with `[<tag>-id='identifier']`
pub fn expand_aliases(selector: &str, tag: &str) -> String {
    let mut out = String::with_capacity(selector.len());
    let mut rest = selector;

    while let Some(at) = rest.find('@') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let len = after
            .find(|c: char| !(c.is_ascii_lowercase() || c == '-'))
            .unwrap_or(after.len());
        if len == 0 {
            out.push('@');
        } else {
            out.push_str(&format!("[{tag}-id='{}']", &after[..len]));
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

/// Result of evaluating a query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult<N> {
    Single(Option<N>),
    All(Vec<N>),
}

impl<N> QueryResult<N> {
    pub fn into_single(self) -> Option<N> {
        match self {
            Self::Single(node) => node,
            Self::All(nodes) => nodes.into_iter().next(),
        }
    }

    pub fn into_all(self) -> Vec<N> {
        match self {
            Self::Single(node) => node.into_iter().collect(),
            Self::All(nodes) => nodes,
        }
    }
}

#[derive(Debug, Clone)]
struct ScopedQuery {
    selector: String,
    all: bool,
}

/// The `_name` accessors of one element instance
#[derive(Debug, Clone, Default)]
pub struct ScopedQueries {
    queries: BTreeMap<String, ScopedQuery>,
}

impl ScopedQueries {
    /// Expand aliases and validate every declared selector
    pub fn build<'a>(
        tag: &str,
        decls: impl IntoIterator<Item = (&'a String, &'a QueryDecl)>,
    ) -> Result<Self, ElementError> {
        let tag = tag.to_ascii_lowercase();
        let mut queries = BTreeMap::new();

        for (name, decl) in decls {
            let selector = expand_aliases(decl.selector(), &tag);
            Selector::parse(&selector).map_err(|source| ElementError::InvalidQuery {
                name: name.clone(),
                source,
            })?;
            tracing::trace!("<{}> _{} => {}", tag, name, selector);
            queries.insert(
                format!("_{name}"),
                ScopedQuery {
                    selector,
                    all: decl.is_all(),
                },
            );
        }

        Ok(Self { queries })
    }

    /// Expanded selector for an accessor, by `_name` or `name`
    pub fn selector(&self, name: &str) -> Option<&str> {
        self.find(name).map(|q| q.selector.as_str())
    }

    /// Accessor names, each starting with `_`
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Run an accessor against the current tree
    ///
    /// Unknown names and selector failures yield `None`.
    pub fn evaluate<T>(
        &self,
        tree: &T,
        root: T::Node,
        nested: &NestedRoots<T::Node>,
        name: &str,
    ) -> Option<QueryResult<T::Node>>
    where
        T: ElementTree + ?Sized,
    {
        let query = self.find(name)?;
        let matches = match tree.select_all(root, &query.selector) {
            Ok(matches) => matches,
            Err(err) => {
                tracing::warn!("Query {} failed: {}", name, err);
                return None;
            }
        };

        let mut visible = matches.into_iter().filter(|&node| !nested.excludes(tree, node));
        Some(if query.all {
            QueryResult::All(visible.collect())
        } else {
            QueryResult::Single(visible.next())
        })
    }

    fn find(&self, name: &str) -> Option<&ScopedQuery> {
        self.queries.get(name).or_else(|| {
            if name.starts_with('_') {
                None
            } else {
                self.queries.get(&format!("_{name}"))
            }
        })
    }
}
