//! Action attribute parsing
//!
//! `<tag>-action="method event->method ..."` declares which events on a node
//! invoke which component methods. Bare tokens take the node's default event.

use crate::default_action;
use crate::error::ElementError;
use crate::tree::ElementTree;

/// Separator between event and method in a token
pub const ARROW: &str = "->";

/// Name of the action attribute for a component tag
pub fn action_attribute(tag: &str) -> String {
    format!("{}-action", tag.to_ascii_lowercase())
}

/// One parsed (event, method) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionSpec {
    pub event: String,
    pub method: String,
}

impl ActionSpec {
    pub fn new(event: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            method: method.into(),
        }
    }
}

/// A bound (node, event, method) triple
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionDescriptor<N> {
    pub node: N,
    pub event: String,
    pub name: String,
}

impl<N> ActionDescriptor<N> {
    pub fn new(node: N, spec: ActionSpec) -> Self {
        Self {
            node,
            event: spec.event,
            name: spec.method,
        }
    }
}

/// Parse one token, using `default_event` for bare method names
pub fn parse_token(token: &str, default_event: &str) -> Result<ActionSpec, ElementError> {
    let malformed = || ElementError::MalformedAction {
        token: token.to_string(),
    };

    let mut parts = token.split(ARROW);
    let first = parts.next().unwrap_or_default();
    match (parts.next(), parts.next()) {
        (None, _) => {
            if first.is_empty() {
                return Err(malformed());
            }
            Ok(ActionSpec::new(default_event, first))
        }
        (Some(method), None) => {
            let event = first.trim();
            if event.is_empty() || method.is_empty() {
                return Err(malformed());
            }
            Ok(ActionSpec::new(event, method))
        }
        (Some(_), Some(_)) => Err(malformed()),
    }
}

/// Parse an attribute value into per-token results, in token order
pub fn parse_value(value: &str, default_event: &str) -> Vec<Result<ActionSpec, ElementError>> {
    value
        .split_whitespace()
        .map(|token| parse_token(token, default_event))
        .collect()
}

/// Parse the action attribute of `node` for component `tag`
///
/// A missing attribute yields nothing.
pub fn parse_node<T: ElementTree + ?Sized>(
    tree: &T,
    node: T::Node,
    tag: &str,
) -> Vec<Result<ActionSpec, ElementError>> {
    match tree.attribute(node, &action_attribute(tag)) {
        Some(value) => parse_value(value, default_action::default_event(tree, node)),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crystalline_dom::DomTree;

    fn ok(results: Vec<Result<ActionSpec, ElementError>>) -> Vec<ActionSpec> {
        results.into_iter().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_attribute_name_is_lowercased() {
        assert_eq!(action_attribute("My-Widget"), "my-widget-action");
    }

    #[test]
    fn test_bare_and_explicit_tokens() {
        let specs = ok(parse_value("save  keyup->search\tfocus->highlight", "click"));
        assert_eq!(specs, vec![
            ActionSpec::new("click", "save"),
            ActionSpec::new("keyup", "search"),
            ActionSpec::new("focus", "highlight"),
        ]);
    }

    #[test]
    fn test_empty_value_yields_nothing() {
        assert!(parse_value("", "click").is_empty());
        assert!(parse_value("   ", "click").is_empty());
    }

    #[test]
    fn test_malformed_tokens_rejected() {
        for token in ["->save", "click->", "a->b->c", "->"] {
            let err = parse_token(token, "click").unwrap_err();
            assert!(
                matches!(&err, ElementError::MalformedAction { token: t } if t == token),
                "{token}: {err:?}"
            );
        }
    }

    #[test]
    fn test_malformed_token_does_not_hide_siblings() {
        let results = parse_value("->bad good", "click");
        assert!(results[0].is_err());
        assert_eq!(results[1].as_ref().unwrap(), &ActionSpec::new("click", "good"));
    }

    #[test]
    fn test_parse_node_uses_default_event() {
        let mut tree = DomTree::new();
        let form = tree.create_element("form");
        tree.set_attribute(form, "x-app-action", "send reset->clear").unwrap();

        let specs = ok(parse_node(&tree, form, "x-app"));
        assert_eq!(specs, vec![
            ActionSpec::new("submit", "send"),
            ActionSpec::new("reset", "clear"),
        ]);

        let plain = tree.create_element("div");
        assert!(parse_node(&tree, plain, "x-app").is_empty());
    }
}
