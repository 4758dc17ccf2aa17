//! Implicit event names for bare action tokens

use crate::tree::ElementTree;

/// What kind of control a node is, as far as its default event goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeShape {
    Form,
    SubmitInput,
    TextInput,
    Select,
    Generic,
}

impl NodeShape {
    /// Classify from a tag name and the `type` attribute
    pub fn classify(tag: &str, input_type: Option<&str>) -> Self {
        if tag.eq_ignore_ascii_case("form") {
            Self::Form
        } else if tag.eq_ignore_ascii_case("input") || tag.eq_ignore_ascii_case("textarea") {
            // exact comparison, `SUBMIT` is a text input
            if input_type == Some("submit") {
                Self::SubmitInput
            } else {
                Self::TextInput
            }
        } else if tag.eq_ignore_ascii_case("select") {
            Self::Select
        } else {
            Self::Generic
        }
    }

    /// Classify a node of `tree`; non-elements are generic
    pub fn of<T: ElementTree + ?Sized>(tree: &T, node: T::Node) -> Self {
        match tree.tag_name(node) {
            Some(tag) => Self::classify(tag, tree.attribute(node, "type")),
            None => Self::Generic,
        }
    }

    pub fn default_event(self) -> &'static str {
        match self {
            Self::Form => "submit",
            Self::SubmitInput => "click",
            Self::TextInput => "input",
            Self::Select => "change",
            Self::Generic => "click",
        }
    }
}

/// Default event for `node`
pub fn default_event<T: ElementTree + ?Sized>(tree: &T, node: T::Node) -> &'static str {
    NodeShape::of(tree, node).default_event()
}
