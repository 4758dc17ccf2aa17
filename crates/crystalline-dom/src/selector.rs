//! Selector matching
//!
//! A CSS selector subset: groups (`,`), descendant and child combinators,
//! and compound steps made of tag, `*`, `#id`, `.class` and attribute
//! conditions (`[attr]`, `[attr=value]`, quoted values).

use crate::{DomTree, NodeId};

/// Selector parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("Empty selector")]
    Empty,

    #[error("Unsupported selector: {0}")]
    Unsupported(String),

    #[error("Unterminated attribute selector: {0}")]
    UnterminatedAttribute(String),
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    groups: Vec<Vec<SelectorPart>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SelectorPart {
    step: Compound,
    // Relation to the part on the left
    combinator: Option<Combinator>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    universal: bool,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
}

impl Compound {
    fn is_empty(&self) -> bool {
        !self.universal
            && self.tag.is_none()
            && self.id.is_none()
            && self.classes.is_empty()
            && self.attrs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrCondition {
    Exists(String),
    Equals(String, String),
}

impl Selector {
    /// Parse a selector list
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let selector = selector.trim();
        if selector.is_empty() {
            return Err(SelectorError::Empty);
        }

        let mut groups = Vec::new();
        for group in split_groups(selector)? {
            groups.push(Parser::new(group, selector).parse_chain()?);
        }
        Ok(Self { groups })
    }

    /// Check if an element matches any group
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.is_element(node)
            && self
                .groups
                .iter()
                .any(|parts| matches_chain(tree, node, parts, parts.len() - 1))
    }
}

fn matches_chain(tree: &DomTree, node: NodeId, parts: &[SelectorPart], index: usize) -> bool {
    let part = &parts[index];
    if !matches_compound(tree, node, &part.step) {
        return false;
    }
    if index == 0 {
        return true;
    }

    match part.combinator {
        Some(Combinator::Child) => tree
            .parent(node)
            .is_some_and(|parent| matches_chain(tree, parent, parts, index - 1)),
        _ => {
            let mut cursor = tree.parent(node);
            while let Some(ancestor) = cursor {
                if matches_chain(tree, ancestor, parts, index - 1) {
                    return true;
                }
                cursor = tree.parent(ancestor);
            }
            false
        }
    }
}

fn matches_compound(tree: &DomTree, node: NodeId, step: &Compound) -> bool {
    let Some(element) = tree.get(node).and_then(|n| n.as_element()) else {
        return false;
    };

    if let Some(tag) = &step.tag {
        if !element.tag_name.eq_ignore_ascii_case(tag) {
            return false;
        }
    }
    if let Some(id) = &step.id {
        if element.id() != Some(id.as_str()) {
            return false;
        }
    }
    if !step
        .classes
        .iter()
        .all(|class| element.classes().any(|c| c == class.as_str()))
    {
        return false;
    }
    step.attrs.iter().all(|condition| match condition {
        AttrCondition::Exists(name) => element.has_attr(name),
        AttrCondition::Equals(name, value) => element.get_attr(name) == Some(value.as_str()),
    })
}

/// Split on top-level commas, ignoring commas inside brackets or quotes
fn split_groups(selector: &str) -> Result<Vec<&str>, SelectorError> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for (i, ch) in selector.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                groups.push(selector[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    groups.push(selector[start..].trim());

    if groups.iter().any(|g| g.is_empty()) {
        return Err(SelectorError::Unsupported(selector.to_string()));
    }
    Ok(groups)
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn new(group: &str, source: &'a str) -> Self {
        Self {
            chars: group.chars().collect(),
            pos: 0,
            source,
        }
    }

    fn unsupported(&self) -> SelectorError {
        SelectorError::Unsupported(self.source.to_string())
    }

    fn unterminated(&self) -> SelectorError {
        SelectorError::UnterminatedAttribute(self.source.to_string())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn parse_chain(&mut self) -> Result<Vec<SelectorPart>, SelectorError> {
        let mut parts: Vec<SelectorPart> = Vec::new();
        let mut pending: Option<Combinator> = None;

        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None => break,
                Some('>') => {
                    if parts.is_empty() || pending == Some(Combinator::Child) {
                        return Err(self.unsupported());
                    }
                    pending = Some(Combinator::Child);
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
            }

            if !parts.is_empty() && pending.is_none() && had_ws {
                pending = Some(Combinator::Descendant);
            }
            let step = self.parse_compound()?;
            let combinator = if parts.is_empty() { None } else { pending.take() };
            parts.push(SelectorPart { step, combinator });
        }

        if parts.is_empty() || pending == Some(Combinator::Child) {
            return Err(self.unsupported());
        }
        Ok(parts)
    }

    fn parse_compound(&mut self) -> Result<Compound, SelectorError> {
        let mut step = Compound::default();

        while let Some(ch) = self.peek() {
            match ch {
                '*' => {
                    self.pos += 1;
                    step.universal = true;
                }
                '#' => {
                    self.pos += 1;
                    step.id = Some(self.parse_ident()?);
                }
                '.' => {
                    self.pos += 1;
                    step.classes.push(self.parse_ident()?);
                }
                '[' => {
                    self.pos += 1;
                    step.attrs.push(self.parse_attr()?);
                }
                c if is_ident_char(c) => {
                    if !step.is_empty() {
                        return Err(self.unsupported());
                    }
                    step.tag = Some(self.parse_ident()?.to_ascii_lowercase());
                }
                c if c.is_whitespace() || c == '>' => break,
                _ => return Err(self.unsupported()),
            }
        }

        if step.is_empty() {
            return Err(self.unsupported());
        }
        Ok(step)
    }

    fn parse_ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unsupported());
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_attr(&mut self) -> Result<AttrCondition, SelectorError> {
        self.skip_ws();
        let name = self.parse_ident()?.to_ascii_lowercase();
        self.skip_ws();

        let condition = match self.peek() {
            Some(']') => AttrCondition::Exists(name),
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                let value = match self.peek() {
                    Some(q @ ('\'' | '"')) => {
                        self.pos += 1;
                        let start = self.pos;
                        while self.peek().is_some_and(|c| c != q) {
                            self.pos += 1;
                        }
                        if self.peek().is_none() {
                            return Err(self.unterminated());
                        }
                        let value: String = self.chars[start..self.pos].iter().collect();
                        self.pos += 1;
                        value
                    }
                    Some(_) => self.parse_ident()?,
                    None => return Err(self.unterminated()),
                };
                self.skip_ws();
                AttrCondition::Equals(name, value)
            }
            Some(_) => return Err(self.unsupported()),
            None => return Err(self.unterminated()),
        };

        if self.peek() != Some(']') {
            return Err(self.unterminated());
        }
        self.pos += 1;
        Ok(condition)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

impl DomTree {
    /// First descendant of `root` matching the selector, in document order
    pub fn query_selector(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .find(|&id| selector.matches(self, id)))
    }

    /// All descendants of `root` matching the selector, in document order
    pub fn query_selector_all(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        Ok(self
            .descendants(root)
            .into_iter()
            .filter(|&id| selector.matches(self, id))
            .collect())
    }

    /// Check if an element matches a selector
    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool, SelectorError> {
        Ok(Selector::parse(selector)?.matches(self, node))
    }

    /// Closest inclusive ancestor matching a selector
    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let selector = Selector::parse(selector)?;
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if selector.matches(self, current) {
                return Ok(Some(current));
            }
            cursor = self.parent(current);
        }
        Ok(None)
    }
}
