//! HTML5 Parser implementation
//!
//! Parses with html5ever into an RcDom and converts that into our arena
//! tree.

use crystalline_dom::{Document, DomTree, NodeId};
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};

use crate::ParseError;

/// HTML5 parser
#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlParser;

impl HtmlParser {
    /// Create a new HTML parser
    pub fn new() -> Self {
        Self
    }

    /// Parse HTML string into a Document
    pub fn parse(&self, html: &str) -> Result<Document, ParseError> {
        self.parse_with_url(html, "about:blank")
    }

    /// Parse HTML with a base URL
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Document, ParseError> {
        tracing::debug!("Parsing HTML document: {}", url);

        let dom = Self::read(html)?;
        let mut document = Document::empty(url);
        let tree = document.tree_mut();
        let root = tree.root();
        Self::convert_node(&dom.document, tree, root)?;

        tracing::debug!("Parsed {} nodes", document.tree().len());
        Ok(document)
    }

    /// Parse a fragment and append its top-level nodes to `parent`
    ///
    /// Each subtree is built detached and then appended, so observers of
    /// `parent` see one child-list record per top-level node.
    ///
    /// Limitations:
    /// - Whitespace-only text nodes are dropped, at every depth.
    /// - Only nodes html5ever places in `<body>` are inserted. Head-only
    ///   content such as `<title>`, `<meta>` or a leading `<style>` is lost.
    pub fn parse_into(
        &self,
        tree: &mut DomTree,
        parent: NodeId,
        html: &str,
    ) -> Result<Vec<NodeId>, ParseError> {
        let dom = Self::read(html)?;
        let Some(body) = Self::find_element(&dom.document, "body") else {
            return Ok(Vec::new());
        };

        let mut inserted = Vec::new();
        for child in body.children.borrow().iter() {
            if let Some(id) = Self::build_detached(child, tree)? {
                tree.append_child(parent, id)?;
                inserted.push(id);
            }
        }

        tracing::debug!("Inserted {} fragment nodes under {:?}", inserted.len(), parent);
        Ok(inserted)
    }

    fn read(html: &str) -> Result<RcDom, ParseError> {
        let dom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;
        Ok(dom)
    }

    fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
        if let RcNodeData::Element { name, .. } = &handle.data {
            if &*name.local == tag {
                return Some(handle.clone());
            }
        }
        handle
            .children
            .borrow()
            .iter()
            .find_map(|child| Self::find_element(child, tag))
    }

    /// Convert an RcDom node and attach it under `parent`
    fn convert_node(handle: &Handle, tree: &mut DomTree, parent: NodeId) -> Result<(), ParseError> {
        if let RcNodeData::Document = handle.data {
            for child in handle.children.borrow().iter() {
                Self::convert_node(child, tree, parent)?;
            }
            return Ok(());
        }

        if let Some(id) = Self::build_detached(handle, tree)? {
            tree.append_child(parent, id)?;
        }
        Ok(())
    }

    /// Build a detached copy of an RcDom subtree
    fn build_detached(handle: &Handle, tree: &mut DomTree) -> Result<Option<NodeId>, ParseError> {
        let id = match &handle.data {
            RcNodeData::Text { contents } => {
                let text = contents.borrow().to_string();
                // Formatting whitespace between tags
                if text.trim().is_empty() {
                    return Ok(None);
                }
                tree.create_text(&text)
            }
            RcNodeData::Comment { contents } => tree.create_comment(contents),
            RcNodeData::Element { name, attrs, .. } => {
                let id = tree.create_element(&name.local);
                for attr in attrs.borrow().iter() {
                    tree.set_attribute(id, &attr.name.local, &attr.value)?;
                }
                for child in handle.children.borrow().iter() {
                    if let Some(child_id) = Self::build_detached(child, tree)? {
                        tree.append_child(id, child_id)?;
                    }
                }
                id
            }
            // Doctype and processing instructions have no counterpart
            _ => return Ok(None),
        };
        Ok(Some(id))
    }
}
