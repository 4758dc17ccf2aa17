//! Crystalline HTML
//!
//! HTML5 markup loader built on html5ever. Produces whole documents or
//! inserts fragments under an existing node of a `DomTree`.

mod parser;

pub use parser::HtmlParser;
pub use crystalline_dom::Document;

/// Parse an HTML string into a document
pub fn parse(html: &str) -> Result<Document, ParseError> {
    HtmlParser::new().parse(html)
}

/// Parse error
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to read markup: {0}")]
    Io(#[from] std::io::Error),

    #[error("DOM error while building tree: {0}")]
    Dom(#[from] crystalline_dom::DomError),
}
