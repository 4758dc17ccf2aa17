//! Element errors

use crystalline_dom::SelectorError;

/// Result type for element operations
pub type ElementResult<T> = Result<T, ElementError>;

/// Errors raised while defining elements or binding actions
#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    /// Tag name is not a valid custom element name
    #[error("Invalid custom element name: {0}")]
    InvalidName(String),

    /// Tag name already has a definition
    #[error("Custom element already defined: {0}")]
    AlreadyDefined(String),

    /// Action names a method missing from the method table
    #[error("Unknown action method `{method}` on <{tag}>")]
    UnknownActionMethod { tag: String, method: String },

    /// Action token without a method or event name
    #[error("Malformed action token `{token}`")]
    MalformedAction { token: String },

    /// Declared query selector cannot be parsed
    #[error("Invalid query `{name}`: {source}")]
    InvalidQuery {
        name: String,
        #[source]
        source: SelectorError,
    },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("Invalid manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}
