//! Static element declarations loaded from JSON
//!
//! ```json
//! {
//!   "options": { "shadow_dom": false },
//!   "properties": { "count": { "default": 0 } },
//!   "queries": { "button": "button@save", "rows": ["tr"] }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ElementError;
use crate::query::QueryDecl;

/// Options given when an element is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefineOptions {
    /// Render into a shadow root; when false the element renders into itself
    pub shadow_dom: bool,
    /// Skip the `<slot>` template
    pub pass_through: bool,
}

impl Default for DefineOptions {
    fn default() -> Self {
        Self {
            shadow_dom: true,
            pass_through: false,
        }
    }
}

/// A declared reactive property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    #[serde(default)]
    pub default: Value,
}

impl PropertyDecl {
    pub fn with_default(default: impl Into<Value>) -> Self {
        Self {
            default: default.into(),
        }
    }
}

/// Declarations shared by every instance of an element type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    pub options: DefineOptions,
    pub properties: BTreeMap<String, PropertyDecl>,
    pub queries: BTreeMap<String, QueryDecl>,
}

impl Manifest {
    pub fn from_json(json: &str) -> Result<Self, ElementError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ElementError> {
        Ok(serde_json::from_value(value)?)
    }
}
