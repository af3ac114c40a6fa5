//! The in-memory representation of a stored entity.
//!
//! Property order and value order are significant and must survive a
//! round-trip through serialization, so properties live in an `IndexMap`
//! and nested JSON values keep their key order (`serde_json` with
//! `preserve_order`).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Property holding the document's storage key and final URL path segment.
pub const PROP_SLUG: &str = "slug";
/// Primary textual property, first choice for slug derivation.
pub const PROP_NAME: &str = "name";
/// Body property, second choice for slug derivation.
pub const PROP_CONTENT: &str = "content";
/// Soft-delete flag. Absence means not-deleted.
pub const PROP_DELETED: &str = "deleted";

/// Ordered property map: property name to an ordered sequence of values.
///
/// A value is a string, a nested object (embedded HTML/rich values), or a
/// nested document (embedded microformats) - all representable as
/// `serde_json::Value`.
pub type Properties = IndexMap<String, Vec<Value>>;

/// A stored content entity: type tags plus an ordered property-value map.
///
/// The on-disk form is the indented JSON serialization of this struct:
/// `{"type": [...], "properties": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "type")]
    pub kind: Vec<String>,
    pub properties: Properties,
}

impl Document {
    /// Create an empty document with the given type tags (e.g. `["h-entry"]`).
    pub fn new(kind: Vec<String>) -> Self {
        Self {
            kind,
            properties: Properties::new(),
        }
    }

    /// The document's slug: the first value of the `slug` property, if it is
    /// a non-empty string.
    pub fn slug(&self) -> Option<&str> {
        self.first_string(PROP_SLUG)
    }

    /// First value of a property, if it is a non-empty string.
    pub fn first_string(&self, property: &str) -> Option<&str> {
        match self.properties.get(property)?.first()? {
            Value::String(s) if !s.is_empty() => Some(s),
            _ => None,
        }
    }

    /// Overwrite a property with the given value sequence.
    pub fn set_property(&mut self, property: &str, values: Vec<Value>) {
        self.properties.insert(property.to_string(), values);
    }

    /// Whether the document is soft-deleted. Accepts a boolean first value or
    /// the strings `"true"`/`"false"` for backends that round-trip through
    /// text.
    pub fn is_deleted(&self) -> bool {
        match self.properties.get(PROP_DELETED).and_then(|values| values.first()) {
            Some(Value::Bool(deleted)) => *deleted,
            Some(Value::String(text)) => text == "true",
            _ => false,
        }
    }

    /// Serialize to the stable, human-diffable on-disk encoding.
    pub fn to_pretty_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    /// Parse a document from its on-disk encoding.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
