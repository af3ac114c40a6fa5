//! The mutation engine: pure functions that apply a replace/add/delete
//! change-set to a document in memory.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::document::{Document, PROP_CONTENT, PROP_NAME, PROP_SLUG};

/// Properties whose mutation triggers slug recomputation.
const SLUG_SOURCES: &[&str] = &[PROP_SLUG, PROP_NAME, PROP_CONTENT];

/// A change-set against a single document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mutation {
    /// Properties to overwrite with the given value sequences.
    #[serde(default)]
    pub replace: IndexMap<String, Vec<Value>>,
    /// Values to append to the named properties (created if absent).
    #[serde(default)]
    pub add: IndexMap<String, Vec<Value>>,
    /// Removal set; see [`Deletion`].
    #[serde(default)]
    pub delete: Option<Deletion>,
}

/// The deletion half of a change-set, which is polymorphic on the wire:
/// either a list of property names to remove entirely, or a map from
/// property name to the values to remove from that property's sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Deletion {
    Keys(Vec<String>),
    Values(IndexMap<String, Vec<Value>>),
}

/// Apply a change-set to a document in place.
///
/// Replacements overwrite the whole value sequence, even with an empty one.
/// Additions append. Value-level deletions match by structural equality and
/// drop a property key entirely once its sequence is emptied.
pub fn apply_mutations(doc: &mut Document, mutation: &Mutation) {
    for (key, values) in &mutation.replace {
        doc.properties.insert(key.clone(), values.clone());
    }

    for (key, values) in &mutation.add {
        doc.properties
            .entry(key.clone())
            .or_default()
            .extend(values.iter().cloned());
    }

    match &mutation.delete {
        None => {}
        Some(Deletion::Keys(keys)) => {
            for key in keys {
                doc.properties.shift_remove(key);
            }
        }
        Some(Deletion::Values(removals)) => {
            for (key, victims) in removals {
                if let Some(values) = doc.properties.get_mut(key) {
                    values.retain(|value| !victims.contains(value));
                    if values.is_empty() {
                        doc.properties.shift_remove(key);
                    }
                }
            }
        }
    }
}

/// Whether a change-set touches `slug`, `name`, or `content` with a
/// non-empty value sequence. An empty sequence for these keys does not
/// trigger recomputation; it is not a slug-clearing operation.
pub fn should_recompute_slug(mutation: &Mutation) -> bool {
    SLUG_SOURCES.iter().any(|prop| {
        mutation.replace.get(*prop).is_some_and(|v| !v.is_empty())
            || mutation.add.get(*prop).is_some_and(|v| !v.is_empty())
    })
}
