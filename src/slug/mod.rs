//! The slug engine.
//!
//! Derives a URL-safe identifier from a document's textual properties,
//! extracts a slug from a URL, and computes the slug mandated by an update's
//! replacement set. Collision probing lives with the store contract, since it
//! needs an existence check against a backend.

mod text;

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

use crate::model::{Document, PROP_CONTENT, PROP_NAME, PROP_SLUG};

pub(crate) use text::text_of;

/// Slugs are built from at most this many words.
const MAX_SLUG_WORDS: usize = 5;

/// Errors from slug derivation and URL parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlugError {
    #[error("slug must be a non-empty string")]
    NotAString,
    #[error("no usable text in name, content, or slug to derive a slug from")]
    NoSource,
    #[error("invalid url: {0:?}")]
    InvalidUrl(String),
    #[error("no valid slug in url: {0:?}")]
    NoSlug(String),
}

/// Derive a slug from a document's `name` and `content` text.
///
/// The first five words of the name are used; if the name yields fewer than
/// five, words from the content pad the phrase out. A document with only
/// content gets its first five words. Returns an empty string when neither
/// property yields usable text; creation treats that as an error.
pub fn generate(doc: &Document) -> String {
    let name = doc.properties.get(PROP_NAME).and_then(|v| text_of(v));
    let content = doc.properties.get(PROP_CONTENT).and_then(|v| text_of(v));

    let mut words: Vec<&str> = Vec::new();
    if let Some(name) = &name {
        words.extend(name.split_whitespace().take(MAX_SLUG_WORDS));
    }
    if let Some(content) = &content {
        if words.len() < MAX_SLUG_WORDS {
            words.extend(content.split_whitespace().take(MAX_SLUG_WORDS - words.len()));
        }
    }

    if words.is_empty() {
        return String::new();
    }
    ::slug::slugify(words.join(" "))
}

/// The slug an update must adopt: an explicit `slug` replacement wins, and
/// must be a non-empty string; otherwise the slug is derived from the
/// mutated document's text.
pub fn compute_new_slug(
    doc: &Document,
    replacements: &IndexMap<String, Vec<Value>>,
) -> Result<String, SlugError> {
    if let Some(values) = replacements.get(PROP_SLUG) {
        if !values.is_empty() {
            return match values.first() {
                Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
                _ => Err(SlugError::NotAString),
            };
        }
    }

    let derived = generate(doc);
    if derived.is_empty() {
        return Err(SlugError::NoSource);
    }
    Ok(derived)
}

/// Extract the slug from a URL: the last non-empty `/`-delimited segment
/// after stripping a single trailing slash.
pub fn from_url(url: &str) -> Result<String, SlugError> {
    if url.trim().is_empty() {
        return Err(SlugError::InvalidUrl(url.to_string()));
    }
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    match trimmed.rsplit('/').find(|segment| !segment.is_empty()) {
        Some(segment) => Ok(segment.to_string()),
        None => Err(SlugError::NoSlug(url.to_string())),
    }
}
