//! Plain-text extraction from property values.
//!
//! Textual properties either carry a plain string or an embedded-HTML object
//! (`{"html": "..."}` or `{"html": ["..."]}`). HTML is converted to plain
//! text with a word cap so pathological bodies cannot blow up slug
//! derivation.

use serde_json::Value;

/// Upper bound on words kept when flattening HTML to text.
const MAX_TEXT_WORDS: usize = 100;

/// First usable text from a property's value sequence: the first non-empty
/// plain string, or the first embedded-HTML object that yields non-empty
/// text.
pub(crate) fn text_of(values: &[Value]) -> Option<String> {
    for value in values {
        match value {
            Value::String(s) if !s.trim().is_empty() => return Some(s.trim().to_string()),
            Value::Object(_) => {
                if let Some(html) = html_payload(value) {
                    let text = html_to_text(html);
                    if !text.is_empty() {
                        return Some(text);
                    }
                }
            }
            _ => {}
        }
    }
    None
}

/// The HTML string inside an embedded-HTML object, whichever of the two
/// wire shapes it uses.
fn html_payload(value: &Value) -> Option<&str> {
    match value.get("html")? {
        Value::String(html) => Some(html),
        Value::Array(items) => items.iter().find_map(Value::as_str),
        _ => None,
    }
}

/// Flatten an HTML fragment to whitespace-normalized plain text, capped at
/// 100 words.
pub(crate) fn html_to_text(html: &str) -> String {
    let fragment = scraper::Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join(" ")
        .split_whitespace()
        .take(MAX_TEXT_WORDS)
        .collect::<Vec<&str>>()
        .join(" ")
}
