//! Document model for the content store.
//!
//! A document is the structured content unit every backend persists: a list
//! of type tags plus an ordered property map (microformats2 shape). The
//! mutation engine in this module applies replace/add/delete change-sets to a
//! document in memory; it never touches storage.

mod document;
mod mutation;

pub use document::{Document, Properties, PROP_CONTENT, PROP_DELETED, PROP_NAME, PROP_SLUG};
pub use mutation::{apply_mutations, should_recompute_slug, Deletion, Mutation};
