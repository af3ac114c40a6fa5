//! scribble-store - a pluggable content store for a publishing API.
//!
//! Persists structured documents (type tags + ordered property map)
//! addressed by a human-readable slug, with CRUD plus soft-delete semantics
//! behind one [`store::ContentStore`] interface. The core backend keeps a
//! local clone of a remote git repository synchronized under concurrent
//! access and makes write-stage-commit-push sequences appear atomic to
//! callers.
//!
//! # Example
//!
//! ```no_run
//! use scribble_store::model::Document;
//! use scribble_store::store::{ContentStore, GitStore, GitStoreConfig};
//!
//! # fn main() -> Result<(), scribble_store::store::StoreError> {
//! let store = GitStore::new(GitStoreConfig {
//!     remote_url: "https://example.test/content.git".to_string(),
//!     path_prefix: "content".to_string(),
//!     public_base_url: "https://example.test".to_string(),
//!     auth: Default::default(),
//!     author: Default::default(),
//! })?;
//!
//! let mut doc = Document::new(vec!["h-entry".to_string()]);
//! doc.set_property("slug", vec!["post-1".into()]);
//! doc.set_property("name", vec!["Hello".into()]);
//! let (url, _visible) = store.create(&doc)?;
//! # Ok(())
//! # }
//! ```

pub mod model;
pub mod slug;
pub mod store;
