//! The contract every storage backend implements, plus the shared slug
//! collision-resolution step that all backends use.

use uuid::Uuid;

use crate::model::{Document, Mutation};
use crate::store::error::{StoreError, StoreResult};

/// The interface a content storage backend implements.
///
/// One concrete type per backend, selected by configuration at startup; a
/// store is constructed once and handed to every caller that needs it.
pub trait ContentStore {
    /// Persist a new document under its caller-supplied slug.
    ///
    /// Returns the public URL and whether the write is already guaranteed
    /// visible to readers (the git backend reports `false`: the push is the
    /// point of no return but propagation is eventually consistent).
    fn create(&self, doc: &Document) -> StoreResult<(String, bool)>;

    /// Apply a change-set to the document at `url`, renaming it when slug
    /// recomputation is triggered. Returns the (possibly new) public URL.
    fn update(&self, url: &str, mutation: &Mutation) -> StoreResult<String>;

    /// Soft-delete: flip the `deleted` property; the underlying file
    /// survives.
    fn delete(&self, url: &str) -> StoreResult<()>;

    /// Clear the `deleted` property. Returns the public URL.
    fn undelete(&self, url: &str) -> StoreResult<String>;

    /// Fetch the document at `url`; `StoreError::NotFound` if absent.
    fn get(&self, url: &str) -> StoreResult<Document>;

    /// Whether any document in the store owns `slug` (matching its logical
    /// slug property, not just its on-disk name).
    fn exists_by_slug(&self, slug: &str) -> StoreResult<bool>;
}

/// Resolve a proposed slug against a store's existence probe.
///
/// A no-op rename returns unchanged. Otherwise the proposal is probed once;
/// on collision a 122-bit random suffix is appended and probed once more. A
/// second collision fails loudly rather than looping, since repeated
/// collision indicates a deeper bug.
pub(crate) fn resolve_collision<F>(
    proposed: &str,
    current: &str,
    mut exists: F,
) -> StoreResult<String>
where
    F: FnMut(&str) -> StoreResult<bool>,
{
    if proposed == current {
        return Ok(proposed.to_string());
    }
    if !exists(proposed)? {
        return Ok(proposed.to_string());
    }

    let candidate = format!("{}-{}", proposed, Uuid::new_v4().simple());
    if exists(&candidate)? {
        return Err(StoreError::CollisionUnresolved(proposed.to_string()));
    }
    Ok(candidate)
}

/// Resolve a proposed slug against a backend through the public contract.
pub fn ensure_unique_slug<S: ContentStore + ?Sized>(
    store: &S,
    proposed: &str,
    current: &str,
) -> StoreResult<String> {
    resolve_collision(proposed, current, |slug| store.exists_by_slug(slug))
}
