//! Store error types.
//!
//! `NotFound` is a sentinel the routing layer maps to a 404; everything else
//! carries enough context (operation, slug, cause) to reconstruct a causal
//! chain without a stack trace.

use thiserror::Error;

use crate::slug::SlugError;

/// The main error type for content store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The slug/URL does not resolve to a live document.
    #[error("content entry not found")]
    NotFound,

    /// The document passed to `create` has no usable `slug` property.
    #[error("document is missing a slug property")]
    MissingSlug,

    /// Slug derivation or URL parsing failed.
    #[error(transparent)]
    Slug(#[from] SlugError),

    /// A live document already owns the proposed slug.
    #[error("slug already in use: {0}")]
    SlugTaken(String),

    /// The random-suffix candidate collided too; repeated collision
    /// indicates a deeper bug, so fail instead of looping.
    #[error("slug collision for {0:?} could not be resolved with a random suffix")]
    CollisionUnresolved(String),

    /// Error from the underlying git library.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem-level failure in the working copy or file backend.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The store's shutdown flag was raised between retry attempts.
    #[error("operation cancelled: store is shutting down")]
    Cancelled,

    /// Fetch-and-fast-forward exhausted its retries.
    #[error("sync with remote failed after {attempts} attempts: {last}")]
    SyncExhausted {
        attempts: u32,
        #[source]
        last: Box<StoreError>,
    },

    /// A rollback after a failed write itself failed, and so did the
    /// reinit fallback. All three failures are named so an operator can
    /// diagnose a stuck repository by hand.
    #[error("{operation} failed ({cause}); rollback failed ({rollback}); reinit failed ({reinit})")]
    RepairFailed {
        operation: &'static str,
        cause: String,
        rollback: String,
        reinit: String,
    },

    /// A store operation failed; wraps the cause with operation and slug.
    #[error("{operation} {slug:?}: {source}")]
    Op {
        operation: &'static str,
        slug: String,
        #[source]
        source: Box<StoreError>,
    },
}

impl StoreError {
    /// Wrap an error with the operation name and slug it occurred under.
    /// `NotFound` passes through unchanged so callers can still match on it.
    pub fn in_op(self, operation: &'static str, slug: &str) -> StoreError {
        match self {
            StoreError::NotFound => StoreError::NotFound,
            other => StoreError::Op {
                operation,
                slug: slug.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Check whether this error is the not-found sentinel.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }

    /// Check whether this error is a slug conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StoreError::SlugTaken(_) | StoreError::CollisionUnresolved(_)
        )
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
