//! Storage backends for the content store.
//!
//! Every backend implements the same [`ContentStore`] contract and shares
//! the mutation and slug engines; only the persistence plumbing differs.
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │         ContentStore         │
//!                 │ create/update/delete/get/... │
//!                 └──────────────────────────────┘
//!                        │                │
//!                        ▼                ▼
//!                 ┌─────────────┐  ┌─────────────┐
//!                 │  GitStore   │  │  FileStore  │
//!                 │ (clone/push)│  │ (flat dir)  │
//!                 └─────────────┘  └─────────────┘
//! ```
//!
//! The git backend is the interesting one: an ephemeral local clone kept in
//! sync with the remote, multi-step write sequences made to appear atomic,
//! and reinit-as-repair when the clone stops being trustworthy.

mod config;
mod contract;
mod error;
mod fs;
mod git;

pub use config::{CommitAuthor, GitAuth, GitStoreConfig};
pub use contract::{ensure_unique_slug, ContentStore};
pub use error::{StoreError, StoreResult};
pub use fs::FileStore;
pub use git::GitStore;
