//! The git-backed content store.
//!
//! Maintains an ephemeral local clone of a remote repository, serializes all
//! operations through one mutex, and implements the contract by writing and
//! removing files in the working copy and committing/pushing them. Reads go
//! through the last-known commit tree, never the working tree, so they stay
//! consistent with the last pushed state.
//!
//! Recovery strategy is reinit-as-repair: whenever the local clone cannot be
//! reconciled with the remote by normal means it is discarded wholesale and
//! re-cloned, trading latency for correctness over incremental repair.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use git2::build::RepoBuilder;
use git2::{Commit, ErrorCode, ObjectType, Oid, Repository, ResetType};
use parking_lot::Mutex;
use serde_json::Value;
use tempfile::TempDir;
use tracing::{debug, warn};

use crate::model::{apply_mutations, should_recompute_slug, Document, Mutation, PROP_DELETED, PROP_SLUG};
use crate::slug;
use crate::store::config::{normalize_base_url, CommitAuthor, GitAuth, GitStoreConfig};
use crate::store::contract::{resolve_collision, ContentStore};
use crate::store::error::{StoreError, StoreResult};

const LOCAL_MAIN_REF: &str = "refs/heads/main";
const REMOTE_MAIN_REF: &str = "refs/remotes/origin/main";
const ENTRY_SUFFIX: &str = ".json";
const MAX_SYNC_ATTEMPTS: u32 = 3;

/// Content store backed by a remote git repository.
///
/// One mutex serializes every operation that touches the shared working
/// copy; reads take it too, because fast-forwarding may reset the working
/// tree. Designed for low-to-moderate write concurrency against a single
/// logical content repository.
pub struct GitStore {
    remote_url: String,
    path_prefix: String,
    public_base_url: String,
    auth: GitAuth,
    author: CommitAuthor,
    workdir: Mutex<Workdir>,
    shutdown: Arc<AtomicBool>,
}

/// The ephemeral local clone. Dropping the `TempDir` deletes it, which is
/// how reinit discards an untrustworthy working copy.
struct Workdir {
    dir: TempDir,
    repo: Repository,
}

fn clone_remote(remote_url: &str, auth: &GitAuth) -> StoreResult<Workdir> {
    let dir = TempDir::new()?;
    let mut builder = RepoBuilder::new();
    builder.fetch_options(auth.fetch_options());
    let repo = builder.clone(remote_url, dir.path())?;
    Ok(Workdir { dir, repo })
}

impl GitStore {
    /// Clone the remote into a fresh temporary directory and build the
    /// store. Failure is fatal; no store is usable without an initial clone.
    pub fn new(config: GitStoreConfig) -> StoreResult<Self> {
        let workdir = clone_remote(&config.remote_url, &config.auth)?;
        Ok(Self {
            remote_url: config.remote_url,
            path_prefix: config.path_prefix.trim_matches('/').to_string(),
            public_base_url: normalize_base_url(&config.public_base_url),
            auth: config.auth,
            author: config.author,
            workdir: Mutex::new(workdir),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Handle for aborting in-flight retry loops on shutdown. Raising the
    /// flag makes pending and future operations fail with `Cancelled`
    /// between sync attempts instead of waiting out all retries.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Repository-relative path of a content entry.
    fn entry_path(&self, slug: &str) -> String {
        if self.path_prefix.is_empty() {
            format!("{slug}{ENTRY_SUFFIX}")
        } else {
            format!("{}/{}{}", self.path_prefix, slug, ENTRY_SUFFIX)
        }
    }

    fn url_for(&self, slug: &str) -> String {
        format!("{}{}", self.public_base_url, slug)
    }

    // ==================== Remote reconciliation ====================

    /// Catch the local clone up to the remote tip. Runs before every
    /// operation, under the write mutex.
    ///
    /// Each failed attempt but the last discards the working copy and
    /// re-clones before retrying (a reinit after the final attempt would
    /// only delay the error); the shutdown flag is checked between attempts
    /// so a cancelled caller does not wait out the full retry budget.
    fn fetch_and_fast_forward(&self, wd: &mut Workdir) -> StoreResult<()> {
        let mut attempt = 0;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(StoreError::Cancelled);
            }
            attempt += 1;
            match self.sync_once(&wd.repo) {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= MAX_SYNC_ATTEMPTS => {
                    return Err(StoreError::SyncExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(attempt, error = %err, "sync with remote failed, reinitializing working copy");
                    match clone_remote(&self.remote_url, &self.auth) {
                        Ok(fresh) => *wd = fresh,
                        Err(reinit_err) => {
                            return Err(StoreError::RepairFailed {
                                operation: "sync",
                                cause: err.to_string(),
                                rollback: "working copy discarded".to_string(),
                                reinit: reinit_err.to_string(),
                            })
                        }
                    }
                }
            }
        }
    }

    /// One fetch/fast-forward attempt. Equal tips return without touching
    /// disk; otherwise the local branch ref is advanced to the remote tip
    /// and the working tree hard-reset to it. Discarding uncommitted local
    /// changes is safe here: every local mutation is committed and pushed
    /// atomically before this point.
    fn sync_once(&self, repo: &Repository) -> StoreResult<()> {
        let mut remote = repo.find_remote("origin")?;
        // an empty refspec list fetches with the remote's configured refspecs
        remote.fetch(&[] as &[&str], Some(&mut self.auth.fetch_options()), None)?;
        drop(remote);

        let remote_tip = repo.refname_to_id(REMOTE_MAIN_REF)?;
        let local_tip = repo.refname_to_id(LOCAL_MAIN_REF)?;
        if remote_tip == local_tip {
            return Ok(());
        }

        debug!(%remote_tip, %local_tip, "fast-forwarding local main to remote tip");
        let mut reference = repo.find_reference(LOCAL_MAIN_REF)?;
        reference.set_target(remote_tip, "fast-forward to remote main")?;
        repo.set_head(LOCAL_MAIN_REF)?;
        let target = repo.find_object(remote_tip, Some(ObjectType::Commit))?;
        repo.reset(&target, ResetType::Hard, None)?;
        Ok(())
    }

    // ==================== Tree reads ====================

    fn head_commit(repo: &Repository) -> StoreResult<Commit<'_>> {
        Ok(repo.head()?.peel_to_commit()?)
    }

    /// Read the document for a slug from the HEAD commit tree. Absent path
    /// or unparseable blob both surface as `NotFound`.
    fn read_document(&self, repo: &Repository, slug: &str) -> StoreResult<Document> {
        let tree = Self::head_commit(repo)?.tree()?;
        let entry = match tree.get_path(Path::new(&self.entry_path(slug))) {
            Ok(entry) => entry,
            Err(err) if err.code() == ErrorCode::NotFound => return Err(StoreError::NotFound),
            Err(err) => return Err(err.into()),
        };
        let blob = repo.find_blob(entry.id())?;
        Document::from_json(blob.content()).map_err(|_| StoreError::NotFound)
    }

    /// Existence check against the HEAD commit tree. Fast path: the entry
    /// file named after the slug. Fallback: scan every entry under the
    /// prefix and compare each document's own slug property
    /// case-insensitively, because slugs and filenames can diverge by
    /// backend evolution. A malformed entry is skipped, not fatal; one bad
    /// file must not block lookups for everything else.
    fn slug_exists(&self, repo: &Repository, slug: &str) -> StoreResult<bool> {
        let tree = Self::head_commit(repo)?.tree()?;
        match tree.get_path(Path::new(&self.entry_path(slug))) {
            Ok(_) => return Ok(true),
            Err(err) if err.code() == ErrorCode::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let prefix_tree = if self.path_prefix.is_empty() {
            Some(tree)
        } else {
            match tree.get_path(Path::new(&self.path_prefix)) {
                Ok(entry) if entry.kind() == Some(ObjectType::Tree) => {
                    Some(repo.find_tree(entry.id())?)
                }
                Ok(_) => None,
                Err(err) if err.code() == ErrorCode::NotFound => None,
                Err(err) => return Err(err.into()),
            }
        };
        let Some(prefix_tree) = prefix_tree else {
            return Ok(false);
        };

        for entry in prefix_tree.iter() {
            if entry.kind() != Some(ObjectType::Blob) {
                continue;
            }
            let Some(name) = entry.name() else { continue };
            if !name.ends_with(ENTRY_SUFFIX) {
                continue;
            }
            let blob = repo.find_blob(entry.id())?;
            let Ok(doc) = Document::from_json(blob.content()) else {
                continue;
            };
            if doc.slug().is_some_and(|s| s.eq_ignore_ascii_case(slug)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ==================== Working-copy writes ====================

    fn write_entry(&self, wd: &Workdir, slug: &str, payload: &[u8]) -> StoreResult<()> {
        let path = wd.dir.path().join(self.entry_path(slug));
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, payload)?;
        Ok(())
    }

    fn remove_entry(&self, wd: &Workdir, slug: &str) -> StoreResult<()> {
        fs::remove_file(wd.dir.path().join(self.entry_path(slug)))?;
        Ok(())
    }

    fn write_changes(
        &self,
        wd: &Workdir,
        writes: &[(&str, &[u8])],
        removals: &[&str],
    ) -> StoreResult<()> {
        for (slug_value, payload) in writes {
            self.write_entry(wd, slug_value, payload)?;
        }
        for slug_value in removals {
            self.remove_entry(wd, slug_value)?;
        }
        Ok(())
    }

    /// Stage exactly the operation's entry paths and commit. Never sweeps
    /// the whole working copy into the index: a stray file left behind by an
    /// earlier failure must not ride along into an unrelated commit.
    fn stage_and_commit(
        &self,
        repo: &Repository,
        message: &str,
        writes: &[(&str, &[u8])],
        removals: &[&str],
    ) -> StoreResult<Oid> {
        let mut index = repo.index()?;
        for (slug_value, _) in writes {
            index.add_path(Path::new(&self.entry_path(slug_value)))?;
        }
        for slug_value in removals {
            index.remove_path(Path::new(&self.entry_path(slug_value)))?;
        }
        index.write()?;
        let tree_id = index.write_tree()?;
        let tree = repo.find_tree(tree_id)?;
        let signature = self.author.signature()?;
        let parent = Self::head_commit(repo)?;
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &[&parent])?;
        Ok(oid)
    }

    fn push(&self, repo: &Repository) -> StoreResult<()> {
        let mut remote = repo.find_remote("origin")?;
        let refspec = format!("{LOCAL_MAIN_REF}:{LOCAL_MAIN_REF}");
        remote.push(&[refspec.as_str()], Some(&mut self.auth.push_options()))?;
        Ok(())
    }

    /// Write the operation's entries, stage those paths, commit, and push.
    ///
    /// Any failure after the first working-copy write rolls the local state
    /// back to the pre-operation HEAD so it matches the last known-pushed
    /// state; if the rollback itself fails the working copy is
    /// reinitialized from remote, and if that fails too a compound error
    /// names all three failures.
    fn apply_change(
        &self,
        wd: &mut Workdir,
        operation: &'static str,
        message: &str,
        writes: &[(&str, &[u8])],
        removals: &[&str],
    ) -> StoreResult<()> {
        let base = Self::head_commit(&wd.repo)?.id();

        if let Err(err) = self.write_changes(wd, writes, removals) {
            self.repair(wd, operation, base, err.to_string())?;
            return Err(err);
        }
        if let Err(err) = self.stage_and_commit(&wd.repo, message, writes, removals) {
            self.repair(wd, operation, base, err.to_string())?;
            return Err(err);
        }
        if let Err(err) = self.push(&wd.repo) {
            self.repair(wd, operation, base, err.to_string())?;
            return Err(err);
        }
        Ok(())
    }

    /// Restore the working copy to `base`; escalate to a full reinit when
    /// the reset fails. `Ok` means local state is consistent again and the
    /// caller should surface the original operation error.
    fn repair(
        &self,
        wd: &mut Workdir,
        operation: &'static str,
        base: Oid,
        cause: String,
    ) -> StoreResult<()> {
        let rollback_err = match Self::reset_to(&wd.repo, base) {
            Ok(()) => return Ok(()),
            Err(err) => err,
        };
        warn!(operation, error = %rollback_err, "rollback failed, reinitializing working copy from remote");
        match clone_remote(&self.remote_url, &self.auth) {
            Ok(fresh) => {
                *wd = fresh;
                Ok(())
            }
            Err(reinit_err) => Err(StoreError::RepairFailed {
                operation,
                cause,
                rollback: rollback_err.to_string(),
                reinit: reinit_err.to_string(),
            }),
        }
    }

    fn reset_to(repo: &Repository, target: Oid) -> StoreResult<()> {
        let object = repo.find_object(target, Some(ObjectType::Commit))?;
        repo.reset(&object, ResetType::Hard, None)?;
        Ok(())
    }

    /// Delete and undelete share this path: flip the `deleted` property and
    /// overwrite the entry in place. Never triggers a rename; deletion does
    /// not affect slug computation.
    fn set_deleted_status(&self, url: &str, deleted: bool) -> StoreResult<String> {
        let slug_value = slug::from_url(url)?;
        let operation = if deleted { "delete" } else { "undelete" };

        let mut wd = self.workdir.lock();
        self.fetch_and_fast_forward(&mut wd)?;
        let mut doc = self.read_document(&wd.repo, &slug_value)?;
        doc.set_property(PROP_DELETED, vec![Value::Bool(deleted)]);
        let payload = doc.to_pretty_json()?;
        self.apply_change(
            &mut wd,
            operation,
            &format!("{operation} content entry: {slug_value}"),
            &[(slug_value.as_str(), payload.as_slice())],
            &[],
        )
        .map_err(|err| err.in_op(operation, &slug_value))?;
        Ok(self.url_for(&slug_value))
    }
}

impl ContentStore for GitStore {
    fn create(&self, doc: &Document) -> StoreResult<(String, bool)> {
        let slug_value = doc.slug().ok_or(StoreError::MissingSlug)?.to_string();
        let payload = doc.to_pretty_json()?;

        let mut wd = self.workdir.lock();
        self.fetch_and_fast_forward(&mut wd)?;
        if self.slug_exists(&wd.repo, &slug_value)? {
            return Err(StoreError::SlugTaken(slug_value));
        }
        self.apply_change(
            &mut wd,
            "create",
            &format!("create content entry: {slug_value}"),
            &[(slug_value.as_str(), payload.as_slice())],
            &[],
        )
        .map_err(|err| err.in_op("create", &slug_value))?;

        // pushed, but propagation to readers is eventually consistent
        Ok((self.url_for(&slug_value), false))
    }

    fn update(&self, url: &str, mutation: &Mutation) -> StoreResult<String> {
        let old_slug = slug::from_url(url)?;

        let mut wd = self.workdir.lock();
        self.fetch_and_fast_forward(&mut wd)?;
        let mut doc = self.read_document(&wd.repo, &old_slug)?;

        apply_mutations(&mut doc, mutation);
        let mut new_slug = old_slug.clone();
        if should_recompute_slug(mutation) {
            let candidate = slug::compute_new_slug(&doc, &mutation.replace)?;
            // probed under the same mutex, so no race against other writers
            // of this instance
            new_slug = resolve_collision(&candidate, &old_slug, |probe| {
                self.slug_exists(&wd.repo, probe)
            })?;
            doc.set_property(PROP_SLUG, vec![Value::String(new_slug.clone())]);
        }
        let payload = doc.to_pretty_json()?;

        if new_slug == old_slug {
            self.apply_change(
                &mut wd,
                "update",
                &format!("update content entry: {old_slug}"),
                &[(old_slug.as_str(), payload.as_slice())],
                &[],
            )
            .map_err(|err| err.in_op("update", &old_slug))?;
        } else {
            self.apply_change(
                &mut wd,
                "rename",
                &format!("rename {old_slug} to {new_slug}"),
                &[(new_slug.as_str(), payload.as_slice())],
                &[old_slug.as_str()],
            )
            .map_err(|err| err.in_op("rename", &new_slug))?;
        }
        Ok(self.url_for(&new_slug))
    }

    fn delete(&self, url: &str) -> StoreResult<()> {
        self.set_deleted_status(url, true).map(|_| ())
    }

    fn undelete(&self, url: &str) -> StoreResult<String> {
        self.set_deleted_status(url, false)
    }

    fn get(&self, url: &str) -> StoreResult<Document> {
        let slug_value = slug::from_url(url)?;
        let mut wd = self.workdir.lock();
        self.fetch_and_fast_forward(&mut wd)?;
        self.read_document(&wd.repo, &slug_value)
    }

    fn exists_by_slug(&self, slug_value: &str) -> StoreResult<bool> {
        let mut wd = self.workdir.lock();
        self.fetch_and_fast_forward(&mut wd)?;
        self.slug_exists(&wd.repo, slug_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PROP_NAME;
    use git2::FileMode;
    use serde_json::json;

    fn seed_remote() -> TempDir {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        let tree_id = repo.treebuilder(None).unwrap().write().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("seed", "seed@example.test").unwrap();
        repo.commit(Some(LOCAL_MAIN_REF), &sig, &sig, "seed repository", &tree, &[])
            .unwrap();
        repo.set_head(LOCAL_MAIN_REF).unwrap();
        dir
    }

    /// Commit an entry blob straight into the bare remote, bypassing the
    /// store, to simulate a second writer or legacy on-disk names.
    fn seed_entry(remote: &TempDir, filename: &str, payload: &[u8]) {
        let repo = Repository::open_bare(remote.path()).unwrap();
        let parent = repo
            .find_reference(LOCAL_MAIN_REF)
            .unwrap()
            .peel_to_commit()
            .unwrap();
        let blob = repo.blob(payload).unwrap();

        let parent_tree = parent.tree().unwrap();
        let existing_content = parent_tree
            .get_name("content")
            .and_then(|entry| repo.find_tree(entry.id()).ok());
        let mut content_builder = repo.treebuilder(existing_content.as_ref()).unwrap();
        content_builder
            .insert(filename, blob, FileMode::Blob.into())
            .unwrap();
        let content_tree = content_builder.write().unwrap();

        let mut root_builder = repo.treebuilder(Some(&parent_tree)).unwrap();
        root_builder
            .insert("content", content_tree, FileMode::Tree.into())
            .unwrap();
        let root_id = root_builder.write().unwrap();
        let root = repo.find_tree(root_id).unwrap();

        let sig = git2::Signature::now("seed", "seed@example.test").unwrap();
        repo.commit(Some(LOCAL_MAIN_REF), &sig, &sig, "seed entry", &root, &[&parent])
            .unwrap();
    }

    fn remote_head_message(remote: &TempDir) -> String {
        let repo = Repository::open_bare(remote.path()).unwrap();
        let commit = repo
            .find_reference(LOCAL_MAIN_REF)
            .unwrap()
            .peel_to_commit()
            .unwrap();
        commit.message().unwrap_or("").to_string()
    }

    fn store_for(remote: &TempDir) -> GitStore {
        GitStore::new(GitStoreConfig {
            remote_url: remote.path().to_str().unwrap().to_string(),
            path_prefix: "content".to_string(),
            public_base_url: "https://example.test".to_string(),
            auth: GitAuth::None,
            author: CommitAuthor::default(),
        })
        .unwrap()
    }

    fn entry(slug_value: &str, name: &str) -> Document {
        let mut doc = Document::new(vec!["h-entry".to_string()]);
        doc.set_property(PROP_SLUG, vec![json!(slug_value)]);
        doc.set_property(PROP_NAME, vec![json!(name)]);
        doc
    }

    #[test]
    fn test_create_then_get_round_trip() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let doc = entry("post-1", "Hello");
        let (url, visible) = store.create(&doc).unwrap();
        assert_eq!(url, "https://example.test/post-1");
        assert!(!visible);

        let fetched = store.get(&url).unwrap();
        assert_eq!(fetched, doc);
        assert_eq!(remote_head_message(&remote), "create content entry: post-1");
    }

    #[test]
    fn test_create_requires_slug() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let doc = Document::new(vec!["h-entry".to_string()]);
        assert!(matches!(store.create(&doc), Err(StoreError::MissingSlug)));
    }

    #[test]
    fn test_create_duplicate_slug_rejected() {
        let remote = seed_remote();
        let store = store_for(&remote);

        store.create(&entry("post-1", "Hello")).unwrap();
        let result = store.create(&entry("post-1", "Other"));
        assert!(matches!(result, Err(StoreError::SlugTaken(_))));
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let err = store.get("https://example.test/nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_two_stores_reconcile_through_remote() {
        let remote = seed_remote();
        let writer = store_for(&remote);
        let reader = store_for(&remote);

        let (url, _) = writer.create(&entry("shared", "Shared post")).unwrap();

        // the reader's clone predates the write; fetch-and-fast-forward
        // must catch it up
        let fetched = reader.get(&url).unwrap();
        assert_eq!(fetched.first_string(PROP_NAME), Some("Shared post"));

        reader.create(&entry("reply", "A reply")).unwrap();
        assert!(writer.exists_by_slug("reply").unwrap());
    }

    #[test]
    fn test_fast_forward_is_idempotent() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let mut wd = store.workdir.lock();
        store.fetch_and_fast_forward(&mut wd).unwrap();
        let before = GitStore::head_commit(&wd.repo).unwrap().id();
        store.fetch_and_fast_forward(&mut wd).unwrap();
        assert_eq!(before, GitStore::head_commit(&wd.repo).unwrap().id());
    }

    #[test]
    fn test_update_without_slug_trigger_keeps_url() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let (url, _) = store.create(&entry("post-1", "Hello")).unwrap();

        let mut mutation = Mutation::default();
        mutation
            .replace
            .insert("category".to_string(), vec![json!("notes")]);
        let new_url = store.update(&url, &mutation).unwrap();
        assert_eq!(new_url, url);

        let fetched = store.get(&url).unwrap();
        assert_eq!(fetched.properties["category"], vec![json!("notes")]);
        assert_eq!(remote_head_message(&remote), "update content entry: post-1");
    }

    #[test]
    fn test_update_recomputes_slug_and_renames() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let (url, _) = store.create(&entry("post-1", "Hello")).unwrap();

        let mut mutation = Mutation::default();
        mutation
            .replace
            .insert(PROP_NAME.to_string(), vec![json!("Updated title here")]);
        let new_url = store.update(&url, &mutation).unwrap();
        assert_eq!(new_url, "https://example.test/updated-title-here");

        let fetched = store.get(&new_url).unwrap();
        assert_eq!(fetched.slug(), Some("updated-title-here"));
        assert_eq!(fetched.first_string(PROP_NAME), Some("Updated title here"));

        // the old file is gone from the tree
        assert!(store.get(&url).unwrap_err().is_not_found());
        assert!(!store.exists_by_slug("post-1").unwrap());
        assert_eq!(
            remote_head_message(&remote),
            "rename post-1 to updated-title-here"
        );
    }

    #[test]
    fn test_update_slug_collision_gets_suffix() {
        let remote = seed_remote();
        let store = store_for(&remote);

        store.create(&entry("hello-world", "taken")).unwrap();
        let (url, _) = store.create(&entry("post-b", "other")).unwrap();

        let mut mutation = Mutation::default();
        mutation
            .replace
            .insert(PROP_NAME.to_string(), vec![json!("Hello World")]);
        let new_url = store.update(&url, &mutation).unwrap();

        let new_slug = slug::from_url(&new_url).unwrap();
        assert!(new_slug.starts_with("hello-world-"));
        assert_ne!(new_slug, "hello-world");
        assert!(store.exists_by_slug(&new_slug).unwrap());
    }

    #[test]
    fn test_update_missing_entry_is_not_found() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let err = store
            .update("https://example.test/ghost", &Mutation::default())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_soft_delete_round_trip() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let (url, _) = store.create(&entry("post-1", "Hello")).unwrap();

        store.delete(&url).unwrap();
        let deleted = store.get(&url).unwrap();
        assert!(deleted.is_deleted());
        assert_eq!(deleted.properties[PROP_DELETED], vec![json!(true)]);
        assert_eq!(deleted.first_string(PROP_NAME), Some("Hello"));
        assert_eq!(remote_head_message(&remote), "delete content entry: post-1");

        let restored_url = store.undelete(&url).unwrap();
        assert_eq!(restored_url, url);
        let restored = store.get(&url).unwrap();
        assert!(!restored.is_deleted());
        assert_eq!(restored.properties[PROP_DELETED], vec![json!(false)]);
        assert_eq!(restored.first_string(PROP_NAME), Some("Hello"));
        assert_eq!(remote_head_message(&remote), "undelete content entry: post-1");
    }

    #[test]
    fn test_exists_fallback_scans_logical_slugs() {
        let remote = seed_remote();
        let store = store_for(&remote);

        // a legacy entry whose on-disk name diverged from its slug property
        let stray = entry("actual-slug", "Stray");
        seed_entry(&remote, "legacy-name.json", &stray.to_pretty_json().unwrap());

        assert!(store.exists_by_slug("actual-slug").unwrap());
        assert!(store.exists_by_slug("ACTUAL-SLUG").unwrap());
        assert!(!store.exists_by_slug("missing").unwrap());
    }

    #[test]
    fn test_exists_fallback_skips_malformed_entries() {
        let remote = seed_remote();
        let store = store_for(&remote);

        seed_entry(&remote, "broken.json", b"{ not json");
        let good = entry("findable", "Good");
        seed_entry(&remote, "odd-name.json", &good.to_pretty_json().unwrap());

        assert!(store.exists_by_slug("findable").unwrap());
    }

    #[test]
    fn test_stray_working_copy_file_is_never_published() {
        let remote = seed_remote();
        let store = store_for(&remote);

        // a file a half-done operation could have left in the working copy
        {
            let wd = store.workdir.lock();
            fs::create_dir_all(wd.dir.path().join("content")).unwrap();
            fs::write(wd.dir.path().join("content/half-done.json"), b"{}").unwrap();
        }

        store.create(&entry("clean-post", "Clean")).unwrap();

        // the pushed commit contains only the entry the operation named
        let repo = Repository::open_bare(remote.path()).unwrap();
        let tree = repo
            .find_reference(LOCAL_MAIN_REF)
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .tree()
            .unwrap();
        assert!(tree.get_path(Path::new("content/clean-post.json")).is_ok());
        assert!(tree.get_path(Path::new("content/half-done.json")).is_err());
        assert_eq!(
            remote_head_message(&remote),
            "create content entry: clean-post"
        );
    }

    #[test]
    fn test_push_failure_rolls_back_local_commit() {
        let remote = seed_remote();
        let store = store_for(&remote);
        let payload = entry("doomed", "Doomed").to_pretty_json().unwrap();

        let mut wd = store.workdir.lock();
        store.fetch_and_fast_forward(&mut wd).unwrap();
        let base = GitStore::head_commit(&wd.repo).unwrap().id();

        // the remote goes away between the fetch and the push
        fs::remove_dir_all(remote.path()).unwrap();

        let result = store.apply_change(
            &mut wd,
            "create",
            "create content entry: doomed",
            &[("doomed", payload.as_slice())],
            &[],
        );
        assert!(result.is_err());

        // local state is back at the last known-pushed commit, entry and all
        assert_eq!(GitStore::head_commit(&wd.repo).unwrap().id(), base);
        let tree = GitStore::head_commit(&wd.repo).unwrap().tree().unwrap();
        assert!(tree.get_path(Path::new("content/doomed.json")).is_err());
        assert!(!wd.dir.path().join("content/doomed.json").exists());
    }

    #[test]
    fn test_unreachable_remote_surfaces_compound_repair_error() {
        let remote = seed_remote();
        let store = store_for(&remote);

        // neither sync nor re-clone can succeed once the remote is gone
        fs::remove_dir_all(remote.path()).unwrap();

        let err = store.get("https://example.test/post-1").unwrap_err();
        assert!(matches!(
            err,
            StoreError::RepairFailed {
                operation: "sync",
                ..
            }
        ));
    }

    #[test]
    fn test_shutdown_cancels_between_attempts() {
        let remote = seed_remote();
        let store = store_for(&remote);

        store.shutdown_handle().store(true, Ordering::Relaxed);
        let err = store.get("https://example.test/post-1").unwrap_err();
        assert!(matches!(err, StoreError::Cancelled));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let remote = seed_remote();
        let store = store_for(&remote);

        let (url, created) = store.create(&entry("post-1", "Hello")).unwrap();
        assert_eq!(url, "https://example.test/post-1");
        assert!(!created);

        let mut mutation = Mutation::default();
        mutation
            .replace
            .insert(PROP_NAME.to_string(), vec![json!("Updated")]);
        let new_url = store.update(&url, &mutation).unwrap();
        assert_eq!(new_url, "https://example.test/updated");

        let fetched = store.get(&new_url).unwrap();
        assert_eq!(fetched.first_string(PROP_NAME), Some("Updated"));
    }
}
