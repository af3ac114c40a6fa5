//! The local-filesystem content store.
//!
//! Same contract, same mutation/slug engine, no remote: one JSON file per
//! document in a flat directory. Writes are visible as soon as they land on
//! disk, so `create` reports `true` for immediate visibility.

use std::fs;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::model::{apply_mutations, should_recompute_slug, Document, Mutation, PROP_DELETED, PROP_SLUG};
use crate::slug;
use crate::store::config::normalize_base_url;
use crate::store::contract::{resolve_collision, ContentStore};
use crate::store::error::{StoreError, StoreResult};

const ENTRY_SUFFIX: &str = ".json";

/// Content store backed by a directory of JSON files.
pub struct FileStore {
    dir: PathBuf,
    public_base_url: String,
    /// Serializes multi-step write sequences (existence probe, write,
    /// rename) against this directory.
    lock: Mutex<()>,
}

impl FileStore {
    /// Create the store, creating the content directory if needed.
    pub fn new(dir: impl Into<PathBuf>, public_base_url: &str) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            public_base_url: normalize_base_url(public_base_url),
            lock: Mutex::new(()),
        })
    }

    fn entry_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{slug}{ENTRY_SUFFIX}"))
    }

    fn url_for(&self, slug: &str) -> String {
        format!("{}{}", self.public_base_url, slug)
    }

    fn read_entry(&self, slug: &str) -> StoreResult<Document> {
        let bytes = match fs::read(self.entry_path(slug)) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound)
            }
            Err(err) => return Err(err.into()),
        };
        Document::from_json(&bytes).map_err(|_| StoreError::NotFound)
    }

    /// Fast path on the entry filename, fallback scan over every entry's
    /// own slug property (case-insensitive), skipping malformed files.
    fn slug_exists(&self, slug: &str) -> StoreResult<bool> {
        if self.entry_path(slug).exists() {
            return Ok(true);
        }
        for dir_entry in fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Ok(bytes) = fs::read(&path) else { continue };
            let Ok(doc) = Document::from_json(&bytes) else {
                continue;
            };
            if doc.slug().is_some_and(|s| s.eq_ignore_ascii_case(slug)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn write_entry(&self, slug: &str, doc: &Document) -> StoreResult<()> {
        fs::write(self.entry_path(slug), doc.to_pretty_json()?)?;
        Ok(())
    }

    /// Write the entry under its new slug, then drop the old file. If the
    /// removal fails the new file is cleaned up again so exactly one file
    /// claims the document either way.
    fn rename_entry(&self, old_slug: &str, new_slug: &str, doc: &Document) -> StoreResult<()> {
        self.write_entry(new_slug, doc)?;
        if let Err(err) = fs::remove_file(self.entry_path(old_slug)) {
            let _ = fs::remove_file(self.entry_path(new_slug));
            return Err(err.into());
        }
        Ok(())
    }

    fn set_deleted_status(&self, url: &str, deleted: bool) -> StoreResult<String> {
        let slug_value = slug::from_url(url)?;
        let _guard = self.lock.lock();
        let mut doc = self.read_entry(&slug_value)?;
        doc.set_property(PROP_DELETED, vec![Value::Bool(deleted)]);
        self.write_entry(&slug_value, &doc)?;
        Ok(self.url_for(&slug_value))
    }
}

impl ContentStore for FileStore {
    fn create(&self, doc: &Document) -> StoreResult<(String, bool)> {
        let slug_value = doc.slug().ok_or(StoreError::MissingSlug)?.to_string();
        let _guard = self.lock.lock();
        if self.slug_exists(&slug_value)? {
            return Err(StoreError::SlugTaken(slug_value));
        }
        self.write_entry(&slug_value, doc)?;
        debug!(slug = %slug_value, "created content entry");
        Ok((self.url_for(&slug_value), true))
    }

    fn update(&self, url: &str, mutation: &Mutation) -> StoreResult<String> {
        let old_slug = slug::from_url(url)?;
        let _guard = self.lock.lock();
        let mut doc = self.read_entry(&old_slug)?;

        apply_mutations(&mut doc, mutation);
        let mut new_slug = old_slug.clone();
        if should_recompute_slug(mutation) {
            let candidate = slug::compute_new_slug(&doc, &mutation.replace)?;
            new_slug = resolve_collision(&candidate, &old_slug, |probe| self.slug_exists(probe))?;
            doc.set_property(PROP_SLUG, vec![Value::String(new_slug.clone())]);
        }

        if new_slug == old_slug {
            self.write_entry(&old_slug, &doc)?;
        } else {
            self.rename_entry(&old_slug, &new_slug, &doc)?;
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
        let _guard = self.lock.lock();
        self.read_entry(&slug_value)
    }

    fn exists_by_slug(&self, slug_value: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock();
        self.slug_exists(slug_value)
    }
}
