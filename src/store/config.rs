//! Store construction parameters.
//!
//! Repository URL, path prefix, public base URL, and credentials all come
//! from external configuration; this crate never reads configuration files
//! itself. The structs here are `Deserialize` so a caller can embed them in
//! whatever config format it loads.

use std::path::PathBuf;

use git2::{Cred, FetchOptions, PushOptions, RemoteCallbacks};
use serde::Deserialize;

/// Configuration for the git-backed store.
#[derive(Debug, Clone, Deserialize)]
pub struct GitStoreConfig {
    /// Remote repository URL (https, ssh, or a local path in tests).
    pub remote_url: String,
    /// Directory inside the repository that holds content entries.
    #[serde(default)]
    pub path_prefix: String,
    /// Base URL documents are published under; a trailing slash is enforced
    /// at store construction.
    pub public_base_url: String,
    #[serde(default)]
    pub auth: GitAuth,
    #[serde(default)]
    pub author: CommitAuthor,
}

/// Credentials for the remote repository.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum GitAuth {
    #[default]
    None,
    UserPass {
        username: String,
        password: String,
    },
    SshKey {
        key_path: PathBuf,
        passphrase: Option<String>,
    },
}

impl GitAuth {
    pub(crate) fn callbacks(&self) -> RemoteCallbacks<'static> {
        let auth = self.clone();
        let mut callbacks = RemoteCallbacks::new();
        callbacks.credentials(move |_url, username_from_url, _allowed| match &auth {
            GitAuth::None => Cred::default(),
            GitAuth::UserPass { username, password } => {
                Cred::userpass_plaintext(username, password)
            }
            GitAuth::SshKey {
                key_path,
                passphrase,
            } => Cred::ssh_key(
                username_from_url.unwrap_or("git"),
                None,
                key_path,
                passphrase.as_deref(),
            ),
        });
        callbacks
    }

    pub(crate) fn fetch_options(&self) -> FetchOptions<'static> {
        let mut options = FetchOptions::new();
        options.remote_callbacks(self.callbacks());
        options
    }

    pub(crate) fn push_options(&self) -> PushOptions<'static> {
        let mut options = PushOptions::new();
        options.remote_callbacks(self.callbacks());
        options
    }
}

/// Author/committer identity for content commits.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "scribble".to_string(),
            email: "scribble@localhost".to_string(),
        }
    }
}

impl CommitAuthor {
    pub(crate) fn signature(&self) -> Result<git2::Signature<'static>, git2::Error> {
        git2::Signature::now(&self.name, &self.email)
    }
}

/// Normalize a public base URL once at store construction: trim whitespace
/// and enforce a trailing slash so `base + slug` is always well-formed.
pub(crate) fn normalize_base_url(base: &str) -> String {
    let mut url = base.trim().to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}
