//! File storage for onboarding documents (photos, certificates, ID scans).
//!
//! Uploads are addressed by a relative path such as
//! `users/{uid}/profile/{name}` and resolve to a content URL.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::error::StorageError;

/// Upload contract: store bytes at `path`, return a URL that serves them.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn upload(&self, path: &str, content: &[u8]) -> Result<String, StorageError>;
}

/// Disk-backed file store.
///
/// Files land under `root`; URLs are `public_base_url` joined with the
/// relative path.
pub struct LocalFileStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalFileStore {
    /// Create a store rooted at `root`, serving under `public_base_url`.
    pub fn new(root: PathBuf, public_base_url: impl Into<String>) -> Self {
        Self {
            root,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Ensure the root directory exists.
    pub async fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Resolve a relative upload path to an absolute path under the root.
    ///
    /// Rejects absolute paths and any `..` component.
    pub fn resolve_path(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let rel = Path::new(relative);
        let clean = !relative.is_empty()
            && rel
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !clean {
            return Err(StorageError::InvalidPath(relative.to_string()));
        }
        Ok(self.root.join(rel))
    }

    fn url_for(&self, relative: &str) -> String {
        format!("{}/{}", self.public_base_url, relative)
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn upload(&self, path: &str, content: &[u8]) -> Result<String, StorageError> {
        let full_path = self.resolve_path(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full_path, content)
            .await
            .map_err(|e| StorageError::UploadFailed {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        debug!(path, bytes = content.len(), "File uploaded");
        Ok(self.url_for(path))
    }
}

/// Strip directories and awkward characters from a client-supplied name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
