/// Disk-backed blob store
///
/// Stands in for an object store during local operation: blobs land under
/// `{root}/{category}/{key}` and are served back as static content at
/// `{public_base_url}/uploads/{category}/{key}`. The locator embeds the
/// category and key, so deletion only needs the locator.
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::{sanitize_filename, BlobError, BlobStore};

/// Blob store writing to a local directory tree
#[derive(Debug, Clone)]
pub struct DiskBlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl DiskBlobStore {
    /// Creates a store rooted at `root`, issuing locators under
    /// `public_base_url` (trailing slashes are trimmed).
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    /// Directory all blobs live under; the HTTP layer serves it statically.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a locator back to the on-disk path from its last two segments
    /// (`.../{category}/{key}`), mirroring how locators are minted.
    fn path_for_locator(&self, locator: &str) -> Option<PathBuf> {
        let mut segments = locator.rsplit('/');
        let key = segments.next()?;
        let category = segments.next()?;
        if key.is_empty() || category.is_empty() || key == ".." || category == ".." {
            return None;
        }
        Some(self.root.join(category).join(key))
    }
}

#[async_trait]
impl BlobStore for DiskBlobStore {
    async fn put(
        &self,
        category: &str,
        original_name: &str,
        content: Bytes,
    ) -> Result<String, BlobError> {
        let key = format!("{}-{}", Uuid::new_v4(), sanitize_filename(original_name));

        let dir = self.root.join(category);
        tokio::fs::create_dir_all(&dir).await?;

        let path = dir.join(&key);
        tokio::fs::write(&path, &content).await?;

        tracing::debug!(
            category = category,
            key = %key,
            bytes = content.len(),
            "stored blob"
        );

        Ok(format!(
            "{}/uploads/{}/{}",
            self.public_base_url, category, key
        ))
    }

    async fn remove(&self, locator: &str) -> Result<(), BlobError> {
        let Some(path) = self.path_for_locator(locator) else {
            // Nothing this store could have minted; treat like a missing blob
            tracing::debug!(locator = locator, "ignoring unparseable locator");
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Io(e)),
        }
    }
}
