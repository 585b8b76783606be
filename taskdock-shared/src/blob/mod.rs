/// Blob store abstraction
///
/// Uploaded binaries live behind the [`BlobStore`] trait so the disk-backed
/// stand-in can be swapped for a real object store without touching the
/// attachment lifecycle manager. A stored blob is addressed by a *locator*:
/// an opaque string that doubles as the client-facing retrieval URL.
///
/// Keys are collision-resistant (a fresh UUID v4 prefixed to the sanitized
/// original name), so a store never overwrites an existing blob and no two
/// concurrent uploads can race on the same key.
use async_trait::async_trait;
use bytes::Bytes;

pub mod disk;

pub use disk::DiskBlobStore;

/// Error type for blob store operations
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// Backing medium write/delete failure (disk full, permission denied)
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Storage abstraction for arbitrary binary content, keyed by locator
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persists `content` under a fresh, collision-resistant key inside
    /// `category` (a logical namespace such as "profile-images").
    ///
    /// Returns the locator: a URL the client can fetch directly, which is
    /// also the handle for a later [`BlobStore::remove`].
    ///
    /// # Errors
    ///
    /// Returns `BlobError::Io` when the backing medium rejects the write.
    /// The caller must not update any owning record when this fails.
    async fn put(
        &self,
        category: &str,
        original_name: &str,
        content: Bytes,
    ) -> Result<String, BlobError>;

    /// Removes the blob addressed by `locator`.
    ///
    /// Idempotent: removing a missing blob is not an error.
    async fn remove(&self, locator: &str) -> Result<(), BlobError>;
}

/// Sanitizes a filename for use inside a storage key.
///
/// Only ASCII alphanumerics, dots, hyphens, and underscores survive;
/// everything else becomes an underscore. This keeps the key safe as a
/// path segment and as part of a URL.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
