/// Upload intake filter
///
/// Screens candidate files before they reach the attachment lifecycle
/// manager. A candidate passes when its declared MIME type is on the
/// allow-list and its size is within the cap. Count bounds are enforced
/// per endpoint (1 profile image, 5 task attachments).
///
/// Rejection of one file in a batch never silently drops the others; the
/// lifecycle manager records each rejection in an explicit partial-success
/// outcome so callers can see which files failed and why.
use bytes::Bytes;

/// 5 MiB per-file size cap
pub const MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Declared MIME types accepted for upload
pub const ALLOWED_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// A file candidate extracted from a multipart request
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// Original filename as sent by the client
    pub filename: String,

    /// Declared MIME type
    pub content_type: String,

    /// Raw content
    pub data: Bytes,
}

/// Error type for intake screening
#[derive(Debug, Clone, thiserror::Error)]
pub enum UploadError {
    /// Declared MIME type is not on the allow-list
    #[error("Unsupported file type: {0}")]
    UnsupportedMediaType(String),

    /// File exceeds the per-file size cap
    #[error("File too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Batch carries more files than the endpoint allows
    #[error("Too many files: limit is {limit}")]
    TooManyFiles { limit: usize },
}

/// Screening policy for an upload endpoint
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Accepted MIME types
    pub allowed_types: Vec<String>,

    /// Per-file size cap in bytes
    pub max_file_size: usize,

    /// Maximum number of files per request
    pub max_files: usize,
}

impl UploadPolicy {
    /// Policy for task attachment uploads: up to 5 files per request
    pub fn task_attachments() -> Self {
        Self {
            allowed_types: ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
            max_file_size: MAX_FILE_SIZE,
            max_files: 5,
        }
    }

    /// Policy for profile image uploads: a single file per request
    pub fn profile_image() -> Self {
        Self {
            max_files: 1,
            ..Self::task_attachments()
        }
    }

    /// Screens a single candidate file
    ///
    /// # Errors
    ///
    /// - `UploadError::UnsupportedMediaType` if the declared type is not allowed
    /// - `UploadError::PayloadTooLarge` if the content exceeds the cap
    pub fn screen(&self, file: &IncomingFile) -> Result<(), UploadError> {
        if !self.allowed_types.iter().any(|t| t == &file.content_type) {
            return Err(UploadError::UnsupportedMediaType(file.content_type.clone()));
        }

        if file.data.len() > self.max_file_size {
            return Err(UploadError::PayloadTooLarge {
                size: file.data.len(),
                limit: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Screens a file's position in the batch against the count bound
    ///
    /// Files past the bound are rejected individually rather than failing
    /// the whole request, consistent with the per-file best-effort policy.
    pub fn screen_count(&self, index: usize) -> Result<(), UploadError> {
        if index >= self.max_files {
            return Err(UploadError::TooManyFiles {
                limit: self.max_files,
            });
        }
        Ok(())
    }
}
