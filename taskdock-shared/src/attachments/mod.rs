/// Attachment lifecycle manager
///
/// Orchestrates validate → store → associate → disassociate → delete for
/// attachments belonging to a user (profile image) or a task (attachment
/// list). The owning record always stores plain locator strings; the
/// manager is the only component that touches both a record store and the
/// blob store, so all partial-failure bookkeeping lives here:
///
/// - Batch task uploads are per-file best-effort: one bad file is recorded
///   and skipped, the rest still land, and the task record is persisted
///   once after all attempts. Callers get an explicit [`BatchOutcome`]
///   instead of a silently shortened list.
/// - A replaced profile image's old blob is deleted (best-effort) before
///   the new locator is persisted, so superseded blobs do not leak.
/// - If persisting the owning record fails after a blob was written, the
///   fresh blob is cleaned up so nothing is orphaned.
use std::sync::Arc;

use serde::Serialize;

use crate::blob::{BlobError, BlobStore};
use crate::models::{Task, UpdateTask, UpdateUser, User};
use crate::store::{StoreError, TaskStore, UserStore};
use crate::upload::{IncomingFile, UploadError, UploadPolicy};

/// Blob category for profile images
pub const PROFILE_IMAGES: &str = "profile-images";

/// Blob category for task attachments
pub const TASK_ATTACHMENTS: &str = "task-attachments";

/// Error type for attachment lifecycle operations
#[derive(Debug, thiserror::Error)]
pub enum AttachError {
    /// The intake filter rejected the file
    #[error(transparent)]
    Rejected(#[from] UploadError),

    /// The blob store failed
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The record store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The locator is not on the task's attachment list
    #[error("Attachment not found in this task")]
    AttachmentNotFound,
}

/// One file that did not make it into a batch
#[derive(Debug, Clone, Serialize)]
pub struct RejectedFile {
    /// Original filename
    pub filename: String,

    /// Why it was skipped
    pub reason: String,
}

/// Partial-success result of a batch upload
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    /// Locators of the files that were stored, in input order
    pub succeeded: Vec<String>,

    /// Files that were screened out or failed to store
    pub failed: Vec<RejectedFile>,
}

/// Coordinates attachment creation, association, and removal
pub struct AttachmentManager {
    blobs: Arc<dyn BlobStore>,
    users: Arc<dyn UserStore>,
    tasks: Arc<dyn TaskStore>,
    profile_policy: UploadPolicy,
    task_policy: UploadPolicy,
}

impl AttachmentManager {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            blobs,
            users,
            tasks,
            profile_policy: UploadPolicy::profile_image(),
            task_policy: UploadPolicy::task_attachments(),
        }
    }

    /// Policy applied to task attachment batches
    pub fn task_policy(&self) -> &UploadPolicy {
        &self.task_policy
    }

    /// Stores `file` as the user's profile image and persists the new
    /// locator, deleting any superseded blob first.
    ///
    /// Unlike batch task uploads this path is strict: a screened-out file
    /// fails the operation, since the request carries nothing else.
    ///
    /// # Errors
    ///
    /// - `AttachError::Rejected` if the intake filter refuses the file
    /// - `AttachError::Blob` if the blob store cannot persist it
    /// - `AttachError::Store` if the user record cannot be updated; the
    ///   fresh blob is removed again so it does not orphan
    pub async fn attach_to_user(
        &self,
        user: &User,
        file: IncomingFile,
    ) -> Result<User, AttachError> {
        self.profile_policy.screen(&file)?;

        let locator = self
            .blobs
            .put(PROFILE_IMAGES, &file.filename, file.data)
            .await?;

        // Delete the superseded blob before persisting the new reference
        if let Some(old) = &user.profile_image {
            if let Err(e) = self.blobs.remove(old).await {
                tracing::warn!(locator = %old, error = %e, "failed to delete superseded profile image");
            }
        }

        let update = UpdateUser {
            profile_image: Some(locator.clone()),
            ..Default::default()
        };

        match self.users.update(user.id, update).await {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => {
                self.discard(&locator).await;
                Err(AttachError::Store(StoreError::NotFound))
            }
            Err(e) => {
                self.discard(&locator).await;
                Err(AttachError::Store(e))
            }
        }
    }

    /// Stores a batch of files for a task, appends the successful locators
    /// to the task's attachment list, and persists the task once after all
    /// attempts complete.
    ///
    /// Per-file best-effort: screening and storage failures are recorded
    /// in the returned [`BatchOutcome`] and never fail the operation.
    ///
    /// # Errors
    ///
    /// `AttachError::Store` only, when the task record itself cannot be
    /// persisted; any blobs written for this batch are removed again.
    pub async fn attach_to_task(
        &self,
        task: Task,
        files: Vec<IncomingFile>,
    ) -> Result<(Task, BatchOutcome), AttachError> {
        let outcome = self.store_batch(files).await;

        if outcome.succeeded.is_empty() {
            return Ok((task, outcome));
        }

        let mut attachments = task.attachments.clone();
        attachments.extend(outcome.succeeded.iter().cloned());

        let update = UpdateTask {
            attachments: Some(attachments),
            ..Default::default()
        };

        match self.tasks.update(task.id, update).await {
            Ok(Some(updated)) => Ok((updated, outcome)),
            Ok(None) => {
                self.discard_batch(&outcome.succeeded).await;
                Err(AttachError::Store(StoreError::NotFound))
            }
            Err(e) => {
                self.discard_batch(&outcome.succeeded).await;
                Err(AttachError::Store(e))
            }
        }
    }

    /// Deletes the blob behind `locator` and drops it from the task's
    /// attachment list.
    ///
    /// # Errors
    ///
    /// - `AttachError::AttachmentNotFound` if the locator is not on the
    ///   task; the task record is left untouched
    /// - `AttachError::Blob` if the blob deletion fails; the locator stays
    ///   on the task so it is not dangled
    pub async fn detach_from_task(
        &self,
        task: Task,
        locator: &str,
    ) -> Result<Task, AttachError> {
        if !task.attachments.iter().any(|a| a == locator) {
            return Err(AttachError::AttachmentNotFound);
        }

        self.blobs.remove(locator).await?;

        let remaining: Vec<String> = task
            .attachments
            .iter()
            .filter(|a| a.as_str() != locator)
            .cloned()
            .collect();

        let update = UpdateTask {
            attachments: Some(remaining),
            ..Default::default()
        };

        match self.tasks.update(task.id, update).await? {
            Some(updated) => Ok(updated),
            None => Err(AttachError::Store(StoreError::NotFound)),
        }
    }

    /// Deletes every blob the task references, best-effort per blob.
    ///
    /// A failed deletion is logged and never blocks the remaining blobs or
    /// the task record deletion the caller performs afterwards.
    pub async fn delete_all_for_task(&self, task: &Task) {
        for locator in &task.attachments {
            if let Err(e) = self.blobs.remove(locator).await {
                tracing::warn!(
                    task_id = %task.id,
                    locator = %locator,
                    error = %e,
                    "failed to delete task attachment blob"
                );
            }
        }
    }

    /// Removes an orphaned blob after the owning record failed to persist.
    async fn discard(&self, locator: &str) {
        if let Err(e) = self.blobs.remove(locator).await {
            tracing::warn!(locator = %locator, error = %e, "failed to clean up orphaned blob");
        }
    }

    async fn discard_batch(&self, locators: &[String]) {
        for locator in locators {
            self.discard(locator).await;
        }
    }

    /// Runs the intake filter and blob store over a batch, sequentially so
    /// the locator list preserves input order.
    async fn store_batch(&self, files: Vec<IncomingFile>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (index, file) in files.into_iter().enumerate() {
            if let Err(e) = self
                .task_policy
                .screen_count(index)
                .and_then(|()| self.task_policy.screen(&file))
            {
                tracing::warn!(filename = %file.filename, reason = %e, "skipping rejected upload");
                outcome.failed.push(RejectedFile {
                    filename: file.filename,
                    reason: e.to_string(),
                });
                continue;
            }

            match self
                .blobs
                .put(TASK_ATTACHMENTS, &file.filename, file.data)
                .await
            {
                Ok(locator) => outcome.succeeded.push(locator),
                Err(e) => {
                    tracing::warn!(filename = %file.filename, error = %e, "failed to store upload");
                    outcome.failed.push(RejectedFile {
                        filename: file.filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        outcome
    }
}
