/// Record stores
///
/// The document database is an external collaborator; these traits are its
/// boundary. The only guarantees the rest of the system relies on are
/// atomic single-record writes and unique-index enforcement on user email
/// and username.
///
/// Two backends ship: [`postgres`] for real deployments and [`memory`] for
/// tests and storage-free operation.
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{CreateTask, CreateUser, Task, UpdateTask, UpdateUser, User};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{PgTaskStore, PgUserStore};

/// Error type for record store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write; the field name is reported
    #[error("Duplicate value for {0}")]
    Duplicate(&'static str),

    /// The record does not exist (or is not visible to the caller)
    #[error("Record not found")]
    NotFound,

    /// Backend failure (connection loss, malformed row, ...)
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                let constraint = db_err.constraint().unwrap_or_default();
                if constraint.contains("email") {
                    StoreError::Duplicate("email")
                } else if constraint.contains("username") {
                    StoreError::Duplicate("username")
                } else {
                    StoreError::Backend(format!("Unique violation: {}", db_err))
                }
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

/// User record store
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// `StoreError::Duplicate` when the email or username is already taken.
    async fn create(&self, data: CreateUser) -> Result<User, StoreError>;

    /// Looks a user up by ID.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Looks a user up by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Returns any user holding either identity field. Used for the
    /// pre-registration duplicate check.
    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Applies the non-None fields of `data`; returns the updated user,
    /// or None when the user does not exist.
    async fn update(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError>;
}

/// Task record store
///
/// Every read and write is scoped to the owning user where an ID is
/// involved, so a task owned by someone else looks exactly like a task
/// that does not exist.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Inserts a new task.
    async fn create(&self, data: CreateTask) -> Result<Task, StoreError>;

    /// Lists the user's tasks, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;

    /// Fetches a task by ID, only if `user_id` owns it.
    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Applies the non-None fields of `data` and refreshes `updated_at`;
    /// returns the updated task, or None when the task does not exist.
    async fn update(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError>;

    /// Deletes a task. Returns whether a record was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
