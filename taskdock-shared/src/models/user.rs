/// User model
///
/// A user is an identity record: globally unique email and username, an
/// Argon2id password hash, and an optional profile image locator pointing
/// at a live blob store entry.
///
/// The password hash never leaves this type through serialization; API
/// responses use a dedicated DTO that omits it.
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// User account record
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Unique username
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2id password hash, never plaintext
    pub password_hash: String,

    /// Locator of the current profile image blob, if one is set
    pub profile_image: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Unique username
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Optional profile image locator
    pub profile_image: Option<String>,
}

/// Input for updating an existing user
///
/// Only non-None fields are updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    /// New username
    pub username: Option<String>,

    /// New profile image locator
    pub profile_image: Option<String>,
}
