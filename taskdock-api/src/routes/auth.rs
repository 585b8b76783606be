/// Authentication and profile endpoints
///
/// # Endpoints
///
/// - `POST /auth/register` - Register a new user (multipart, optional profile image)
/// - `POST /auth/login` - Login and get a token (JSON)
/// - `GET /auth/profile` - Fetch the authenticated user's profile
/// - `PUT /auth/profile` - Update username and/or profile image (multipart)
use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
    routes::forms::collect_multipart,
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use taskdock_shared::{
    attachments::PROFILE_IMAGES,
    auth::{jwt, password},
    models::{CreateUser, UpdateUser, User},
    store::StoreError,
    upload::{UploadError, UploadPolicy},
};
use uuid::Uuid;
use validator::Validate;

/// Register form fields (multipart text parts)
#[derive(Debug, Validate)]
pub struct RegisterForm {
    /// Unique username
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    pub username: String,

    /// Unique email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Plaintext password, hashed before storage
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Email address
    pub email: String,

    /// Password
    pub password: String,
}

/// User representation returned by the API; never carries the hash
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User ID
    pub id: Uuid,

    /// Username
    pub username: String,

    /// Email address
    pub email: String,

    /// Profile image locator, if one is set
    pub profile_image: Option<String>,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            profile_image: user.profile_image.clone(),
            created_at: user.created_at,
        }
    }
}

/// Response for register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// Outcome description
    pub message: String,

    /// The user
    pub user: UserResponse,

    /// Bearer token for subsequent requests
    pub token: String,
}

/// Response for profile updates
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    /// Outcome description
    pub message: String,

    /// The updated user
    pub user: UserResponse,
}

/// Flattens validator output into the single-message error body.
fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(_, errs)| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .next()
        .unwrap_or_else(|| "Validation failed".to_string())
}

/// Signs a token for the user with the configured TTL.
fn issue_token(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let claims = jwt::Claims::with_expiration(user_id, Duration::days(state.config.jwt.ttl_days));
    Ok(jwt::create_token(&claims, state.jwt_secret())?)
}

/// Register a new user
///
/// Accepts multipart form data: `username`, `email`, `password` text
/// fields and an optional profile image file.
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, duplicate email/username, or
///   the profile image was screened out
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let form = collect_multipart(multipart, "profileImage").await?;

    let req = RegisterForm {
        username: form
            .text_owned("username")
            .ok_or_else(|| ApiError::BadRequest("Username is required".to_string()))?,
        email: form
            .text_owned("email")
            .ok_or_else(|| ApiError::BadRequest("Email is required".to_string()))?,
        password: form
            .text_owned("password")
            .ok_or_else(|| ApiError::BadRequest("Password is required".to_string()))?,
    };
    req.validate()
        .map_err(|e| ApiError::BadRequest(validation_message(&e)))?;

    // Duplicate check covers both identity fields with a single message
    if state
        .users
        .find_by_username_or_email(&req.username, &req.email)
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "User already exists with this email or username".to_string(),
        ));
    }

    let password_hash = password::hash_password(&req.password)?;

    // The profile image is screened and stored before the user exists;
    // a create failure below must clean the blob up again.
    let policy = UploadPolicy::profile_image();
    if form.files.len() > policy.max_files {
        return Err(UploadError::TooManyFiles {
            limit: policy.max_files,
        }
        .into());
    }

    let mut profile_image = None;
    if let Some(file) = form.files.into_iter().next() {
        policy.screen(&file)?;
        let locator = state
            .blobs
            .put(PROFILE_IMAGES, &file.filename, file.data)
            .await?;
        profile_image = Some(locator);
    }

    let created = state
        .users
        .create(CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            profile_image: profile_image.clone(),
        })
        .await;

    let user = match created {
        Ok(user) => user,
        Err(e) => {
            if let Some(locator) = &profile_image {
                if let Err(cleanup) = state.blobs.remove(locator).await {
                    tracing::warn!(
                        locator = %locator,
                        error = %cleanup,
                        "failed to clean up orphaned profile image"
                    );
                }
            }
            return Err(match e {
                // The unique index caught a race the pre-check missed
                StoreError::Duplicate(_) => ApiError::BadRequest(
                    "User already exists with this email or username".to_string(),
                ),
                other => other.into(),
            });
        }
    };

    let token = issue_token(&state, user.id)?;

    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            user: UserResponse::from(&user),
            token,
        }),
    ))
}

/// Login
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password, indistinguishably
/// - `500 Internal Server Error`: Server error
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = state
        .users
        .find_by_email(&req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid credentials".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let token = issue_token(&state, user.id)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        user: UserResponse::from(&user),
        token,
    }))
}

/// Fetch the authenticated user's profile
pub async fn get_profile(
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// Update form fields for the profile endpoint
#[derive(Debug, Validate)]
struct UpdateProfileForm {
    #[validate(length(min = 3, max = 30, message = "Username must be 3-30 characters"))]
    username: String,
}

/// Update username and/or profile image
///
/// Multipart form data; both parts are optional and absent fields leave
/// the record untouched. A new profile image replaces the old one and the
/// superseded blob is deleted.
///
/// # Errors
///
/// - `400 Bad Request`: Username taken or invalid, or the image was
///   screened out
/// - `500 Internal Server Error`: Server error
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<Json<ProfileResponse>> {
    let form = collect_multipart(multipart, "profileImage").await?;

    let mut user = user;

    if let Some(username) = form.text_owned("username") {
        let update = UpdateProfileForm { username };
        update
            .validate()
            .map_err(|e| ApiError::BadRequest(validation_message(&e)))?;

        user = state
            .users
            .update(
                user.id,
                UpdateUser {
                    username: Some(update.username),
                    ..Default::default()
                },
            )
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    }

    if form.files.len() > 1 {
        return Err(UploadError::TooManyFiles { limit: 1 }.into());
    }
    if let Some(file) = form.files.into_iter().next() {
        user = state.attachments.attach_to_user(&user, file).await?;
    }

    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".to_string(),
        user: UserResponse::from(&user),
    }))
}
