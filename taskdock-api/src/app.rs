/// Application state, router builder, and auth middleware
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdock_api::{app::AppState, config::Config};
/// use taskdock_shared::blob::DiskBlobStore;
/// use taskdock_shared::store::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let store = Arc::new(MemoryStore::new());
/// let blobs = Arc::new(DiskBlobStore::new(
///     &config.uploads.dir,
///     &config.api.public_url,
/// ));
/// let state = AppState::new(store.clone(), store, blobs, config);
/// let app = taskdock_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```
use crate::config::Config;
use crate::error::ApiError;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskdock_shared::attachments::AttachmentManager;
use taskdock_shared::auth::jwt;
use taskdock_shared::blob::BlobStore;
use taskdock_shared::models::User;
use taskdock_shared::store::{TaskStore, UserStore};
use taskdock_shared::upload::MAX_FILE_SIZE;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Request body cap: a full task attachment batch plus multipart overhead
const BODY_LIMIT: usize = 6 * MAX_FILE_SIZE;

/// The authenticated user, injected into request extensions by
/// [`require_auth`] and extracted by protected handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// User record store
    pub users: Arc<dyn UserStore>,

    /// Task record store
    pub tasks: Arc<dyn TaskStore>,

    /// Blob store for attachment content
    pub blobs: Arc<dyn BlobStore>,

    /// Attachment lifecycle manager
    pub attachments: Arc<AttachmentManager>,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state, wiring the attachment manager to the
    /// given stores.
    pub fn new(
        users: Arc<dyn UserStore>,
        tasks: Arc<dyn TaskStore>,
        blobs: Arc<dyn BlobStore>,
        config: Config,
    ) -> Self {
        let attachments = Arc::new(AttachmentManager::new(
            blobs.clone(),
            users.clone(),
            tasks.clone(),
        ));

        Self {
            users,
            tasks,
            blobs,
            attachments,
            config: Arc::new(config),
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                        # Health check (public)
/// ├── /auth/
/// │   ├── POST /register             # Register (multipart, public)
/// │   ├── POST /login                # Login (JSON, public)
/// │   └── GET|PUT /profile           # Profile (authenticated)
/// ├── /tasks/                        # All authenticated
/// │   ├── GET|POST /
/// │   ├── GET|PUT|DELETE /:id
/// │   └── POST /:id/remove-attachment
/// └── /uploads/*                     # Static blob retrieval (public)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (permissive)
/// 3. Body size limit
/// 4. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Registration and login (public, no auth required)
    let auth_public = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    // Profile routes (require JWT authentication)
    let profile_routes = Router::new()
        .route(
            "/profile",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Task routes (require JWT authentication)
    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:id/remove-attachment",
            post(routes::tasks::remove_attachment),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_public.merge(profile_routes))
        .nest("/tasks", task_routes)
        // Blob retrieval is static content; locators resolve here
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .with_state(state)
}

/// JWT authentication middleware
///
/// Extracts and validates the bearer token from the Authorization header,
/// resolves the user, and injects [`CurrentUser`] into request extensions.
/// Every failure mode is the same 401 to the client; expired and malformed
/// tokens are logged distinctly.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Expected Bearer token".to_string()))?;

    let claims = match jwt::validate_token(token, state.jwt_secret()) {
        Ok(claims) => claims,
        Err(e @ jwt::JwtError::Expired) => {
            tracing::debug!("rejected expired token");
            return Err(e.into());
        }
        Err(e) => {
            tracing::debug!(error = %e, "rejected invalid token");
            return Err(e.into());
        }
    };

    // A token for a deleted user is rejected here
    let user = state
        .users
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
