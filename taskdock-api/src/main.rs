//! # Taskdock API Server
//!
//! Multi-user task manager with authenticated file attachments.
//!
//! The server exposes registration/login, owner-scoped task CRUD, and
//! attachment upload/removal; attachment content is stored on disk and
//! served back as static files under `/uploads`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskdock-api
//! ```

use std::sync::Arc;

use taskdock_api::app::{build_router, AppState};
use taskdock_api::config::{Config, StoreBackend};
use taskdock_shared::blob::DiskBlobStore;
use taskdock_shared::store::{self, MemoryStore, PgTaskStore, PgUserStore, TaskStore, UserStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskdock_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskdock API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    tokio::fs::create_dir_all(&config.uploads.dir).await?;

    let (users, tasks): (Arc<dyn UserStore>, Arc<dyn TaskStore>) = match &config.store.backend {
        StoreBackend::Postgres {
            url,
            max_connections,
        } => {
            let pool = store::postgres::connect(url, *max_connections).await?;
            store::postgres::ensure_schema(&pool).await?;
            tracing::info!("connected to postgres");
            (
                Arc::new(PgUserStore::new(pool.clone())),
                Arc::new(PgTaskStore::new(pool)),
            )
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store; data will not survive a restart");
            let store = Arc::new(MemoryStore::new());
            (store.clone(), store)
        }
    };

    let blobs = Arc::new(DiskBlobStore::new(
        &config.uploads.dir,
        &config.api.public_url,
    ));

    let bind_address = config.bind_address();
    let state = AppState::new(users, tasks, blobs, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
