/// Common test utilities for integration tests
///
/// This module provides shared infrastructure for integration tests:
/// - App construction over the in-memory store and a temp-dir blob store
/// - Request helpers driving the router via `tower::ServiceExt`
/// - A multipart body builder for the upload endpoints
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, Response, StatusCode};
use taskdock_api::app::{build_router, AppState};
use taskdock_api::config::{
    ApiConfig, Config, JwtConfig, StoreBackend, StoreConfig, UploadsConfig,
};
use taskdock_shared::blob::DiskBlobStore;
use taskdock_shared::store::MemoryStore;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const PUBLIC_URL: &str = "http://localhost:8080";

/// Test context containing the app and its blob directory
pub struct TestContext {
    pub app: axum::Router,
    pub uploads_dir: PathBuf,
    _uploads: tempfile::TempDir,
}

impl TestContext {
    /// Creates a fresh app over empty stores and an empty blob directory
    pub fn new() -> Self {
        let uploads = tempfile::tempdir().expect("failed to create temp dir");

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                public_url: PUBLIC_URL.to_string(),
            },
            store: StoreConfig {
                backend: StoreBackend::Memory,
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
                ttl_days: 7,
            },
            uploads: UploadsConfig {
                dir: uploads.path().to_path_buf(),
            },
        };

        let store = Arc::new(MemoryStore::new());
        let blobs = Arc::new(DiskBlobStore::new(uploads.path(), PUBLIC_URL));
        let state = AppState::new(store.clone(), store, blobs, config);

        Self {
            app: build_router(state),
            uploads_dir: uploads.path().to_path_buf(),
            _uploads: uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("request failed")
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(build_request("GET", uri, token, None, Body::empty()))
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        self.send(build_request("DELETE", uri, token, None, Body::empty()))
            .await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Response<Body> {
        self.send(build_request(
            "POST",
            uri,
            token,
            Some("application/json".to_string()),
            Body::from(body.to_string()),
        ))
        .await
    }

    pub async fn post_multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        form: MultipartBody,
    ) -> Response<Body> {
        self.send(build_request(
            "POST",
            uri,
            token,
            Some(form.content_type()),
            Body::from(form.finish()),
        ))
        .await
    }

    pub async fn put_multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        form: MultipartBody,
    ) -> Response<Body> {
        self.send(build_request(
            "PUT",
            uri,
            token,
            Some(form.content_type()),
            Body::from(form.finish()),
        ))
        .await
    }
}

fn build_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    content_type: Option<String>,
    body: Body,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);

    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }

    builder.body(body).expect("failed to build request")
}

/// Reads the full response body
pub async fn raw_body(response: Response<Body>) -> Bytes {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body")
}

/// Reads and parses a JSON response body
pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = raw_body(response).await;
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

/// Builder for `multipart/form-data` request bodies
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: format!("----taskdock-test-{}", uuid::Uuid::new_v4().simple()),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        self.body.extend_from_slice(value.as_bytes());
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body
            .extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
        self.body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        self.body
            .extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

/// Registers a user and returns (user, token)
pub async fn register_user(
    ctx: &TestContext,
    username: &str,
    email: &str,
) -> (serde_json::Value, String) {
    let form = MultipartBody::new()
        .text("username", username)
        .text("email", email)
        .text("password", "password123");

    let response = ctx.post_multipart("/auth/register", None, form).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = json_body(response).await;
    let token = body["token"].as_str().expect("token missing").to_string();

    (body["user"].clone(), token)
}

/// Turns a locator minted by the test app into a fetchable request path
pub fn locator_path(locator: &str) -> String {
    locator
        .strip_prefix(PUBLIC_URL)
        .expect("locator not under the public URL")
        .to_string()
}
