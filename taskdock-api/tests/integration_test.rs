/// End-to-end tests driving the full router
///
/// These run against the in-memory record store and a temp-dir blob store,
/// so they exercise the real middleware, handlers, screening, and blob
/// lifecycle without external services.
mod common;

use axum::http::StatusCode;
use common::{json_body, locator_path, raw_body, register_user, MultipartBody, TestContext};

const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake image content";

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();

    let response = ctx.get("/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "OK");
    assert_eq!(body["message"], "Server is running");
}

#[tokio::test]
async fn test_register_login_profile_flow() {
    let ctx = TestContext::new();

    let (user, token) = register_user(&ctx, "alice", "alice@example.com").await;
    assert_eq!(user["username"], "alice");
    assert_eq!(user["email"], "alice@example.com");
    assert!(user["profileImage"].is_null());
    // The hash must never appear in any response shape
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    // Same email, different username: one shared duplicate message
    let form = MultipartBody::new()
        .text("username", "alice2")
        .text("email", "alice@example.com")
        .text("password", "password123");
    let response = ctx.post_multipart("/auth/register", None, form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(
        body["message"],
        "User already exists with this email or username"
    );

    // Login with the right password
    let response = ctx
        .post_json(
            "/auth/login",
            None,
            serde_json::json!({"email": "alice@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Login successful");
    assert!(body["token"].is_string());

    // Wrong password and unknown email are indistinguishable
    let response = ctx
        .post_json(
            "/auth/login",
            None,
            serde_json::json!({"email": "alice@example.com", "password": "wrong"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Invalid credentials");

    let response = ctx
        .post_json(
            "/auth/login",
            None,
            serde_json::json!({"email": "nobody@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Invalid credentials");

    // Profile round trip
    let response = ctx.get("/auth/profile", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["username"], "alice");
    assert!(body["createdAt"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();

    let response = ctx.get("/tasks", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx.get("/tasks", Some("not-a-jwt")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Invalid token");

    let response = ctx.get("/auth/profile", None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_task_crud_flow() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "bob", "bob@example.com").await;

    // Create with explicit fields
    let form = MultipartBody::new()
        .text("title", "Write report")
        .text("description", "Quarterly numbers")
        .text("status", "in-progress")
        .text("priority", "high")
        .text("dueDate", "2026-09-01T12:00:00Z");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Task created successfully");
    let task = &body["task"];
    assert_eq!(task["title"], "Write report");
    assert_eq!(task["status"], "in-progress");
    assert_eq!(task["priority"], "high");
    assert!(task["dueDate"].as_str().unwrap().starts_with("2026-09-01"));
    let task_id = task["id"].as_str().unwrap().to_string();

    // Defaults apply when fields are absent
    let form = MultipartBody::new().text("title", "Second task");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["task"]["status"], "pending");
    assert_eq!(body["task"]["priority"], "medium");

    // List is newest first
    let response = ctx.get("/tasks", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Second task", "Write report"]);

    // Fetch one
    let response = ctx.get(&format!("/tasks/{}", task_id), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Partial update leaves other fields alone
    let form = MultipartBody::new().text("status", "completed");
    let response = ctx
        .put_multipart(&format!("/tasks/{}", task_id), Some(&token), form)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["task"]["status"], "completed");
    assert_eq!(body["task"]["title"], "Write report");

    // Delete, then the task is gone
    let response = ctx.delete(&format!("/tasks/{}", task_id), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        json_body(response).await["message"],
        "Task deleted successfully"
    );

    let response = ctx.get(&format!("/tasks/{}", task_id), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["message"], "Task not found");
}

#[tokio::test]
async fn test_create_task_field_validation() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "carol", "carol@example.com").await;

    let form = MultipartBody::new().text("description", "no title");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Title is required");

    let form = MultipartBody::new().text("title", "T").text("status", "done");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["message"], "Invalid status: done");

    let form = MultipartBody::new()
        .text("title", "T")
        .text("dueDate", "next tuesday");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_owner_isolation() {
    let ctx = TestContext::new();
    let (_, alice_token) = register_user(&ctx, "alice", "alice@example.com").await;
    let (_, bob_token) = register_user(&ctx, "bob", "bob@example.com").await;

    let form = MultipartBody::new().text("title", "Alice's secret");
    let response = ctx.post_multipart("/tasks", Some(&alice_token), form).await;
    let task_id = json_body(response).await["task"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    // A foreign task is a 404, not a 401/403, so existence does not leak
    let response = ctx
        .get(&format!("/tasks/{}", task_id), Some(&bob_token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["message"], "Task not found");

    let response = ctx
        .delete(&format!("/tasks/{}", task_id), Some(&bob_token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = ctx.get("/tasks", Some(&bob_token)).await;
    assert!(json_body(response).await.as_array().unwrap().is_empty());

    // Alice still has it
    let response = ctx
        .get(&format!("/tasks/{}", task_id), Some(&alice_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_attachment_batch_partial_success() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "dave", "dave@example.com").await;

    let form = MultipartBody::new()
        .text("title", "With files")
        .file("attachments", "photo.png", "image/png", PNG_BYTES)
        .file("attachments", "run.exe", "application/x-msdownload", b"MZ")
        .file("attachments", "notes.pdf", "application/pdf", b"%PDF-1.4");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;

    // One rejection, two successes; the rejection did not fail the request
    let uploads = &body["uploads"];
    assert_eq!(uploads["succeeded"].as_array().unwrap().len(), 2);
    assert_eq!(uploads["failed"].as_array().unwrap().len(), 1);
    assert_eq!(uploads["failed"][0]["filename"], "run.exe");

    let attachments = body["task"]["attachments"].as_array().unwrap();
    assert_eq!(attachments.len(), 2);
    assert!(attachments[0].as_str().unwrap().contains("photo.png"));
    assert!(attachments[1].as_str().unwrap().contains("notes.pdf"));

    // The locator resolves to the uploaded bytes
    let locator = attachments[0].as_str().unwrap();
    let response = ctx.get(&locator_path(locator), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&raw_body(response).await[..], PNG_BYTES);
}

#[tokio::test]
async fn test_file_under_wrong_field_is_rejected() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "leo", "leo@example.com").await;

    // A file smuggled under a non-upload field fails the request
    let form = MultipartBody::new()
        .text("title", "Sneaky")
        .file("description", "photo.png", "image/png", PNG_BYTES);
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Unexpected file field: description"
    );

    // No task was created
    let response = ctx.get("/tasks", Some(&token)).await;
    assert!(json_body(response).await.as_array().unwrap().is_empty());

    // The profile endpoint only takes files under profileImage
    let form = MultipartBody::new().file("attachments", "me.png", "image/png", PNG_BYTES);
    let response = ctx.put_multipart("/auth/profile", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx.get("/auth/profile", Some(&token)).await;
    assert!(json_body(response).await["profileImage"].is_null());
}

#[tokio::test]
async fn test_oversized_file_is_skipped() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "erin", "erin@example.com").await;

    let oversized = vec![0u8; 5 * 1024 * 1024 + 1];
    let form = MultipartBody::new()
        .text("title", "Big upload")
        .file("attachments", "huge.png", "image/png", &oversized)
        .file("attachments", "small.png", "image/png", PNG_BYTES);
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;

    assert_eq!(body["task"]["attachments"].as_array().unwrap().len(), 1);
    assert_eq!(body["uploads"]["failed"][0]["filename"], "huge.png");
}

#[tokio::test]
async fn test_remove_attachment() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "frank", "frank@example.com").await;

    let form = MultipartBody::new()
        .text("title", "Task")
        .file("attachments", "doc.pdf", "application/pdf", b"%PDF-1.4");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    let body = json_body(response).await;
    let task_id = body["task"]["id"].as_str().unwrap().to_string();
    let locator = body["task"]["attachments"][0]
        .as_str()
        .unwrap()
        .to_string();

    // Detach: list empties and the blob is gone
    let response = ctx
        .post_json(
            &format!("/tasks/{}/remove-attachment", task_id),
            Some(&token),
            serde_json::json!({"attachmentUrl": locator}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Attachment removed successfully");
    assert!(body["task"]["attachments"].as_array().unwrap().is_empty());

    let response = ctx.get(&locator_path(&locator), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Removing it again is a 400, task untouched
    let response = ctx
        .post_json(
            &format!("/tasks/{}/remove-attachment", task_id),
            Some(&token),
            serde_json::json!({"attachmentUrl": locator}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Attachment not found in this task"
    );
}

#[tokio::test]
async fn test_delete_task_cascades_blob_deletion() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "grace", "grace@example.com").await;

    let form = MultipartBody::new()
        .text("title", "Doomed")
        .file("attachments", "a.png", "image/png", PNG_BYTES)
        .file("attachments", "b.pdf", "application/pdf", b"%PDF-1.4");
    let response = ctx.post_multipart("/tasks", Some(&token), form).await;
    let body = json_body(response).await;
    let task_id = body["task"]["id"].as_str().unwrap().to_string();
    let locators: Vec<String> = body["task"]["attachments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    assert_eq!(locators.len(), 2);

    let response = ctx.delete(&format!("/tasks/{}", task_id), Some(&token)).await;
    assert_eq!(response.status(), StatusCode::OK);

    for locator in &locators {
        let response = ctx.get(&locator_path(locator), None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_profile_image_replacement() {
    let ctx = TestContext::new();

    // Register with an image
    let form = MultipartBody::new()
        .text("username", "hank")
        .text("email", "hank@example.com")
        .text("password", "password123")
        .file("profileImage", "old.png", "image/png", PNG_BYTES);
    let response = ctx.post_multipart("/auth/register", None, form).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    let token = body["token"].as_str().unwrap().to_string();
    let old_locator = body["user"]["profileImage"].as_str().unwrap().to_string();

    let response = ctx.get(&locator_path(&old_locator), None).await;
    assert_eq!(response.status(), StatusCode::OK);

    // Replace it; the superseded blob is deleted, not leaked
    let form = MultipartBody::new().file("profileImage", "new.png", "image/png", b"new image");
    let response = ctx.put_multipart("/auth/profile", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let new_locator = body["user"]["profileImage"].as_str().unwrap().to_string();
    assert_ne!(old_locator, new_locator);

    let response = ctx.get(&locator_path(&new_locator), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&raw_body(response).await[..], b"new image");

    let response = ctx.get(&locator_path(&old_locator), None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Rejected image leaves the profile untouched
    let form = MultipartBody::new().file("profileImage", "script.sh", "text/x-sh", b"#!/bin/sh");
    let response = ctx.put_multipart("/auth/profile", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx.get("/auth/profile", Some(&token)).await;
    let body = json_body(response).await;
    assert_eq!(body["profileImage"], new_locator.as_str());
}

#[tokio::test]
async fn test_register_rejects_bad_profile_image() {
    let ctx = TestContext::new();

    let form = MultipartBody::new()
        .text("username", "ivan")
        .text("email", "ivan@example.com")
        .text("password", "password123")
        .file("profileImage", "evil.exe", "application/x-msdownload", b"MZ");
    let response = ctx.post_multipart("/auth/register", None, form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // The account was not created
    let response = ctx
        .post_json(
            "/auth/login",
            None,
            serde_json::json!({"email": "ivan@example.com", "password": "password123"}),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_profile_username() {
    let ctx = TestContext::new();
    let (_, token) = register_user(&ctx, "judy", "judy@example.com").await;
    register_user(&ctx, "taken", "taken@example.com").await;

    // Rename
    let form = MultipartBody::new().text("username", "judith");
    let response = ctx.put_multipart("/auth/profile", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"]["username"], "judith");

    // Taken username is rejected
    let form = MultipartBody::new().text("username", "taken");
    let response = ctx.put_multipart("/auth/profile", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Too-short username is rejected before it reaches the store
    let form = MultipartBody::new().text("username", "ab");
    let response = ctx.put_multipart("/auth/profile", Some(&token), form).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_expired_token_rejected() {
    use taskdock_shared::auth::jwt;

    let ctx = TestContext::new();
    let (user, _) = register_user(&ctx, "kate", "kate@example.com").await;
    let user_id = user["id"].as_str().unwrap().parse().unwrap();

    let claims = jwt::Claims::with_expiration(user_id, chrono::Duration::seconds(-60));
    let token = jwt::create_token(&claims, common::JWT_SECRET).unwrap();

    let response = ctx.get("/tasks", Some(&token)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(response).await["message"], "Token expired");
}
