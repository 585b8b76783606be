/// Task endpoints
///
/// All routes here sit behind the auth middleware; the handlers trust the
/// injected [`CurrentUser`] and scope every store lookup to it, so a task
/// owned by someone else produces the same 404 as a missing one.
///
/// # Endpoints
///
/// - `GET    /tasks` - List the user's tasks, newest first
/// - `POST   /tasks` - Create a task (multipart, up to 5 attachments)
/// - `GET    /tasks/:id` - Fetch one task
/// - `PUT    /tasks/:id` - Update fields and add attachments (multipart)
/// - `DELETE /tasks/:id` - Delete a task and its attachment blobs
/// - `POST   /tasks/:id/remove-attachment` - Detach one attachment (JSON)
use crate::{
    app::{AppState, CurrentUser},
    error::{ApiError, ApiResult},
    routes::forms::collect_multipart,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskdock_shared::{
    attachments::BatchOutcome,
    models::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask},
};
use uuid::Uuid;

/// Response for task create and update
#[derive(Debug, Serialize)]
pub struct TaskWriteResponse {
    /// Outcome description
    pub message: String,

    /// The task after the write
    pub task: Task,

    /// Per-file outcome of the attachment batch
    pub uploads: BatchOutcome,
}

/// Response for remove-attachment
#[derive(Debug, Serialize)]
pub struct TaskResponse {
    /// Outcome description
    pub message: String,

    /// The task after the write
    pub task: Task,
}

/// Response carrying only a message
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Outcome description
    pub message: String,
}

/// Remove-attachment request
#[derive(Debug, Deserialize)]
pub struct RemoveAttachmentRequest {
    /// Locator of the attachment to remove
    #[serde(rename = "attachmentUrl")]
    pub attachment_url: String,
}

/// Parses an optional status field, rejecting unknown values.
fn parse_status(value: Option<&str>) -> Result<Option<TaskStatus>, ApiError> {
    value
        .map(|s| s.parse().map_err(ApiError::BadRequest))
        .transpose()
}

/// Parses an optional priority field, rejecting unknown values.
fn parse_priority(value: Option<&str>) -> Result<Option<TaskPriority>, ApiError> {
    value
        .map(|s| s.parse().map_err(ApiError::BadRequest))
        .transpose()
}

/// Parses an optional RFC 3339 due date.
fn parse_due_date(value: Option<&str>) -> Result<Option<DateTime<Utc>>, ApiError> {
    value
        .map(|s| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| {
                    ApiError::BadRequest("Invalid due date: expected RFC 3339".to_string())
                })
        })
        .transpose()
}

/// Looks a task up, owner-scoped; absence and foreign ownership are the
/// same 404.
async fn find_owned_task(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<Task> {
    state
        .tasks
        .find_for_user(id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
}

/// List the user's tasks, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.tasks.list_for_user(user.id).await?;

    Ok(Json(tasks))
}

/// Fetch one task
pub async fn get_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let task = find_owned_task(&state, id, user.id).await?;

    Ok(Json(task))
}

/// Create a task
///
/// Multipart form data: `title` (required, non-empty), `description`,
/// `status`, `priority`, `dueDate` text fields and up to 5 attachment
/// files. File rejections never fail the request; they are reported in
/// the `uploads` field of the response.
///
/// # Errors
///
/// - `400 Bad Request`: Missing title, or invalid status/priority/due date
/// - `500 Internal Server Error`: Server error
pub async fn create_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> ApiResult<(StatusCode, Json<TaskWriteResponse>)> {
    let form = collect_multipart(multipart, "attachments").await?;

    let title = form
        .text("title")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::BadRequest("Title is required".to_string()))?;

    let task = state
        .tasks
        .create(CreateTask {
            user_id: user.id,
            title,
            description: form.text_owned("description").unwrap_or_default(),
            status: parse_status(form.text("status"))?.unwrap_or_default(),
            priority: parse_priority(form.text("priority"))?.unwrap_or_default(),
            due_date: parse_due_date(form.text("dueDate"))?,
        })
        .await?;

    let (task, uploads) = state.attachments.attach_to_task(task, form.files).await?;

    tracing::info!(task_id = %task.id, user_id = %user.id, "task created");

    Ok((
        StatusCode::CREATED,
        Json(TaskWriteResponse {
            message: "Task created successfully".to_string(),
            task,
            uploads,
        }),
    ))
}

/// Update a task
///
/// Multipart form data; every field is optional and absent fields leave
/// the record untouched. Attachment files are additive, appended after
/// the existing list, and screened per file like on create.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid status/priority/due date
/// - `404 Not Found`: No such task for this user
/// - `500 Internal Server Error`: Server error
pub async fn update_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<TaskWriteResponse>> {
    let form = collect_multipart(multipart, "attachments").await?;

    let task = find_owned_task(&state, id, user.id).await?;

    let update = UpdateTask {
        title: form.text_owned("title"),
        description: form.text_owned("description"),
        status: parse_status(form.text("status"))?,
        priority: parse_priority(form.text("priority"))?,
        due_date: parse_due_date(form.text("dueDate"))?,
        attachments: None,
    };

    let task = state
        .tasks
        .update(task.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let (task, uploads) = state.attachments.attach_to_task(task, form.files).await?;

    Ok(Json(TaskWriteResponse {
        message: "Task updated successfully".to_string(),
        task,
        uploads,
    }))
}

/// Delete a task and every blob it references
///
/// Blob deletion is best-effort per attachment and never blocks the
/// record deletion.
///
/// # Errors
///
/// - `404 Not Found`: No such task for this user
/// - `500 Internal Server Error`: Server error
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    let task = find_owned_task(&state, id, user.id).await?;

    state.attachments.delete_all_for_task(&task).await;

    if !state.tasks.delete(task.id).await? {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    tracing::info!(task_id = %task.id, user_id = %user.id, "task deleted");

    Ok(Json(MessageResponse {
        message: "Task deleted successfully".to_string(),
    }))
}

/// Detach one attachment from a task
///
/// Deletes the blob and drops the locator from the task's list.
///
/// # Errors
///
/// - `400 Bad Request`: The locator is not on this task's list
/// - `404 Not Found`: No such task for this user
/// - `500 Internal Server Error`: Server error
pub async fn remove_attachment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<RemoveAttachmentRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let task = find_owned_task(&state, id, user.id).await?;

    let task = state
        .attachments
        .detach_from_task(task, &req.attachment_url)
        .await?;

    Ok(Json(TaskResponse {
        message: "Attachment removed successfully".to_string(),
        task,
    }))
}
