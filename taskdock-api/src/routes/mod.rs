/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, and profile endpoints
/// - `tasks`: Task CRUD and attachment endpoints
/// - `forms`: Multipart form collection shared by the upload endpoints
pub mod auth;
pub mod forms;
pub mod health;
pub mod tasks;
