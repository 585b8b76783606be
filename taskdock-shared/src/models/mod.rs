/// Domain models
///
/// - `user`: identity record with optional profile image locator
/// - `task`: owned work item with status, priority, and attachment locators

pub mod task;
pub mod user;

pub use task::{CreateTask, Task, TaskPriority, TaskStatus, UpdateTask};
pub use user::{CreateUser, UpdateUser, User};
