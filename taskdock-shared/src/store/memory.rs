/// In-memory record store
///
/// Backs both store traits with `RwLock<HashMap>`s. Used by the test
/// suite and by `STORE_BACKEND=memory` deployments where persistence
/// across restarts does not matter. Enforces the same unique-index
/// semantics as the Postgres backend.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{CreateTask, CreateUser, Task, UpdateTask, UpdateUser, User};

use super::{StoreError, TaskStore, UserStore};

/// Record store holding everything in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut users = self.users.write().await;

        // Same unique-index semantics as the SQL schema
        for existing in users.values() {
            if existing.email == data.email {
                return Err(StoreError::Duplicate("email"));
            }
            if existing.username == data.username {
                return Err(StoreError::Duplicate("username"));
            }
        }

        let user = User {
            id: Uuid::new_v4(),
            username: data.username,
            email: data.email,
            password_hash: data.password_hash,
            profile_image: data.profile_image,
            created_at: Utc::now(),
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username || u.email == email)
            .cloned())
    }

    async fn update(&self, id: Uuid, data: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        if let Some(new_username) = &data.username {
            let taken = users
                .values()
                .any(|u| u.id != id && &u.username == new_username);
            if taken {
                return Err(StoreError::Duplicate("username"));
            }
        }

        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(username) = data.username {
            user.username = username;
        }
        if let Some(profile_image) = data.profile_image {
            user.profile_image = Some(profile_image);
        }

        Ok(Some(user.clone()))
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create(&self, data: CreateTask) -> Result<Task, StoreError> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            attachments: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.tasks.write().await.insert(task.id, task.clone());

        Ok(task)
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();

        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(tasks)
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> Result<Option<Task>, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned())
    }

    async fn update(&self, id: Uuid, data: UpdateTask) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;

        let Some(task) = tasks.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = data.title {
            task.title = title;
        }
        if let Some(description) = data.description {
            task.description = description;
        }
        if let Some(status) = data.status {
            task.status = status;
        }
        if let Some(priority) = data.priority {
            task.priority = priority;
        }
        if let Some(due_date) = data.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(attachments) = data.attachments {
            task.attachments = attachments;
        }
        task.updated_at = Utc::now();

        Ok(Some(task.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }
}
