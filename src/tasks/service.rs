use std::sync::Arc;

use tracing::{debug, warn};

use super::allocator::TaskAllocator;
use super::Task;
use crate::error::{AppError, AppResult};
use crate::identity::Owner;
use crate::storage::{StoreError, TaskStore};

/// Allocate-then-insert attempts before a racing `add` gives up with `Conflict`.
pub const DEFAULT_MAX_INSERT_ATTEMPTS: u32 = 3;

/// CRUD over one owner's tasks. Input is validated before any store access; the
/// owner always comes from the access gate.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    allocator: TaskAllocator,
    max_insert_attempts: u32,
}

fn require_description(description: &str) -> AppResult<()> {
    if description.trim().is_empty() {
        return Err(AppError::invalid("invalid_description", "Invalid request"));
    }
    Ok(())
}

fn require_id(id: i32) -> AppResult<()> {
    if id <= 0 {
        return Err(AppError::invalid("invalid_task_id", "Invalid task ID"));
    }
    Ok(())
}

fn task_not_found() -> AppError { AppError::not_found("task_not_found", "Task not found") }

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, max_insert_attempts: u32) -> Self {
        Self {
            allocator: TaskAllocator::new(store.clone()),
            store,
            max_insert_attempts: max_insert_attempts.max(1),
        }
    }

    /// Create a task under the smallest free id. A duplicate-id insert caused by
    /// a concurrent `add` re-runs the allocation, up to `max_insert_attempts`.
    pub async fn add(&self, owner: &Owner, description: &str) -> AppResult<Task> {
        require_description(description)?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let task = Task { id: self.allocator.next_id(owner).await?, description: description.to_string() };
            match self.store.insert_task(owner.as_str(), &task).await {
                Ok(()) => {
                    debug!(target: "todo::tasks", owner = %owner, id = task.id, attempt, "task added");
                    return Ok(task);
                }
                Err(StoreError::Conflict(key)) if attempt < self.max_insert_attempts => {
                    debug!(target: "todo::tasks", owner = %owner, id = task.id, attempt, key = %key, "id taken concurrently, reallocating");
                }
                Err(StoreError::Conflict(key)) => {
                    warn!(target: "todo::tasks", owner = %owner, attempt, key = %key, "giving up on task insert");
                    return Err(AppError::conflict("task_id_conflict", "task id conflict, retry the request"));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// All tasks of `owner`, ascending by id. An empty list is not an error.
    pub async fn list(&self, owner: &Owner) -> AppResult<Vec<Task>> {
        Ok(self.store.list_tasks(owner.as_str()).await?)
    }

    pub async fn update(&self, owner: &Owner, id: i32, description: &str) -> AppResult<Task> {
        require_id(id)?;
        require_description(description)?;
        let affected = self.store.update_task(owner.as_str(), id, description).await?;
        if affected == 0 {
            return Err(task_not_found());
        }
        Ok(Task { id, description: description.to_string() })
    }

    /// Delete a task; its id becomes the next allocation candidate if it is now
    /// the smallest gap.
    pub async fn delete(&self, owner: &Owner, id: i32) -> AppResult<()> {
        require_id(id)?;
        let affected = self.store.delete_task(owner.as_str(), id).await?;
        if affected == 0 {
            return Err(task_not_found());
        }
        Ok(())
    }
}
