//! Task persistence.
//!
//! [`TaskStore`] is the seam between the HTTP layer and the document store.
//! There is no transaction support: concurrent updates to one task race and
//! the last write wins.

use async_trait::async_trait;
use parking_lot::RwLock;
use todo_shared::{Task, UpdateTaskRequest};
use uuid::Uuid;

use crate::error::StoreResult;

#[async_trait]
pub trait TaskStore: Send + Sync {
    /// All tasks in insertion order.
    async fn list_all(&self) -> StoreResult<Vec<Task>>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Task>>;

    /// Persists a new task before returning it.
    async fn create(&self, text: String, completed: bool) -> StoreResult<Task>;

    /// Returns `None` when no task has this id.
    async fn update_by_id(&self, id: Uuid, patch: UpdateTaskRequest) -> StoreResult<Option<Task>>;

    /// Idempotent. Returns whether a task was actually removed.
    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool>;

    async fn delete_all(&self) -> StoreResult<()>;
}

/// In-process store, used for tests and for running without Redis.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<Vec<Task>>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.read().is_empty()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn list_all(&self) -> StoreResult<Vec<Task>> {
        Ok(self.tasks.read().clone())
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self.tasks.read().iter().find(|t| t.id == id).cloned())
    }

    async fn create(&self, text: String, completed: bool) -> StoreResult<Task> {
        let task = Task::new(text, completed);
        self.tasks.write().push(task.clone());
        Ok(task)
    }

    async fn update_by_id(&self, id: Uuid, patch: UpdateTaskRequest) -> StoreResult<Option<Task>> {
        let mut tasks = self.tasks.write();
        Ok(tasks.iter_mut().find(|t| t.id == id).map(|task| {
            patch.apply_to(task);
            task.clone()
        }))
    }

    async fn delete_by_id(&self, id: Uuid) -> StoreResult<bool> {
        let mut tasks = self.tasks.write();
        let before = tasks.len();
        tasks.retain(|t| t.id != id);
        Ok(tasks.len() != before)
    }

    async fn delete_all(&self) -> StoreResult<()> {
        self.tasks.write().clear();
        Ok(())
    }
}
