//! Client-side mirror of the server task list.
//!
//! The board only mutates state; rendering reads it back through
//! [`TaskBoard::tasks`], [`TaskBoard::counts`] and [`TaskBoard::summary`].

use crate::Task;
use uuid::Uuid;

pub const EMPTY_SUMMARY: &str = "No tasks, add one above!";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskCounts {
    pub total: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskBoard {
    tasks: Vec<Task>,
}

impl TaskBoard {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn replace(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn push(&mut self, task: Task) {
        self.tasks.push(task);
    }

    /// Flips the completion flag and returns the new value.
    pub fn toggle(&mut self, id: Uuid) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        task.completed = !task.completed;
        Some(task.completed)
    }

    /// Undoes a toggle the server refused. `attempted` is the value the
    /// toggle set; if the task has been toggled again since, it is left alone.
    pub fn revert_toggle(&mut self, id: Uuid, attempted: bool) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) if task.completed == attempted => {
                task.completed = !attempted;
                true
            }
            _ => false,
        }
    }

    /// Replaces the local copy with the server's version of the record.
    pub fn apply(&mut self, updated: Task) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == updated.id) {
            *task = updated;
        }
    }

    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);
        self.tasks.len() != before
    }

    pub fn completed_ids(&self) -> Vec<Uuid> {
        self.tasks
            .iter()
            .filter(|t| t.completed)
            .map(|t| t.id)
            .collect()
    }

    /// Drops every completed task and returns their ids for deletion upstream.
    pub fn take_completed(&mut self) -> Vec<Uuid> {
        let ids = self.completed_ids();
        self.tasks.retain(|t| !t.completed);
        ids
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    pub fn counts(&self) -> TaskCounts {
        TaskCounts {
            total: self.tasks.len(),
            completed: self.tasks.iter().filter(|t| t.completed).count(),
        }
    }

    pub fn summary(&self) -> String {
        if self.tasks.is_empty() {
            return EMPTY_SUMMARY.to_string();
        }
        let counts = self.counts();
        format!(
            "Total tasks: {} | Completed: {}",
            counts.total, counts.completed
        )
    }
}

/// Trimmed input text, or `None` when there is nothing to add.
pub fn normalize_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
