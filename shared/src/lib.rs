use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod board;

pub use board::{TaskBoard, TaskCounts};

/// Name of the cookie carrying the server-side session id.
pub const SESSION_COOKIE: &str = "todo_session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub text: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

/// Partial update. Absent (or null) fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    pub user: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Task {
    pub fn new(text: String, completed: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            completed,
        }
    }
}

impl CreateTaskRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            completed: None,
        }
    }
}

impl UpdateTaskRequest {
    pub fn completed(completed: bool) -> Self {
        Self {
            text: None,
            completed: Some(completed),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.completed.is_none()
    }

    pub fn apply_to(self, task: &mut Task) {
        if let Some(text) = self.text {
            task.text = text;
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}

impl AuthStatus {
    /// Best-effort display name from an identity provider profile.
    pub fn display_name(&self) -> Option<&str> {
        let user = self.user.as_ref()?;
        ["name", "email", "preferred_username", "sub"]
            .iter()
            .find_map(|key| user.get(*key).and_then(|v| v.as_str()))
    }
}
