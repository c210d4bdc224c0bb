//! Error types for the task service.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;
use todo_shared::ErrorBody;
use uuid::Uuid;

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a task store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the command.
    #[error("store unavailable: {0}")]
    Unavailable(#[from] redis::RedisError),

    /// A stored document could not be decoded.
    #[error("corrupt task document: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors raised during the identity exchange.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Callback `state` does not match what the login step stored.
    #[error("login state mismatch")]
    StateMismatch,

    /// Callback arrived without an authorization code.
    #[error("missing authorization code")]
    MissingCode,

    /// The provider answered the callback with an error.
    #[error("identity provider rejected login: {0}")]
    Rejected(String),

    /// The provider could not be reached or returned garbage.
    #[error("identity provider unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
}

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("task {0} not found")]
    NotFound(Uuid),

    #[error("not authenticated")]
    Unauthenticated,

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Store(StoreError::Corrupt(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(AuthError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Auth(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Returns true if this is a server error (5xx).
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            ApiError::NotFound(Uuid::nil()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::MalformedInput("text".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AuthError::StateMismatch).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn store_failures_are_server_errors() {
        let unavailable = redis::RedisError::from((redis::ErrorKind::IoError, "connection refused"));
        let err = ApiError::from(StoreError::from(unavailable));
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(err.is_server_error());

        let corrupt = serde_json::from_str::<todo_shared::Task>("{").unwrap_err();
        let err = ApiError::from(StoreError::from(corrupt));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found_message_names_id() {
        let id = Uuid::new_v4();
        assert!(ApiError::NotFound(id).to_string().contains(&id.to_string()));
    }
}
