//! Task API handlers.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::Json,
    Extension,
};
use todo_shared::{AuthStatus, CreateTaskRequest, Task, UpdateTaskRequest};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::AppState;

fn task_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|e| ApiError::MalformedInput(e.body_text()))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::MalformedInput(e.body_text()))
}

pub async fn list_tasks(State(app): State<AppState>) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = app.store.list_all().await?;
    Ok(Json(tasks))
}

pub async fn get_task(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(id)?;
    match app.store.get_by_id(id).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::NotFound(id)),
    }
}

pub async fn create_task(
    State(app): State<AppState>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let payload = body(payload)?;
    let task = app
        .store
        .create(payload.text, payload.completed.unwrap_or(false))
        .await?;

    info!(task_id = %task.id, "task created");
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(id)?;
    let patch = body(payload)?;

    match app.store.update_by_id(id, patch).await? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::NotFound(id)),
    }
}

pub async fn delete_task(
    State(app): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = task_id(id)?;
    if app.store.delete_by_id(id).await? {
        info!(task_id = %id, "task deleted");
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_all_tasks(State(app): State<AppState>) -> Result<StatusCode, ApiError> {
    app.store.delete_all().await?;
    info!("all tasks deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn status(Extension(context): Extension<AuthContext>) -> Json<AuthStatus> {
    Json(context.status())
}
