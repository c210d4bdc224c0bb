use serde::de::DeserializeOwned;
use todo_shared::{AuthStatus, CreateTaskRequest, Task, UpdateTaskRequest};
use uuid::Uuid;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{console, window, Request, RequestInit, Response};

pub const LOGIN_PATH: &str = "/auth/login";

#[derive(Debug, Clone, PartialEq)]
pub enum FetchError {
    /// The session is gone; the user has to log in again.
    Unauthorized,
    Status(u16),
    Network(String),
}

impl FetchError {
    pub fn describe(&self) -> String {
        match self {
            FetchError::Unauthorized => "Not logged in".to_string(),
            FetchError::Status(code) => format!("Server responded with {}", code),
            FetchError::Network(reason) => reason.clone(),
        }
    }
}

fn network(reason: &str) -> FetchError {
    FetchError::Network(reason.to_string())
}

async fn send(method: &str, url: &str, body: Option<String>) -> Result<Response, FetchError> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = &body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|_| network("Failed to create request"))?;
    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| network("Failed to set header"))?;
    }

    let promise = window()
        .ok_or_else(|| network("No window"))?
        .fetch_with_request(&request);
    let response: Response = JsFuture::from(promise)
        .await
        .map_err(|_| network("Failed to send request"))?
        .into();

    match response.status() {
        401 => Err(FetchError::Unauthorized),
        code if !(200..300).contains(&code) => {
            console::log_1(&format!("[api] {} {} -> {}", method, url, code).into());
            Err(FetchError::Status(code))
        }
        _ => Ok(response),
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let text_promise = response
        .text()
        .map_err(|_| network("Failed to read response"))?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|_| network("Failed to get text"))?
        .as_string()
        .ok_or_else(|| network("Failed to convert to string"))?;

    serde_json::from_str(&text).map_err(|e| FetchError::Network(format!("Failed to parse JSON: {}", e)))
}

fn encode<T: serde::Serialize>(value: &T) -> Result<String, FetchError> {
    serde_json::to_string(value).map_err(|_| network("Failed to serialize request"))
}

pub async fn fetch_status() -> Result<AuthStatus, FetchError> {
    read_json(send("GET", "/status", None).await?).await
}

pub async fn fetch_tasks() -> Result<Vec<Task>, FetchError> {
    read_json(send("GET", "/api/tasks", None).await?).await
}

pub async fn create_task(text: String) -> Result<Task, FetchError> {
    let body = encode(&CreateTaskRequest::new(text))?;
    read_json(send("POST", "/api/tasks", Some(body)).await?).await
}

pub async fn set_completed(id: Uuid, completed: bool) -> Result<Task, FetchError> {
    let body = encode(&UpdateTaskRequest::completed(completed))?;
    let url = format!("/api/tasks/{}", id);
    read_json(send("PUT", &url, Some(body)).await?).await
}

pub async fn delete_task(id: Uuid) -> Result<(), FetchError> {
    let url = format!("/api/tasks/{}", id);
    send("DELETE", &url, None).await?;
    Ok(())
}

pub async fn delete_all() -> Result<(), FetchError> {
    send("DELETE", "/api/tasks", None).await?;
    Ok(())
}

/// Sends the browser to the login entry point.
pub fn redirect_to_login() {
    if let Some(window) = window() {
        if window.location().set_href(LOGIN_PATH).is_err() {
            console::log_1(&"[api] could not redirect to login".into());
        }
    }
}
