#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, Response, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use todo_backend::{
    auth::{AuthContext, GatePolicy, IdentityVerifier, SessionVerifier, StaticVerifier},
    build_router,
    error::AuthError,
    oauth::IdentityProvider,
    session::SessionStore,
    store::MemoryTaskStore,
    AppState,
};
use tower::ServiceExt;

pub const INDEX_HTML: &str = "<!doctype html><title>todo</title>";
pub const APP_JS: &str = "console.log('todo');";

/// Accepts the code `good`, rejects everything else.
pub struct FakeProvider;

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!("https://idp.test/authorize?state={state}")
    }

    async fn complete_login(&self, code: &str) -> Result<Value, AuthError> {
        if code == "good" {
            Ok(json!({"sub": "u-1", "name": "Test User"}))
        } else {
            Err(AuthError::Rejected("bad code".into()))
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryTaskStore>,
    pub dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), INDEX_HTML).unwrap();
        std::fs::write(dir.path().join("app.js"), APP_JS).unwrap();
        Self {
            store: Arc::new(MemoryTaskStore::new()),
            dir,
        }
    }

    fn state(&self) -> AppState {
        AppState::new(self.store.clone(), Arc::new(FakeProvider))
    }

    pub fn router(&self, context: AuthContext, policy: GatePolicy) -> Router {
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(StaticVerifier(context));
        build_router(self.state(), verifier, policy, self.dir.path())
    }

    /// Router whose every request is already logged in.
    pub fn authed(&self) -> Router {
        self.router(
            AuthContext::authenticated(json!({"sub": "u-1"})),
            GatePolicy::default(),
        )
    }

    pub fn anonymous(&self) -> Router {
        self.router(AuthContext::anonymous(), GatePolicy::default())
    }

    /// Router that resolves identity from real session cookies.
    pub fn with_sessions(&self) -> Router {
        self.with_session_store(Arc::new(SessionStore::new()))
    }

    pub fn with_session_store(&self, sessions: Arc<SessionStore>) -> Router {
        let mut state = self.state();
        state.sessions = sessions;
        let verifier: Arc<dyn IdentityVerifier> =
            Arc::new(SessionVerifier::new(state.sessions.clone()));
        build_router(state, verifier, GatePolicy::default(), self.dir.path())
    }
}

pub fn request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn with_cookie(mut req: Request<Body>, cookie: &str) -> Request<Body> {
    req.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    req
}

pub async fn send(app: &Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn body_bytes(resp: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(resp: Response<Body>) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// `name=value` part of the `Set-Cookie` header.
pub fn set_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn create(app: &Router, text: &str) -> Value {
    let resp = send(
        app,
        json_request(Method::POST, "/api/tasks", json!({ "text": text })),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

pub async fn list(app: &Router) -> Vec<Value> {
    let resp = send(app, request(Method::GET, "/api/tasks")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    match body_json(resp).await {
        Value::Array(items) => items,
        other => panic!("expected array, got {other}"),
    }
}
