//! Request identity and the auth gate.
//!
//! Every request passes through [`identify`], which asks the configured
//! [`IdentityVerifier`] for an [`AuthContext`] and stores it in the request
//! extensions. Route groups are then wrapped in [`guard`], which consults the
//! [`GatePolicy`] for that group's [`RouteClass`] before anything else runs.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use todo_shared::AuthStatus;
use tracing::debug;

use crate::error::ApiError;
use crate::session::{session_id, SessionStore};

pub const LOGIN_PATH: &str = "/auth/login";

/// Identity resolved for a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthContext {
    pub authenticated: bool,
    pub user: Option<serde_json::Value>,
    pub session_id: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user: serde_json::Value) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
            session_id: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn status(&self) -> AuthStatus {
        AuthStatus {
            authenticated: self.authenticated,
            user: self.user.clone(),
        }
    }
}

/// Decides who is making a request.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, headers: &HeaderMap) -> AuthContext;
}

/// Resolves the session cookie against the in-process [`SessionStore`].
pub struct SessionVerifier {
    sessions: Arc<SessionStore>,
}

impl SessionVerifier {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl IdentityVerifier for SessionVerifier {
    async fn verify(&self, headers: &HeaderMap) -> AuthContext {
        let Some(id) = session_id(headers) else {
            return AuthContext::anonymous();
        };
        match self.sessions.get(&id) {
            Some(session) => AuthContext {
                authenticated: session.user.is_some(),
                user: session.user,
                session_id: Some(id),
            },
            None => AuthContext::anonymous(),
        }
    }
}

/// Returns the same context for every request.
pub struct StaticVerifier(pub AuthContext);

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, _headers: &HeaderMap) -> AuthContext {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    /// HTML entry points such as `/`.
    Page,
    /// `/api/*`.
    Api,
    /// Files from the static directory.
    Static,
}

/// Which route classes require an authenticated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatePolicy {
    pub pages: bool,
    pub api: bool,
    pub static_assets: bool,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            pages: true,
            api: true,
            static_assets: false,
        }
    }
}

impl GatePolicy {
    pub fn with_static(mut self, protect: bool) -> Self {
        self.static_assets = protect;
        self
    }

    pub fn requires_auth(&self, class: RouteClass) -> bool {
        match class {
            RouteClass::Page => self.pages,
            RouteClass::Api => self.api,
            RouteClass::Static => self.static_assets,
        }
    }

    pub fn gate(self, class: RouteClass) -> Gate {
        Gate {
            policy: self,
            class,
        }
    }
}

/// Middleware state for one guarded route group.
#[derive(Debug, Clone, Copy)]
pub struct Gate {
    policy: GatePolicy,
    class: RouteClass,
}

pub async fn identify(
    State(verifier): State<Arc<dyn IdentityVerifier>>,
    mut req: Request,
    next: Next,
) -> Response {
    let context = verifier.verify(req.headers()).await;
    req.extensions_mut().insert(context);
    next.run(req).await
}

pub async fn guard(State(gate): State<Gate>, req: Request, next: Next) -> Response {
    if !gate.policy.requires_auth(gate.class) {
        return next.run(req).await;
    }

    let authenticated = req
        .extensions()
        .get::<AuthContext>()
        .is_some_and(AuthContext::is_authenticated);
    if authenticated {
        return next.run(req).await;
    }

    debug!(path = %req.uri().path(), class = ?gate.class, "unauthenticated request denied");
    match gate.class {
        RouteClass::Api => ApiError::Unauthenticated.into_response(),
        RouteClass::Page | RouteClass::Static => Redirect::to(LOGIN_PATH).into_response(),
    }
}
