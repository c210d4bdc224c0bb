//! OAuth2 authorization-code login against an external identity provider.
//!
//! `/auth/login` stores a random `state` in the caller's session and redirects
//! to the provider. `/auth/callback` checks that `state`, lets the provider
//! turn the code into a user profile, then swaps the pre-login session for a
//! fresh one carrying the profile.

use async_trait::async_trait;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    Extension,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::config::IdentityConfig;
use crate::error::{ApiError, AuthError};
use crate::session::{expired_cookie, session_cookie, SessionData};
use crate::AppState;

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Where to send the browser to start a login.
    fn authorization_url(&self, state: &str) -> String;

    /// Exchanges an authorization code for the user's profile.
    async fn complete_login(&self, code: &str) -> Result<serde_json::Value, AuthError>;
}

/// IBM App ID style provider: `{server}/{tenant}/authorization|token|userinfo`.
pub struct AppIdProvider {
    http: reqwest::Client,
    config: IdentityConfig,
    base: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AppIdProvider {
    pub fn new(config: IdentityConfig) -> Self {
        let base = endpoint_base(&config.server_url, &config.tenant_id);
        Self {
            http: reqwest::Client::new(),
            config,
            base,
        }
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{}", self.base, name)
    }
}

fn endpoint_base(server_url: &str, tenant_id: &str) -> String {
    let server = server_url.trim_end_matches('/');
    if server.rsplit('/').next() == Some(tenant_id) {
        server.to_string()
    } else {
        format!("{server}/{tenant_id}")
    }
}

#[async_trait]
impl IdentityProvider for AppIdProvider {
    fn authorization_url(&self, state: &str) -> String {
        let endpoint = self.endpoint("authorization");
        let params = [
            ("response_type", "code"),
            ("client_id", self.config.client_id.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("scope", "openid"),
            ("state", state),
        ];
        match url::Url::parse_with_params(&endpoint, &params) {
            Ok(url) => url.into(),
            Err(e) => {
                warn!(error = %e, "could not build authorization url");
                endpoint
            }
        }
    }

    async fn complete_login(&self, code: &str) -> Result<serde_json::Value, AuthError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await?;
        if response.status().is_client_error() {
            return Err(AuthError::Rejected(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response.error_for_status()?.json().await?;

        let profile = self
            .http
            .get(self.endpoint("userinfo"))
            .bearer_auth(&token.access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(profile)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub async fn login(
    State(app): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Response {
    let csrf = Uuid::new_v4().simple().to_string();

    let existing = context.session_id.as_deref().and_then(|id| {
        app.sessions
            .update(id, |session| session.csrf_state = Some(csrf.clone()))
            .map(|_| id.to_string())
    });
    let new_session = match existing {
        Some(_) => None,
        None => Some(app.sessions.create(SessionData {
            csrf_state: Some(csrf.clone()),
            user: None,
        })),
    };

    debug!("redirecting to identity provider");
    let mut response = Redirect::to(&app.provider.authorization_url(&csrf)).into_response();
    if let Some(id) = new_session {
        response
            .headers_mut()
            .insert(header::SET_COOKIE, session_cookie(&id));
    }
    response
}

pub async fn callback(
    State(app): State<AppState>,
    Extension(context): Extension<AuthContext>,
    Query(params): Query<CallbackParams>,
) -> Result<Response, ApiError> {
    let session_id = context.session_id;
    let user = match verify_callback(&app, session_id.as_deref(), params).await {
        Ok(user) => user,
        Err(err) => {
            if let Some(id) = session_id.as_deref() {
                if app.sessions.remove_pending(id) {
                    debug!("pending session dropped after failed callback");
                }
            }
            return Err(err.into());
        }
    };

    if let Some(id) = session_id.as_deref() {
        app.sessions.remove(id);
    }
    let fresh = app.sessions.create(SessionData {
        csrf_state: None,
        user: Some(user),
    });
    info!("login completed");

    let mut response = Redirect::to("/").into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, session_cookie(&fresh));
    Ok(response)
}

/// Checks the provider's answer against the session's CSRF state and
/// exchanges the code for a profile.
async fn verify_callback(
    app: &AppState,
    session_id: Option<&str>,
    params: CallbackParams,
) -> Result<serde_json::Value, AuthError> {
    if let Some(error) = params.error {
        return Err(AuthError::Rejected(params.error_description.unwrap_or(error)));
    }

    let session_id = session_id.ok_or(AuthError::StateMismatch)?;
    let expected = app
        .sessions
        .update(session_id, |session| session.csrf_state.take())
        .flatten();
    match (expected, params.state) {
        (Some(expected), Some(got)) if expected == got => {}
        _ => return Err(AuthError::StateMismatch),
    }

    let code = params.code.ok_or(AuthError::MissingCode)?;
    app.provider.complete_login(&code).await
}

pub async fn logout(
    State(app): State<AppState>,
    Extension(context): Extension<AuthContext>,
) -> Response {
    if let Some(id) = context.session_id {
        app.sessions.remove(&id);
        info!("session closed");
    }
    let mut response = Redirect::to("/").into_response();
    response
        .headers_mut()
        .insert(header::SET_COOKIE, expired_cookie());
    response
}

pub async fn profile(Extension(context): Extension<AuthContext>) -> Response {
    match context.user {
        Some(user) if context.authenticated => Json(json!({ "user": user })).into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Not logged in" })),
        )
            .into_response(),
    }
}
