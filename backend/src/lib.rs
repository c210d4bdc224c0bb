//! Task list backend: REST API over a document store, gated by an OAuth
//! session.

use std::path::Path;
use std::sync::Arc;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod auth;
pub mod config;
pub mod error;
pub mod oauth;
pub mod redis_store;
pub mod routes;
pub mod session;
pub mod store;

use auth::{GatePolicy, IdentityVerifier, RouteClass};
use oauth::IdentityProvider;
use session::SessionStore;
use store::TaskStore;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub sessions: Arc<SessionStore>,
    pub provider: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn TaskStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            store,
            sessions: Arc::new(SessionStore::new()),
            provider,
        }
    }
}

/// Assembles every route. `/` and `/api/*` are guarded according to
/// `policy`; anything else falls through to files under `static_dir`.
pub fn build_router(
    state: AppState,
    verifier: Arc<dyn IdentityVerifier>,
    policy: GatePolicy,
    static_dir: impl AsRef<Path>,
) -> Router {
    let static_dir = static_dir.as_ref();

    let api: Router<AppState> = Router::new()
        .route(
            "/api/tasks",
            get(routes::list_tasks)
                .post(routes::create_task)
                .delete(routes::delete_all_tasks),
        )
        .route(
            "/api/tasks/:id",
            get(routes::get_task)
                .put(routes::update_task)
                .delete(routes::delete_task),
        )
        .route_layer(middleware::from_fn_with_state(
            policy.gate(RouteClass::Api),
            auth::guard,
        ));

    let pages: Router<AppState> = Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_layer(middleware::from_fn_with_state(
            policy.gate(RouteClass::Page),
            auth::guard,
        ));

    let identity: Router<AppState> = Router::new()
        .route("/status", get(routes::status))
        .route("/auth/login", get(oauth::login))
        .route("/auth/callback", get(oauth::callback))
        .route("/auth/logout", get(oauth::logout))
        .route("/auth/profile", get(oauth::profile));

    let assets: Router<AppState> = Router::new()
        .fallback_service(ServeDir::new(static_dir))
        .layer(middleware::from_fn_with_state(
            policy.gate(RouteClass::Static),
            auth::guard,
        ));

    Router::new()
        .merge(api)
        .merge(pages)
        .merge(identity)
        .merge(assets)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn_with_state(verifier, auth::identify)),
        )
        .with_state(state)
}
