use std::sync::Arc;

use anyhow::Context;
use todo_backend::{
    auth::{IdentityVerifier, SessionVerifier},
    build_router,
    config::{AppConfig, StoreBackend},
    oauth::AppIdProvider,
    redis_store::RedisTaskStore,
    store::{MemoryTaskStore, TaskStore},
    AppState,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn TaskStore> = match &config.store {
        StoreBackend::Redis { url } => {
            let store = RedisTaskStore::open(url).context("invalid REDIS_URL")?;
            match store.ping().await {
                Ok(()) => info!("Redis connected"),
                Err(e) => warn!(error = %e, "Redis unreachable, API calls will fail until it is up"),
            }
            Arc::new(store)
        }
        StoreBackend::Memory => {
            info!("using in-memory task store");
            Arc::new(MemoryTaskStore::new())
        }
    };

    let provider = Arc::new(AppIdProvider::new(config.identity.clone()));
    let state = AppState::new(store, provider);
    let verifier: Arc<dyn IdentityVerifier> =
        Arc::new(SessionVerifier::new(state.sessions.clone()));

    let app = build_router(state, verifier, config.gate, &config.static_dir);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server running on http://localhost:{}", config.port);
    info!(static_dir = %config.static_dir.display(), "serving static files");
    axum::serve(listener, app).await?;

    Ok(())
}
