//! Server configuration loaded from the environment.
//!
//! A `.env` file in the working directory is read first if present. Identity
//! provider settings are required; everything else has a default.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::auth::GatePolicy;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
pub const DEFAULT_STATIC_DIR: &str = "frontend/dist";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Which [`TaskStore`](crate::store::TaskStore) backs the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Redis { url: String },
    Memory,
}

/// Settings for the external OAuth2 identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub server_url: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
    pub static_dir: PathBuf,
    pub gate: GatePolicy,
    pub identity: IdentityConfig,
}

impl AppConfig {
    /// Loads `.env` (if any) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .collect();

        let port = match vars.get("PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                message: format!("{e}"),
            })?,
            None => DEFAULT_PORT,
        };

        let store = match vars.get("TASK_STORE").map(|s| s.trim().to_ascii_lowercase()) {
            None => redis_backend(&vars),
            Some(kind) if kind == "redis" => redis_backend(&vars),
            Some(kind) if kind == "memory" => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "TASK_STORE",
                    message: format!("expected `redis` or `memory`, got `{other}`"),
                })
            }
        };

        let static_dir = vars
            .get("STATIC_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        let protect_static = match vars.get("AUTH_PROTECT_STATIC") {
            Some(raw) => parse_bool("AUTH_PROTECT_STATIC", raw)?,
            None => false,
        };

        let identity = IdentityConfig {
            client_id: required(&vars, "CLIENT_ID")?,
            client_secret: required(&vars, "CLIENT_SECRET")?,
            tenant_id: required(&vars, "TENANT_ID")?,
            server_url: required(&vars, "OAUTH_SERVER_URL")?,
            redirect_uri: required(&vars, "REDIRECT_URI")?,
        };
        url::Url::parse(&identity.server_url).map_err(|e| ConfigError::Invalid {
            key: "OAUTH_SERVER_URL",
            message: e.to_string(),
        })?;
        url::Url::parse(&identity.redirect_uri).map_err(|e| ConfigError::Invalid {
            key: "REDIRECT_URI",
            message: e.to_string(),
        })?;

        Ok(Self {
            port,
            store,
            static_dir,
            gate: GatePolicy::default().with_static(protect_static),
            identity,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn redis_backend(vars: &HashMap<String, String>) -> StoreBackend {
    StoreBackend::Redis {
        url: vars
            .get("REDIS_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
    }
}

fn required(vars: &HashMap<String, String>, key: &'static str) -> Result<String, ConfigError> {
    vars.get(key).cloned().ok_or(ConfigError::Missing(key))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            key,
            message: format!("expected a boolean, got `{other}`"),
        }),
    }
}
