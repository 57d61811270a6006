use std::env;
use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Startup settings, read from the environment (and `.env`) by `main` only.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub host: String,
    pub port: u16,
    pub cors: CorsPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CorsPolicy {
    /// Any origin, method and header, with credentials.
    #[default]
    AllowAll,
    /// Listed origins only. Methods and headers are still unrestricted.
    Origins(Vec<String>),
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_path = env::var("TODO_DB_PATH").unwrap_or_else(|_| "todos.db".into());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = match env::var("PORT") {
            Ok(port) => port
                .parse()
                .with_context(|| format!("PORT must be a port number, got {:?}", port))?,
            Err(_) => 8000,
        };
        let cors = env::var("CORS_ALLOW_ORIGINS")
            .map(|origins| CorsPolicy::parse(&origins))
            .unwrap_or_default();

        Ok(Self {
            database_path,
            host,
            port,
            cors,
        })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

impl CorsPolicy {
    pub fn parse(value: &str) -> Self {
        let origins: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            CorsPolicy::AllowAll
        } else {
            CorsPolicy::Origins(origins)
        }
    }

    // A literal `*` cannot be combined with credentials, so the wide-open
    // policy mirrors the request's origin and headers instead.
    pub fn layer(&self) -> CorsLayer {
        match self {
            CorsPolicy::AllowAll => CorsLayer::very_permissive(),
            CorsPolicy::Origins(origins) => {
                let origins: Vec<HeaderValue> = origins
                    .iter()
                    .filter_map(|o| match HeaderValue::from_str(o) {
                        Ok(value) => Some(value),
                        Err(_) => {
                            tracing::warn!("ignoring invalid CORS origin {:?}", o);
                            None
                        }
                    })
                    .collect();
                CorsLayer::very_permissive().allow_origin(AllowOrigin::list(origins))
            }
        }
    }
}
