//! Server configuration from environment variables.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `HOST` | `0.0.0.0` | Bind address |
//! | `PORT` | `3000` | Bind port |
//! | `DATABASE_URL` | unset | PostgreSQL URL; in-memory store when unset |
//! | `STORAGE_PATH` | `./data` | Envelope blob directory |
//! | `ALLOWED_ORIGINS` | `http://localhost:3000` | Comma-separated CORS origins |
//! | `RATE_LIMIT_ENABLED` | `true` | Global rate limiter on/off |
//! | `RATE_LIMIT_REQUESTS` | `100` | Requests allowed per period |
//! | `RATE_LIMIT_PERIOD_SECS` | `60` | Rate limit period |

use axum::http::HeaderValue;
use towa_core::defaults::{
    MAX_REQUEST_BODY_BYTES, RATE_LIMIT_PERIOD_SECS, RATE_LIMIT_REQUESTS, SERVER_PORT,
};

/// Runtime configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub storage_path: String,
    pub allowed_origins: Vec<String>,
    pub rate_limit_enabled: bool,
    pub rate_limit_requests: u64,
    pub rate_limit_period_secs: u64,
    /// Request body ceiling; fits a maximal base64 envelope plus framing.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            database_url: None,
            storage_path: "./data".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            rate_limit_enabled: true,
            rate_limit_requests: RATE_LIMIT_REQUESTS,
            rate_limit_period_secs: RATE_LIMIT_PERIOD_SECS,
            max_body_bytes: MAX_REQUEST_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .ok()
            .map(|s| parse_origin_list(&s))
            .filter(|origins| !origins.is_empty())
            .unwrap_or(defaults.allowed_origins);

        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            storage_path: std::env::var("STORAGE_PATH").unwrap_or(defaults.storage_path),
            allowed_origins,
            rate_limit_enabled: std::env::var("RATE_LIMIT_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.rate_limit_enabled),
            rate_limit_requests: env_parse("RATE_LIMIT_REQUESTS")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.rate_limit_requests),
            rate_limit_period_secs: env_parse("RATE_LIMIT_PERIOD_SECS")
                .filter(|n: &u64| *n > 0)
                .unwrap_or(defaults.rate_limit_period_secs),
            max_body_bytes: defaults.max_body_bytes,
        }
    }

    /// Origins as header values; unparseable entries are skipped with a warning.
    pub fn cors_origins(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(
                        subsystem = "api",
                        component = "config",
                        origin = %origin,
                        error = %e,
                        "Invalid CORS origin"
                    );
                    None
                }
            })
            .collect()
    }

    /// Disable the global rate limiter.
    pub fn without_rate_limit(mut self) -> Self {
        self.rate_limit_enabled = false;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn parse_origin_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
