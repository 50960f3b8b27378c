//! PostgreSQL connection pool.

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use towa_core::defaults::{
    DB_ACQUIRE_TIMEOUT_SECS, DB_IDLE_TIMEOUT_SECS, DB_MAX_CONNECTIONS, DB_MIN_CONNECTIONS,
};
use towa_core::{Error, Result};

/// Sizing and timeouts for the connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long a caller waits for a free connection.
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DB_MAX_CONNECTIONS,
            min_connections: DB_MIN_CONNECTIONS,
            acquire_timeout: Duration::from_secs(DB_ACQUIRE_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DB_IDLE_TIMEOUT_SECS),
        }
    }
}

impl PoolConfig {
    /// Read pool settings from the environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DB_MAX_CONNECTIONS` | `10` |
    /// | `DB_MIN_CONNECTIONS` | `1` |
    /// | `DB_ACQUIRE_TIMEOUT_SECS` | `30` |
    /// | `DB_IDLE_TIMEOUT_SECS` | `600` |
    ///
    /// The minimum is clamped to the maximum.
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(key: &str) -> Option<T> {
            std::env::var(key).ok()?.trim().parse().ok()
        }

        let defaults = Self::default();
        let max_connections = var("DB_MAX_CONNECTIONS")
            .filter(|n: &u32| *n > 0)
            .unwrap_or(defaults.max_connections);

        Self {
            max_connections,
            min_connections: var("DB_MIN_CONNECTIONS")
                .unwrap_or(defaults.min_connections)
                .min(max_connections),
            acquire_timeout: var("DB_ACQUIRE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.acquire_timeout),
            idle_timeout: var("DB_IDLE_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.idle_timeout),
        }
    }

    /// Fixed pool size: min and max both set to `n`.
    pub fn with_size(mut self, n: u32) -> Self {
        self.max_connections = n.max(1);
        self.min_connections = self.max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

/// Connect with the default [`PoolConfig`].
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    create_pool_with_config(database_url, PoolConfig::default()).await
}

/// Connect with an explicit [`PoolConfig`].
pub async fn create_pool_with_config(database_url: &str, config: PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "database",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        duration_ms = start.elapsed().as_millis() as u64,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Log pool occupancy; warns when every connection is checked out.
pub fn log_pool_metrics(pool: &PgPool) {
    let size = pool.size();
    let idle = pool.num_idle();

    if size > 0 && idle == 0 {
        warn!(
            subsystem = "database",
            component = "pool",
            op = "metrics",
            pool_size = size,
            "All pooled connections in use"
        );
    } else {
        debug!(
            subsystem = "database",
            component = "pool",
            op = "metrics",
            pool_size = size,
            pool_idle = idle,
            "Pool occupancy"
        );
    }
}
