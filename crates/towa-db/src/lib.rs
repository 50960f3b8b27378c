//! # towa-db
//!
//! Storage backends for towa.
//!
//! - PostgreSQL connection pooling ([`PoolConfig`])
//! - PostgreSQL implementations of the discovery index, opening log,
//!   telemetry sink and stats repository
//! - A filesystem content store for envelope blobs
//! - An in-memory store implementing every collaborator trait
//!
//! ## Example
//!
//! ```rust,ignore
//! use towa_db::{Database, FilesystemBackend};
//! use towa_core::{ContentStore, DiscoveryIndex};
//!
//! # async fn run() -> towa_db::Result<()> {
//!     let db = Database::connect("postgres://localhost/towa").await?;
//!     let blobs = FilesystemBackend::new("/var/lib/towa");
//!     blobs.validate().await?;
//!
//!     let candidates = db.letters.list("dce2e53f9657421cb94bc2b0252c55e0", 50).await?;
//!     println!("{} letters", candidates.len());
//!     Ok(())
//! # }
//! ```

pub mod file_storage;
pub mod letters;
pub mod memory;
pub mod openings;
pub mod pool;
pub mod stats;
pub mod telemetry;

// Public so `tests/` can reach it.
pub mod test_fixtures;

use sqlx::PgPool;

pub use towa_core::{Error, Result};

pub use file_storage::{generate_storage_path, FilesystemBackend};
pub use letters::PgLetterIndex;
pub use memory::MemoryStore;
pub use openings::PgOpeningLog;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use stats::PgStats;
pub use telemetry::PgTelemetrySink;

/// PostgreSQL repositories sharing one pool.
#[derive(Clone)]
pub struct Database {
    pub pool: PgPool,
    /// Discovery index over stored letters.
    pub letters: PgLetterIndex,
    /// Opening log.
    pub openings: PgOpeningLog,
    /// Telemetry sink.
    pub telemetry: PgTelemetrySink,
    /// Aggregate statistics.
    pub stats: PgStats,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self {
            letters: PgLetterIndex::new(pool.clone()),
            openings: PgOpeningLog::new(pool.clone()),
            telemetry: PgTelemetrySink::new(pool.clone()),
            stats: PgStats::new(pool.clone()),
            pool,
        }
    }

    /// Connect using [`PoolConfig::default`].
    pub async fn connect(url: &str) -> Result<Self> {
        create_pool(url).await.map(Self::new)
    }

    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        create_pool_with_config(url, config).await.map(Self::new)
    }

    /// Apply the embedded `migrations/` directory.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
