//! Collaborator traits.
//!
//! The sealing core never performs I/O. Everything that touches storage or
//! the network sits behind these traits so the HTTP layer can run against
//! PostgreSQL and the filesystem in production and against an in-memory
//! store in tests.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// CONTENT STORE
// =============================================================================

/// Durable storage for opaque envelope blobs.
///
/// Implementations must treat the payload as an indivisible byte string:
/// no inspection, transformation or truncation.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Persist a blob and return its retrieval identifier.
    async fn put(&self, data: &[u8]) -> Result<Uuid>;

    /// Fetch a blob by retrieval identifier.
    ///
    /// Returns `Error::LetterNotFound` when no blob exists.
    async fn get(&self, id: Uuid) -> Result<Vec<u8>>;

    /// Remove a blob. Removing a missing blob is not an error.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// DISCOVERY INDEX
// =============================================================================

/// Maps identity discovery keys to stored letters.
#[async_trait]
pub trait DiscoveryIndex: Send + Sync {
    /// Index a stored letter.
    async fn put(&self, letter: NewLetter) -> Result<LetterRecord>;

    /// List candidates for a discovery key, newest first.
    async fn list(&self, discovery_key: &str, limit: i64) -> Result<Vec<Candidate>>;

    /// Fetch an indexed letter by retrieval identifier.
    async fn get(&self, id: Uuid) -> Result<Option<LetterRecord>>;
}

// =============================================================================
// OPENING LOG
// =============================================================================

/// Records that a reader opened a letter.
#[async_trait]
pub trait OpeningLog: Send + Sync {
    /// Record an opening.
    ///
    /// Returns `Error::Conflict` if this opener already opened this letter.
    async fn record(&self, letter_id: Uuid, opener_id: &str) -> Result<Opening>;
}

// =============================================================================
// TELEMETRY & STATS
// =============================================================================

/// Sink for product telemetry events.
#[async_trait]
pub trait TelemetrySink: Send + Sync {
    /// Record an event and return its identifier.
    async fn record(&self, event: TelemetryEvent) -> Result<Uuid>;
}

/// Aggregate statistics source.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    async fn public_stats(&self) -> Result<PublicStats>;
}

// =============================================================================
// EXTERNAL SERVICES (stubbed)
// =============================================================================

/// Storage fee estimation.
pub trait FeeEstimator: Send + Sync {
    /// Estimate the fee for storing `bytes` bytes.
    fn estimate(&self, bytes: u64) -> FeeEstimate;
}

/// Content moderation gate.
#[async_trait]
pub trait ModerationGate: Send + Sync {
    async fn check(&self, request: &ModerationRequest) -> Result<ModerationVerdict>;
}
