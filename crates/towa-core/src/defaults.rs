//! Centralized default constants for towa.
//!
//! Every crate references these instead of defining its own magic numbers.
//! Values that end up inside sealed envelopes (KDF costs) are only defaults
//! for *new* letters; existing envelopes carry their own parameters.

// =============================================================================
// PAYLOAD
// =============================================================================

/// Maximum plaintext size of a letter (content plus inline attachments).
pub const MAX_PAYLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Maximum HTTP body size accepted by the API.
///
/// Envelope bytes are hex-encoded on the wire, so the body is roughly twice
/// the payload plus a small JSON header.
pub const MAX_REQUEST_BODY_BYTES: usize = 2 * MAX_PAYLOAD_BYTES + 64 * 1024;

// =============================================================================
// KEY DERIVATION (Argon2id)
// =============================================================================

/// Default Argon2id iteration count.
pub const KDF_ITERATIONS: u32 = 3;

/// Default Argon2id memory cost in KiB (64 MiB).
pub const KDF_MEMORY_KIB: u32 = 65_536;

/// Default Argon2id parallelism.
pub const KDF_PARALLELISM: u32 = 1;

/// Upper bound on memory an envelope may demand (1 GiB).
pub const KDF_MAX_MEMORY_KIB: u32 = 1_048_576;

/// Upper bound on iterations an envelope may demand.
pub const KDF_MAX_ITERATIONS: u32 = 64;

/// Upper bound on parallelism an envelope may demand.
pub const KDF_MAX_PARALLELISM: u32 = 16;

/// Default number of derivations allowed to run at once.
pub const KDF_MAX_CONCURRENT: usize = 4;

/// Default total Argon2 memory budget across concurrent derivations (256 MiB).
pub const KDF_MEMORY_BUDGET_KIB: u32 = 262_144;

// =============================================================================
// DISCOVERY
// =============================================================================

/// Hex length of an identity discovery key.
pub const DISCOVERY_KEY_HEX_LEN: usize = 32;

/// Hex length of an answer-bound bucket id.
pub const BUCKET_ID_HEX_LEN: usize = 16;

/// Default number of candidates returned by an index lookup.
pub const CANDIDATE_LIMIT: i64 = 50;

/// Hard cap on candidates returned by an index lookup.
pub const CANDIDATE_LIMIT_MAX: i64 = 200;

// =============================================================================
// FEES (mocked network pricing)
// =============================================================================

/// Mock storage price in AR per byte.
pub const FEE_AR_PER_BYTE: f64 = 0.000_001;

/// Mock AR to USD exchange rate.
pub const FEE_AR_TO_USD: f64 = 25.50;

/// Mock USD to JPY exchange rate.
pub const FEE_USD_TO_JPY: f64 = 150.0;

/// Safety buffer applied to fee estimates.
pub const FEE_BUFFER_MULTIPLIER: f64 = 1.1;

/// Network label reported with fee estimates.
pub const FEE_NETWORK: &str = "irys-mainnet";

/// Permanent-storage gateway reported by public stats.
pub const ARWEAVE_GATEWAY: &str = "https://arweave.net";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

/// Default rate limit: max requests per period.
pub const RATE_LIMIT_REQUESTS: u64 = 100;

/// Default rate limit: period in seconds.
pub const RATE_LIMIT_PERIOD_SECS: u64 = 60;

// =============================================================================
// DATABASE
// =============================================================================

/// Connection pool ceiling.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Connections kept open while idle.
pub const DB_MIN_CONNECTIONS: u32 = 1;

/// Seconds to wait for a pooled connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Seconds before an idle connection is closed.
pub const DB_IDLE_TIMEOUT_SECS: u64 = 600;
