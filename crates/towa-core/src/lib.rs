//! # towa-core
//!
//! Core types, traits, and abstractions for towa sealed letters.
//!
//! This crate holds the pieces every other towa crate agrees on: the
//! server-side record models, the collaborator traits the HTTP layer talks
//! to (content store, discovery index, opening log, telemetry, stats), the
//! shared error type, and the stubbed fee and moderation services.
//!
//! Nothing in here touches key material. The cryptographic envelope lives in
//! `towa-crypto`; the server only ever handles opaque encrypted blobs.
//!
//! ## Log Level Contract
//!
//! All crates log through `tracing` with `subsystem`, `component` and `op`
//! fields plus entity fields such as `letter_id` and `discovery_key`.
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service or corrupt data, requires operator attention |
//! | WARN  | Recoverable issue, request rejected or side effect skipped |
//! | INFO  | Lifecycle events (startup, shutdown), letters stored |
//! | DEBUG | Decision points, config choices, timings |
//!
//! Answers, normalized identities, derived keys and plaintext are never
//! logged at any level.

pub mod defaults;
pub mod error;
pub mod fees;
pub mod models;
pub mod moderation;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use fees::FixedRateFeeEstimator;
pub use models::*;
pub use moderation::AllowAllModeration;
pub use traits::*;
pub use uuid_utils::new_v7;
