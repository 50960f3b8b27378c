//! # towa-api
//!
//! HTTP surface for towa sealed letters.
//!
//! The server stores and indexes envelopes that were sealed on the client.
//! It never receives answers, message keys or plaintext; the only readable
//! field it handles is the public security question.
//!
//! ## Routes
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | POST | `/api/v1/letters` | Store and index an envelope |
//! | GET | `/api/v1/letters/:id` | Fetch an encoded envelope |
//! | GET | `/api/v1/index/:discovery_key` | List candidates for an identity |
//! | POST | `/api/v1/openings` | Record that a reader opened a letter |
//! | GET | `/api/v1/fees` | Storage fee estimate |
//! | POST | `/api/v1/moderation/check` | Moderation verdict for a draft |
//! | POST | `/api/v1/telemetry` | Record a product event |
//! | GET | `/api/v1/stats/public` | Aggregate statistics |
//! | GET | `/health` | Liveness |

pub mod config;
pub mod error;
pub mod handlers;

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use governor::{Quota, RateLimiter};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use towa_core::defaults::MAX_PAYLOAD_BYTES;
use towa_core::{
    AllowAllModeration, ContentStore, DiscoveryIndex, FeeEstimator, FixedRateFeeEstimator,
    ModerationGate, OpeningLog, StatsRepository, TelemetrySink,
};
use towa_db::{Database, MemoryStore};

pub use config::ServerConfig;
pub use error::ApiError;

/// Global rate limiter type (direct quota, no per-client bucketing).
pub type GlobalRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Collaborators shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub content: Arc<dyn ContentStore>,
    pub index: Arc<dyn DiscoveryIndex>,
    pub openings: Arc<dyn OpeningLog>,
    pub telemetry: Arc<dyn TelemetrySink>,
    pub stats: Arc<dyn StatsRepository>,
    pub fees: Arc<dyn FeeEstimator>,
    pub moderation: Arc<dyn ModerationGate>,
    /// Ceiling on `encryptedContent` of uploaded envelopes.
    pub max_payload_bytes: usize,
    /// Global rate limiter (None if rate limiting is disabled).
    pub rate_limiter: Option<Arc<GlobalRateLimiter>>,
}

impl AppState {
    /// State backed entirely by one in-memory store.
    pub fn in_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            content: store.clone(),
            index: store.clone(),
            openings: store.clone(),
            telemetry: store.clone(),
            stats: store,
            fees: Arc::new(FixedRateFeeEstimator::default()),
            moderation: Arc::new(AllowAllModeration),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            rate_limiter: None,
        }
    }

    /// State backed by PostgreSQL repositories and the given blob store.
    pub fn with_database(db: Database, content: Arc<dyn ContentStore>) -> Self {
        Self {
            content,
            index: Arc::new(db.letters),
            openings: Arc::new(db.openings),
            telemetry: Arc::new(db.telemetry),
            stats: Arc::new(db.stats),
            fees: Arc::new(FixedRateFeeEstimator::default()),
            moderation: Arc::new(AllowAllModeration),
            max_payload_bytes: MAX_PAYLOAD_BYTES,
            rate_limiter: None,
        }
    }

    pub fn with_moderation(mut self, gate: Arc<dyn ModerationGate>) -> Self {
        self.moderation = gate;
        self
    }

    pub fn with_index(mut self, index: Arc<dyn DiscoveryIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn with_max_payload_bytes(mut self, limit: usize) -> Self {
        self.max_payload_bytes = limit;
        self
    }

    /// Install a global limiter of `requests` per `period_secs`.
    ///
    /// Zero values leave rate limiting disabled.
    pub fn with_rate_limit(mut self, requests: u64, period_secs: u64) -> Self {
        self.rate_limiter = build_rate_limiter(requests, period_secs);
        self
    }
}

fn build_rate_limiter(requests: u64, period_secs: u64) -> Option<Arc<GlobalRateLimiter>> {
    let burst = u32::try_from(requests).ok().and_then(NonZeroU32::new)?;
    let quota = Quota::with_period(Duration::from_secs(period_secs))?.allow_burst(burst);
    Some(Arc::new(RateLimiter::direct(quota)))
}

/// Request ids are UUIDv7 so they sort by arrival time.
#[derive(Clone, Copy)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Result<impl IntoResponse, (StatusCode, Json<serde_json::Value>)> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!(
                subsystem = "api",
                component = "rate_limit",
                "Rate limit exceeded"
            );
            return Err((
                StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "error": "rate_limit_exceeded",
                    "error_description": "Too many requests. Please wait before retrying."
                })),
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Build the application router with middleware.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/letters", post(handlers::letters::create_letter))
        .route("/api/v1/letters/:id", get(handlers::letters::get_letter))
        .route(
            "/api/v1/index/:discovery_key",
            get(handlers::index::list_candidates),
        )
        .route("/api/v1/openings", post(handlers::openings::record_opening))
        .route("/api/v1/fees", get(handlers::fees::estimate_fee))
        .route(
            "/api/v1/moderation/check",
            post(handlers::moderation::check_content),
        )
        .route("/api/v1/telemetry", post(handlers::telemetry::record_event))
        .route("/api/v1/stats/public", get(handlers::stats::public_stats))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(config.cors_origins()))
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
                .max_age(Duration::from_secs(3600)),
        )
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .with_state(state)
}
