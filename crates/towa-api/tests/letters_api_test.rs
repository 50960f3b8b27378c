//! HTTP tests for the towa API against in-memory collaborators.
//!
//! This test suite validates:
//! - The send, find, fetch, open and record flow end to end
//! - Strict request validation (unknown fields, bad keys, bad envelopes)
//! - Payload ceiling, moderation rejection and index-failure cleanup
//! - Fees, moderation, telemetry and stats endpoints
//! - Global rate limiting
//!
//! Requests go through the full router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use towa_api::{router, AppState, ServerConfig};
use towa_core::{
    Candidate, DiscoveryIndex, Error, LetterRecord, ModerationGate, ModerationRequest,
    ModerationVerdict, NewLetter, TelemetryKind,
};
use towa_crypto::{
    decode_envelope, derive_identity_key, encode_envelope, open, seal, KdfParams, SealOptions,
};
use towa_db::{FilesystemBackend, MemoryStore};

// ============================================================================
// Helpers
// ============================================================================

fn fast_options() -> SealOptions {
    SealOptions::default().with_kdf_params(KdfParams::new(1, 1024, 1))
}

fn sealed_envelope_json(plaintext: &[u8], question: &str, answer: &str) -> Value {
    let sealed = seal(plaintext, question, answer, &fast_options()).unwrap();
    serde_json::from_str(&encode_envelope(&sealed.envelope).unwrap()).unwrap()
}

fn identity() -> String {
    derive_identity_key("Yamada Taro", "1990-01-02").to_string()
}

fn app_with(state: AppState) -> Router {
    router(state, &ServerConfig::default())
}

fn memory_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (app_with(AppState::in_memory(store.clone())), store)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn upload(app: &Router, key: &str, envelope: Value) -> (StatusCode, Value) {
    send(
        app,
        post_json(
            "/api/v1/letters",
            &json!({ "discoveryKey": key, "envelope": envelope }),
        ),
    )
    .await
}

struct RejectAll;

#[async_trait]
impl ModerationGate for RejectAll {
    async fn check(&self, _request: &ModerationRequest) -> towa_core::Result<ModerationVerdict> {
        Ok(ModerationVerdict {
            approved: false,
            confidence: 0.99,
            flags: vec!["test".to_string()],
            message: "Question rejected".to_string(),
        })
    }
}

struct FailingIndex;

#[async_trait]
impl DiscoveryIndex for FailingIndex {
    async fn put(&self, _letter: NewLetter) -> towa_core::Result<LetterRecord> {
        Err(Error::Internal("index unavailable".to_string()))
    }

    async fn list(&self, _key: &str, _limit: i64) -> towa_core::Result<Vec<Candidate>> {
        Ok(Vec::new())
    }

    async fn get(&self, _id: Uuid) -> towa_core::Result<Option<LetterRecord>> {
        Ok(None)
    }
}

// ============================================================================
// Test Category 1: End-to-end flow
// ============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = memory_app();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_send_find_open_record_flow() {
    let (app, store) = memory_app();
    let key = identity();

    let envelope = sealed_envelope_json("誕生日おめでとう".as_bytes(), "favorite color?", "Blue");
    let (status, created) = upload(&app, &key, envelope).await;
    assert_eq!(status, StatusCode::CREATED);
    let letter_id: Uuid = created["letterId"].as_str().unwrap().parse().unwrap();
    assert!(created["bytes"].as_i64().unwrap() > 0);
    assert!(created["cost"]["ar"].as_f64().unwrap() > 0.0);

    // Reader derives the same key from a differently formatted identity
    let reader_key = derive_identity_key(" YAMADA\u{3000}taro ", "1990/01/02").to_string();
    assert_eq!(reader_key, key);
    let (status, index) = send(&app, get(&format!("/api/v1/index/{}", reader_key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(index["total"], 1);
    assert_eq!(index["discoveryKey"], key.as_str());
    assert_eq!(index["candidates"][0]["letterId"], letter_id.to_string());
    assert_eq!(index["candidates"][0]["question"], "favorite color?");

    let response = app
        .clone()
        .oneshot(get(&format!("/api/v1/letters/{}", letter_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let blob = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let envelope = decode_envelope(&blob).unwrap();
    assert_eq!(open(&envelope, " blue ").unwrap(), "誕生日おめでとう".as_bytes());

    let opening = json!({ "letterId": letter_id, "openerId": "reader-1" });
    let (status, recorded) = send(&app, post_json("/api/v1/openings", &opening)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(recorded["letterId"], letter_id.to_string());

    let (status, _) = send(&app, post_json("/api/v1/openings", &opening)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, stats) = send(&app, get("/api/v1/stats/public")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["letters"]["count"], 0);
    assert_eq!(stats["openings"]["count"], 1);
    assert_eq!(stats["openings"]["uniqueOpeners"], 1);

    let kinds: Vec<TelemetryKind> = store
        .telemetry_events()
        .await
        .into_iter()
        .map(|e| e.event)
        .collect();
    assert_eq!(
        kinds,
        vec![
            TelemetryKind::Sent,
            TelemetryKind::Found,
            TelemetryKind::Decrypt
        ]
    );
}

#[tokio::test]
async fn test_stored_blob_is_canonical_envelope() {
    let (app, _) = memory_app();
    let sealed = seal(b"hello", "q?", "a", &fast_options()).unwrap();
    let canonical = encode_envelope(&sealed.envelope).unwrap();

    let (status, created) = upload(&app, &identity(), serde_json::from_str(&canonical).unwrap()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["bytes"].as_u64().unwrap(), canonical.len() as u64);

    let response = app
        .clone()
        .oneshot(get(&format!(
            "/api/v1/letters/{}",
            created["letterId"].as_str().unwrap()
        )))
        .await
        .unwrap();
    let blob = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(blob, canonical.as_bytes());
}

#[tokio::test]
async fn test_filesystem_content_store() {
    let dir = tempfile::tempdir().unwrap();
    let blobs = FilesystemBackend::new(dir.path());
    blobs.validate().await.unwrap();

    let mut state = AppState::in_memory(Arc::new(MemoryStore::new()));
    state.content = Arc::new(blobs);
    let app = app_with(state);

    let (status, created) = upload(&app, &identity(), sealed_envelope_json(b"x", "q?", "a")).await;
    assert_eq!(status, StatusCode::CREATED);

    let uri = format!("/api/v1/letters/{}", created["letterId"].as_str().unwrap());
    let response = app.clone().oneshot(get(&uri)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// ============================================================================
// Test Category 2: Validation
// ============================================================================

#[tokio::test]
async fn test_unknown_field_rejected() {
    let (app, store) = memory_app();
    let body = json!({
        "discoveryKey": identity(),
        "envelope": sealed_envelope_json(b"x", "q?", "a"),
        "answer": "a",
    });
    let (status, _) = send(&app, post_json("/api/v1/letters", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(store.blob_count().await, 0);
}

#[tokio::test]
async fn test_invalid_discovery_key_rejected() {
    let (app, _) = memory_app();
    let envelope = sealed_envelope_json(b"x", "q?", "a");

    for key in ["", "xyz", "DCE2E53F9657421CB94BC2B0252C55E0", "dce2e53f"] {
        let (status, _) = upload(&app, key, envelope.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "key {:?}", key);
    }

    let (status, _) = send(&app, get("/api/v1/index/not-a-key")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_envelope_rejected() {
    let (app, _) = memory_app();

    let mut wrong_version = sealed_envelope_json(b"x", "q?", "a");
    wrong_version["version"] = json!(2);
    let (status, _) = upload(&app, &identity(), wrong_version).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut extra = sealed_envelope_json(b"x", "q?", "a");
    extra["plaintext"] = json!("leak");
    let (status, _) = upload(&app, &identity(), extra).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = upload(&app, &identity(), json!("not an envelope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_limit() {
    let (app, _) = memory_app();
    let key = identity();

    let mut ids = Vec::new();
    for question in ["first?", "second?", "third?"] {
        let (status, created) = upload(&app, &key, sealed_envelope_json(b"x", question, "a")).await;
        assert_eq!(status, StatusCode::CREATED);
        ids.push(created["letterId"].as_str().unwrap().to_string());
    }

    let (status, index) = send(&app, get(&format!("/api/v1/index/{}?limit=2", key))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(index["total"], 2);
    assert_eq!(index["candidates"][0]["letterId"], ids[2].as_str());
    assert_eq!(index["candidates"][1]["letterId"], ids[1].as_str());

    let (status, _) = send(&app, get(&format!("/api/v1/index/{}?limit=0", key))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_empty_index() {
    let (app, _) = memory_app();
    let (status, index) = send(&app, get(&format!("/api/v1/index/{}", identity()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(index["total"], 0);
    assert!(index["candidates"].as_array().unwrap().is_empty());
}

// ============================================================================
// Test Category 3: Rejections and failures
// ============================================================================

#[tokio::test]
async fn test_payload_ceiling() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(AppState::in_memory(store.clone()).with_max_payload_bytes(32));

    let (status, _) = upload(&app, &identity(), sealed_envelope_json(&[7u8; 32], "q?", "a")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = upload(&app, &identity(), sealed_envelope_json(&[7u8; 33], "q?", "a")).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(store.blob_count().await, 1);
}

#[tokio::test]
async fn test_moderation_rejection() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(AppState::in_memory(store.clone()).with_moderation(Arc::new(RejectAll)));

    let (status, body) = upload(&app, &identity(), sealed_envelope_json(b"x", "q?", "a")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "Question rejected");
    assert_eq!(store.blob_count().await, 0);
}

#[tokio::test]
async fn test_index_failure_removes_blob() {
    let store = Arc::new(MemoryStore::new());
    let app = app_with(AppState::in_memory(store.clone()).with_index(Arc::new(FailingIndex)));

    let (status, body) = upload(&app, &identity(), sealed_envelope_json(b"x", "q?", "a")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(body["incident"].is_string());
    assert_eq!(store.blob_count().await, 0);
    assert!(store.telemetry_events().await.is_empty());
}

#[tokio::test]
async fn test_unknown_letter() {
    let (app, _) = memory_app();
    let missing = Uuid::now_v7();

    let (status, _) = send(&app, get(&format!("/api/v1/letters/{}", missing))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let opening = json!({ "letterId": missing, "openerId": "reader-1" });
    let (status, _) = send(&app, post_json("/api/v1/openings", &opening)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api/v1/letters/not-a-uuid")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_opening_requires_opener() {
    let (app, _) = memory_app();
    let (_, created) = upload(&app, &identity(), sealed_envelope_json(b"x", "q?", "a")).await;

    let opening = json!({ "letterId": created["letterId"], "openerId": "  " });
    let (status, _) = send(&app, post_json("/api/v1/openings", &opening)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Test Category 4: Service endpoints
// ============================================================================

#[tokio::test]
async fn test_fee_estimate() {
    let (app, _) = memory_app();

    let (status, fee) = send(&app, get("/api/v1/fees?bytes=1048576")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fee["cost"]["usd"], 29.41);
    assert_eq!(fee["cost"]["jpy"], 4412.0);
    assert_eq!(fee["rates"]["arToUsd"], 25.5);
    assert_eq!(fee["network"], "irys-mainnet");

    for uri in ["/api/v1/fees", "/api/v1/fees?bytes=0", "/api/v1/fees?bytes=-5"] {
        let (status, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_moderation_check() {
    let (app, _) = memory_app();

    let draft = json!({
        "content": "<p>Happy birthday</p>",
        "attachments": [{ "name": "photo.jpg", "size": 2048, "type": "image/jpeg" }],
    });
    let (status, verdict) = send(&app, post_json("/api/v1/moderation/check", &draft)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verdict["approved"], true);
    assert_eq!(verdict["confidence"], 0.95);

    let (status, _) = send(
        &app,
        post_json("/api/v1/moderation/check", &json!({ "content": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_telemetry_event() {
    let (app, store) = memory_app();

    let (status, body) = send(
        &app,
        post_json("/api/v1/telemetry", &json!({ "event": "view", "value": 1.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["id"].is_string());
    assert_eq!(store.telemetry_events().await[0].event, TelemetryKind::View);

    let (status, _) = send(
        &app,
        post_json("/api/v1/telemetry", &json!({ "event": "opened" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_empty() {
    let (app, _) = memory_app();
    let (status, stats) = send(&app, get("/api/v1/stats/public")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["letters"]["count"], 0);
    assert_eq!(stats["cost"]["avgPerLetter"], 0.0);
    assert_eq!(stats["arweave"]["gateway"], "https://arweave.net");
    assert_eq!(stats["arweave"]["ok"], true);
}

#[tokio::test]
async fn test_stats_count_only_attributed_letters() {
    let (app, _) = memory_app();
    let key = identity();

    for sender in [Some("sender-1"), Some("sender-1"), None] {
        let mut body = json!({
            "discoveryKey": key,
            "envelope": sealed_envelope_json(b"hello", "q?", "a"),
        });
        if let Some(sender) = sender {
            body["senderId"] = json!(sender);
        }
        let (status, _) = send(&app, post_json("/api/v1/letters", &body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, stats) = send(&app, get("/api/v1/stats/public")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["letters"]["count"], 2);
    assert_eq!(stats["letters"]["uniqueSenders"], 1);
}

// ============================================================================
// Test Category 5: Middleware
// ============================================================================

#[tokio::test]
async fn test_rate_limit() {
    let state = AppState::in_memory(Arc::new(MemoryStore::new())).with_rate_limit(1, 3600);
    let app = app_with(state);

    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_request_id_header() {
    let (app, _) = memory_app();
    let response = app.clone().oneshot(get("/health")).await.unwrap();
    let id = response
        .headers()
        .get("x-request-id")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(id.parse::<Uuid>().unwrap().get_version_num(), 7);
}
