use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use switchyard_core::ledger::PriceTable;
use switchyard_core::provider::EchoProvider;
use switchyard_core::{CostLedger, Gateway, GatewayOptions, KeyRegistry, MessageNormalizer, RateLimiter, ResponseCache};
use switchyard_types::models::LimitSpec;
use switchyard_types::Permission;

use crate::router::build_router;
use crate::state::AppState;

struct Harness {
    server: TestServer,
    user_key: String,
    admin_key: String,
}

fn harness_with_limits(client: LimitSpec) -> Harness {
    let registry = Arc::new(KeyRegistry::new());
    let user_key = registry.create("acme", [Permission::Standard]).unwrap().key;
    let admin_key = registry.create("ops", [Permission::Admin]).unwrap().key;

    let gateway = Gateway::new(
        registry,
        Arc::new(RateLimiter::new(client, LimitSpec { capacity: 1000, refill_per_second: 100.0 })),
        Arc::new(ResponseCache::new(Duration::from_secs(60), None)),
        Arc::new(MessageNormalizer::default()),
        Arc::new(CostLedger::new(PriceTable::default())),
        Arc::new(EchoProvider::default()),
        GatewayOptions::default(),
    );
    let state = AppState::new(Arc::new(gateway), vec!["echo-1".into(), "gpt-4".into()]);
    let server = TestServer::new(build_router(state)).unwrap();

    Harness { server, user_key, admin_key }
}

fn harness() -> Harness {
    harness_with_limits(LimitSpec { capacity: 100, refill_per_second: 10.0 })
}

fn with_key(request: TestRequest, key: &str) -> TestRequest {
    request.add_header(HeaderName::from_static("x-api-key"), HeaderValue::from_str(key).unwrap())
}

fn completion_body(text: &str) -> Value {
    json!({"model": "echo-1", "messages": [{"role": "user", "content": text}]})
}

#[tokio::test]
async fn test_health_is_public() {
    let h = harness();
    let response = h.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_completion_then_cache_hit() {
    let h = harness();

    let first = with_key(h.server.post("/v1/completions"), &h.user_key).json(&completion_body("ping")).await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["content"], "ping");
    assert_eq!(first["cached"], false);

    let second = with_key(h.server.post("/v1/completions"), &h.user_key).json(&completion_body("ping")).await;
    let second: Value = second.json();
    assert_eq!(second["cached"], true);
    assert_eq!(second["hit_count"], 1);
    assert_eq!(second["fingerprint"], first["fingerprint"]);

    let stats: Value = with_key(h.server.get("/cache/stats"), &h.user_key).await.json();
    assert_eq!(stats["entry_count"], 1);
    assert_eq!(stats["total_hits"], 1);
}

#[tokio::test]
async fn test_bearer_and_query_keys_are_accepted() {
    let h = harness();

    let bearer = HeaderValue::from_str(&format!("Bearer {}", h.user_key)).unwrap();
    h.server.get("/usage").add_header(header::AUTHORIZATION, bearer).await.assert_status_ok();
    h.server.get("/usage").add_query_param("api_key", &h.user_key).await.assert_status_ok();
}

#[tokio::test]
async fn test_missing_or_unknown_key_is_unauthorized() {
    let h = harness();

    let response = h.server.post("/v1/completions").json(&completion_body("hi")).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "unauthorized");

    let response = with_key(h.server.get("/usage"), "sy_not_a_key").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_key_with_malformed_body_is_unauthorized() {
    let h = harness();

    let response = with_key(h.server.post("/v1/completions"), "sy_not_a_key")
        .content_type("application/json")
        .bytes("{ not json".into())
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "unauthorized");

    let response = h.server.post("/v1/completions").content_type("application/json").bytes("{ not json".into()).await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_completion_with_enhancements_and_citations() {
    let h = harness();

    let body = json!({
        "model": "echo-1",
        "messages": [{"role": "user", "content": "see [docs](https://docs.rs)"}],
        "enhancements": {"tone": "formal"},
        "extract_citations": true
    });
    let response = with_key(h.server.post("/v1/completions"), &h.user_key).json(&body).await;
    response.assert_status_ok();
    let response: Value = response.json();
    assert_eq!(response["citations"], json!([{"id": 1, "label": "docs", "url": "https://docs.rs"}]));
    assert!(response["content"].as_str().is_some_and(|c| c.contains("[1]")));

    // Without the option the field is omitted
    let plain: Value = with_key(h.server.post("/v1/completions"), &h.user_key)
        .json(&completion_body("see [docs](https://docs.rs)"))
        .await
        .json();
    assert!(plain.get("citations").is_none());
}

#[tokio::test]
async fn test_invalid_messages_are_bad_request() {
    let h = harness();

    let body = json!({"model": "echo-1", "messages": [{"role": "robot", "content": "beep"}]});
    let response = with_key(h.server.post("/v1/completions"), &h.user_key).json(&body).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "invalid_input");

    let response = with_key(h.server.post("/v1/completions"), &h.user_key)
        .content_type("application/json")
        .bytes("{ not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rate_limited_response_carries_retry_after() {
    let h = harness_with_limits(LimitSpec { capacity: 1, refill_per_second: 0.5 });

    with_key(h.server.post("/v1/completions"), &h.user_key)
        .json(&completion_body("one"))
        .await
        .assert_status_ok();

    let response = with_key(h.server.post("/v1/completions"), &h.user_key).json(&completion_body("two")).await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers().get(header::RETRY_AFTER).and_then(|v| v.to_str().ok()), Some("2"));

    let body: Value = response.json();
    assert_eq!(body["error"]["type"], "rate_limited");
    let retry = body["error"]["retry_after_secs"].as_f64().unwrap();
    assert!(retry > 1.5 && retry <= 2.0, "retry_after_secs = {retry}");
}

#[tokio::test]
async fn test_admin_routes_reject_standard_keys() {
    let h = harness();

    for path in ["/usage/report", "/usage/models", "/auth/keys"] {
        with_key(h.server.get(path), &h.user_key).await.assert_status(StatusCode::FORBIDDEN);
    }
    for path in ["/usage/reset", "/cache/clear"] {
        with_key(h.server.post(path), &h.user_key).await.assert_status(StatusCode::FORBIDDEN);
    }
    with_key(h.server.post("/rate-limits/client"), &h.user_key)
        .json(&json!({"id": "acme", "capacity": 5, "refill_per_second": 1.0}))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_usage_visibility() {
    let h = harness();
    with_key(h.server.post("/v1/completions"), &h.user_key)
        .json(&completion_body("count me"))
        .await
        .assert_status_ok();

    let own: Value = with_key(h.server.get("/usage"), &h.user_key).await.json();
    assert_eq!(own["requests"], 1);

    with_key(h.server.get("/usage"), &h.user_key)
        .add_query_param("client_id", "ops")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let by_admin: Value = with_key(h.server.get("/usage"), &h.admin_key)
        .add_query_param("client_id", "acme")
        .await
        .json();
    assert_eq!(by_admin["requests"], 1);

    let report: Value = with_key(h.server.get("/usage/report"), &h.admin_key).await.json();
    assert_eq!(report["totals"]["requests"], 1);
    assert_eq!(report["dispatched_requests"], 1);

    let reset: Value = with_key(h.server.post("/usage/reset"), &h.admin_key).await.json();
    assert_eq!(reset["removed"], 1);
}

#[tokio::test]
async fn test_rate_limit_routes() {
    let h = harness();

    let own: Value = with_key(h.server.get("/rate-limits"), &h.user_key).await.json();
    assert_eq!(own["subject_id"], "acme");
    assert_eq!(own["kind"], "client");
    assert_eq!(own["capacity"], 100);

    let updated = with_key(h.server.post("/rate-limits/model"), &h.admin_key)
        .json(&json!({"id": "echo-1", "capacity": 3, "refill_per_second": 0.5}))
        .await;
    updated.assert_status_ok();
    let updated: Value = updated.json();
    assert_eq!(updated["capacity"], 3);
    assert_eq!(updated["tokens_available"], 3.0);

    let model: Value = with_key(h.server.get("/rate-limits"), &h.user_key)
        .add_query_param("kind", "model")
        .add_query_param("subject", "echo-1")
        .await
        .json();
    assert_eq!(model["capacity"], 3);

    with_key(h.server.post("/rate-limits/client"), &h.admin_key)
        .json(&json!({"id": "acme", "capacity": 0, "refill_per_second": 1.0}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_key_lifecycle() {
    let h = harness();

    let created = with_key(h.server.post("/auth/keys"), &h.admin_key)
        .json(&json!({"owner": "globex", "allowed_models": ["gpt-4"], "rate_limit": 30}))
        .await;
    created.assert_status(StatusCode::CREATED);
    let created: Value = created.json();
    let new_key = created["key"].as_str().unwrap().to_string();
    assert!(new_key.starts_with("sy_"));
    assert_eq!(created["permissions"], json!(["standard"]));
    assert_eq!(created["rate_limit"], 30);

    let bucket: Value = with_key(h.server.get("/rate-limits"), &new_key).await.json();
    assert_eq!(bucket["capacity"], 30);

    let listed: Value = with_key(h.server.get("/auth/keys"), &h.admin_key).await.json();
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|k| k["key"].as_str().is_some_and(|s| s.contains("..."))));

    // Restricted to gpt-4
    let models: Value = with_key(h.server.get("/v1/models"), &new_key).await.json();
    assert_eq!(models["data"], json!([{"id": "gpt-4", "object": "model"}]));
    with_key(h.server.post("/v1/completions"), &new_key)
        .json(&completion_body("hello"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    with_key(h.server.post("/auth/keys/deactivate"), &h.admin_key)
        .json(&json!({"key": new_key}))
        .await
        .assert_status_ok();
    with_key(h.server.get("/usage"), &new_key).await.assert_status(StatusCode::UNAUTHORIZED);

    with_key(h.server.post("/auth/keys/deactivate"), &h.admin_key)
        .json(&json!({"key": "sy_missing"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint_renders_text() {
    let h = harness();
    let response = h.server.get("/metrics").await;
    response.assert_status_ok();
    assert!(response.text().starts_with('#') || response.text().contains("switchyard_"));
}
