//! Router-level integration tests using `tower::ServiceExt::oneshot`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use zkpa_api::state::AppState;
use zkpa_api::app;
use zkpa_crypto::SigningKey;
use zkpa_engine::{AttestationPipeline, EngineConfig, MemoryStore};

fn test_state(demo_mode: bool) -> AppState {
    let config = EngineConfig {
        demo_mode,
        ..EngineConfig::default()
    };
    let pipeline = AttestationPipeline::start(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(SigningKey::generate()),
        None,
        None,
    );
    AppState::new(pipeline, None)
}

fn create_body() -> Value {
    json!({
        "evidence": [
            {"uri": "demo://ev/1", "hash": "aa".repeat(32), "type": "log"}
        ],
        "policy": "NIST 800-53 - AC-2",
        "control": {
            "framework": "NIST 800-53",
            "control_id": "AC-2",
            "statement": "The organization manages information system accounts",
            "assessment_result": "PASS",
            "assessment_window": "2026-Q1"
        }
    })
}

async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value: Value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn wait_for_valid(state: &AppState, claim_id: &str) {
    for _ in 0..500 {
        let (status, body) = send(state, get(&format!("/attestations/{claim_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        match body["status"].as_str() {
            Some("valid") => return,
            Some(s) if s.starts_with("failed") => panic!("attestation failed: {body}"),
            _ => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    panic!("attestation {claim_id} did not become valid in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn create_returns_201_with_claim_id() {
    let state = test_state(false);
    let (status, body) = send(&state, post_json("/attestations", &create_body())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["claim_id"].as_str().unwrap().starts_with("ATT-"));
    assert_eq!(body["status"], "computing_commitment");
    assert!(body["created_at"].is_string());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_evidence_is_422() {
    let state = test_state(false);
    let mut body = create_body();
    body["evidence"] = json!([]);
    let (status, response) = send(&state, post_json("/attestations", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_evidence_digest_is_400() {
    let state = test_state(false);
    let mut body = create_body();
    body["evidence"][0]["hash"] = json!("not-a-digest");
    let (status, response) = send(&state, post_json("/attestations", &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["error"]["message"]
        .as_str()
        .unwrap()
        .contains("evidence[0]"));
}

#[tokio::test(flavor = "multi_thread")]
async fn idempotency_header_replays_claim_id() {
    let state = test_state(false);
    let body = create_body();

    let request = |key: &str| {
        Request::builder()
            .method("POST")
            .uri("/attestations")
            .header("content-type", "application/json")
            .header("Idempotency-Key", key)
            .body(Body::from(body.to_string()))
            .unwrap()
    };

    let (s1, r1) = send(&state, request("k-1")).await;
    let (s2, r2) = send(&state, request("k-1")).await;
    assert_eq!(s1, StatusCode::CREATED);
    assert_eq!(s2, StatusCode::CREATED);
    assert_eq!(r1["claim_id"], r2["claim_id"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn get_unknown_attestation_is_404() {
    let state = test_state(false);
    let (status, body) = send(&state, get("/attestations/ATT-20260101000000-abcdef")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    // Syntactically invalid identifiers are also 404, not 500.
    let (status, _) = send(&state, get("/attestations/garbage")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn full_flow_create_verify_download() {
    let state = test_state(false);
    let (_, created) = send(&state, post_json("/attestations", &create_body())).await;
    let claim_id = created["claim_id"].as_str().unwrap().to_string();
    wait_for_valid(&state, &claim_id).await;

    // Verify with the default check set.
    let (status, receipt) = send(
        &state,
        post_json("/verify", &json!({"attestation_id": claim_id})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["overall"], "PASS");
    assert_eq!(receipt["checks"].as_array().unwrap().len(), 6);
    let receipt_id = receipt["receipt_id"].as_str().unwrap();

    // The stored receipt is retrievable.
    let (status, stored) = send(&state, get(&format!("/verify/{receipt_id}"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["receipt_id"], receipt["receipt_id"]);

    // Download json package with attachment disposition.
    let response = app(state.clone())
        .oneshot(get(&format!("/attestations/{claim_id}/download?format=json")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get("content-disposition")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(disposition.starts_with("attachment"));
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let package: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(package["package"]["protocol"], "zkpa");

    // OSCAL rendering.
    let (status, oscal) = send(
        &state,
        get(&format!("/attestations/{claim_id}/download?format=oscal")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(oscal.get("assessment-results").is_some());

    // Unsupported format.
    let (status, _) = send(
        &state,
        get(&format!("/attestations/{claim_id}/download?format=pdf")),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Lifecycle events are exposed and non-empty.
    let (status, events) = send(&state, get(&format!("/attestations/{claim_id}/events"))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!events.as_array().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn list_respects_limit_clamp_and_status_filter() {
    let state = test_state(false);
    for _ in 0..3 {
        send(&state, post_json("/attestations", &create_body())).await;
    }

    let (status, body) = send(&state, get("/attestations?limit=100000")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 200);
    assert_eq!(body["count"], 3);

    let (status, _) = send(&state, get("/attestations?status=bogus")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = send(&state, get("/attestations?status=revoked")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn revoke_flow_via_http() {
    let state = test_state(false);
    let (_, created) = send(&state, post_json("/attestations", &create_body())).await;
    let claim_id = created["claim_id"].as_str().unwrap().to_string();
    wait_for_valid(&state, &claim_id).await;

    let (status, revoked) = send(
        &state,
        post_json(
            &format!("/attestations/{claim_id}/revoke"),
            &json!({"reason": "issuer key rotation"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["status"], "revoked");

    // Revoking again conflicts.
    let (status, _) = send(
        &state,
        post_json(
            &format!("/attestations/{claim_id}/revoke"),
            &json!({"reason": "again"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test(flavor = "multi_thread")]
async fn interpret_is_deterministic_over_http() {
    let state = test_state(false);
    let body = json!({
        "control_statement": "The organization manages information system accounts",
        "framework": "NIST 800-53",
        "control_id": "AC-2"
    });
    let (status, first) = send(&state, post_json("/control/interpret", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["claim_type"], "control_effectiveness");
    assert_eq!(first["proof_template"], "zk_predicate");
    assert_eq!(first["risk_level"], "high");
    assert_eq!(first["source"], "rule-based");

    let (_, second) = send(&state, post_json("/control/interpret", &body)).await;
    assert_eq!(first, second);
}

#[tokio::test(flavor = "multi_thread")]
async fn quick_attest_and_sample_catalog() {
    let state = test_state(false);

    let (status, catalog) = send(&state, get("/samples/controls")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(catalog["count"].as_u64().unwrap() >= 6);

    let (status, control) = send(&state, get("/samples/controls/AC-2")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(control["control"]["framework"], "NIST 800-53");

    let (status, created) = send(
        &state,
        post_json("/samples/quick-attest/AC-2", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    wait_for_valid(&state, created["claim_id"].as_str().unwrap()).await;

    let (status, _) = send(
        &state,
        post_json("/samples/quick-attest/XX-99", &json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread")]
async fn demo_surface_is_gated() {
    let locked = test_state(false);
    let (status, _) = send(&locked, get("/demo/stats")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let open = test_state(true);
    send(&open, post_json("/attestations", &create_body())).await;
    let (status, stats) = send(&open, get("/demo/stats")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["attestations"], 1);

    let (status, after) = send(
        &open,
        Request::builder()
            .method("POST")
            .uri("/demo/reset")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["attestations"], 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn health_probes_respond() {
    let state = test_state(false);
    let (status, _) = send(&state, get("/health/liveness")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&state, get("/health/readiness")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test(flavor = "multi_thread")]
async fn openapi_document_is_served() {
    let state = test_state(false);
    let (status, doc) = send(&state, get("/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/attestations").is_some());
}
