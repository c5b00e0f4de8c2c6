//! HTTP-level tests of the `/hsm/v2` Component routes, driven in-process
//! with `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;
use smd_api::{create_api_router, ApiConfig, AppState, ComponentManager};
use smd_core::{Component, VersionPolicy};
use smd_events::{EventEmitter, EventError, EventHub, EventSink, LifecycleEvent};
use smd_storage::InMemoryStore;
use smd_test_utils::mocks::{FailingSink, RecordingSink, UnavailableStore};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

#[path = "support/harness.rs"]
mod harness;
use harness::{body_json, empty_request, harness, harness_with, json_request, uids};

const COMPONENTS: &str = "/hsm/v2/State/Components";

fn node(id: &str) -> serde_json::Value {
    json!({"ID": id, "Type": "Node", "State": "Ready", "NID": 17, "Enabled": true})
}

#[tokio::test]
async fn test_create_list_get_roundtrip() {
    let (h, _) = harness();

    let response = h
        .app()
        .oneshot(json_request(
            Method::POST,
            COMPONENTS,
            json!({"Components": [node("x0c0s0b0n0"), node("x0c0s1b0n0")]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-api-version"], "v1");

    let response = h.app().oneshot(empty_request(Method::GET, COMPONENTS)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let list = body_json(response).await;
    assert_eq!(list["Components"].as_array().map(Vec::len), Some(2));

    let response = h
        .app()
        .oneshot(empty_request(Method::GET, "/hsm/v2/State/Components/x0c0s1b0n0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, node("x0c0s1b0n0"));
}

#[tokio::test]
async fn test_trailing_slash_collection_route() {
    let (h, _) = harness();
    let response = h
        .app()
        .oneshot(empty_request(Method::GET, "/hsm/v2/State/Components/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"Components": []}));
}

#[tokio::test]
async fn test_nid_accepts_numbers_and_numeric_strings() {
    let (h, _) = harness();
    let body = r#"{"Components":[
        {"ID":"max","Type":"Node","NID":18446744073709551615},
        {"ID":"text","Type":"Node","NID":"42"},
        {"ID":"big","Type":"Node","NID":123456789012345678901234},
        {"ID":"frac","Type":"Node","NID":1.50}
    ]}"#;
    let request = Request::builder()
        .method(Method::POST)
        .uri(COMPONENTS)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();
    assert_eq!(h.app().oneshot(request).await.unwrap().status(), StatusCode::CREATED);

    let response = h.app().oneshot(empty_request(Method::GET, COMPONENTS)).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#""NID":18446744073709551615"#), "{}", text);
    assert!(text.contains(r#""NID":42"#), "{}", text);
    assert!(text.contains(r#""NID":123456789012345678901234"#), "{}", text);
    assert!(text.contains(r#""NID":1.50"#), "{}", text);
}

#[tokio::test]
async fn test_update_keeps_nid_digits() {
    let (h, _) = harness();
    let response = h
        .app()
        .oneshot(json_request(Method::POST, COMPONENTS, json!({"Components": [node("x0")]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/hsm/v2/State/Components/x0")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"ID":"x0","NID":98765432109876543210,"labels":{"rack":"r1"}}"#))
        .unwrap();
    let response = h.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#""NID":98765432109876543210"#), "{}", text);
}

#[tokio::test]
async fn test_bad_json_is_invalid_input() {
    let (h, store) = harness();
    let request = Request::builder()
        .method(Method::POST)
        .uri(COMPONENTS)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"Components\": [ {"))
        .unwrap();

    let response = h.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_non_numeric_nid_rejected() {
    let (h, _) = harness();
    let response = h
        .app()
        .oneshot(json_request(
            Method::POST,
            COMPONENTS,
            json!({"Components": [{"ID": "x0", "NID": "abc"}]}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_description_over_limit_is_400() {
    let (h, store) = harness();
    let response = h
        .app()
        .oneshot(json_request(
            Method::POST,
            COMPONENTS,
            json!({"Components": [{"ID": "x0", "description": "d".repeat(201)}]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_FAILED");
    assert_eq!(body["details"][0]["constraint"], "max=200");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_get_missing_is_404() {
    let (h, _) = harness();
    let response = h
        .app()
        .oneshot(empty_request(Method::GET, "/hsm/v2/State/Components/nope"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "ENTITY_NOT_FOUND");
}

#[tokio::test]
async fn test_update_returns_new_spec() {
    let (h, _) = harness();
    h.app()
        .oneshot(json_request(Method::POST, COMPONENTS, json!({"Components": [node("x0")]})))
        .await
        .unwrap();

    let response = h
        .app()
        .oneshot(json_request(
            Method::PUT,
            "/hsm/v2/State/Components/x0",
            json!({"ID": "x0", "State": "Off", "labels": {"rack": "x3000"}}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"ID": "x0", "Type": "", "State": "Off"}));
    let stored = h.manager.get("x0").await.unwrap();
    assert_eq!(stored.metadata.labels().get("rack").map(String::as_str), Some("x3000"));
}

#[tokio::test]
async fn test_update_missing_with_bad_body_is_404() {
    let (h, _) = harness();
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/hsm/v2/State/Components/ghost")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();

    let response = h.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_existing_with_bad_body_is_400() {
    let (h, _) = harness();
    h.app()
        .oneshot(json_request(Method::POST, COMPONENTS, json!({"Components": [node("x0")]})))
        .await
        .unwrap();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/hsm/v2/State/Components/x0")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("not json"))
        .unwrap();
    let response = h.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_delete_always_succeeds() {
    let (h, _) = harness();
    h.app()
        .oneshot(json_request(Method::POST, COMPONENTS, json!({"Components": [node("x0")]})))
        .await
        .unwrap();

    for _ in 0..2 {
        let response = h
            .app()
            .oneshot(empty_request(Method::DELETE, "/hsm/v2/State/Components/x0"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"Message": "Component deleted successfully", "ID": "x0"})
        );
    }

    let response = h
        .app()
        .oneshot(empty_request(Method::GET, "/hsm/v2/State/Components/x0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_id_conflict_when_enforced() {
    let (h, store) = harness();
    let manager = h.manager.clone().enforce_unique_ids(true);
    let app = smd_api::create_api_router(
        smd_api::AppState::new(manager, VersionPolicy::default(), h.hub.clone()),
        &smd_api::ApiConfig::default(),
    );

    let create = || json_request(Method::POST, COMPONENTS, json!({"Components": [node("x0")]}));
    assert_eq!(app.clone().oneshot(create()).await.unwrap().status(), StatusCode::CREATED);

    let response = app.oneshot(create()).await.unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "ENTITY_ALREADY_EXISTS");
    assert_eq!(store.len().await, 1);
}

// ============================================================================
// VERSION NEGOTIATION
// ============================================================================

#[tokio::test]
async fn test_unsupported_version_rejected() {
    let (h, _) = harness();
    let request = Request::builder()
        .method(Method::GET)
        .uri(COMPONENTS)
        .header("X-API-Version", "v9")
        .body(Body::empty())
        .unwrap();

    let response = h.app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UNSUPPORTED_VERSION");
    assert_eq!(body["details"]["served"], json!(["v1"]));
}

#[tokio::test]
async fn test_requested_version_is_stamped() {
    let (h, _) = harness();
    let policy = VersionPolicy::new("smd.openchami.io", vec!["v1".into(), "v2".into()]).unwrap();
    let request = Request::builder()
        .method(Method::POST)
        .uri(COMPONENTS)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json;version=v2")
        .body(Body::from(json!({"Components": [node("x0")]}).to_string()))
        .unwrap();

    let response = h.app_with_policy(policy).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-api-version"], "v2");

    let stored = h.manager.get("x0").await.unwrap();
    assert_eq!(stored.api_version, "smd.openchami.io/v2");
    assert_eq!(stored.schema_version, "v2");
}

// ============================================================================
// OPERATIONAL ENDPOINTS
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let (h, _) = harness();

    let response = h.app().oneshot(empty_request(Method::GET, "/health/ping")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = h.app().oneshot(empty_request(Method::GET, "/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "healthy");
}

#[tokio::test]
async fn test_unreachable_store_is_not_ready() {
    let h = harness_with(Arc::new(UnavailableStore), uids());

    let response = h.app().oneshot(empty_request(Method::GET, "/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = h.app().oneshot(empty_request(Method::GET, COMPONENTS)).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "STORAGE_ERROR");
    assert!(!body["message"].as_str().unwrap_or_default().contains("offline"));
}

#[tokio::test]
async fn test_metrics_and_openapi_served() {
    let (h, _) = harness();
    h.app().oneshot(empty_request(Method::GET, COMPONENTS)).await.unwrap();

    let response = h.app().oneshot(empty_request(Method::GET, "/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("smd_lifecycle_operations_total"));

    let response = h.app().oneshot(empty_request(Method::GET, "/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(response).await["paths"]["/hsm/v2/State/Components"].is_object());
}

#[tokio::test]
async fn test_sink_failures_do_not_change_responses() {
    let store = InMemoryStore::<Component>::new();
    let recorder = Arc::new(RecordingSink::new());
    let failures = Arc::new(AtomicUsize::new(0));
    let counted = failures.clone();
    let (events, worker) = EventEmitter::builder("smd")
        .sink(Arc::new(FailingSink) as Arc<dyn EventSink>)
        .sink(recorder.clone() as Arc<dyn EventSink>)
        .on_delivery_failure(Arc::new(
            move |_event: &LifecycleEvent, _sink: &str, _error: &EventError| {
                counted.fetch_add(1, Ordering::SeqCst);
            },
        ))
        .spawn();
    let manager = ComponentManager::new(Arc::new(store.clone()), uids(), events);
    let app = create_api_router(
        AppState::new(manager, VersionPolicy::default(), EventHub::new(8)),
        &ApiConfig::default(),
    );

    let response = app
        .clone()
        .oneshot(json_request(Method::POST, COMPONENTS, json!({"Components": [node("x0")]})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(empty_request(Method::DELETE, "/hsm/v2/State/Components/x0"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(store.is_empty().await);

    drop(app);
    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .expect("event worker drains")
        .expect("event worker exits cleanly");
    assert_eq!(failures.load(Ordering::SeqCst), 2);
    assert_eq!(recorder.events().len(), 2);
}
