// tests/api_http.rs
//
// HTTP-level tests for the public Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.

use std::fs;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt as _; // for `oneshot`

use job_aggregator::aggregator::AggregationManager;
use job_aggregator::api::{create_router, AppState};
use job_aggregator::config::ProviderConfig;
use job_aggregator::sources::feedhire::FeedHireAdapter;
use job_aggregator::sources::jobwire::JobwireAdapter;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

/// Build the same Router the binary uses, backed by fixture adapters.
fn test_router() -> Router {
    let jobwire = fs::read_to_string("tests/fixtures/jobwire_search.json").expect("fixture");
    let feedhire = fs::read_to_string("tests/fixtures/feedhire_jobs.xml").expect("fixture");

    let mut manager = AggregationManager::new();
    manager.initialize_with(
        vec![
            Arc::new(JobwireAdapter::from_fixture(
                &jobwire,
                ProviderConfig::default(),
            )),
            Arc::new(FeedHireAdapter::from_fixture(
                &feedhire,
                ProviderConfig::default(),
            )),
        ],
        vec![],
    );
    create_router(AppState {
        manager: Arc::new(manager),
    })
}

#[tokio::test]
async fn health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).unwrap().trim(), "ok");
}

#[tokio::test]
async fn search_returns_the_aggregation_envelope() {
    let app = test_router();

    let payload = json!({
        "criteria": { "keywords": ["engineer"], "location": "Austin" }
    });
    let req = Request::builder()
        .method("POST")
        .uri("/search")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /search");

    let resp = app.oneshot(req).await.expect("oneshot /search");
    assert!(resp.status().is_success());

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Value = serde_json::from_slice(&bytes).expect("parse search json");

    assert_eq!(v["success"], json!(true));
    assert!(v["total"].as_u64().unwrap() > 0);
    assert!(v["jobs"].is_array());
    assert!(v["sources"]["jobwire"]["success"].as_bool().unwrap());
    assert!(v["sources"]["feedhire"]["success"].as_bool().unwrap());
    assert!(v["metadata"]["fetched_at"].is_string());
    assert_eq!(
        v["metadata"]["providers_queried"],
        json!(["jobwire", "feedhire"])
    );
}

#[tokio::test]
async fn empty_provider_list_falls_back_to_the_default_set() {
    let app = test_router();

    let payload = json!({ "criteria": {}, "providers": [] });
    let req = Request::builder()
        .method("POST")
        .uri("/search")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /search");

    let resp = app.oneshot(req).await.expect("oneshot /search");
    assert!(resp.status().is_success());

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Value = serde_json::from_slice(&bytes).expect("parse search json");
    assert_eq!(
        v["metadata"]["providers_queried"],
        json!(["jobwire", "feedhire"])
    );
    assert_eq!(v["sources"].as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn search_with_unknown_provider_is_a_400() {
    let app = test_router();

    let payload = json!({ "criteria": {}, "providers": ["mystery"] });
    let req = Request::builder()
        .method("POST")
        .uri("/search")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /search");

    let resp = app.oneshot(req).await.expect("oneshot /search");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn job_details_route_scopes_to_one_provider() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/jobs/jobwire/jw-101")
        .body(Body::empty())
        .expect("build GET /jobs");

    let resp = app.oneshot(req).await.expect("oneshot /jobs");
    assert!(resp.status().is_success());

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Value = serde_json::from_slice(&bytes).expect("parse detail json");
    assert_eq!(v["success"], json!(true));
    assert_eq!(v["job"]["title"], json!("Senior Rust Engineer"));
}

#[tokio::test]
async fn job_details_unknown_provider_is_a_404() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/jobs/mystery/any-id")
        .body(Body::empty())
        .expect("build GET /jobs");

    let resp = app.oneshot(req).await.expect("oneshot /jobs");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn connections_and_stats_routes_answer() {
    let app = test_router();

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/sources/connections")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /sources/connections");
    assert!(resp.status().is_success());

    let resp2 = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/sources/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("oneshot /sources/stats");
    assert!(resp2.status().is_success());

    let bytes = body::to_bytes(resp2.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Value = serde_json::from_slice(&bytes).expect("parse stats json");
    assert!(v.get("jobwire").is_some());
    assert!(v.get("feedhire").is_some());
}
