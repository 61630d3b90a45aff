//! Shared test helpers for worker integration tests.
#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use storefront_notifications::channels::BroadcastHub;
use tower::ServiceExt;

use storefront_worker::routes;
use storefront_worker::state::AppState;

/// Build the full app router around `hub`, reporting two workers. Uses the
/// same route structure as `main.rs`.
pub fn build_test_app(hub: BroadcastHub) -> Router {
    routes::build_router(AppState::new(hub, 2))
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
