// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Backend client tests against a stub upstream served over real HTTP.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Json, Router,
};
use chrono::Utc;
use maraude_map::services::BackendClient;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

mod common;

use common::{create_test_app_with_backend, json_body, ASSOCIATION};

/// Upstream that answers 503 while `healthy` is false.
async fn spawn_upstream(healthy: Arc<AtomicBool>) -> String {
    async fn points(State(healthy): State<Arc<AtomicBool>>) -> Response {
        if !healthy.load(Ordering::SeqCst) {
            return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
        }
        Json(json!({
            "data": [{
                "id": "p1",
                "association_id": ASSOCIATION,
                "latitude": 48.85,
                "longitude": 2.35,
                "created_at": Utc::now().to_rfc3339(),
            }]
        }))
        .into_response()
    }

    async fn empty(State(healthy): State<Arc<AtomicBool>>) -> Response {
        if !healthy.load(Ordering::SeqCst) {
            return (StatusCode::SERVICE_UNAVAILABLE, "down").into_response();
        }
        Json(json!([])).into_response()
    }

    async fn reject_patch() -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, "bad flag").into_response()
    }

    let app = Router::new()
        .route("/associations/{id}/points", get(points))
        .route("/associations/{id}/itineraries", get(empty))
        .route("/associations/{id}/events", get(empty))
        .route("/points/{id}", patch(reject_patch))
        .with_state(healthy);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn map_request() -> Request<Body> {
    Request::builder()
        .uri(format!("/api/associations/{}/map", ASSOCIATION))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_upstream_503_serves_stale_snapshot() {
    let healthy = Arc::new(AtomicBool::new(true));
    let url = spawn_upstream(healthy.clone()).await;
    let backend = BackendClient::new(&url, None, Duration::from_secs(5)).unwrap();
    let (app, state) = create_test_app_with_backend(backend);

    let response = app.clone().oneshot(map_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["stale"], false);
    assert_eq!(body["total_points"], 1);

    healthy.store(false, Ordering::SeqCst);

    let response = app.oneshot(map_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["stale"], true);
    assert!(body["notice"].is_string());
    assert_eq!(body["total_points"], 1);
    assert!(!state.live.status().connected);
}

#[tokio::test]
async fn test_upstream_503_without_snapshot() {
    let url = spawn_upstream(Arc::new(AtomicBool::new(false))).await;
    let backend = BackendClient::new(&url, None, Duration::from_secs(5)).unwrap();
    let (app, _) = create_test_app_with_backend(backend);

    let response = app.oneshot(map_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "backend_unavailable");
}

#[tokio::test]
async fn test_upstream_client_error_is_not_transient() {
    let url = spawn_upstream(Arc::new(AtomicBool::new(true))).await;
    let backend = BackendClient::new(&url, None, Duration::from_secs(5)).unwrap();

    let err = backend.set_point_active("p1", false).await.unwrap_err();
    assert!(!err.is_transient());

    let points = backend.fetch_points(ASSOCIATION, 7).await.unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn test_unreachable_upstream_is_transient() {
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let backend = BackendClient::new(&url, None, Duration::from_secs(5)).unwrap();
    let err = backend.fetch_events(ASSOCIATION).await.unwrap_err();
    assert!(err.is_transient());
}
