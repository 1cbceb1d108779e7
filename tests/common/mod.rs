// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use chrono::{Duration, Utc};
use maraude_map::config::Config;
use maraude_map::models::{Event, EventStatus, GeoPoint, Itinerary};
use maraude_map::routes::create_router;
use maraude_map::services::BackendClient;
use maraude_map::time_utils::format_utc_rfc3339;
use maraude_map::AppState;
use std::sync::Arc;

pub const ASSOCIATION: &str = "asso-1";

/// Create a test app backed by the in-memory backend.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        BackendClient::new_memory(),
    ));
    (create_router(state.clone()), state)
}

/// Create a test app talking to `backend`.
#[allow(dead_code)]
pub fn create_test_app_with_backend(backend: BackendClient) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(Config::test_default(), backend));
    (create_router(state.clone()), state)
}

/// A point created `minutes_ago` minutes before now.
#[allow(dead_code)]
pub fn point(id: &str, lat: f64, lng: f64, minutes_ago: i64) -> GeoPoint {
    GeoPoint {
        id: Some(id.to_string()),
        association_id: ASSOCIATION.to_string(),
        latitude: lat,
        longitude: lng,
        notes: format!("notes for {}", id),
        address: None,
        name: None,
        created_at: Some(format_utc_rfc3339(Utc::now() - Duration::minutes(minutes_ago))),
        observed_at: None,
        active: None,
    }
}

#[allow(dead_code)]
pub fn event(id: &str, status: EventStatus) -> Event {
    Event {
        id: id.to_string(),
        title: format!("Event {}", id),
        status,
        start_date: None,
    }
}

#[allow(dead_code)]
pub fn itinerary(id: &str, event_id: &str, route_geojson: &str) -> Itinerary {
    Itinerary {
        id: id.to_string(),
        association_id: ASSOCIATION.to_string(),
        event_id: Some(event_id.to_string()),
        start_lat: Some(48.85),
        start_lng: Some(2.35),
        end_lat: None,
        end_lng: None,
        route_geojson: Some(route_geojson.to_string()),
        distance: Some(1_500.0),
        duration: Some(1_200.0),
        google_maps_url: None,
        is_active: None,
        created_at: Some(format_utc_rfc3339(Utc::now() - Duration::hours(2))),
    }
}

/// Seed the in-memory backend.
#[allow(dead_code)]
pub async fn seed(
    state: &AppState,
    points: Vec<GeoPoint>,
    itineraries: Vec<Itinerary>,
    events: Vec<Event>,
) {
    let store = state
        .backend
        .memory_store()
        .expect("test app uses the memory backend");
    let mut store = store.write().await;
    store.points.extend(points);
    store.itineraries.extend(itineraries);
    store
        .events
        .extend(events.into_iter().map(|e| (ASSOCIATION.to_string(), e)));
}

/// Simulate the backend going down (or coming back).
#[allow(dead_code)]
pub async fn set_backend_available(state: &AppState, available: bool) {
    let store = state.backend.memory_store().expect("memory backend");
    store.write().await.unavailable = !available;
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json body")
}
