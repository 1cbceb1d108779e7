// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map API routes.

use crate::config::ALLOWED_DAY_WINDOWS;
use crate::error::{AppError, Result};
use crate::models::Itinerary;
use crate::services::map_view::{build_map_view, MapView, MapViewOptions};
use crate::services::route_planner::{PlannerState, RoutePlanner};
use crate::services::{Snapshot, ToggleKey};
use crate::spatial::sanitize_route_geojson;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Largest clustering radius a client may ask for, in meters.
const MAX_CLUSTER_RADIUS_M: f64 = 5_000.0;

const BACKEND_DOWN_NOTICE: &str =
    "Association backend unreachable; showing the last known data.";

/// API routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/associations/{id}/map", get(get_map))
        .route("/api/associations/{id}/itineraries", post(create_itinerary))
        .route("/api/points/{id}/toggle", post(toggle_point))
        .route("/api/clusters/toggle", post(toggle_cluster))
        .route("/api/itineraries/{id}/toggle", post(toggle_itinerary))
        .route("/api/itineraries/{id}", delete(delete_itinerary))
        .route("/api/route-geometry/sanitize", post(sanitize_geometry))
        .route("/api/session/reset", post(reset_session))
}

// ─── Map ─────────────────────────────────────────────────────

#[derive(Deserialize)]
struct MapQuery {
    /// Trailing window in days (1, 7, 30 or 90)
    days: Option<u32>,
    /// Render a heatmap instead of markers
    #[serde(default)]
    heatmap: bool,
    /// Also list deactivated points and archived itineraries
    #[serde(default)]
    include_inactive: bool,
    /// Clustering radius override, in meters
    radius: Option<f64>,
}

fn map_options(params: &MapQuery, state: &AppState) -> Result<MapViewOptions> {
    let days = params.days.unwrap_or(state.config.default_days);
    if !ALLOWED_DAY_WINDOWS.contains(&days) {
        return Err(AppError::BadRequest(format!(
            "'days' must be one of {:?}",
            ALLOWED_DAY_WINDOWS
        )));
    }

    let radius_m = params.radius.unwrap_or(state.config.cluster_radius_m);
    if !radius_m.is_finite() || radius_m <= 0.0 || radius_m > MAX_CLUSTER_RADIUS_M {
        return Err(AppError::BadRequest(format!(
            "'radius' must be in (0, {}] meters",
            MAX_CLUSTER_RADIUS_M
        )));
    }

    Ok(MapViewOptions {
        days,
        radius_m,
        heatmap: params.heatmap,
        include_inactive: params.include_inactive,
    })
}

/// Get the map display state for an association.
///
/// Falls back to the last fetched data, flagged stale, when the backend is
/// unreachable.
async fn get_map(
    State(state): State<Arc<AppState>>,
    Path(association_id): Path<String>,
    Query(params): Query<MapQuery>,
) -> Result<Json<MapView>> {
    let options = map_options(&params, &state)?;

    tracing::debug!(
        association_id = %association_id,
        days = options.days,
        heatmap = options.heatmap,
        "Fetching map"
    );

    let fetched = tokio::try_join!(
        state.backend.fetch_points(&association_id, options.days),
        state.backend.fetch_itineraries(&association_id),
        state.backend.fetch_events(&association_id),
    );

    let now = chrono::Utc::now();
    match fetched {
        Ok((points, itineraries, events)) => {
            state.live.mark_connected();
            let view = build_map_view(&points, &itineraries, &events, &options, now);
            state.snapshots.store(
                &association_id,
                Snapshot {
                    points,
                    itineraries,
                    events,
                    fetched_at: now,
                },
            );
            Ok(Json(view))
        }
        Err(err) if err.is_transient() => {
            state.live.mark_disconnected(BACKEND_DOWN_NOTICE);
            let Some(snapshot) = state.snapshots.get(&association_id) else {
                return Err(err);
            };

            tracing::warn!(
                association_id = %association_id,
                fetched_at = %snapshot.fetched_at,
                "Serving stale map data"
            );
            let mut view = build_map_view(
                &snapshot.points,
                &snapshot.itineraries,
                &snapshot.events,
                &options,
                now,
            );
            view.stale = true;
            view.notice = Some(BACKEND_DOWN_NOTICE.to_string());
            Ok(Json(view))
        }
        Err(err) => Err(err),
    }
}

// ─── Toggles ─────────────────────────────────────────────────

#[derive(Deserialize)]
struct ToggleRequest {
    active: bool,
}

#[derive(Deserialize, Validate)]
struct ClusterToggleRequest {
    #[validate(length(min = 1, max = 500))]
    ids: Vec<String>,
    active: bool,
}

/// Outcome of a confirmed toggle.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ToggleResponse {
    pub ids: Vec<String>,
    pub active: bool,
}

/// Activate or deactivate one point.
async fn toggle_point(
    State(state): State<Arc<AppState>>,
    Path(point_id): Path<String>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>> {
    let _guard = state
        .toggles
        .begin(ToggleKey::Point(point_id.clone()))
        .ok_or_else(|| AppError::Conflict(format!("Point {} is already being toggled", point_id)))?;

    state.backend.set_point_active(&point_id, body.active).await?;

    let ids = vec![point_id];
    state.snapshots.set_points_active(&ids, body.active);
    tracing::info!(point_id = %ids[0], active = body.active, "Point toggled");

    Ok(Json(ToggleResponse {
        ids,
        active: body.active,
    }))
}

/// Activate or deactivate every point of a cluster.
async fn toggle_cluster(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ClusterToggleRequest>,
) -> Result<Json<ToggleResponse>> {
    body.validate()?;

    let key = ToggleKey::cluster(&body.ids);
    let _guard = state
        .toggles
        .begin(key)
        .ok_or_else(|| AppError::Conflict("Cluster is already being toggled".to_string()))?;

    state.backend.set_points_active(&body.ids, body.active).await?;

    state.snapshots.set_points_active(&body.ids, body.active);
    tracing::info!(count = body.ids.len(), active = body.active, "Cluster toggled");

    Ok(Json(ToggleResponse {
        ids: body.ids,
        active: body.active,
    }))
}

/// Activate or archive an itinerary.
async fn toggle_itinerary(
    State(state): State<Arc<AppState>>,
    Path(itinerary_id): Path<String>,
    Json(body): Json<ToggleRequest>,
) -> Result<Json<ToggleResponse>> {
    let _guard = state
        .toggles
        .begin(ToggleKey::Itinerary(itinerary_id.clone()))
        .ok_or_else(|| {
            AppError::Conflict(format!("Itinerary {} is already being updated", itinerary_id))
        })?;

    state
        .backend
        .set_itinerary_active(&itinerary_id, body.active)
        .await?;

    state.snapshots.set_itinerary_active(&itinerary_id, body.active);
    tracing::info!(itinerary_id = %itinerary_id, active = body.active, "Itinerary toggled");

    Ok(Json(ToggleResponse {
        ids: vec![itinerary_id],
        active: body.active,
    }))
}

/// Delete an itinerary.
async fn delete_itinerary(
    State(state): State<Arc<AppState>>,
    Path(itinerary_id): Path<String>,
) -> Result<StatusCode> {
    let _guard = state
        .toggles
        .begin(ToggleKey::Itinerary(itinerary_id.clone()))
        .ok_or_else(|| {
            AppError::Conflict(format!("Itinerary {} is already being updated", itinerary_id))
        })?;

    state.backend.delete_itinerary(&itinerary_id).await?;
    state.snapshots.remove_itinerary(&itinerary_id);
    tracing::info!(itinerary_id = %itinerary_id, "Itinerary deleted");

    Ok(StatusCode::NO_CONTENT)
}

// ─── Itinerary creation ──────────────────────────────────────

#[derive(Deserialize, Validate)]
struct CreateItineraryRequest {
    #[validate(length(min = 1, max = 100))]
    event_id: String,
    #[validate(range(min = -90.0, max = 90.0))]
    start_lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    start_lng: f64,
    /// Present when the start point came from an address search
    #[validate(length(max = 300))]
    start_address: Option<String>,
    radius_m: Option<u32>,
}

#[derive(Serialize)]
struct CreateItineraryResponse {
    itinerary: Itinerary,
    state: PlannerState,
}

/// Create an itinerary for an event from a start point and radius.
async fn create_itinerary(
    State(state): State<Arc<AppState>>,
    Path(association_id): Path<String>,
    Json(body): Json<CreateItineraryRequest>,
) -> Result<(StatusCode, Json<CreateItineraryResponse>)> {
    body.validate()?;

    let mut planner = RoutePlanner::new();
    planner.select_event(&body.event_id)?;
    match body.start_address.as_deref().filter(|a| !a.trim().is_empty()) {
        Some(address) => planner.select_address(body.start_lat, body.start_lng, address)?,
        None => planner.select_map_click(body.start_lat, body.start_lng)?,
    }
    if let Some(radius_m) = body.radius_m {
        planner.set_radius(radius_m)?;
    }
    let request = planner.request_confirmation()?;

    let itinerary = state
        .backend
        .create_itinerary(&association_id, &request)
        .await?;
    planner.mark_created(&itinerary.id)?;

    tracing::info!(
        association_id = %association_id,
        itinerary_id = %itinerary.id,
        event_id = %request.event_id,
        radius_m = request.radius_m,
        "Itinerary created"
    );
    state
        .snapshots
        .push_itinerary(&association_id, itinerary.clone());

    Ok((
        StatusCode::CREATED,
        Json(CreateItineraryResponse {
            itinerary,
            state: planner.state().clone(),
        }),
    ))
}

// ─── Geometry ────────────────────────────────────────────────

/// Sanitize a raw route payload; `null` when nothing is renderable.
async fn sanitize_geometry(body: Bytes) -> Json<Option<serde_json::Value>> {
    let Ok(raw) = std::str::from_utf8(&body) else {
        tracing::warn!(len = body.len(), "Route geometry is not valid UTF-8");
        return Json(None);
    };
    Json(sanitize_route_geojson(raw).map(|g| g.as_json()))
}

// ─── Session ─────────────────────────────────────────────────

/// Tear down per-session state (logout).
async fn reset_session(State(state): State<Arc<AppState>>) -> StatusCode {
    state.reset_session_state();
    StatusCode::NO_CONTENT
}
