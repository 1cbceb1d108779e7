// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live point updates: backend webhook in, Server-Sent Events out.

use crate::models::PointEvent;
use crate::services::LiveStatus;
use crate::AppState;
use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Live-update routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/associations/{id}/live", get(subscribe))
        .route("/api/live/status", get(status))
        .route("/api/live/{uuid}/points", post(handle_point_event))
}

/// Stream an association's point updates as SSE.
async fn subscribe(
    State(state): State<Arc<AppState>>,
    Path(association_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::info!(association_id = %association_id, "Live subscriber connected");
    let subscription = state.live.subscribe(&association_id);

    let events = stream::unfold(subscription, |mut subscription| async move {
        let Some(update) = subscription.next().await else {
            tracing::debug!(
                association_id = %subscription.association_id(),
                "Live stream closed"
            );
            return None;
        };
        let event = Event::default()
            .event(update.kind())
            .json_data(&update)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to encode live update");
                Event::default().event("error").data("encoding failed")
            });
        Some((Ok::<_, Infallible>(event), subscription))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Current live channel status.
async fn status(State(state): State<Arc<AppState>>) -> Json<LiveStatus> {
    Json(state.live.status())
}

/// Backend webhook payload.
#[derive(Deserialize, Debug)]
struct WebhookPayload {
    association_id: String,
    event: PointEvent,
}

#[derive(Serialize, Default)]
struct WebhookResponse {
    delivered: usize,
}

/// Accept a point-added/point-updated notification from the backend.
async fn handle_point_event(
    State(state): State<Arc<AppState>>,
    Path(uuid): Path<String>,
    Json(payload): Json<serde_json::Value>,
) -> (StatusCode, Json<WebhookResponse>) {
    let expected = state.config.webhook_path_uuid.as_bytes();
    if !bool::from(uuid.as_bytes().ct_eq(expected)) {
        tracing::warn!(
            received_uuid = %uuid,
            "Security Alert: Webhook path UUID mismatch"
        );
        return (StatusCode::NOT_FOUND, Json(WebhookResponse::default()));
    }

    let payload: WebhookPayload = match serde_json::from_value(payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "Failed to parse live webhook payload");
            return (StatusCode::BAD_REQUEST, Json(WebhookResponse::default()));
        }
    };

    tracing::info!(
        association_id = %payload.association_id,
        kind = payload.event.kind(),
        point_id = ?payload.event.point().id,
        "Live point update received"
    );

    state.live.mark_connected();
    state
        .snapshots
        .apply_point_event(&payload.association_id, payload.event.clone());
    let delivered = state
        .live
        .publish(&payload.association_id, payload.event);

    (StatusCode::ACCEPTED, Json(WebhookResponse { delivered }))
}
