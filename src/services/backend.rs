// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Association backend client.
//!
//! Handles:
//! - Point, itinerary and event retrieval
//! - Activation toggles for points, point groups and itineraries
//! - Itinerary creation and deletion
//!
//! List endpoints answer either with a bare array or with a wrapper object;
//! both shapes are normalized here so callers only ever see a `Vec`.

use crate::error::AppError;
use crate::models::{Event, GeoPoint, Itinerary, NewItinerary};
use crate::spatial::filter_recent;
use crate::time_utils::format_utc_rfc3339;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// List response as sent by the backend: bare array or wrapped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Bare(Vec<T>),
    Wrapped(ListWrapper<T>),
}

/// Wrapper object around a list.
#[derive(Debug, Deserialize)]
pub struct ListWrapper<T> {
    #[serde(
        alias = "points",
        alias = "itineraries",
        alias = "events",
        alias = "items",
        alias = "members",
        alias = "results"
    )]
    pub data: Vec<T>,
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) => items,
            ListPayload::Wrapped(wrapper) => wrapper.data,
        }
    }
}

#[derive(Serialize)]
struct ActiveBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    ids: Option<&'a [String]>,
    is_active: bool,
}

/// In-memory backend contents, for tests and offline development.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub points: Vec<GeoPoint>,
    pub itineraries: Vec<Itinerary>,
    pub events: Vec<(String, Event)>,
    /// When set, every call fails as if the backend were down.
    pub unavailable: bool,
    next_id: u64,
}

#[derive(Clone)]
enum Transport {
    Http {
        http: reqwest::Client,
        base_url: String,
        api_token: Option<String>,
    },
    Memory(Arc<RwLock<MemoryStore>>),
}

/// Association backend client.
#[derive(Clone)]
pub struct BackendClient {
    transport: Transport,
}

impl BackendClient {
    /// Create an HTTP client for the backend at `base_url`.
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            transport: Transport::Http {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                api_token,
            },
        })
    }

    /// Create an in-memory backend (offline mode).
    pub fn new_memory() -> Self {
        Self {
            transport: Transport::Memory(Arc::new(RwLock::new(MemoryStore::default()))),
        }
    }

    /// Handle on the in-memory store, if this client is in-memory.
    pub fn memory_store(&self) -> Option<Arc<RwLock<MemoryStore>>> {
        match &self.transport {
            Transport::Memory(store) => Some(store.clone()),
            Transport::Http { .. } => None,
        }
    }

    /// Points of an association created within the trailing `days` window.
    pub async fn fetch_points(
        &self,
        association_id: &str,
        days: u32,
    ) -> Result<Vec<GeoPoint>, AppError> {
        match &self.transport {
            Transport::Http { .. } => {
                let path = format!("associations/{}/points", urlencoding::encode(association_id));
                self.get_list(&path, &[("days", days.to_string())]).await
            }
            Transport::Memory(store) => {
                let store = store.read().await;
                check_available(&store)?;
                let points: Vec<GeoPoint> = store
                    .points
                    .iter()
                    .filter(|p| p.association_id == association_id)
                    .cloned()
                    .collect();
                Ok(filter_recent(points, days, chrono::Utc::now()))
            }
        }
    }

    /// All itineraries of an association.
    pub async fn fetch_itineraries(&self, association_id: &str) -> Result<Vec<Itinerary>, AppError> {
        match &self.transport {
            Transport::Http { .. } => {
                let path = format!(
                    "associations/{}/itineraries",
                    urlencoding::encode(association_id)
                );
                self.get_list(&path, &[]).await
            }
            Transport::Memory(store) => {
                let store = store.read().await;
                check_available(&store)?;
                Ok(store
                    .itineraries
                    .iter()
                    .filter(|i| i.association_id == association_id)
                    .cloned()
                    .collect())
            }
        }
    }

    /// All scheduled events of an association.
    pub async fn fetch_events(&self, association_id: &str) -> Result<Vec<Event>, AppError> {
        match &self.transport {
            Transport::Http { .. } => {
                let path = format!("associations/{}/events", urlencoding::encode(association_id));
                self.get_list(&path, &[]).await
            }
            Transport::Memory(store) => {
                let store = store.read().await;
                check_available(&store)?;
                Ok(store
                    .events
                    .iter()
                    .filter(|(asso, _)| asso == association_id)
                    .map(|(_, e)| e.clone())
                    .collect())
            }
        }
    }

    /// Set the active flag of a single point.
    pub async fn set_point_active(&self, point_id: &str, active: bool) -> Result<(), AppError> {
        match &self.transport {
            Transport::Http { .. } => {
                let path = format!("points/{}", urlencoding::encode(point_id));
                self.send_json(
                    reqwest::Method::PATCH,
                    &path,
                    &ActiveBody {
                        ids: None,
                        is_active: active,
                    },
                )
                .await
            }
            Transport::Memory(store) => {
                let mut store = store.write().await;
                check_available(&store)?;
                let point = store
                    .points
                    .iter_mut()
                    .find(|p| p.id.as_deref() == Some(point_id))
                    .ok_or_else(|| AppError::NotFound(format!("Point {}", point_id)))?;
                point.active = Some(active);
                Ok(())
            }
        }
    }

    /// Set the active flag of several points at once (a cluster).
    pub async fn set_points_active(&self, point_ids: &[String], active: bool) -> Result<(), AppError> {
        match &self.transport {
            Transport::Http { .. } => {
                self.send_json(
                    reqwest::Method::PATCH,
                    "points/bulk",
                    &ActiveBody {
                        ids: Some(point_ids),
                        is_active: active,
                    },
                )
                .await
            }
            Transport::Memory(store) => {
                let mut store = store.write().await;
                check_available(&store)?;
                if let Some(missing) = point_ids
                    .iter()
                    .find(|id| !store.points.iter().any(|p| p.id.as_ref() == Some(*id)))
                {
                    return Err(AppError::NotFound(format!("Point {}", missing)));
                }
                for point in store.points.iter_mut() {
                    if point.id.as_ref().is_some_and(|id| point_ids.contains(id)) {
                        point.active = Some(active);
                    }
                }
                Ok(())
            }
        }
    }

    /// Activate or archive an itinerary.
    pub async fn set_itinerary_active(
        &self,
        itinerary_id: &str,
        active: bool,
    ) -> Result<(), AppError> {
        match &self.transport {
            Transport::Http { .. } => {
                let path = format!("itineraries/{}", urlencoding::encode(itinerary_id));
                self.send_json(
                    reqwest::Method::PATCH,
                    &path,
                    &ActiveBody {
                        ids: None,
                        is_active: active,
                    },
                )
                .await
            }
            Transport::Memory(store) => {
                let mut store = store.write().await;
                check_available(&store)?;
                let itinerary = store
                    .itineraries
                    .iter_mut()
                    .find(|i| i.id == itinerary_id)
                    .ok_or_else(|| AppError::NotFound(format!("Itinerary {}", itinerary_id)))?;
                itinerary.is_active = Some(active);
                Ok(())
            }
        }
    }

    /// Delete an itinerary.
    pub async fn delete_itinerary(&self, itinerary_id: &str) -> Result<(), AppError> {
        match &self.transport {
            Transport::Http { http, .. } => {
                let url = self.url(&format!("itineraries/{}", urlencoding::encode(itinerary_id)));
                let response = self
                    .authorize(http.delete(&url))
                    .send()
                    .await
                    .map_err(unreachable_error)?;
                check_response(response).await.map(|_| ())
            }
            Transport::Memory(store) => {
                let mut store = store.write().await;
                check_available(&store)?;
                let before = store.itineraries.len();
                store.itineraries.retain(|i| i.id != itinerary_id);
                if store.itineraries.len() == before {
                    return Err(AppError::NotFound(format!("Itinerary {}", itinerary_id)));
                }
                Ok(())
            }
        }
    }

    /// Ask the backend to compute and store a new itinerary.
    pub async fn create_itinerary(
        &self,
        association_id: &str,
        request: &NewItinerary,
    ) -> Result<Itinerary, AppError> {
        match &self.transport {
            Transport::Http { http, .. } => {
                let url = self.url(&format!(
                    "associations/{}/itineraries",
                    urlencoding::encode(association_id)
                ));
                let response = self
                    .authorize(http.post(&url))
                    .json(request)
                    .send()
                    .await
                    .map_err(unreachable_error)?;
                let response = check_response(response).await?;
                response
                    .json()
                    .await
                    .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))
            }
            Transport::Memory(store) => {
                let mut store = store.write().await;
                check_available(&store)?;
                if !store
                    .events
                    .iter()
                    .any(|(asso, e)| asso == association_id && e.id == request.event_id)
                {
                    return Err(AppError::NotFound(format!("Event {}", request.event_id)));
                }
                store.next_id += 1;
                let itinerary = Itinerary {
                    id: format!("it-{}", store.next_id),
                    association_id: association_id.to_string(),
                    event_id: Some(request.event_id.clone()),
                    start_lat: Some(request.start_lat),
                    start_lng: Some(request.start_lng),
                    end_lat: None,
                    end_lng: None,
                    route_geojson: None,
                    distance: None,
                    duration: None,
                    google_maps_url: None,
                    is_active: Some(true),
                    created_at: Some(format_utc_rfc3339(chrono::Utc::now())),
                };
                store.itineraries.push(itinerary.clone());
                Ok(itinerary)
            }
        }
    }

    fn url(&self, path: &str) -> String {
        match &self.transport {
            Transport::Http { base_url, .. } => format!("{}/{}", base_url, path),
            Transport::Memory(_) => path.to_string(),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.transport {
            Transport::Http {
                api_token: Some(token),
                ..
            } => builder.bearer_auth(token),
            _ => builder,
        }
    }

    /// GET a list endpoint and normalize its shape.
    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let Transport::Http { http, .. } = &self.transport else {
            return Err(AppError::Internal(anyhow::anyhow!("HTTP call on memory backend")));
        };

        let url = self.url(path);
        tracing::debug!(url = %url, "Fetching list from backend");

        let response = self
            .authorize(http.get(&url).query(query))
            .send()
            .await
            .map_err(unreachable_error)?;
        let response = check_response(response).await?;

        let payload: ListPayload<T> = response
            .json()
            .await
            .map_err(|e| AppError::Backend(format!("JSON parse error: {}", e)))?;
        Ok(payload.into_vec())
    }

    /// Send a JSON body and ignore the response body.
    async fn send_json<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<(), AppError> {
        let Transport::Http { http, .. } = &self.transport else {
            return Err(AppError::Internal(anyhow::anyhow!("HTTP call on memory backend")));
        };

        let response = self
            .authorize(http.request(method, self.url(path)))
            .json(body)
            .send()
            .await
            .map_err(unreachable_error)?;
        check_response(response).await.map(|_| ())
    }
}

fn unreachable_error(e: reqwest::Error) -> AppError {
    AppError::Unavailable(e.to_string())
}

fn check_available(store: &MemoryStore) -> Result<(), AppError> {
    if store.unavailable {
        return Err(AppError::Unavailable(
            "in-memory backend offline".to_string(),
        ));
    }
    Ok(())
}

/// Check response status and return error if not successful.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(AppError::NotFound(url));
    }
    if status.is_server_error() {
        return Err(AppError::Unavailable(format!("HTTP {}: {}", status, body)));
    }

    Err(AppError::Backend(format!("HTTP {}: {}", status, body)))
}
