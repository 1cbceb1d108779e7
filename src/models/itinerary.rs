// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Scheduled outreach events and the itineraries computed for them.

use crate::spatial::Timestamped;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Lifecycle status of a scheduled event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventStatus {
    #[default]
    Planned,
    Ongoing,
    Completed,
    Canceled,
    /// Anything the backend adds later.
    Other(String),
}

impl From<String> for EventStatus {
    fn from(raw: String) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "planned" | "scheduled" => EventStatus::Planned,
            "ongoing" | "in_progress" => EventStatus::Ongoing,
            "completed" | "done" => EventStatus::Completed,
            "canceled" | "cancelled" => EventStatus::Canceled,
            _ => EventStatus::Other(raw),
        }
    }
}

impl From<EventStatus> for String {
    fn from(status: EventStatus) -> Self {
        match status {
            EventStatus::Planned => "planned".to_string(),
            EventStatus::Ongoing => "ongoing".to_string(),
            EventStatus::Completed => "completed".to_string(),
            EventStatus::Canceled => "canceled".to_string(),
            EventStatus::Other(s) => s,
        }
    }
}

/// A scheduled outreach ("maraude") event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub start_date: Option<String>,
}

/// A computed route between a start point and an event's area of interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: String,
    #[serde(default)]
    pub association_id: String,
    /// Linked scheduling event
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub start_lat: Option<f64>,
    #[serde(default)]
    pub start_lng: Option<f64>,
    #[serde(default)]
    pub end_lat: Option<f64>,
    #[serde(default)]
    pub end_lng: Option<f64>,
    /// Route geometry as a serialized FeatureCollection
    #[serde(default)]
    pub route_geojson: Option<String>,
    /// Distance in meters
    #[serde(default)]
    pub distance: Option<f64>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    /// Deep link to an external map service
    #[serde(default)]
    pub google_maps_url: Option<String>,
    /// Active/archived flag; absent means active
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Itinerary {
    /// Own flag, ignoring the linked event.
    pub fn is_flagged_active(&self) -> bool {
        self.is_active != Some(false)
    }

    /// Linked to an event that still exists and is not canceled.
    pub fn has_live_event(&self, events: &HashMap<String, Event>) -> bool {
        self.event_id
            .as_deref()
            .and_then(|id| events.get(id))
            .is_some_and(|event| event.status != EventStatus::Canceled)
    }

    /// Whether this itinerary belongs on the active map.
    ///
    /// Requires a live linked event and the itinerary's own flag not
    /// explicitly false.
    pub fn is_displayable(&self, events: &HashMap<String, Event>) -> bool {
        self.has_live_event(events) && self.is_flagged_active()
    }
}

impl Timestamped for Itinerary {
    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Request body sent to the backend to create an itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewItinerary {
    pub event_id: String,
    pub start_lat: f64,
    pub start_lng: f64,
    /// Search radius around the start point, in meters
    pub radius_m: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_address: Option<String>,
}
