// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Field observation points.

use crate::spatial::{Located, Timestamped};
use geo::Point;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A single geolocated field observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeoPoint {
    /// Backend identifier (absent until persisted)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Owning association
    #[serde(default)]
    pub association_id: String,
    /// Latitude in degrees
    #[serde(alias = "lat")]
    pub latitude: f64,
    /// Longitude in degrees
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    /// Free-text notes left by the team
    #[serde(default)]
    pub notes: String,
    /// Human-readable address, if geocoded
    #[serde(default)]
    pub address: Option<String>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Creation timestamp (raw, as stored by the backend)
    #[serde(default)]
    pub created_at: Option<String>,
    /// When the situation was actually observed
    #[serde(default, alias = "date")]
    pub observed_at: Option<String>,
    /// Active flag; absent means active
    #[serde(default, rename = "is_active", alias = "active")]
    pub active: Option<bool>,
}

impl GeoPoint {
    /// Whether the point is shown as active.
    pub fn is_active(&self) -> bool {
        self.active != Some(false)
    }

    /// Latitude within [-90, 90] and longitude within [-180, 180].
    pub fn has_valid_coordinates(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Timestamp used for age tinting: observation time, falling back to creation.
    pub fn display_timestamp(&self) -> Option<&str> {
        self.observed_at.as_deref().or(self.created_at.as_deref())
    }
}

impl Located for GeoPoint {
    fn location(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

impl Timestamped for GeoPoint {
    fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }
}

/// Live-update notification about a point.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "point", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PointEvent {
    PointAdded(GeoPoint),
    PointUpdated(GeoPoint),
}

impl PointEvent {
    pub fn point(&self) -> &GeoPoint {
        match self {
            PointEvent::PointAdded(p) | PointEvent::PointUpdated(p) => p,
        }
    }

    /// Short name used as the SSE event type.
    pub fn kind(&self) -> &'static str {
        match self {
            PointEvent::PointAdded(_) => "point_added",
            PointEvent::PointUpdated(_) => "point_updated",
        }
    }
}

/// Merge a live update into a local point list.
///
/// Updates replace the point with the same id; additions (and updates for
/// unknown ids) are appended.
pub fn apply_point_event(points: &mut Vec<GeoPoint>, event: PointEvent) {
    let (incoming, is_update) = match event {
        PointEvent::PointAdded(p) => (p, false),
        PointEvent::PointUpdated(p) => (p, true),
    };

    let existing = incoming
        .id
        .as_ref()
        .and_then(|id| points.iter().position(|p| p.id.as_ref() == Some(id)));

    match existing {
        Some(idx) => points[idx] = incoming,
        None => {
            if is_update {
                tracing::debug!(id = ?incoming.id, "Update for unknown point, appending");
            }
            points.push(incoming);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, notes: &str) -> GeoPoint {
        GeoPoint {
            id: Some(id.to_string()),
            association_id: "asso".to_string(),
            latitude: 48.85,
            longitude: 2.35,
            notes: notes.to_string(),
            address: None,
            name: None,
            created_at: None,
            observed_at: None,
            active: None,
        }
    }

    #[test]
    fn test_deserialize_backend_shape() {
        let json = r#"{
            "id": "p1",
            "association_id": "a1",
            "latitude": 48.8566,
            "longitude": 2.3522,
            "notes": "2 personnes",
            "created_at": "2024-01-01T10:00:00Z",
            "is_active": false
        }"#;
        let p: GeoPoint = serde_json::from_str(json).unwrap();
        assert_eq!(p.id.as_deref(), Some("p1"));
        assert!(!p.is_active());
        assert_eq!(p.location(), Point::new(2.3522, 48.8566));
    }

    #[test]
    fn test_absent_active_flag_means_active() {
        let p: GeoPoint = serde_json::from_str(r#"{"lat": 1.0, "lng": 2.0}"#).unwrap();
        assert!(p.is_active());
        assert_eq!(p.notes, "");
    }

    #[test]
    fn test_coordinate_bounds() {
        let mut p = point("p", "");
        assert!(p.has_valid_coordinates());
        p.latitude = 91.0;
        assert!(!p.has_valid_coordinates());
        p.latitude = 0.0;
        p.longitude = -180.5;
        assert!(!p.has_valid_coordinates());
    }

    #[test]
    fn test_display_timestamp_prefers_observed() {
        let mut p = point("p", "");
        p.created_at = Some("2024-01-01T10:00:00Z".to_string());
        assert_eq!(p.display_timestamp(), Some("2024-01-01T10:00:00Z"));
        p.observed_at = Some("2024-01-01T09:00:00Z".to_string());
        assert_eq!(p.display_timestamp(), Some("2024-01-01T09:00:00Z"));
    }

    #[test]
    fn test_apply_event_replaces_by_id() {
        let mut points = vec![point("a", "old"), point("b", "")];
        apply_point_event(&mut points, PointEvent::PointUpdated(point("a", "new")));
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].notes, "new");
    }

    #[test]
    fn test_apply_event_appends_new() {
        let mut points = vec![point("a", "")];
        apply_point_event(&mut points, PointEvent::PointAdded(point("c", "")));
        apply_point_event(&mut points, PointEvent::PointUpdated(point("d", "")));
        assert_eq!(points.len(), 3);
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(PointEvent::PointAdded(point("a", ""))).unwrap();
        assert_eq!(json["type"], "point_added");
        assert_eq!(json["point"]["id"], "a");
    }
}
