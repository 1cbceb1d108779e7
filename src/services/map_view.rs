// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Map display state.
//!
//! Turns raw points, itineraries and events into what the map client draws:
//! individual and aggregate markers (or heatmap points), and route polylines.

use crate::models::{Event, GeoPoint, Itinerary};
use crate::spatial::{
    cluster_points, filter_recent_refs, sanitize_route_geojson, AgeColor, Cluster,
};
use crate::time_utils::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Label shown for points with neither a name nor an address.
const FALLBACK_LABEL: &str = "Point";

/// Knobs for building a map view.
#[derive(Debug, Clone, Copy)]
pub struct MapViewOptions {
    pub days: u32,
    pub radius_m: f64,
    pub heatmap: bool,
    pub include_inactive: bool,
}

/// A point as shown in a marker or popup.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PointView {
    pub id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub label: String,
    pub notes: String,
    pub address: Option<String>,
    pub observed_at: Option<String>,
    pub color: AgeColor,
    pub color_hex: String,
    pub active: bool,
}

impl PointView {
    fn from_point(point: &GeoPoint, now: DateTime<Utc>) -> Self {
        let color = AgeColor::for_timestamp(point.display_timestamp(), now);
        Self {
            id: point.id.clone(),
            lat: point.latitude,
            lng: point.longitude,
            label: point
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .or_else(|| point.address.clone())
                .unwrap_or_else(|| FALLBACK_LABEL.to_string()),
            notes: point.notes.clone(),
            address: point.address.clone(),
            observed_at: point.display_timestamp().map(str::to_string),
            color,
            color_hex: color.hex().to_string(),
            active: point.is_active(),
        }
    }
}

/// A marker on the map.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MarkerView {
    /// A lone point.
    Single { point: PointView },
    /// Several nearby points shown as one counted marker.
    Cluster {
        lat: f64,
        lng: f64,
        #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
        count: usize,
        color: AgeColor,
        color_hex: String,
        /// Ids to send with a cluster toggle
        member_ids: Vec<String>,
        members: Vec<PointView>,
    },
}

/// A weighted heatmap sample.
#[derive(Debug, Clone, Copy, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HeatPoint {
    pub lat: f64,
    pub lng: f64,
    pub intensity: f64,
}

/// Map bounds as `[[south, west], [north, east]]`.
pub type LatLngBounds = [[f64; 2]; 2];

/// An itinerary as drawn on the map.
#[derive(Debug, Clone, Serialize)]
pub struct RouteView {
    pub id: String,
    pub event_id: Option<String>,
    pub event_title: Option<String>,
    pub distance_m: Option<f64>,
    pub duration_s: Option<f64>,
    pub google_maps_url: Option<String>,
    pub active: bool,
    /// `None` when the stored geometry is unrenderable.
    pub geometry: Option<geojson::FeatureCollection>,
    pub bounds: Option<LatLngBounds>,
}

/// Everything the map client needs for one render.
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub days: u32,
    pub heatmap: bool,
    /// Discrete markers; empty in heatmap mode.
    pub markers: Vec<MarkerView>,
    /// Heatmap samples; empty unless in heatmap mode.
    pub heat_points: Vec<HeatPoint>,
    /// Deactivated points, when requested.
    pub inactive_points: Vec<PointView>,
    /// Displayable itineraries.
    pub routes: Vec<RouteView>,
    /// Archived itineraries of live events, when requested.
    pub archived_routes: Vec<RouteView>,
    pub total_points: usize,
    pub active_points: usize,
    /// Built from cached data because the backend was unreachable.
    pub stale: bool,
    /// User-facing notice accompanying stale data.
    pub notice: Option<String>,
}

/// Build the display state for one association.
pub fn build_map_view(
    points: &[GeoPoint],
    itineraries: &[Itinerary],
    events: &[Event],
    options: &MapViewOptions,
    now: DateTime<Utc>,
) -> MapView {
    let recent: Vec<&GeoPoint> = filter_recent_refs(points, options.days, now)
        .into_iter()
        .filter(|p| {
            let valid = p.has_valid_coordinates();
            if !valid {
                tracing::warn!(
                    id = ?p.id,
                    lat = p.latitude,
                    lng = p.longitude,
                    "Skipping point with invalid coordinates"
                );
            }
            valid
        })
        .collect();

    let (active, inactive): (Vec<&GeoPoint>, Vec<&GeoPoint>) =
        recent.iter().copied().partition(|p| p.is_active());

    let (markers, heat_points) = if options.heatmap {
        let heat: Vec<HeatPoint> = active
            .iter()
            .map(|p| HeatPoint {
                lat: p.latitude,
                lng: p.longitude,
                intensity: 1.0,
            })
            .collect();
        (Vec::new(), heat)
    } else {
        let clusters = cluster_points(&active, options.radius_m);
        let markers: Vec<MarkerView> = clusters.iter().map(|c| marker_for(c, now)).collect();
        (markers, Vec::new())
    };

    let inactive_points = if options.include_inactive {
        inactive.iter().map(|p| PointView::from_point(p, now)).collect()
    } else {
        Vec::new()
    };

    let events_by_id: HashMap<String, Event> =
        events.iter().map(|e| (e.id.clone(), e.clone())).collect();

    let mut routes = Vec::new();
    let mut archived_routes = Vec::new();
    for itinerary in filter_recent_refs(itineraries, options.days, now) {
        if itinerary.is_displayable(&events_by_id) {
            routes.push(route_view(itinerary, &events_by_id));
        } else if options.include_inactive && itinerary.has_live_event(&events_by_id) {
            archived_routes.push(route_view(itinerary, &events_by_id));
        }
    }

    tracing::debug!(
        points = points.len(),
        in_window = recent.len(),
        active = active.len(),
        markers = markers.len(),
        routes = routes.len(),
        "Built map view"
    );

    MapView {
        days: options.days,
        heatmap: options.heatmap,
        markers,
        heat_points,
        inactive_points,
        routes,
        archived_routes,
        total_points: recent.len(),
        active_points: active.len(),
        stale: false,
        notice: None,
    }
}

fn marker_for(cluster: &Cluster<'_, &GeoPoint>, now: DateTime<Utc>) -> MarkerView {
    if cluster.is_single() {
        return MarkerView::Single {
            point: PointView::from_point(cluster.seed(), now),
        };
    }

    let seed = cluster.seed();
    let newest = cluster
        .members()
        .iter()
        .filter_map(|p| p.display_timestamp().and_then(parse_timestamp))
        .max();
    let color = AgeColor::for_time(newest, now);

    MarkerView::Cluster {
        lat: seed.latitude,
        lng: seed.longitude,
        count: cluster.len(),
        color,
        color_hex: color.hex().to_string(),
        member_ids: cluster
            .members()
            .iter()
            .filter_map(|p| p.id.clone())
            .collect(),
        members: cluster
            .members()
            .iter()
            .map(|p| PointView::from_point(p, now))
            .collect(),
    }
}

fn route_view(itinerary: &Itinerary, events: &HashMap<String, Event>) -> RouteView {
    let geometry = itinerary
        .route_geojson
        .as_deref()
        .and_then(sanitize_route_geojson);

    if geometry.is_none() && itinerary.route_geojson.is_some() {
        tracing::debug!(id = %itinerary.id, "Itinerary geometry not renderable");
    }

    let bounds = geometry
        .as_ref()
        .and_then(|g| g.bounding_rect())
        .map(|r| [[r.min().y, r.min().x], [r.max().y, r.max().x]]);

    RouteView {
        id: itinerary.id.clone(),
        event_id: itinerary.event_id.clone(),
        event_title: itinerary
            .event_id
            .as_ref()
            .and_then(|id| events.get(id))
            .map(|e| e.title.clone()),
        distance_m: itinerary.distance,
        duration_s: itinerary.duration,
        google_maps_url: itinerary.google_maps_url.clone(),
        active: itinerary.is_flagged_active(),
        geometry: geometry.map(|g| g.to_feature_collection()),
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventStatus;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn point(id: &str, lat: f64, lng: f64, created_at: &str) -> GeoPoint {
        GeoPoint {
            id: Some(id.to_string()),
            association_id: "a1".to_string(),
            latitude: lat,
            longitude: lng,
            notes: String::new(),
            address: None,
            name: None,
            created_at: Some(created_at.to_string()),
            observed_at: None,
            active: None,
        }
    }

    fn options() -> MapViewOptions {
        MapViewOptions {
            days: 7,
            radius_m: 50.0,
            heatmap: false,
            include_inactive: false,
        }
    }

    #[test]
    fn test_cluster_marker_uses_newest_member_color() {
        let points = vec![
            point("old", 48.8566, 2.3522, "2024-06-13T12:00:00Z"),
            point("new", 48.8567, 2.3523, "2024-06-15T11:30:00Z"),
        ];

        let view = build_map_view(&points, &[], &[], &options(), now());
        assert_eq!(view.markers.len(), 1);
        match &view.markers[0] {
            MarkerView::Cluster {
                count,
                color,
                member_ids,
                lat,
                ..
            } => {
                assert_eq!(*count, 2);
                assert_eq!(*color, AgeColor::Urgent);
                assert_eq!(member_ids, &vec!["old".to_string(), "new".to_string()]);
                assert_eq!(*lat, 48.8566);
            }
            other => panic!("expected cluster, got {:?}", other),
        }
    }

    #[test]
    fn test_heatmap_replaces_markers() {
        let points = vec![
            point("a", 48.85, 2.35, "2024-06-15T10:00:00Z"),
            point("b", 45.76, 4.83, "2024-06-15T10:00:00Z"),
        ];
        let mut opts = options();
        opts.heatmap = true;

        let view = build_map_view(&points, &[], &[], &opts, now());
        assert!(view.markers.is_empty());
        assert_eq!(view.heat_points.len(), 2);
    }

    #[test]
    fn test_inactive_points_split_out() {
        let mut off = point("off", 45.76, 4.83, "2024-06-15T10:00:00Z");
        off.active = Some(false);
        let points = vec![point("on", 48.85, 2.35, "2024-06-15T10:00:00Z"), off];

        let view = build_map_view(&points, &[], &[], &options(), now());
        assert_eq!(view.markers.len(), 1);
        assert!(view.inactive_points.is_empty());
        assert_eq!(view.active_points, 1);

        let mut opts = options();
        opts.include_inactive = true;
        let view = build_map_view(&points, &[], &[], &opts, now());
        assert_eq!(view.inactive_points.len(), 1);
        assert!(!view.inactive_points[0].active);
    }

    #[test]
    fn test_invalid_coordinates_skipped() {
        let points = vec![point("bad", 123.0, 2.35, "2024-06-15T10:00:00Z")];
        let view = build_map_view(&points, &[], &[], &options(), now());
        assert!(view.markers.is_empty());
        assert_eq!(view.total_points, 0);
    }

    #[test]
    fn test_routes_follow_event_rules() {
        let events = vec![
            Event {
                id: "e1".to_string(),
                title: "Maraude du soir".to_string(),
                status: EventStatus::Planned,
                start_date: None,
            },
            Event {
                id: "e2".to_string(),
                title: "Annulée".to_string(),
                status: EventStatus::Canceled,
                start_date: None,
            },
        ];
        let itinerary = |id: &str, event: &str, active: Option<bool>| -> Itinerary {
            serde_json::from_value(serde_json::json!({
                "id": id,
                "event_id": event,
                "is_active": active,
                "created_at": "2024-06-14T10:00:00Z",
                "route_geojson": r#"{"features":[{"geometry":{"type":"LineString","coordinates":[[2.35,48.85],[2.36,48.86]]}}]}"#,
            }))
            .unwrap()
        };
        let itineraries = vec![
            itinerary("shown", "e1", None),
            itinerary("archived", "e1", Some(false)),
            itinerary("canceled", "e2", None),
        ];

        let mut opts = options();
        opts.include_inactive = true;
        let view = build_map_view(&[], &itineraries, &events, &opts, now());

        assert_eq!(view.routes.len(), 1);
        let route = &view.routes[0];
        assert_eq!(route.id, "shown");
        assert_eq!(route.event_title.as_deref(), Some("Maraude du soir"));
        assert_eq!(route.geometry.as_ref().unwrap().features.len(), 1);
        assert_eq!(route.bounds, Some([[48.85, 2.35], [48.86, 2.36]]));

        assert_eq!(view.archived_routes.len(), 1);
        assert_eq!(view.archived_routes[0].id, "archived");
    }

    #[test]
    fn test_label_fallbacks() {
        let mut p = point("a", 48.85, 2.35, "2024-06-15T10:00:00Z");
        assert_eq!(PointView::from_point(&p, now()).label, FALLBACK_LABEL);
        p.address = Some("1 rue de Rivoli".to_string());
        assert_eq!(PointView::from_point(&p, now()).label, "1 rue de Rivoli");
        p.name = Some("Gare".to_string());
        assert_eq!(PointView::from_point(&p, now()).label, "Gare");
    }
}
