// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Defensive parsing of itinerary route geometry.
//!
//! Route payloads come from a third-party routing service as a string that
//! should hold a FeatureCollection. They are frequently incomplete: the
//! collection `type` may be missing and individual features may carry junk
//! coordinates. Bad features are dropped one by one; the payload is only
//! discarded when nothing renderable is left.

use geo::{BoundingRect, Geometry, GeometryCollection, LineString, Point, Rect};
use serde_json::{Map, Value};

const FEATURE_COLLECTION: &str = "FeatureCollection";
/// Minimum number of valid positions for a line-like feature.
const MIN_LINE_POSITIONS: usize = 2;

/// Renderable shape of a retained feature.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteShape {
    Line(LineString<f64>),
    Point(Point<f64>),
}

/// A sanitized route payload with at least one renderable feature.
#[derive(Debug, Clone)]
pub struct RouteGeometry {
    collection: Map<String, Value>,
    shapes: Vec<RouteShape>,
}

impl RouteGeometry {
    /// Retained features, in payload order.
    pub fn features(&self) -> &[Value] {
        self.collection
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Shapes of the retained features, in payload order.
    pub fn shapes(&self) -> &[RouteShape] {
        &self.shapes
    }

    /// The repaired collection as JSON.
    pub fn as_json(&self) -> Value {
        Value::Object(self.collection.clone())
    }

    /// The repaired collection serialized back to a string.
    pub fn to_geojson_string(&self) -> String {
        Value::Object(self.collection.clone()).to_string()
    }

    /// Line features as `geo` line strings.
    pub fn line_strings(&self) -> Vec<LineString<f64>> {
        self.shapes
            .iter()
            .filter_map(|s| match s {
                RouteShape::Line(line) => Some(line.clone()),
                RouteShape::Point(_) => None,
            })
            .collect()
    }

    /// Point features as `geo` points.
    pub fn points(&self) -> Vec<Point<f64>> {
        self.shapes
            .iter()
            .filter_map(|s| match s {
                RouteShape::Point(p) => Some(*p),
                RouteShape::Line(_) => None,
            })
            .collect()
    }

    /// Bounding box of everything retained, used to fit the map view.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        let collection: GeometryCollection<f64> = self
            .shapes
            .iter()
            .map(|s| match s {
                RouteShape::Line(line) => Geometry::LineString(line.clone()),
                RouteShape::Point(p) => Geometry::Point(*p),
            })
            .collect();
        collection.bounding_rect()
    }

    /// Strongly typed GeoJSON for the map client.
    ///
    /// Feature properties survive; coordinates come from the validated shapes.
    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        let features = self
            .features()
            .iter()
            .zip(&self.shapes)
            .map(|(raw, shape)| {
                let value = match shape {
                    RouteShape::Line(line) => geojson::Value::from(line),
                    RouteShape::Point(p) => geojson::Value::from(p),
                };
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(value)),
                    id: None,
                    properties: raw.get("properties").and_then(Value::as_object).cloned(),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Sanitize a raw route payload.
///
/// Returns `None` when the input is blank, unparseable, has no `features`
/// array, or has no feature left after filtering.
pub fn sanitize_route_geojson(raw: &str) -> Option<RouteGeometry> {
    if raw.trim().is_empty() {
        return None;
    }

    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to parse route geometry");
            return None;
        }
    };

    let Value::Object(mut collection) = parsed else {
        tracing::warn!("Route geometry is not a JSON object");
        return None;
    };

    let Some(Value::Array(features)) = collection.remove("features") else {
        tracing::debug!("Route geometry has no features array");
        return None;
    };

    if !collection.contains_key("type") {
        tracing::debug!("Route geometry missing collection type, repairing");
        collection.insert(
            "type".to_string(),
            Value::String(FEATURE_COLLECTION.to_string()),
        );
    }

    let total = features.len();
    let mut kept = Vec::with_capacity(total);
    let mut shapes = Vec::with_capacity(total);

    for feature in features {
        if let Some((feature, shape)) = sanitize_feature(feature) {
            kept.push(feature);
            shapes.push(shape);
        }
    }

    if kept.len() < total {
        tracing::warn!(
            total,
            dropped = total - kept.len(),
            "Dropped invalid route features"
        );
    }

    if kept.is_empty() {
        return None;
    }

    collection.insert("features".to_string(), Value::Array(kept));
    Some(RouteGeometry { collection, shapes })
}

/// Validate one feature. Line-like features keep only their valid positions.
fn sanitize_feature(mut feature: Value) -> Option<(Value, RouteShape)> {
    let geometry = feature.get_mut("geometry")?.as_object_mut()?;

    let has_type = geometry
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.is_empty());
    if !has_type {
        return None;
    }

    let coords = geometry.get("coordinates")?.as_array()?;
    let first = coords.first()?;

    let shape = if first.is_array() {
        let (valid, positions): (Vec<Value>, Vec<(f64, f64)>) = coords
            .iter()
            .filter_map(|c| position(c).map(|p| (c.clone(), p)))
            .unzip();
        if positions.len() < MIN_LINE_POSITIONS {
            return None;
        }
        geometry.insert("coordinates".to_string(), Value::Array(valid));
        RouteShape::Line(LineString::from(positions))
    } else {
        let (x, y) = position(&Value::Array(coords.clone()))?;
        RouteShape::Point(Point::new(x, y))
    };

    Some((feature, shape))
}

/// A two-element all-numeric position.
fn position(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [x, y] => Some((x.as_f64()?, y.as_f64()?)),
        _ => None,
    }
}
