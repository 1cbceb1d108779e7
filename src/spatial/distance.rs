// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Great-circle distance between observation points.

use geo::{Distance, HaversineMeasure, Point};

/// Earth radius used for all map distances, in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Haversine distance in meters between two points (x = longitude, y = latitude).
///
/// NaN coordinates propagate to a NaN distance.
pub fn haversine_distance(a: Point<f64>, b: Point<f64>) -> f64 {
    HaversineMeasure::new(EARTH_RADIUS_METERS).distance(a, b)
}

/// Haversine distance in meters between two latitude/longitude pairs in degrees.
pub fn distance_between(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    haversine_distance(Point::new(lng1, lat1), Point::new(lng2, lat2))
}
