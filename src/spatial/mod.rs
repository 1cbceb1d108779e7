// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Geospatial core: distances, recency windows, clustering, route geometry.

pub mod cluster;
pub mod distance;
pub mod recency;
pub mod route_geometry;

pub use cluster::{cluster_points, Cluster, Located, DEFAULT_CLUSTER_RADIUS_METERS};
pub use distance::{distance_between, haversine_distance, EARTH_RADIUS_METERS};
pub use recency::{filter_recent, filter_recent_refs, is_within_window, AgeColor, Timestamped};
pub use route_geometry::{sanitize_route_geojson, RouteGeometry, RouteShape};
