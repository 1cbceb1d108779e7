// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Greedy proximity clustering of observation points.
//!
//! Single pass in input order: each unassigned point seeds a cluster and
//! pulls in every later unassigned point within the radius of that seed.
//! Membership is measured against the seed only, never a running centroid,
//! so the result depends on input order.

use super::distance::haversine_distance;
use geo::Point;

/// Default clustering radius in meters.
pub const DEFAULT_CLUSTER_RADIUS_METERS: f64 = 50.0;

/// Anything that sits at a position on the map.
pub trait Located {
    /// Position as (x = longitude, y = latitude).
    fn location(&self) -> Point<f64>;
}

impl<T: Located + ?Sized> Located for &T {
    fn location(&self) -> Point<f64> {
        (**self).location()
    }
}

/// A group of points lying within the radius of their seed.
#[derive(Debug, Clone)]
pub struct Cluster<'a, T> {
    members: Vec<&'a T>,
}

impl<'a, T> Cluster<'a, T> {
    /// The point that opened this cluster.
    pub fn seed(&self) -> &'a T {
        self.members[0]
    }

    /// All members, seed first, then in input order.
    pub fn members(&self) -> &[&'a T] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; a cluster holds at least its seed.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A lone point renders as an individual marker.
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }
}

/// Partition `points` into seed-anchored clusters.
pub fn cluster_points<T: Located>(points: &[T], max_distance_m: f64) -> Vec<Cluster<'_, T>> {
    let mut assigned = vec![false; points.len()];
    let mut clusters = Vec::new();

    for (i, seed) in points.iter().enumerate() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let seed_at = seed.location();
        let mut members = vec![seed];

        for (j, candidate) in points.iter().enumerate().skip(i + 1) {
            if assigned[j] {
                continue;
            }
            if haversine_distance(seed_at, candidate.location()) <= max_distance_m {
                assigned[j] = true;
                members.push(candidate);
            }
        }

        clusters.push(Cluster { members });
    }

    tracing::trace!(
        points = points.len(),
        clusters = clusters.len(),
        radius_m = max_distance_m,
        "Clustered points"
    );
    clusters
}
