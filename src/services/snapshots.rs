// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Last known map data per association.
//!
//! Served with a notice when the backend is unreachable. Confirmed toggles
//! and live updates are applied here so the fallback stays current.

use crate::models::{apply_point_event, Event, GeoPoint, Itinerary, PointEvent};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;

/// One association's data as last fetched.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub points: Vec<GeoPoint>,
    pub itineraries: Vec<Itinerary>,
    pub events: Vec<Event>,
    pub fetched_at: DateTime<Utc>,
}

/// Shared snapshot cache keyed by association id.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    inner: Arc<DashMap<String, Snapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, association_id: &str, snapshot: Snapshot) {
        self.inner.insert(association_id.to_string(), snapshot);
    }

    pub fn get(&self, association_id: &str) -> Option<Snapshot> {
        self.inner.get(association_id).map(|s| s.clone())
    }

    /// Merge a live update into the association's points, if cached.
    pub fn apply_point_event(&self, association_id: &str, event: PointEvent) {
        if let Some(mut snapshot) = self.inner.get_mut(association_id) {
            apply_point_event(&mut snapshot.points, event);
        }
    }

    /// Apply a confirmed point toggle. Returns how many cached points changed.
    pub fn set_points_active(&self, point_ids: &[String], active: bool) -> usize {
        let mut changed = 0;
        for mut snapshot in self.inner.iter_mut() {
            for point in snapshot.points.iter_mut() {
                if point.id.as_ref().is_some_and(|id| point_ids.contains(id)) {
                    point.active = Some(active);
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Apply a confirmed itinerary toggle.
    pub fn set_itinerary_active(&self, itinerary_id: &str, active: bool) {
        for mut snapshot in self.inner.iter_mut() {
            if let Some(it) = snapshot.itineraries.iter_mut().find(|i| i.id == itinerary_id) {
                it.is_active = Some(active);
            }
        }
    }

    /// Apply a confirmed itinerary deletion.
    pub fn remove_itinerary(&self, itinerary_id: &str) {
        for mut snapshot in self.inner.iter_mut() {
            snapshot.itineraries.retain(|i| i.id != itinerary_id);
        }
    }

    /// Add a newly created itinerary.
    pub fn push_itinerary(&self, association_id: &str, itinerary: Itinerary) {
        if let Some(mut snapshot) = self.inner.get_mut(association_id) {
            snapshot.itineraries.push(itinerary);
        }
    }

    pub fn clear(&self) {
        self.inner.clear();
    }
}
