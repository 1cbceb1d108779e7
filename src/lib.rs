// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Maraude-Map: map backend for street-outreach associations
//!
//! This crate computes what the volunteers' map shows: recent observation
//! points grouped by proximity, age-tinted markers, heatmap samples and
//! sanitized itinerary routes. It forwards activation toggles to the
//! association backend and fans out live point updates.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod spatial;
pub mod time_utils;

use config::Config;
use services::{BackendClient, LiveHub, SnapshotCache, ToggleTracker};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub backend: BackendClient,
    pub live: LiveHub,
    pub toggles: ToggleTracker,
    pub snapshots: SnapshotCache,
}

impl AppState {
    pub fn new(config: Config, backend: BackendClient) -> Self {
        Self {
            config,
            backend,
            live: LiveHub::new(),
            toggles: ToggleTracker::new(),
            snapshots: SnapshotCache::new(),
        }
    }

    /// Drop per-session state: live subscriptions, in-flight toggles and
    /// cached map data.
    pub fn reset_session_state(&self) {
        self.live.reset();
        self.toggles.clear();
        self.snapshots.clear();
        tracing::info!("Session state reset");
    }
}
