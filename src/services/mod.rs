// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod backend;
pub mod live;
pub mod map_view;
pub mod route_planner;
pub mod snapshots;
pub mod toggles;

pub use backend::{BackendClient, ListPayload, MemoryStore};
pub use live::{LiveHub, LiveStatus, LiveSubscription};
pub use map_view::{build_map_view, MapView, MapViewOptions, MarkerView};
pub use route_planner::{PlannerError, PlannerState, RoutePlanner};
pub use snapshots::{Snapshot, SnapshotCache};
pub use toggles::{ToggleKey, ToggleTracker};
