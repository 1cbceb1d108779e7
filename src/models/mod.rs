// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod itinerary;
pub mod point;

pub use itinerary::{Event, EventStatus, Itinerary, NewItinerary};
pub use point::{apply_point_event, GeoPoint, PointEvent};
