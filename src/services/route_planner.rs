// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Itinerary creation workflow.
//!
//! `Idle → EventSelected → PointSelected → ConfirmationPending → Created`.
//! The start point comes either from an address search or a map click.
//! `cancel` returns to `Idle` from any step.

use crate::models::NewItinerary;
use serde::Serialize;

pub const MIN_RADIUS_M: u32 = 100;
pub const MAX_RADIUS_M: u32 = 50_000;
pub const DEFAULT_RADIUS_M: u32 = 1_000;

/// Where the start point came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PointSource {
    AddressSearch { address: String },
    MapClick,
}

/// Chosen start point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartPoint {
    pub lat: f64,
    pub lng: f64,
    #[serde(flatten)]
    pub source: PointSource,
}

/// Current step of the workflow.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlannerState {
    Idle,
    EventSelected { event_id: String },
    PointSelected { event_id: String, start: StartPoint },
    ConfirmationPending { request: NewItinerary },
    Created { itinerary_id: String },
}

impl PlannerState {
    fn name(&self) -> &'static str {
        match self {
            PlannerState::Idle => "idle",
            PlannerState::EventSelected { .. } => "event_selected",
            PlannerState::PointSelected { .. } => "point_selected",
            PlannerState::ConfirmationPending { .. } => "confirmation_pending",
            PlannerState::Created { .. } => "created",
        }
    }
}

/// Errors from the creation workflow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlannerError {
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    #[error("Start point out of range: ({lat}, {lng})")]
    InvalidCoordinates { lat: f64, lng: f64 },

    #[error("Radius must be between 100 and 50000 meters, got {0}")]
    InvalidRadius(u32),

    #[error("Event id must not be empty")]
    EmptyEvent,
}

/// Drives one itinerary creation.
#[derive(Debug, Clone)]
pub struct RoutePlanner {
    state: PlannerState,
    radius_m: u32,
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new()
    }
}

impl RoutePlanner {
    pub fn new() -> Self {
        Self {
            state: PlannerState::Idle,
            radius_m: DEFAULT_RADIUS_M,
        }
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    pub fn radius_m(&self) -> u32 {
        self.radius_m
    }

    /// Pick the event. Allowed from `Idle` or to change the event.
    pub fn select_event(&mut self, event_id: &str) -> Result<(), PlannerError> {
        match self.state {
            PlannerState::Idle | PlannerState::EventSelected { .. } => {}
            _ => return Err(self.invalid("select an event")),
        }
        if event_id.trim().is_empty() {
            return Err(PlannerError::EmptyEvent);
        }

        self.state = PlannerState::EventSelected {
            event_id: event_id.to_string(),
        };
        Ok(())
    }

    /// Start point from an address search result.
    pub fn select_address(
        &mut self,
        lat: f64,
        lng: f64,
        address: &str,
    ) -> Result<(), PlannerError> {
        self.select_point(
            lat,
            lng,
            PointSource::AddressSearch {
                address: address.to_string(),
            },
        )
    }

    /// Start point from a click on the map.
    pub fn select_map_click(&mut self, lat: f64, lng: f64) -> Result<(), PlannerError> {
        self.select_point(lat, lng, PointSource::MapClick)
    }

    fn select_point(&mut self, lat: f64, lng: f64, source: PointSource) -> Result<(), PlannerError> {
        let event_id = match &self.state {
            PlannerState::EventSelected { event_id }
            | PlannerState::PointSelected { event_id, .. } => event_id.clone(),
            _ => return Err(self.invalid("select a start point")),
        };
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(PlannerError::InvalidCoordinates { lat, lng });
        }

        self.state = PlannerState::PointSelected {
            event_id,
            start: StartPoint { lat, lng, source },
        };
        Ok(())
    }

    /// Set the search radius. Allowed any time before confirmation.
    pub fn set_radius(&mut self, radius_m: u32) -> Result<(), PlannerError> {
        if matches!(
            self.state,
            PlannerState::ConfirmationPending { .. } | PlannerState::Created { .. }
        ) {
            return Err(self.invalid("change the radius"));
        }
        if !(MIN_RADIUS_M..=MAX_RADIUS_M).contains(&radius_m) {
            return Err(PlannerError::InvalidRadius(radius_m));
        }
        self.radius_m = radius_m;
        Ok(())
    }

    /// Freeze the draft and wait for the user's confirmation.
    pub fn request_confirmation(&mut self) -> Result<NewItinerary, PlannerError> {
        let PlannerState::PointSelected { event_id, start } = &self.state else {
            return Err(self.invalid("request confirmation"));
        };

        let start_address = match &start.source {
            PointSource::AddressSearch { address } => Some(address.clone()),
            PointSource::MapClick => None,
        };
        let request = NewItinerary {
            event_id: event_id.clone(),
            start_lat: start.lat,
            start_lng: start.lng,
            radius_m: self.radius_m,
            start_address,
        };

        self.state = PlannerState::ConfirmationPending {
            request: request.clone(),
        };
        Ok(request)
    }

    /// Record the backend's confirmation of the new itinerary.
    pub fn mark_created(&mut self, itinerary_id: &str) -> Result<(), PlannerError> {
        if !matches!(self.state, PlannerState::ConfirmationPending { .. }) {
            return Err(self.invalid("complete creation"));
        }
        self.state = PlannerState::Created {
            itinerary_id: itinerary_id.to_string(),
        };
        Ok(())
    }

    /// Abandon the workflow from any step.
    pub fn cancel(&mut self) {
        tracing::debug!(from = self.state.name(), "Route planning canceled");
        self.state = PlannerState::Idle;
        self.radius_m = DEFAULT_RADIUS_M;
    }

    fn invalid(&self, action: &'static str) -> PlannerError {
        PlannerError::InvalidTransition {
            state: self.state.name(),
            action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_with_address() {
        let mut planner = RoutePlanner::new();
        planner.select_event("e1").unwrap();
        planner.select_address(48.85, 2.35, "Place de la République").unwrap();
        planner.set_radius(2_000).unwrap();

        let request = planner.request_confirmation().unwrap();
        assert_eq!(request.event_id, "e1");
        assert_eq!(request.radius_m, 2_000);
        assert_eq!(request.start_address.as_deref(), Some("Place de la République"));

        planner.mark_created("it-9").unwrap();
        assert_eq!(
            planner.state(),
            &PlannerState::Created {
                itinerary_id: "it-9".to_string()
            }
        );
    }

    #[test]
    fn test_map_click_has_no_address() {
        let mut planner = RoutePlanner::new();
        planner.select_event("e1").unwrap();
        planner.select_map_click(48.85, 2.35).unwrap();
        let request = planner.request_confirmation().unwrap();
        assert!(request.start_address.is_none());
        assert_eq!(request.radius_m, DEFAULT_RADIUS_M);
    }

    #[test]
    fn test_point_before_event_rejected() {
        let mut planner = RoutePlanner::new();
        let err = planner.select_map_click(48.85, 2.35).unwrap_err();
        assert_eq!(
            err,
            PlannerError::InvalidTransition {
                state: "idle",
                action: "select a start point"
            }
        );
    }

    #[test]
    fn test_cancel_from_any_step() {
        let mut planner = RoutePlanner::new();
        planner.select_event("e1").unwrap();
        planner.select_map_click(1.0, 1.0).unwrap();
        planner.request_confirmation().unwrap();
        planner.cancel();
        assert_eq!(planner.state(), &PlannerState::Idle);
        assert!(planner.mark_created("x").is_err());
    }

    #[test]
    fn test_validation() {
        let mut planner = RoutePlanner::new();
        assert_eq!(planner.select_event(" "), Err(PlannerError::EmptyEvent));
        assert_eq!(planner.set_radius(10), Err(PlannerError::InvalidRadius(10)));
        planner.select_event("e1").unwrap();
        assert!(matches!(
            planner.select_map_click(95.0, 0.0),
            Err(PlannerError::InvalidCoordinates { .. })
        ));
    }

    #[test]
    fn test_radius_locked_after_confirmation() {
        let mut planner = RoutePlanner::new();
        planner.select_event("e1").unwrap();
        planner.select_map_click(1.0, 1.0).unwrap();
        planner.request_confirmation().unwrap();
        assert!(planner.set_radius(500).is_err());
    }
}
