// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-flight toggle tracking.
//!
//! A toggle for an entity that is already being toggled is refused. The key
//! is released when the returned guard drops, whatever the outcome.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// What is being toggled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ToggleKey {
    Point(String),
    /// A cluster, keyed by its sorted member ids.
    Cluster(Vec<String>),
    Itinerary(String),
}

impl ToggleKey {
    /// Cluster key independent of member order.
    pub fn cluster(ids: &[String]) -> Self {
        let mut ids = ids.to_vec();
        ids.sort();
        ids.dedup();
        ToggleKey::Cluster(ids)
    }
}

/// Claim on an in-flight key: who holds it and since when.
#[derive(Debug, Clone, Copy)]
struct Claim {
    token: u64,
    started: Instant,
}

/// Shared set of toggles currently in flight.
#[derive(Clone, Default)]
pub struct ToggleTracker {
    in_flight: Arc<DashMap<ToggleKey, Claim>>,
    next_token: Arc<AtomicU64>,
}

impl ToggleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as in flight. Returns `None` if it already is.
    pub fn begin(&self, key: ToggleKey) -> Option<ToggleGuard> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(key = ?key, "Toggle already in flight");
                None
            }
            Entry::Vacant(slot) => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                slot.insert(Claim {
                    token,
                    started: Instant::now(),
                });
                Some(ToggleGuard {
                    key,
                    token,
                    in_flight: self.in_flight.clone(),
                })
            }
        }
    }

    pub fn is_in_flight(&self, key: &ToggleKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Forget all in-flight toggles.
    pub fn clear(&self) {
        self.in_flight.clear();
    }
}

/// Releases its key when dropped, unless the key was cleared and claimed
/// again by a later toggle.
pub struct ToggleGuard {
    key: ToggleKey,
    token: u64,
    in_flight: Arc<DashMap<ToggleKey, Claim>>,
}

impl Drop for ToggleGuard {
    fn drop(&mut self) {
        let token = self.token;
        if let Some((_, claim)) = self.in_flight.remove_if(&self.key, |_, c| c.token == token) {
            tracing::trace!(
                key = ?self.key,
                elapsed_ms = claim.started.elapsed().as_millis() as u64,
                "Toggle finished"
            );
        }
    }
}
