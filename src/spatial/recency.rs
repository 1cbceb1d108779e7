// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Trailing-window recency filtering and age-based marker tinting.
//!
//! The window filter only looks at creation time. Records whose creation
//! timestamp is missing or unparseable are dropped.

use crate::time_utils::parse_timestamp;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Records that expose a creation timestamp.
pub trait Timestamped {
    /// Raw creation timestamp as received from the backend.
    fn created_at(&self) -> Option<&str>;
}

/// True when `created_at` lies in `[now - days, now]`.
pub fn is_within_window(created_at: Option<&str>, days: u32, now: DateTime<Utc>) -> bool {
    let Some(created) = created_at.and_then(parse_timestamp) else {
        return false;
    };

    let age = now - created;
    age >= TimeDelta::zero() && age <= TimeDelta::days(i64::from(days))
}

/// Keep the records created within the trailing `days` window.
pub fn filter_recent<T: Timestamped>(records: Vec<T>, days: u32, now: DateTime<Utc>) -> Vec<T> {
    let before = records.len();
    let kept: Vec<T> = records
        .into_iter()
        .filter(|r| is_within_window(r.created_at(), days, now))
        .collect();

    tracing::debug!(before, after = kept.len(), days, "Applied recency window");
    kept
}

/// Borrowing variant of [`filter_recent`].
pub fn filter_recent_refs<'a, T: Timestamped>(
    records: &'a [T],
    days: u32,
    now: DateTime<Utc>,
) -> Vec<&'a T> {
    records
        .iter()
        .filter(|r| is_within_window(r.created_at(), days, now))
        .collect()
}

/// Marker tint bucket derived from how old an observation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum AgeColor {
    /// Under one hour old.
    Urgent,
    /// Under six hours old.
    Warm,
    /// Under a day old.
    Caution,
    /// A day or older.
    Aged,
    /// No usable timestamp.
    Default,
}

impl AgeColor {
    /// Bucket for a parsed timestamp. Future timestamps count as fresh.
    pub fn for_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        let Some(at) = at else {
            return AgeColor::Default;
        };

        let age = now - at;
        if age < TimeDelta::hours(1) {
            AgeColor::Urgent
        } else if age < TimeDelta::hours(6) {
            AgeColor::Warm
        } else if age < TimeDelta::hours(24) {
            AgeColor::Caution
        } else {
            AgeColor::Aged
        }
    }

    /// Bucket for a raw timestamp string.
    pub fn for_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> Self {
        Self::for_time(raw.and_then(parse_timestamp), now)
    }

    /// CSS hex color used by the map client.
    pub fn hex(self) -> &'static str {
        match self {
            AgeColor::Urgent => "#ef4444",
            AgeColor::Warm => "#f97316",
            AgeColor::Caution => "#eab308",
            AgeColor::Aged => "#6b7280",
            AgeColor::Default => "#3b82f6",
        }
    }
}
