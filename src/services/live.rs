// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live point updates fan-out.
//!
//! The association backend pushes point-added/point-updated notifications to
//! the webhook; each is broadcast to the subscribers of that association.
//! Slow subscribers skip what they missed instead of holding up publishers.
//! There is no reconnect loop: a broken upstream only flips the status flag.

use crate::models::PointEvent;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const CHANNEL_CAPACITY: usize = 256;

/// A notification scoped to one association.
#[derive(Debug, Clone)]
pub struct LiveMessage {
    pub association_id: String,
    pub event: PointEvent,
}

/// Live channel status shown to the client.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LiveStatus {
    pub connected: bool,
    pub notice: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub subscribers: usize,
}

/// Broadcast hub for live point updates.
#[derive(Clone)]
pub struct LiveHub {
    sender: broadcast::Sender<LiveMessage>,
    connected: Arc<AtomicBool>,
    notice: Arc<Mutex<Option<String>>>,
    /// Bumped on reset; open subscriptions end when it changes.
    generation: Arc<watch::Sender<u64>>,
}

impl Default for LiveHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            sender,
            connected: Arc::new(AtomicBool::new(true)),
            notice: Arc::new(Mutex::new(None)),
            generation: Arc::new(watch::Sender::new(0)),
        }
    }

    /// Publish a notification. Returns how many subscribers received it.
    pub fn publish(&self, association_id: &str, event: PointEvent) -> usize {
        let kind = event.kind();
        let delivered = self
            .sender
            .send(LiveMessage {
                association_id: association_id.to_string(),
                event,
            })
            .unwrap_or(0);

        tracing::debug!(
            association_id,
            kind,
            delivered,
            "Published live point update"
        );
        delivered
    }

    /// Subscribe to one association's notifications.
    pub fn subscribe(&self, association_id: &str) -> LiveSubscription {
        LiveSubscription {
            association_id: association_id.to_string(),
            receiver: Some(self.sender.subscribe()),
            reset: self.generation.subscribe(),
        }
    }

    /// Record that the upstream went away, with a notice for the user.
    pub fn mark_disconnected(&self, notice: impl Into<String>) {
        let notice = notice.into();
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::warn!(notice = %notice, "Live updates disconnected");
        }
        if let Ok(mut slot) = self.notice.lock() {
            *slot = Some(notice);
        }
    }

    /// Record that the upstream is reachable again.
    pub fn mark_connected(&self) {
        if !self.connected.swap(true, Ordering::SeqCst) {
            tracing::info!("Live updates reconnected");
        }
        if let Ok(mut slot) = self.notice.lock() {
            *slot = None;
        }
    }

    pub fn status(&self) -> LiveStatus {
        LiveStatus {
            connected: self.connected.load(Ordering::SeqCst),
            notice: self.notice.lock().ok().and_then(|n| n.clone()),
            subscribers: self.sender.receiver_count(),
        }
    }

    /// End every open subscription and clear the status.
    pub fn reset(&self) {
        self.generation.send_modify(|generation| *generation += 1);
        self.mark_connected();
        tracing::info!("Live hub reset");
    }
}

/// Receiving end for one association.
pub struct LiveSubscription {
    association_id: String,
    /// Dropped once the subscription ends, so it no longer counts.
    receiver: Option<broadcast::Receiver<LiveMessage>>,
    reset: watch::Receiver<u64>,
}

impl LiveSubscription {
    /// Next event for this association, or `None` once the hub is closed or reset.
    ///
    /// A reset wakes a pending call immediately.
    pub async fn next(&mut self) -> Option<PointEvent> {
        loop {
            let receiver = self.receiver.as_mut()?;

            let received = tokio::select! {
                biased;
                _ = self.reset.changed() => None,
                received = receiver.recv() => Some(received),
            };

            match received {
                None => return self.end(),
                Some(Ok(msg)) if msg.association_id == self.association_id => {
                    return Some(msg.event)
                }
                Some(Ok(_)) => continue,
                Some(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                    tracing::warn!(
                        association_id = %self.association_id,
                        skipped,
                        "Live subscriber lagged, skipping updates"
                    );
                }
                Some(Err(broadcast::error::RecvError::Closed)) => return self.end(),
            }
        }
    }

    fn end(&mut self) -> Option<PointEvent> {
        if self.receiver.take().is_some() {
            tracing::debug!(association_id = %self.association_id, "Live subscription ended");
        }
        None
    }

    pub fn association_id(&self) -> &str {
        &self.association_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;

    fn point(id: &str) -> GeoPoint {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "latitude": 48.85,
            "longitude": 2.35,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_its_association() {
        let hub = LiveHub::new();
        let mut sub = hub.subscribe("a1");

        hub.publish("a2", PointEvent::PointAdded(point("other")));
        hub.publish("a1", PointEvent::PointAdded(point("mine")));

        let event = sub.next().await.unwrap();
        assert_eq!(event.point().id.as_deref(), Some("mine"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = LiveHub::new();
        assert_eq!(hub.publish("a1", PointEvent::PointAdded(point("p"))), 0);
    }

    #[test]
    fn test_status_transitions() {
        let hub = LiveHub::new();
        assert!(hub.status().connected);

        hub.mark_disconnected("Connexion perdue");
        let status = hub.status();
        assert!(!status.connected);
        assert_eq!(status.notice.as_deref(), Some("Connexion perdue"));

        hub.mark_connected();
        assert!(hub.status().connected);
        assert!(hub.status().notice.is_none());
    }

    #[tokio::test]
    async fn test_reset_ends_subscriptions() {
        let hub = LiveHub::new();
        let mut sub = hub.subscribe("a1");
        hub.reset();
        hub.publish("a1", PointEvent::PointAdded(point("p")));
        assert!(sub.next().await.is_none());
        assert!(sub.next().await.is_none());
    }

    #[tokio::test]
    async fn test_reset_wakes_pending_subscriber() {
        let hub = LiveHub::new();
        let mut sub = hub.subscribe("a1");
        assert_eq!(hub.status().subscribers, 1);

        let reset_later = async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            hub.reset();
        };
        let waiting = tokio::time::timeout(std::time::Duration::from_millis(500), sub.next());

        let (next, ()) = tokio::join!(waiting, reset_later);
        assert!(next.expect("subscription should end on reset").is_none());

        // Still held, but no longer counted.
        assert_eq!(sub.association_id(), "a1");
        assert_eq!(hub.status().subscribers, 0);
    }

    #[tokio::test]
    async fn test_subscription_after_reset_still_works() {
        let hub = LiveHub::new();
        hub.reset();
        let mut sub = hub.subscribe("a1");
        hub.publish("a1", PointEvent::PointAdded(point("fresh")));
        let event = sub.next().await.unwrap();
        assert_eq!(event.point().id.as_deref(), Some("fresh"));
    }
}
