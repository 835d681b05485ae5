//! Runner lifecycle events for SSE broadcasting.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late-joining clients can catch up.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::ids::RunnerId;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

// ---------------------------------------------------------------------------
// EventPayload
// ---------------------------------------------------------------------------

/// Payload describing what happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    RunnerStarted {
        runner_id: RunnerId,
        extension_id: String,
        action_id: String,
        amount: usize,
    },
    EntryFailed {
        runner_id: RunnerId,
        input: Option<PathBuf>,
        error: String,
    },
    RunnerStopped {
        runner_id: RunnerId,
    },
    RunnerFinished {
        runner_id: RunnerId,
        finished: usize,
        failed: usize,
        skipped: usize,
    },
    RunnerEvicted {
        runner_id: RunnerId,
    },
}

impl EventPayload {
    /// The runner this event is about.
    pub fn runner_id(&self) -> RunnerId {
        match self {
            EventPayload::RunnerStarted { runner_id, .. }
            | EventPayload::EntryFailed { runner_id, .. }
            | EventPayload::RunnerStopped { runner_id }
            | EventPayload::RunnerFinished { runner_id, .. }
            | EventPayload::RunnerEvicted { runner_id } => *runner_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// What happened.
    pub payload: EventPayload,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn broadcast(&self, payload: EventPayload) {
        let event = Event::new(payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // No subscribers is fine.
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.tx.receiver_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stopped(raw: u64) -> EventPayload {
        EventPayload::RunnerStopped {
            runner_id: RunnerId::from_raw(raw),
        }
    }

    #[test]
    fn broadcast_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.broadcast(stopped(3));

        let event = rx.try_recv().unwrap();
        match &event.payload {
            EventPayload::RunnerStopped { runner_id } => assert_eq!(runner_id.as_u64(), 3),
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn recent_events_capped() {
        let bus = EventBus::new(256);
        for i in 0..150 {
            bus.broadcast(stopped(i));
        }
        assert_eq!(bus.recent_events(200).len(), MAX_RECENT_EVENTS);
    }

    #[test]
    fn recent_events_newest_first() {
        let bus = EventBus::new(16);
        for i in 0..10 {
            bus.broadcast(stopped(i));
        }
        bus.broadcast(EventPayload::RunnerEvicted {
            runner_id: RunnerId::from_raw(99),
        });

        let recent = bus.recent_events(3);
        assert_eq!(recent.len(), 3);
        assert!(matches!(recent[0].payload, EventPayload::RunnerEvicted { .. }));
    }

    #[test]
    fn no_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.broadcast(EventPayload::EntryFailed {
            runner_id: RunnerId::from_raw(1),
            input: Some("/in/a.wav".into()),
            error: "exit code 1".into(),
        });
    }

    #[test]
    fn payload_is_tagged() {
        let json = serde_json::to_value(EventPayload::RunnerFinished {
            runner_id: RunnerId::from_raw(2),
            finished: 3,
            failed: 1,
            skipped: 0,
        })
        .unwrap();
        assert_eq!(json["type"], "runner_finished");
        assert_eq!(json["runner_id"], 2);
    }

    #[test]
    fn payload_runner_id() {
        assert_eq!(stopped(5).runner_id(), RunnerId::from_raw(5));
        let failed = EventPayload::EntryFailed {
            runner_id: RunnerId::from_raw(8),
            input: None,
            error: "spawn failed".into(),
        };
        assert_eq!(failed.runner_id().as_u64(), 8);
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = Event::new(EventPayload::RunnerStarted {
            runner_id: RunnerId::from_raw(1),
            extension_id: "audio".into(),
            action_id: "transcode".into(),
            amount: 12,
        });
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
    }
}
