//! Server-Sent Events (SSE) handler.
//!
//! Subscribes to the [`bf_core::events::EventBus`], optionally filters by
//! runner, replays recent events for late joiners, and sends keepalive
//! heartbeats.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;

use bf_core::RunnerId;

use crate::context::AppContext;

/// Optional query parameter for runner filtering.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// Only stream events about this runner.
    pub runner_id: Option<u64>,
}

/// GET /api/events -- SSE stream of runner events.
pub async fn events_handler(
    State(ctx): State<AppContext>,
    Query(params): Query<EventsQuery>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let filter = params.runner_id.map(RunnerId::from_raw);

    let recent = ctx.event_bus.recent_events(50);
    let mut rx = ctx.event_bus.subscribe();

    let stream = async_stream::stream! {
        for event in recent.into_iter().rev() {
            if matches_runner(&event.payload, filter) {
                if let Ok(data) = serde_json::to_string(&event) {
                    yield Ok(Event::default().data(data));
                }
            }
        }

        let mut heartbeat = tokio::time::interval(Duration::from_secs(15));

        loop {
            tokio::select! {
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            if matches_runner(&event.payload, filter) {
                                if let Ok(data) = serde_json::to_string(&event) {
                                    yield Ok(Event::default().data(data));
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::debug!("SSE client lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
                _ = heartbeat.tick() => {
                    yield Ok(Event::default()
                        .event("heartbeat")
                        .data(r#"{"type":"heartbeat"}"#));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn matches_runner(payload: &bf_core::events::EventPayload, filter: Option<RunnerId>) -> bool {
    filter.map_or(true, |id| payload.runner_id() == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bf_core::events::EventPayload;

    #[test]
    fn filter_matches_only_requested_runner() {
        let payload = EventPayload::RunnerStopped {
            runner_id: RunnerId::from_raw(3),
        };
        assert!(matches_runner(&payload, None));
        assert!(matches_runner(&payload, Some(RunnerId::from_raw(3))));
        assert!(!matches_runner(&payload, Some(RunnerId::from_raw(4))));
    }
}
