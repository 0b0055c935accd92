//! Server-Sent Events for payroll job progress
//!
//! Streams JobStarted, StageUpdated, JobCompleted and JobFailed. Delivery is
//! best effort; a client that lags past the bus capacity loses events and
//! should fall back to polling the status endpoint.

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use paytrack_common::events::PayrollEvent;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::AppState;

const HEARTBEAT: Duration = Duration::from_secs(15);

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only forward events of this job
    pub request_id: Option<Uuid>,
}

impl EventFilter {
    fn matches(&self, event: &PayrollEvent) -> bool {
        self.request_id.map_or(true, |id| event.request_id() == id)
    }
}

/// GET /api/v1/payroll/events[?request_id=...]
pub async fn payroll_event_stream(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(request_id = ?filter.request_id, "SSE client connected to payroll events");

    let mut rx = state.event_bus.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                _ = tokio::time::sleep(HEARTBEAT) => {
                    yield Ok(Event::default().comment("heartbeat"));
                }

                received = rx.recv() => {
                    let event = match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "SSE client lagged, events dropped");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    };
                    if !filter.matches(&event) {
                        continue;
                    }

                    let event_type = event.event_type();
                    match serde_json::to_string(&event) {
                        Ok(json) => {
                            debug!(event_type, "SSE: forwarding payroll event");
                            yield Ok(Event::default().event(event_type).data(json));
                        }
                        Err(e) => warn!("SSE: failed to serialize event {}: {}", event_type, e),
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(HEARTBEAT).text("heartbeat"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_filter_by_request_id() {
        let id = Uuid::new_v4();
        let event = PayrollEvent::JobCompleted {
            request_id: id,
            artifact_url: None,
            timestamp: Utc::now(),
        };

        assert!(EventFilter::default().matches(&event));
        assert!(EventFilter { request_id: Some(id) }.matches(&event));
        assert!(!EventFilter {
            request_id: Some(Uuid::new_v4())
        }
        .matches(&event));
    }
}
