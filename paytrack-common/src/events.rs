//! Event types and EventBus for PayTrack
//!
//! The intake pipeline emits one event per job state change; the SSE endpoint
//! forwards them to connected dashboards. Delivery is best effort: slow
//! subscribers lose the oldest events and fall back to polling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::api::{JobStatus, Stage};

/// Payroll job events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PayrollEvent {
    /// Upload accepted, contract parsed and persisted
    JobStarted {
        request_id: Uuid,
        employee_id: String,
        file_name: String,
        timestamp: DateTime<Utc>,
    },

    /// A stage changed status
    StageUpdated {
        request_id: Uuid,
        stage: Stage,
        status: JobStatus,
        message: Option<String>,
        /// Completed stages as a percentage of all stages
        progress_percentage: u8,
        timestamp: DateTime<Utc>,
    },

    /// All stages completed
    JobCompleted {
        request_id: Uuid,
        artifact_url: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A stage failed; the job is terminal
    JobFailed {
        request_id: Uuid,
        stage: Stage,
        error: String,
        timestamp: DateTime<Utc>,
    },
}

impl PayrollEvent {
    /// SSE event name
    pub fn event_type(&self) -> &str {
        match self {
            PayrollEvent::JobStarted { .. } => "JobStarted",
            PayrollEvent::StageUpdated { .. } => "StageUpdated",
            PayrollEvent::JobCompleted { .. } => "JobCompleted",
            PayrollEvent::JobFailed { .. } => "JobFailed",
        }
    }

    /// Job the event belongs to
    pub fn request_id(&self) -> Uuid {
        match self {
            PayrollEvent::JobStarted { request_id, .. }
            | PayrollEvent::StageUpdated { request_id, .. }
            | PayrollEvent::JobCompleted { request_id, .. }
            | PayrollEvent::JobFailed { request_id, .. } => *request_id,
        }
    }
}

/// Broadcast bus for [`PayrollEvent`]s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PayrollEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PayrollEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers.
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PayrollEvent,
    ) -> Result<usize, broadcast::error::SendError<PayrollEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PayrollEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
