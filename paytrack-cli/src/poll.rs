//! Status polling
//!
//! Polls at a fixed interval while the job is non-terminal and returns on the
//! first terminal snapshot. Dropping the future stops polling; there is no
//! server-side cancel.

use paytrack_common::api::{JobStatus, JobStatusResponse, Stage};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::client::{ClientError, IntakeClient};

#[derive(Debug, Error)]
pub enum PollError {
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The service reported a stage moving backwards
    #[error("Stage {stage} went from {from} to {to}")]
    Regressed {
        stage: Stage,
        from: JobStatus,
        to: JobStatus,
    },
}

/// Reject a snapshot whose stages moved backwards relative to `previous`
pub fn check_progress(
    previous: &JobStatusResponse,
    current: &JobStatusResponse,
) -> Result<(), PollError> {
    for (before, after) in previous.stages.iter().zip(&current.stages) {
        if after.status.rank() < before.status.rank() {
            return Err(PollError::Regressed {
                stage: after.stage,
                from: before.status,
                to: after.status,
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct Poller {
    interval: Duration,
}

impl Poller {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until COMPLETED or FAILED, calling `on_update` with every
    /// snapshot (including the terminal one)
    pub async fn until_terminal(
        &self,
        client: &IntakeClient,
        request_id: Uuid,
        mut on_update: impl FnMut(&JobStatusResponse),
    ) -> Result<JobStatusResponse, PollError> {
        let mut previous: Option<JobStatusResponse> = None;

        loop {
            let current = client.status(request_id).await?;
            if let Some(prev) = &previous {
                check_progress(prev, &current)?;
            }
            on_update(&current);

            if current.is_terminal() {
                tracing::debug!(request_id = %request_id, status = %current.status, "Job reached terminal state");
                return Ok(current);
            }

            previous = Some(current);
            tokio::time::sleep(self.interval).await;
        }
    }
}
