//! Payroll job state machine
//!
//! A job runs five stages in fixed order:
//! CONTRACT_READER → SALARY_CALCULATOR → COMPLIANCE_MAPPER → ANOMALY_DETECTOR → DOCUMENT_GENERATOR
//!
//! Invariants enforced here:
//! - a stage starts only when every earlier stage is COMPLETED
//! - stage status only moves forward (PENDING → RUNNING → COMPLETED | FAILED)
//! - the overall status is derived from the stages, never stored independently
//! - once the job is COMPLETED or FAILED nothing about it changes

use chrono::{DateTime, Utc};
use paytrack_common::api::{
    JobStatus, JobStatusResponse, PayrollResult, Stage, StageProgress,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Rejected state machine transition
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("Job {request_id} is already {status}")]
    JobTerminal { request_id: Uuid, status: JobStatus },

    #[error("Stage {stage} cannot start while {blocking} is {blocking_status}")]
    OutOfOrder {
        stage: Stage,
        blocking: Stage,
        blocking_status: JobStatus,
    },

    #[error("Stage {stage} cannot move from {from} to {to}")]
    IllegalTransition {
        stage: Stage,
        from: JobStatus,
        to: JobStatus,
    },

    #[error("Final stage must complete together with the job result")]
    MissingResult,
}

/// Payroll job (one per accepted upload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollJob {
    pub(crate) request_id: Uuid,
    pub(crate) employee_id: String,
    pub(crate) stages: Vec<StageProgress>,
    pub(crate) result: Option<PayrollResult>,
    pub(crate) artifact_url: Option<String>,
    pub(crate) error_message: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl PayrollJob {
    /// New job with every stage PENDING
    pub fn new(request_id: Uuid, employee_id: String) -> Self {
        let now = Utc::now();
        Self {
            request_id,
            employee_id,
            stages: Stage::ALL.iter().map(|s| StageProgress::pending(*s)).collect(),
            result: None,
            artifact_url: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    pub fn stages(&self) -> &[StageProgress] {
        &self.stages
    }

    pub fn stage(&self, stage: Stage) -> &StageProgress {
        &self.stages[stage.index()]
    }

    pub fn result(&self) -> Option<&PayrollResult> {
        self.result.as_ref()
    }

    pub fn artifact_url(&self) -> Option<&str> {
        self.artifact_url.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Overall status derived from the stages
    pub fn status(&self) -> JobStatus {
        if self.stages.iter().any(|s| s.status == JobStatus::Failed) {
            JobStatus::Failed
        } else if self.stages.iter().all(|s| s.status == JobStatus::Completed) {
            JobStatus::Completed
        } else if self.stages.iter().any(|s| s.status != JobStatus::Pending) {
            JobStatus::Running
        } else {
            JobStatus::Pending
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    /// Stage that is running, or the stage that failed
    pub fn current_stage(&self) -> Option<Stage> {
        self.stages
            .iter()
            .find(|s| matches!(s.status, JobStatus::Running | JobStatus::Failed))
            .map(|s| s.stage)
    }

    /// Completed stages as a percentage of all stages
    pub fn progress_percentage(&self) -> u8 {
        let completed = self
            .stages
            .iter()
            .filter(|s| s.status == JobStatus::Completed)
            .count();
        (completed * 100 / self.stages.len()) as u8
    }

    fn ensure_open(&self) -> Result<(), TransitionError> {
        let status = self.status();
        if status.is_terminal() {
            return Err(TransitionError::JobTerminal {
                request_id: self.request_id,
                status,
            });
        }
        Ok(())
    }

    fn ensure_running(&self, stage: Stage, to: JobStatus) -> Result<(), TransitionError> {
        let from = self.stage(stage).status;
        if from != JobStatus::Running {
            return Err(TransitionError::IllegalTransition { stage, from, to });
        }
        Ok(())
    }

    /// PENDING → RUNNING. Every earlier stage must be COMPLETED.
    pub fn start_stage(&mut self, stage: Stage, message: &str) -> Result<(), TransitionError> {
        self.ensure_open()?;

        let from = self.stage(stage).status;
        if from != JobStatus::Pending {
            return Err(TransitionError::IllegalTransition {
                stage,
                from,
                to: JobStatus::Running,
            });
        }

        if let Some(blocking) = self.stages[..stage.index()]
            .iter()
            .find(|s| s.status != JobStatus::Completed)
        {
            return Err(TransitionError::OutOfOrder {
                stage,
                blocking: blocking.stage,
                blocking_status: blocking.status,
            });
        }

        let now = Utc::now();
        let entry = &mut self.stages[stage.index()];
        entry.status = JobStatus::Running;
        entry.message = Some(message.to_string());
        entry.started_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    /// Replace the progress message of a RUNNING stage
    pub fn update_message(&mut self, stage: Stage, message: &str) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.ensure_running(stage, JobStatus::Running)?;

        self.stages[stage.index()].message = Some(message.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }

    /// RUNNING → COMPLETED for every stage except the last, which completes
    /// through [`PayrollJob::finish`]
    pub fn complete_stage(&mut self, stage: Stage, message: &str) -> Result<(), TransitionError> {
        if stage == Stage::DocumentGenerator {
            return Err(TransitionError::MissingResult);
        }
        self.ensure_open()?;
        self.ensure_running(stage, JobStatus::Completed)?;
        self.mark_completed(stage, message);
        Ok(())
    }

    /// Complete the final stage and attach the job result in one step, so the
    /// first COMPLETED snapshot is also the last
    pub fn finish(
        &mut self,
        result: PayrollResult,
        artifact_url: Option<String>,
        message: &str,
    ) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.ensure_running(Stage::DocumentGenerator, JobStatus::Completed)?;

        self.mark_completed(Stage::DocumentGenerator, message);
        self.result = Some(result);
        self.artifact_url = artifact_url;
        Ok(())
    }

    /// RUNNING → FAILED. The job becomes terminal.
    pub fn fail_stage(&mut self, stage: Stage, error: &str) -> Result<(), TransitionError> {
        self.ensure_open()?;
        self.ensure_running(stage, JobStatus::Failed)?;

        let now = Utc::now();
        let entry = &mut self.stages[stage.index()];
        entry.status = JobStatus::Failed;
        entry.message = Some(format!("Error: {}", error));
        entry.completed_at = Some(now);
        self.error_message = Some(format!("{} failed: {}", stage, error));
        self.updated_at = now;
        Ok(())
    }

    fn mark_completed(&mut self, stage: Stage, message: &str) {
        let now = Utc::now();
        let entry = &mut self.stages[stage.index()];
        entry.status = JobStatus::Completed;
        entry.message = Some(message.to_string());
        entry.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Wire representation for the status endpoint
    pub fn to_response(&self) -> JobStatusResponse {
        let status = self.status();
        JobStatusResponse {
            request_id: self.request_id,
            employee_id: self.employee_id.clone(),
            status,
            current_stage: self.current_stage(),
            progress_percentage: self.progress_percentage(),
            stages: self.stages.clone(),
            result: if status == JobStatus::Completed {
                self.result.clone()
            } else {
                None
            },
            artifact_url: self.artifact_url.clone(),
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
