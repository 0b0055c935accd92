//! Payroll workflow orchestrator
//!
//! Drives a job through stages 2-5 after the gateway has completed stage 1:
//! SALARY_CALCULATOR → COMPLIANCE_MAPPER → ANOMALY_DETECTOR → DOCUMENT_GENERATOR
//!
//! Every transition is persisted before its event is emitted, so a poller never
//! sees an event for a state it cannot read back. A stage error fails the job
//! at that stage; later stages stay PENDING.

use anyhow::Result;
use chrono::Utc;
use paytrack_common::api::{ContractRecord, JobStatus, PayrollResult, Stage};
use paytrack_common::events::{EventBus, PayrollEvent};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::PathBuf;

use super::document_generator::{self, DocumentInputs};
use super::{anomaly_detector, compliance_mapper, salary_calculator, StageError};
use crate::db;
use crate::models::PayrollJob;

/// Event describing the current state of one stage of `job`
pub(crate) fn stage_event(job: &PayrollJob, stage: Stage) -> PayrollEvent {
    let progress = job.stage(stage);
    PayrollEvent::StageUpdated {
        request_id: job.request_id(),
        stage,
        status: progress.status,
        message: progress.message.clone(),
        progress_percentage: job.progress_percentage(),
        timestamp: Utc::now(),
    }
}

/// Workflow orchestrator service
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    db: SqlitePool,
    event_bus: EventBus,
    outputs_dir: PathBuf,
}

impl WorkflowOrchestrator {
    pub fn new(db: SqlitePool, event_bus: EventBus, outputs_dir: PathBuf) -> Self {
        Self {
            db,
            event_bus,
            outputs_dir,
        }
    }

    /// Write the job snapshot. A terminal row in the store means another
    /// writer finished this job; that is an error for this writer.
    async fn persist(&self, job: &PayrollJob) -> Result<()> {
        if !db::jobs::save_job(&self.db, job).await? {
            anyhow::bail!("Job {} is already terminal in the store", job.request_id());
        }
        Ok(())
    }

    async fn begin(&self, job: &mut PayrollJob, stage: Stage, message: &str) -> Result<()> {
        job.start_stage(stage, message)?;
        self.persist(job).await?;
        self.event_bus.emit_lossy(stage_event(job, stage));
        tracing::debug!(request_id = %job.request_id(), stage = %stage, "Stage started");
        Ok(())
    }

    async fn fail(&self, job: &mut PayrollJob, stage: Stage, error: &str) -> Result<()> {
        job.fail_stage(stage, error)?;
        self.persist(job).await?;
        self.event_bus.emit_lossy(stage_event(job, stage));
        self.event_bus.emit_lossy(PayrollEvent::JobFailed {
            request_id: job.request_id(),
            stage,
            error: error.to_string(),
            timestamp: Utc::now(),
        });
        tracing::warn!(
            request_id = %job.request_id(),
            stage = %stage,
            error = %error,
            "Payroll job failed"
        );
        Ok(())
    }

    /// Run one intermediate stage. `Ok(None)` means the stage failed and the
    /// job is now terminal.
    async fn run_stage<T>(
        &self,
        job: &mut PayrollJob,
        stage: Stage,
        running: &str,
        done: &str,
        work: impl Future<Output = std::result::Result<T, StageError>>,
    ) -> Result<Option<T>> {
        self.begin(job, stage, running).await?;

        match work.await {
            Ok(value) => {
                job.complete_stage(stage, done)?;
                self.persist(job).await?;
                self.event_bus.emit_lossy(stage_event(job, stage));
                Ok(Some(value))
            }
            Err(e) => {
                self.fail(job, stage, &e.to_string()).await?;
                Ok(None)
            }
        }
    }

    /// Execute stages 2-5 for a job whose contract has been read.
    ///
    /// Returns the final job state. `Err` means a transition could not be
    /// persisted; the caller should then mark the job failed.
    pub async fn execute(&self, mut job: PayrollJob, contract: ContractRecord) -> Result<PayrollJob> {
        let request_id = job.request_id();
        tracing::info!(request_id = %request_id, employee_id = %job.employee_id(), "Starting payroll workflow");

        let Some(breakdown) = self
            .run_stage(
                &mut job,
                Stage::SalaryCalculator,
                "Calculating salary breakdown",
                "Salary calculation completed",
                async { salary_calculator::calculate(&contract) },
            )
            .await?
        else {
            return Ok(job);
        };

        let Some(compliance) = self
            .run_stage(
                &mut job,
                Stage::ComplianceMapper,
                "Checking statutory compliance",
                "Compliance mapping completed",
                async { Ok::<_, StageError>(compliance_mapper::map_compliance(&breakdown)) },
            )
            .await?
        else {
            return Ok(job);
        };

        let Some(anomalies) = self
            .run_stage(
                &mut job,
                Stage::AnomalyDetector,
                "Detecting anomalies",
                "Anomaly detection completed",
                async { Ok::<_, StageError>(anomaly_detector::detect(&breakdown)) },
            )
            .await?
        else {
            return Ok(job);
        };

        // The final stage completes together with the job result
        self.begin(&mut job, Stage::DocumentGenerator, "Generating payslip")
            .await?;
        let inputs = DocumentInputs {
            contract: &contract,
            breakdown: &breakdown,
            compliance: &compliance,
            anomalies: &anomalies,
        };
        let documents = match document_generator::generate(&self.outputs_dir, &inputs).await {
            Ok(documents) => documents,
            Err(e) => {
                self.fail(&mut job, Stage::DocumentGenerator, &e.to_string())
                    .await?;
                return Ok(job);
            }
        };

        let artifact_url = documents.first().map(|d| d.download_url.clone());
        let result = PayrollResult {
            contract,
            salary_breakdown: breakdown,
            compliance_status: compliance,
            anomaly_report: anomalies,
            generated_documents: documents,
        };
        job.finish(result, artifact_url.clone(), "Documents generated")?;
        self.persist(&job).await?;

        self.event_bus
            .emit_lossy(stage_event(&job, Stage::DocumentGenerator));
        self.event_bus.emit_lossy(PayrollEvent::JobCompleted {
            request_id,
            artifact_url,
            timestamp: Utc::now(),
        });
        tracing::info!(request_id = %request_id, "Payroll workflow completed");

        Ok(job)
    }

    /// Mark a non-terminal job FAILED at its running stage, or at the next
    /// pending stage when none is running
    pub async fn handle_failure(&self, mut job: PayrollJob, error: &str) -> Result<PayrollJob> {
        if job.is_terminal() {
            return Ok(job);
        }

        let stage = match job.current_stage() {
            Some(stage) => stage,
            None => {
                let next = job
                    .stages()
                    .iter()
                    .find(|s| s.status == JobStatus::Pending)
                    .map(|s| s.stage)
                    .unwrap_or(Stage::DocumentGenerator);
                job.start_stage(next, "Recovering")?;
                next
            }
        };

        self.fail(&mut job, stage, error).await?;
        Ok(job)
    }

    /// Fail every job left non-terminal by a previous run. Returns how many
    /// jobs were marked.
    pub async fn fail_interrupted_jobs(&self) -> Result<usize> {
        let jobs = db::jobs::unfinished_jobs(&self.db).await?;
        let count = jobs.len();
        for job in jobs {
            let request_id = job.request_id();
            if let Err(e) = self
                .handle_failure(job, "Interrupted by service restart")
                .await
            {
                tracing::error!(request_id = %request_id, error = %e, "Failed to mark interrupted job");
            }
        }
        Ok(count)
    }
}
