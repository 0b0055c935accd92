//! PayrollJob transition rules

use paytrack_common::api::{
    AnomalyReport, ComplianceStatus, JobStatus, PayrollResult, SalaryBreakdown, Severity, Stage,
};
use paytrack_intake::models::{PayrollJob, TransitionError};
use uuid::Uuid;

fn new_job() -> PayrollJob {
    PayrollJob::new(Uuid::new_v4(), "E-1".to_string())
}

fn advance_to(job: &mut PayrollJob, stage: Stage) {
    for s in Stage::ALL.iter().take(stage.index()) {
        job.start_stage(*s, "running").unwrap();
        job.complete_stage(*s, "done").unwrap();
    }
}

fn empty_result(job: &PayrollJob) -> PayrollResult {
    let contract = paytrack_common::api::ContractRecord {
        request_id: job.request_id(),
        employee_id: job.employee_id().to_string(),
        employee_name: "Test".to_string(),
        employee_email: None,
        employee_phone: None,
        designation: "Employee".to_string(),
        department: "General".to_string(),
        join_date: None,
        salary_components: Default::default(),
        statutory_obligations: Vec::new(),
        region: "IN".to_string(),
        currency: "INR".to_string(),
        file_name: "c.txt".to_string(),
        uploaded_at: chrono::Utc::now(),
    };
    PayrollResult {
        contract,
        salary_breakdown: SalaryBreakdown {
            gross_salary: 0.0,
            net_salary: 0.0,
            total_earnings: 0.0,
            total_deductions: 0.0,
            salary_components: Default::default(),
            deduction_components: Default::default(),
            calculation_justification: Default::default(),
        },
        compliance_status: ComplianceStatus {
            is_compliant: true,
            compliance_issues: Vec::new(),
            tax_slabs_applied: Default::default(),
            corrections_suggested: Vec::new(),
        },
        anomaly_report: AnomalyReport {
            has_anomalies: false,
            anomalies: Vec::new(),
            risk_level: Severity::Low,
        },
        generated_documents: Vec::new(),
    }
}

#[test]
fn test_new_job_is_pending_everywhere() {
    let job = new_job();
    assert_eq!(job.status(), JobStatus::Pending);
    assert_eq!(job.progress_percentage(), 0);
    assert_eq!(job.current_stage(), None);
    assert!(job.stages().iter().all(|s| s.status == JobStatus::Pending));
}

#[test]
fn test_stage_cannot_skip_ahead() {
    let mut job = new_job();
    let err = job.start_stage(Stage::ComplianceMapper, "early").unwrap_err();
    assert_eq!(
        err,
        TransitionError::OutOfOrder {
            stage: Stage::ComplianceMapper,
            blocking: Stage::ContractReader,
            blocking_status: JobStatus::Pending,
        }
    );
}

#[test]
fn test_status_is_derived_from_stages() {
    let mut job = new_job();
    job.start_stage(Stage::ContractReader, "reading").unwrap();
    assert_eq!(job.status(), JobStatus::Running);
    assert_eq!(job.current_stage(), Some(Stage::ContractReader));

    job.complete_stage(Stage::ContractReader, "read").unwrap();
    // Started but no stage running: still RUNNING overall
    assert_eq!(job.status(), JobStatus::Running);
    assert_eq!(job.progress_percentage(), 20);
}

#[test]
fn test_no_backwards_transitions() {
    let mut job = new_job();
    job.start_stage(Stage::ContractReader, "reading").unwrap();
    job.complete_stage(Stage::ContractReader, "read").unwrap();

    assert!(matches!(
        job.start_stage(Stage::ContractReader, "again"),
        Err(TransitionError::IllegalTransition { .. })
    ));
    assert!(matches!(
        job.complete_stage(Stage::SalaryCalculator, "never started"),
        Err(TransitionError::IllegalTransition { .. })
    ));
}

#[test]
fn test_final_stage_requires_result() {
    let mut job = new_job();
    advance_to(&mut job, Stage::DocumentGenerator);
    job.start_stage(Stage::DocumentGenerator, "generating").unwrap();

    assert_eq!(
        job.complete_stage(Stage::DocumentGenerator, "done"),
        Err(TransitionError::MissingResult)
    );

    let result = empty_result(&job);
    job.finish(result, Some("/api/v1/downloads/p.txt".to_string()), "done")
        .unwrap();
    assert_eq!(job.status(), JobStatus::Completed);
    assert!(job.to_response().result.is_some());
}

#[test]
fn test_terminal_job_is_frozen() {
    let mut job = new_job();
    advance_to(&mut job, Stage::SalaryCalculator);
    job.start_stage(Stage::SalaryCalculator, "calculating").unwrap();
    job.fail_stage(Stage::SalaryCalculator, "Gross salary must be positive")
        .unwrap();

    assert_eq!(job.status(), JobStatus::Failed);
    assert_eq!(
        job.error_message(),
        Some("salary_calculator failed: Gross salary must be positive")
    );

    let frozen = job.clone();
    assert!(matches!(
        job.start_stage(Stage::ComplianceMapper, "late"),
        Err(TransitionError::JobTerminal { .. })
    ));
    assert!(matches!(
        job.update_message(Stage::SalaryCalculator, "late"),
        Err(TransitionError::JobTerminal { .. })
    ));
    assert_eq!(job, frozen);

    // No result is exposed for a failed job
    assert!(job.to_response().result.is_none());
}
