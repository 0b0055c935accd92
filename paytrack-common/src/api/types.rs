//! Shared API request/response types
//!
//! Everything the intake service puts on the wire and the client reads back.
//! Maps use `BTreeMap` so that repeated serialization of the same value yields
//! identical bytes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

// ========================================
// Workflow stages and status
// ========================================

/// One named step of the contract-processing pipeline, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Read and parse the uploaded contract
    ContractReader,
    /// Compute gross/net salary and statutory deductions
    SalaryCalculator,
    /// Check the breakdown against statutory rules
    ComplianceMapper,
    /// Flag discrepancies in amounts and deductions
    AnomalyDetector,
    /// Produce the payslip and tax summary
    DocumentGenerator,
}

impl Stage {
    /// Fixed execution order
    pub const ALL: [Stage; 5] = [
        Stage::ContractReader,
        Stage::SalaryCalculator,
        Stage::ComplianceMapper,
        Stage::AnomalyDetector,
        Stage::DocumentGenerator,
    ];

    /// Position in [`Stage::ALL`]
    pub fn index(self) -> usize {
        match self {
            Stage::ContractReader => 0,
            Stage::SalaryCalculator => 1,
            Stage::ComplianceMapper => 2,
            Stage::AnomalyDetector => 3,
            Stage::DocumentGenerator => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Stage::ContractReader => "contract_reader",
            Stage::SalaryCalculator => "salary_calculator",
            Stage::ComplianceMapper => "compliance_mapper",
            Stage::AnomalyDetector => "anomaly_detector",
            Stage::DocumentGenerator => "document_generator",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::ContractReader => {
                "Parses employment contracts to extract salary components and benefits"
            }
            Stage::SalaryCalculator => "Calculates salary breakdown and statutory deductions",
            Stage::ComplianceMapper => "Maps salary deductions against statutory rules",
            Stage::AnomalyDetector => "Flags discrepancies in calculation and tax treatment",
            Stage::DocumentGenerator => "Generates downloadable payslips and tax summaries",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Status of a stage, and of a job as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// COMPLETED and FAILED admit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Progress order: PENDING < RUNNING < terminal
    pub fn rank(self) -> u8 {
        match self {
            JobStatus::Pending => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed => 2,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Per-stage progress as reported by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageProgress {
    pub stage: Stage,
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl StageProgress {
    pub fn pending(stage: Stage) -> Self {
        Self {
            stage,
            status: JobStatus::Pending,
            message: None,
            started_at: None,
            completed_at: None,
        }
    }
}

// ========================================
// Contract data
// ========================================

/// Salary components of a contract. Absent components are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SalaryComponents {
    #[serde(default)]
    pub basic_salary: f64,
    /// House rent (housing) allowance
    #[serde(default)]
    pub hra: f64,
    /// Leave travel allowance
    #[serde(default)]
    pub lta: f64,
    #[serde(default)]
    pub variable_pay: f64,
    #[serde(default)]
    pub bonuses: f64,
    #[serde(default)]
    pub other_allowances: f64,
}

impl SalaryComponents {
    /// Sum of all components
    pub fn total(&self) -> f64 {
        self.basic_salary
            + self.hra
            + self.lta
            + self.variable_pay
            + self.bonuses
            + self.other_allowances
    }

    /// Name and value of every component, in declaration order
    pub fn entries(&self) -> [(&'static str, f64); 6] {
        [
            ("basic_salary", self.basic_salary),
            ("hra", self.hra),
            ("lta", self.lta),
            ("variable_pay", self.variable_pay),
            ("bonuses", self.bonuses),
            ("other_allowances", self.other_allowances),
        ]
    }

    /// Every component must be a finite, non-negative amount
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in self.entries() {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("Salary component {} must be a non-negative amount, got {}", name, value));
            }
        }
        Ok(())
    }
}

/// Fields extracted from a contract document by a parser.
///
/// Everything is optional: the gateway fills defaults when building the
/// persisted [`ContractRecord`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractFields {
    #[serde(default)]
    pub employee_id: Option<String>,
    #[serde(default)]
    pub employee_name: Option<String>,
    #[serde(default)]
    pub employee_email: Option<String>,
    #[serde(default)]
    pub employee_phone: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
    #[serde(default)]
    pub salary_components: SalaryComponents,
    #[serde(default)]
    pub statutory_obligations: Vec<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Persisted contract record. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractRecord {
    pub request_id: Uuid,
    pub employee_id: String,
    pub employee_name: String,
    pub employee_email: Option<String>,
    pub employee_phone: Option<String>,
    pub designation: String,
    pub department: String,
    pub join_date: Option<NaiveDate>,
    pub salary_components: SalaryComponents,
    pub statutory_obligations: Vec<String>,
    pub region: String,
    pub currency: String,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}

// ========================================
// Pipeline results
// ========================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeductionComponents {
    /// Provident fund
    pub pf: f64,
    /// Employee state insurance
    pub esi: f64,
    /// Tax deducted at source
    pub tds: f64,
    pub gratuity: f64,
    pub other_deductions: f64,
}

impl DeductionComponents {
    pub fn total(&self) -> f64 {
        self.pf + self.esi + self.tds + self.gratuity + self.other_deductions
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryBreakdown {
    pub gross_salary: f64,
    pub net_salary: f64,
    pub total_earnings: f64,
    pub total_deductions: f64,
    pub salary_components: SalaryComponents,
    pub deduction_components: DeductionComponents,
    pub calculation_justification: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceStatus {
    pub is_compliant: bool,
    pub compliance_issues: Vec<String>,
    pub tax_slabs_applied: BTreeMap<String, String>,
    pub corrections_suggested: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub has_anomalies: bool,
    pub anomalies: Vec<Anomaly>,
    pub risk_level: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// "payslip" or "tax_summary"
    pub document_type: String,
    pub file_name: String,
    pub download_url: String,
    pub generated_at: DateTime<Utc>,
}

/// Final structured payload of a completed job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollResult {
    pub contract: ContractRecord,
    pub salary_breakdown: SalaryBreakdown,
    pub compliance_status: ComplianceStatus,
    pub anomaly_report: AnomalyReport,
    pub generated_documents: Vec<GeneratedDocument>,
}

// ========================================
// Endpoint bodies
// ========================================

/// GET /api/v1/payroll/status/{request_id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub request_id: Uuid,
    pub employee_id: String,
    pub status: JobStatus,
    /// Stage currently running, or the stage that failed
    pub current_stage: Option<Stage>,
    /// Completed stages as a percentage of all stages
    pub progress_percentage: u8,
    pub stages: Vec<StageProgress>,
    /// Present only once the job is COMPLETED
    pub result: Option<PayrollResult>,
    pub artifact_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobStatusResponse {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// POST /api/v1/payroll/upload-and-process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub request_id: Uuid,
    /// Parsed contract, available as soon as the upload is accepted
    pub contract: ContractRecord,
    /// Job snapshot at response time
    pub job: JobStatusResponse,
}

/// GET /api/v1/agents entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInfo {
    pub name: Stage,
    pub description: String,
    pub status: String,
}

/// Employee record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub designation: Option<String>,
    pub department: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub salary_components: Option<SalaryComponents>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// POST /api/v1/employees request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEmployee {
    pub employee_id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
    #[serde(default)]
    pub salary_components: Option<SalaryComponents>,
}

/// POST /api/v1/employees response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateEmployeeResponse {
    pub success: bool,
    pub employee_id: String,
    pub message: String,
}

/// Row-level failure during a spreadsheet import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRowError {
    /// 1-based data row (header excluded)
    pub row: usize,
    pub employee: Option<String>,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub created_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<ImportRowError>,
}

/// POST /api/v1/employees/import response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeImportResponse {
    pub success: bool,
    pub message: String,
    pub details: ImportSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardKpis {
    pub total_employees: i64,
    /// Percentage of runs without high-severity anomalies
    pub payroll_accuracy: f64,
    /// Percentage of runs without compliance issues
    pub compliance_status: f64,
    /// Sum of net salary over completed runs
    pub total_disbursed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollRunSummary {
    pub request_id: Uuid,
    pub employee_id: String,
    pub status: JobStatus,
    pub net_salary: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyAlert {
    pub request_id: Uuid,
    pub employee_id: String,
    pub category: String,
    pub severity: Severity,
    pub description: String,
    pub detected_at: DateTime<Utc>,
}

/// GET /api/v1/dashboard/summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub kpis: DashboardKpis,
    pub recent_payroll_runs: Vec<PayrollRunSummary>,
    pub anomaly_alerts: Vec<AnomalyAlert>,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    /// Human-readable message, shown to users verbatim
    pub message: String,
}
