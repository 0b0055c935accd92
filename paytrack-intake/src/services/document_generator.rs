//! Stage 5: payslip and tax summary artifacts
//!
//! Documents are plain text, written into the outputs directory and served by
//! the downloads endpoint.

use chrono::Utc;
use paytrack_common::api::{
    AnomalyReport, ComplianceStatus, ContractRecord, GeneratedDocument, SalaryBreakdown,
};
use std::fmt::Write as _;
use std::path::Path;
use tracing::debug;

use super::StageError;

/// URL prefix under which generated files are served
pub const DOWNLOADS_PREFIX: &str = "/api/v1/downloads";

pub fn download_url(file_name: &str) -> String {
    format!("{}/{}", DOWNLOADS_PREFIX, file_name)
}

/// Inputs the documents are rendered from
pub struct DocumentInputs<'a> {
    pub contract: &'a ContractRecord,
    pub breakdown: &'a SalaryBreakdown,
    pub compliance: &'a ComplianceStatus,
    pub anomalies: &'a AnomalyReport,
}

fn render_payslip(input: &DocumentInputs<'_>) -> String {
    let c = input.contract;
    let b = input.breakdown;
    let cur = &c.currency;
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "PAYSLIP");
    let _ = writeln!(out, "=======");
    let _ = writeln!(out, "Employee:     {} ({})", c.employee_name, c.employee_id);
    let _ = writeln!(out, "Designation:  {}", c.designation);
    let _ = writeln!(out, "Department:   {}", c.department);
    if let Some(date) = c.join_date {
        let _ = writeln!(out, "Joined:       {}", date);
    }
    let _ = writeln!(out, "Region:       {}", c.region);
    let _ = writeln!(out, "Reference:    {}", c.request_id);
    let _ = writeln!(out);

    let _ = writeln!(out, "EARNINGS");
    for (name, amount) in b.salary_components.entries() {
        let _ = writeln!(out, "  {:<20} {} {:>14.2}", name, cur, amount);
    }
    let _ = writeln!(out, "  {:<20} {} {:>14.2}", "gross_salary", cur, b.gross_salary);
    let _ = writeln!(out);

    let d = &b.deduction_components;
    let _ = writeln!(out, "DEDUCTIONS");
    for (name, amount) in [
        ("pf", d.pf),
        ("esi", d.esi),
        ("tds", d.tds),
        ("gratuity", d.gratuity),
        ("other_deductions", d.other_deductions),
    ] {
        let _ = writeln!(out, "  {:<20} {} {:>14.2}", name, cur, amount);
    }
    let _ = writeln!(out, "  {:<20} {} {:>14.2}", "total_deductions", cur, b.total_deductions);
    let _ = writeln!(out);
    let _ = writeln!(out, "NET SALARY             {} {:>14.2}", cur, b.net_salary);

    out
}

fn render_tax_summary(input: &DocumentInputs<'_>) -> String {
    let c = input.contract;
    let b = input.breakdown;
    let mut out = String::new();

    let _ = writeln!(out, "TAX SUMMARY");
    let _ = writeln!(out, "===========");
    let _ = writeln!(out, "Employee: {} ({})", c.employee_name, c.employee_id);
    let _ = writeln!(out, "Annual gross income: {} {:.2}", c.currency, b.gross_salary * 12.0);
    let _ = writeln!(
        out,
        "Annual TDS: {} {:.2}",
        c.currency,
        b.deduction_components.tds * 12.0
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Slabs applied:");
    for (key, value) in &input.compliance.tax_slabs_applied {
        let _ = writeln!(out, "  {}: {}", key, value);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Calculation:");
    for line in b.calculation_justification.values() {
        let _ = writeln!(out, "  {}", line);
    }
    let _ = writeln!(out);

    if input.compliance.is_compliant {
        let _ = writeln!(out, "Compliance: no issues");
    } else {
        let _ = writeln!(out, "Compliance issues:");
        for issue in &input.compliance.compliance_issues {
            let _ = writeln!(out, "  - {}", issue);
        }
    }

    let _ = writeln!(out, "Risk level: {:?}", input.anomalies.risk_level);
    for a in &input.anomalies.anomalies {
        let _ = writeln!(out, "  - [{:?}] {}", a.severity, a.description);
    }

    out
}

/// Write the payslip and tax summary. The payslip comes first; its URL is
/// the job's artifact URL.
pub async fn generate(
    outputs_dir: &Path,
    input: &DocumentInputs<'_>,
) -> Result<Vec<GeneratedDocument>, StageError> {
    tokio::fs::create_dir_all(outputs_dir).await?;

    let request_id = input.contract.request_id;
    let documents = [
        ("payslip", format!("payslip_{}.txt", request_id), render_payslip(input)),
        (
            "tax_summary",
            format!("tax_summary_{}.txt", request_id),
            render_tax_summary(input),
        ),
    ];

    let mut generated = Vec::with_capacity(documents.len());
    for (document_type, file_name, body) in documents {
        let path = outputs_dir.join(&file_name);
        tokio::fs::write(&path, body).await?;
        debug!(request_id = %request_id, path = %path.display(), "Document written");

        generated.push(GeneratedDocument {
            document_type: document_type.to_string(),
            download_url: download_url(&file_name),
            file_name,
            generated_at: Utc::now(),
        });
    }

    Ok(generated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::salary_calculator::{calculate, tests::contract_with};
    use crate::services::{anomaly_detector, compliance_mapper};
    use paytrack_common::api::SalaryComponents;

    #[tokio::test]
    async fn test_generates_payslip_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let contract = contract_with(SalaryComponents {
            basic_salary: 50_000.0,
            hra: 20_000.0,
            ..Default::default()
        });
        let breakdown = calculate(&contract).unwrap();
        let compliance = compliance_mapper::map_compliance(&breakdown);
        let anomalies = anomaly_detector::detect(&breakdown);

        let docs = generate(
            dir.path(),
            &DocumentInputs {
                contract: &contract,
                breakdown: &breakdown,
                compliance: &compliance,
                anomalies: &anomalies,
            },
        )
        .await
        .unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].document_type, "payslip");
        assert_eq!(
            docs[0].download_url,
            format!("/api/v1/downloads/payslip_{}.txt", contract.request_id)
        );

        let payslip = std::fs::read_to_string(dir.path().join(&docs[0].file_name)).unwrap();
        assert!(payslip.contains("NET SALARY"));
        assert!(payslip.contains("51500.00"));
        assert!(payslip.contains("lta"));

        let summary = std::fs::read_to_string(dir.path().join(&docs[1].file_name)).unwrap();
        assert!(summary.contains("Compliance: no issues"));
    }
}
