//! Stage 4: discrepancy detection over amounts and deductions

use paytrack_common::api::{Anomaly, AnomalyReport, SalaryBreakdown, Severity};

use super::statutory::{
    BASIC_SALARY_CEILING, DEDUCTION_RATIO_LIMIT, HRA_BASIC_RATIO, MINIMUM_WAGE, PF_CAP, PF_RATE,
};

/// Allowed drift between the recorded and the expected PF amount
const PF_TOLERANCE: f64 = 1.0;

fn anomaly(category: &str, severity: Severity, description: String, suggestion: &str) -> Anomaly {
    Anomaly {
        category: category.to_string(),
        severity,
        description,
        suggestion: suggestion.to_string(),
    }
}

/// Flag discrepancies in a salary breakdown
pub fn detect(breakdown: &SalaryBreakdown) -> AnomalyReport {
    let basic = breakdown.salary_components.basic_salary;
    let hra = breakdown.salary_components.hra;
    let gross = breakdown.gross_salary;
    let mut anomalies = Vec::new();

    if basic < MINIMUM_WAGE {
        anomalies.push(anomaly(
            "basic_salary",
            Severity::High,
            format!("Basic salary ({:.2}) is below minimum wage threshold", basic),
            "Review basic salary against minimum wage requirements",
        ));
    }
    if basic > BASIC_SALARY_CEILING {
        anomalies.push(anomaly(
            "basic_salary",
            Severity::Medium,
            format!("Basic salary ({:.2}) is unusually high", basic),
            "Verify basic salary amount for data entry accuracy",
        ));
    }
    if hra > basic * HRA_BASIC_RATIO {
        anomalies.push(anomaly(
            "hra",
            Severity::Medium,
            format!("HRA ({:.2}) exceeds 50% of basic salary ({:.2})", hra, basic),
            "Review HRA calculation and tax implications",
        ));
    }
    if gross > 0.0 {
        let ratio = breakdown.total_deductions / gross;
        if ratio > DEDUCTION_RATIO_LIMIT {
            anomalies.push(anomaly(
                "deductions",
                Severity::High,
                format!(
                    "Total deductions ({:.2}) are {:.1}% of gross salary",
                    breakdown.total_deductions,
                    ratio * 100.0
                ),
                "Review deduction calculations and employee consent",
            ));
        }
    }

    let pf = breakdown.deduction_components.pf;
    let expected_pf = (basic * PF_RATE).min(PF_CAP);
    if (pf - expected_pf).abs() > PF_TOLERANCE {
        anomalies.push(anomaly(
            "pf",
            Severity::High,
            format!(
                "PF amount ({:.2}) doesn't match expected calculation ({:.2})",
                pf, expected_pf
            ),
            "Recalculate PF as 12% of basic salary, capped at 15,000",
        ));
    }

    let risk_level = anomalies
        .iter()
        .map(|a| a.severity)
        .max()
        .unwrap_or(Severity::Low);

    AnomalyReport {
        has_anomalies: !anomalies.is_empty(),
        anomalies,
        risk_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::salary_calculator::{calculate, tests::contract_with};
    use paytrack_common::api::SalaryComponents;

    fn breakdown(basic: f64, hra: f64) -> SalaryBreakdown {
        calculate(&contract_with(SalaryComponents {
            basic_salary: basic,
            hra,
            ..Default::default()
        }))
        .unwrap()
    }

    #[test]
    fn test_clean_breakdown_is_low_risk() {
        let report = detect(&breakdown(50_000.0, 20_000.0));
        assert!(!report.has_anomalies);
        assert_eq!(report.risk_level, Severity::Low);
    }

    #[test]
    fn test_low_basic_is_high_risk() {
        let report = detect(&breakdown(12_000.0, 3_000.0));
        assert!(report.has_anomalies);
        assert_eq!(report.risk_level, Severity::High);
        assert_eq!(report.anomalies[0].category, "basic_salary");
    }

    #[test]
    fn test_high_hra_is_medium_risk() {
        let report = detect(&breakdown(40_000.0, 30_000.0));
        assert_eq!(report.anomalies.len(), 1);
        assert_eq!(report.anomalies[0].category, "hra");
        assert_eq!(report.risk_level, Severity::Medium);
    }

    #[test]
    fn test_pf_mismatch() {
        let mut b = breakdown(50_000.0, 10_000.0);
        b.deduction_components.pf = 1_800.0;
        let report = detect(&b);
        assert!(report.anomalies.iter().any(|a| a.category == "pf"));
        assert_eq!(report.risk_level, Severity::High);
    }

    #[test]
    fn test_heavy_deductions_flagged() {
        // Basic-only contract: PF 12% + gratuity 18.5% + TDS push past 40%
        let report = detect(&breakdown(400_000.0, 0.0));
        assert!(report.anomalies.iter().any(|a| a.category == "deductions"));
    }
}
