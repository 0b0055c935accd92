//! Stage 3: statutory compliance checks over a salary breakdown

use paytrack_common::api::{ComplianceStatus, SalaryBreakdown};
use std::collections::BTreeMap;

use super::statutory::{
    slab_for, ESI_THRESHOLD, HRA_BASIC_RATIO, MINIMUM_WAGE, PF_CAP,
};

struct Finding {
    issue: String,
    correction: String,
}

type Rule = fn(&SalaryBreakdown) -> Option<Finding>;

fn pf_cap(b: &SalaryBreakdown) -> Option<Finding> {
    let pf = b.deduction_components.pf;
    (pf > PF_CAP).then(|| Finding {
        issue: format!("PF deduction ({:.2}) exceeds the statutory cap of {:.0}", pf, PF_CAP),
        correction: format!("Cap PF deduction at {:.0}", PF_CAP),
    })
}

fn esi_threshold(b: &SalaryBreakdown) -> Option<Finding> {
    let esi = b.deduction_components.esi;
    if b.gross_salary > ESI_THRESHOLD && esi > 0.0 {
        Some(Finding {
            issue: format!(
                "ESI deducted although gross salary ({:.2}) exceeds {:.0}",
                b.gross_salary, ESI_THRESHOLD
            ),
            correction: "Remove ESI deduction for salary above the ESI threshold".to_string(),
        })
    } else if b.gross_salary <= ESI_THRESHOLD && esi == 0.0 {
        Some(Finding {
            issue: "ESI deduction missing for an ESI-eligible salary".to_string(),
            correction: "Deduct ESI at 0.75% of gross salary".to_string(),
        })
    } else {
        None
    }
}

fn hra_ratio(b: &SalaryBreakdown) -> Option<Finding> {
    let basic = b.salary_components.basic_salary;
    let hra = b.salary_components.hra;
    (hra > basic * HRA_BASIC_RATIO).then(|| Finding {
        issue: format!(
            "HRA ({:.2}) exceeds 50% of basic salary ({:.2})",
            hra, basic
        ),
        correction: "Treat HRA above 50% of basic salary as taxable".to_string(),
    })
}

fn minimum_wage(b: &SalaryBreakdown) -> Option<Finding> {
    let basic = b.salary_components.basic_salary;
    (basic < MINIMUM_WAGE).then(|| Finding {
        issue: format!(
            "Basic salary ({:.2}) is below the minimum wage of {:.0}",
            basic, MINIMUM_WAGE
        ),
        correction: format!("Raise basic salary to at least {:.0}", MINIMUM_WAGE),
    })
}

const RULES: [Rule; 4] = [pf_cap, esi_threshold, hra_ratio, minimum_wage];

/// Check a breakdown against the statutory rule table
pub fn map_compliance(breakdown: &SalaryBreakdown) -> ComplianceStatus {
    let (compliance_issues, corrections_suggested): (Vec<_>, Vec<_>) = RULES
        .iter()
        .filter_map(|rule| rule(breakdown))
        .map(|f| (f.issue, f.correction))
        .unzip();

    let annual_income = breakdown.gross_salary * 12.0;
    let mut tax_slabs_applied = BTreeMap::new();
    tax_slabs_applied.insert(
        "income_tax_slab".to_string(),
        slab_for(annual_income).describe(),
    );
    tax_slabs_applied.insert("annual_income".to_string(), format!("{:.2}", annual_income));
    tax_slabs_applied.insert("pf_cap".to_string(), format!("{:.0}", PF_CAP));
    tax_slabs_applied.insert("esi_threshold".to_string(), format!("{:.0}", ESI_THRESHOLD));

    ComplianceStatus {
        is_compliant: compliance_issues.is_empty(),
        compliance_issues,
        tax_slabs_applied,
        corrections_suggested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::salary_calculator::{calculate, tests::contract_with};
    use paytrack_common::api::SalaryComponents;

    #[test]
    fn test_compliant_breakdown() {
        let b = calculate(&contract_with(SalaryComponents {
            basic_salary: 50_000.0,
            hra: 20_000.0,
            ..Default::default()
        }))
        .unwrap();

        let status = map_compliance(&b);
        assert!(status.is_compliant, "issues: {:?}", status.compliance_issues);
        assert!(status.corrections_suggested.is_empty());
        assert_eq!(status.tax_slabs_applied["pf_cap"], "15000");
        assert_eq!(status.tax_slabs_applied["income_tax_slab"], "600000-900000 at 10%");
    }

    #[test]
    fn test_hra_and_minimum_wage_issues() {
        let b = calculate(&contract_with(SalaryComponents {
            basic_salary: 12_000.0,
            hra: 30_000.0,
            ..Default::default()
        }))
        .unwrap();

        let status = map_compliance(&b);
        assert!(!status.is_compliant);
        assert_eq!(status.compliance_issues.len(), 2);
        assert!(status.compliance_issues[0].contains("HRA"));
        assert!(status.compliance_issues[1].contains("minimum wage"));
        assert_eq!(status.corrections_suggested.len(), 2);
    }

    #[test]
    fn test_esi_on_high_salary_is_flagged() {
        let mut b = calculate(&contract_with(SalaryComponents {
            basic_salary: 40_000.0,
            ..Default::default()
        }))
        .unwrap();
        b.deduction_components.esi = 300.0;

        let status = map_compliance(&b);
        assert!(status.compliance_issues.iter().any(|i| i.starts_with("ESI deducted")));
    }
}
