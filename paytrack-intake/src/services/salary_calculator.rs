//! Stage 2: salary breakdown and statutory deductions

use paytrack_common::api::{ContractRecord, DeductionComponents, SalaryBreakdown};
use std::collections::BTreeMap;

use super::statutory::{
    annual_tax, round_currency, slab_for, ESI_RATE, ESI_THRESHOLD, GRATUITY_DIVISOR,
    GRATUITY_NUMERATOR, PF_CAP, PF_RATE,
};
use super::StageError;

/// Monthly TDS for a monthly gross, from the annualised slab table
pub fn monthly_tds(monthly_gross: f64) -> f64 {
    annual_tax(monthly_gross * 12.0) / 12.0
}

/// Compute the monthly salary breakdown for a contract
pub fn calculate(contract: &ContractRecord) -> Result<SalaryBreakdown, StageError> {
    let components = contract.salary_components.clone();
    let basic = components.basic_salary;
    let total_earnings = round_currency(components.total());

    let pf = round_currency((basic * PF_RATE).min(PF_CAP));
    let esi = if total_earnings <= ESI_THRESHOLD {
        round_currency(total_earnings * ESI_RATE)
    } else {
        0.0
    };
    let gratuity = round_currency(basic * GRATUITY_NUMERATOR / GRATUITY_DIVISOR);
    let tds = round_currency(monthly_tds(total_earnings));

    let deductions = DeductionComponents {
        pf,
        esi,
        tds,
        gratuity,
        other_deductions: 0.0,
    };
    let total_deductions = round_currency(deductions.total());
    let net_salary = round_currency(total_earnings - total_deductions);

    let mut justification = BTreeMap::new();
    justification.insert(
        "pf_calculation".to_string(),
        format!(
            "PF: 12% of basic salary ({:.2}) = {:.2}, capped at {:.0}",
            basic, pf, PF_CAP
        ),
    );
    justification.insert(
        "esi_calculation".to_string(),
        if esi > 0.0 {
            format!("ESI: 0.75% of gross salary ({:.2}) = {:.2}", total_earnings, esi)
        } else {
            format!(
                "ESI: not applicable, gross salary ({:.2}) exceeds {:.0}",
                total_earnings, ESI_THRESHOLD
            )
        },
    );
    justification.insert(
        "gratuity_calculation".to_string(),
        format!(
            "Gratuity: ({:.2} × 4.81) / 26 = {:.2}",
            basic, gratuity
        ),
    );
    justification.insert(
        "tds_calculation".to_string(),
        format!(
            "TDS: annual income {:.2} in slab {} = {:.2} per month",
            total_earnings * 12.0,
            slab_for(total_earnings * 12.0).describe(),
            tds
        ),
    );
    justification.insert(
        "net_calculation".to_string(),
        format!(
            "Net salary: gross ({:.2}) - deductions ({:.2}) = {:.2}",
            total_earnings, total_deductions, net_salary
        ),
    );

    let breakdown = SalaryBreakdown {
        gross_salary: total_earnings,
        net_salary,
        total_earnings,
        total_deductions,
        salary_components: components,
        deduction_components: deductions,
        calculation_justification: justification,
    };
    validate(&breakdown)?;
    Ok(breakdown)
}

fn validate(breakdown: &SalaryBreakdown) -> Result<(), StageError> {
    if breakdown.gross_salary <= 0.0 {
        return Err(StageError::Validation(
            "Gross salary must be greater than 0".to_string(),
        ));
    }
    if breakdown.total_deductions > breakdown.gross_salary {
        return Err(StageError::Validation(format!(
            "Total deductions ({:.2}) exceed gross salary ({:.2})",
            breakdown.total_deductions, breakdown.gross_salary
        )));
    }
    if breakdown.net_salary < 0.0 {
        return Err(StageError::Validation(
            "Net salary cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use paytrack_common::api::SalaryComponents;
    use uuid::Uuid;

    pub(crate) fn contract_with(components: SalaryComponents) -> ContractRecord {
        ContractRecord {
            request_id: Uuid::new_v4(),
            employee_id: "E-1".to_string(),
            employee_name: "Test Employee".to_string(),
            employee_email: None,
            employee_phone: None,
            designation: "Engineer".to_string(),
            department: "General".to_string(),
            join_date: None,
            salary_components: components,
            statutory_obligations: vec!["PF".to_string()],
            region: "IN".to_string(),
            currency: "INR".to_string(),
            file_name: "contract.txt".to_string(),
            uploaded_at: Utc::now(),
        }
    }

    #[test]
    fn test_mid_income_breakdown() {
        let contract = contract_with(SalaryComponents {
            basic_salary: 50_000.0,
            hra: 20_000.0,
            ..Default::default()
        });
        let b = calculate(&contract).unwrap();

        assert_eq!(b.gross_salary, 70_000.0);
        assert_eq!(b.deduction_components.pf, 6_000.0);
        assert_eq!(b.deduction_components.esi, 0.0);
        assert_eq!(b.deduction_components.gratuity, 9_250.0);
        // 840000 annual: 15000 + 240000 × 10% = 39000 → 3250 monthly
        assert_eq!(b.deduction_components.tds, 3_250.0);
        assert_eq!(b.total_deductions, 18_500.0);
        assert_eq!(b.net_salary, 51_500.0);
        assert_eq!(b.calculation_justification.len(), 5);
    }

    #[test]
    fn test_esi_applies_at_low_income() {
        let contract = contract_with(SalaryComponents {
            basic_salary: 16_000.0,
            hra: 4_000.0,
            ..Default::default()
        });
        let b = calculate(&contract).unwrap();
        assert_eq!(b.deduction_components.esi, 150.0);
        assert_eq!(b.deduction_components.tds, 0.0);
    }

    #[test]
    fn test_pf_cap() {
        let contract = contract_with(SalaryComponents {
            basic_salary: 200_000.0,
            ..Default::default()
        });
        let b = calculate(&contract).unwrap();
        assert_eq!(b.deduction_components.pf, PF_CAP);
    }

    #[test]
    fn test_zero_salary_fails() {
        let err = calculate(&contract_with(SalaryComponents::default())).unwrap_err();
        assert!(err.to_string().contains("Gross salary"));
    }

    #[test]
    fn test_deductions_exceeding_gross_fail_validation() {
        let contract = contract_with(SalaryComponents {
            basic_salary: 30_000.0,
            ..Default::default()
        });
        let mut b = calculate(&contract).unwrap();
        b.deduction_components.other_deductions = 40_000.0;
        b.total_deductions = b.deduction_components.total();
        b.net_salary = b.gross_salary - b.total_deductions;

        let err = validate(&b).unwrap_err();
        assert!(err.to_string().contains("exceed gross salary"));
    }

    #[test]
    fn test_monthly_tds() {
        assert_eq!(monthly_tds(25_000.0), 0.0);
        assert_eq!(monthly_tds(50_000.0), 1_250.0);
    }
}
