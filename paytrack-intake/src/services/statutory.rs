//! Statutory payroll constants (India, FY 2024-25) and the income tax slab table

/// Employee PF contribution as a share of basic salary
pub const PF_RATE: f64 = 0.12;
pub const PF_CAP: f64 = 15_000.0;

/// Employee ESI contribution as a share of gross earnings
pub const ESI_RATE: f64 = 0.0075;
/// ESI applies only at or below this monthly gross
pub const ESI_THRESHOLD: f64 = 21_000.0;

/// Monthly gratuity accrual: basic × 4.81 / 26
pub const GRATUITY_NUMERATOR: f64 = 4.81;
pub const GRATUITY_DIVISOR: f64 = 26.0;

pub const MINIMUM_WAGE: f64 = 15_000.0;
/// HRA above this share of basic is flagged
pub const HRA_BASIC_RATIO: f64 = 0.5;

/// Basic salary above this is treated as a probable data entry error
pub const BASIC_SALARY_CEILING: f64 = 500_000.0;
/// Deductions above this share of gross are flagged
pub const DEDUCTION_RATIO_LIMIT: f64 = 0.40;

/// One annual income tax slab
#[derive(Debug, Clone, Copy)]
pub struct TaxSlab {
    /// Inclusive upper bound of annual income; `None` for the top slab
    pub upper: Option<f64>,
    pub lower: f64,
    pub rate: f64,
    /// Tax due on all income below `lower`
    pub base_tax: f64,
}

pub const TAX_SLABS: [TaxSlab; 6] = [
    TaxSlab { lower: 0.0, upper: Some(300_000.0), rate: 0.0, base_tax: 0.0 },
    TaxSlab { lower: 300_000.0, upper: Some(600_000.0), rate: 0.05, base_tax: 0.0 },
    TaxSlab { lower: 600_000.0, upper: Some(900_000.0), rate: 0.10, base_tax: 15_000.0 },
    TaxSlab { lower: 900_000.0, upper: Some(1_200_000.0), rate: 0.15, base_tax: 45_000.0 },
    TaxSlab { lower: 1_200_000.0, upper: Some(1_500_000.0), rate: 0.20, base_tax: 90_000.0 },
    TaxSlab { lower: 1_500_000.0, upper: None, rate: 0.30, base_tax: 150_000.0 },
];

/// Slab an annual income falls into
pub fn slab_for(annual_income: f64) -> &'static TaxSlab {
    TAX_SLABS
        .iter()
        .find(|s| s.upper.map_or(true, |upper| annual_income <= upper))
        .unwrap_or(&TAX_SLABS[TAX_SLABS.len() - 1])
}

/// Annual income tax on `annual_income`
pub fn annual_tax(annual_income: f64) -> f64 {
    let slab = slab_for(annual_income);
    slab.base_tax + (annual_income - slab.lower).max(0.0) * slab.rate
}

impl TaxSlab {
    pub fn describe(&self) -> String {
        match self.upper {
            Some(upper) => format!(
                "{:.0}-{:.0} at {:.0}%",
                self.lower,
                upper,
                self.rate * 100.0
            ),
            None => format!("above {:.0} at {:.0}%", self.lower, self.rate * 100.0),
        }
    }
}

/// Round a currency amount to two decimals
pub fn round_currency(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
