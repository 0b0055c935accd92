//! Labelled field recognition over extracted contract text
//!
//! Contracts state their terms as `Label: value` lines (or table rows). Each
//! field has a set of accepted labels; the first matching line wins. Amounts
//! may carry currency symbols and digit grouping ("Rs. 6,00,000"). Amounts
//! stated per annum are converted to monthly figures.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use paytrack_common::api::{ContractFields, SalaryComponents};
use regex::{Captures, Regex};

use super::ParseError;

/// Leading bullets, table pipes or list numbering before a label
const LINE_PREFIX: &str = r"(?im)^[\s|*•\-]*(?:\d+[.)]\s*)?";

/// Text between a salary label and its amount: separators and currency, no digits
const AMOUNT_GAP: &str = r"[^\d\n]*?";

/// `(amount)(%)?(rest of line)`
const AMOUNT: &str = r"(?P<amount>\d[\d,]*(?:\.\d+)?)\s*(?P<percent>%)?(?P<rest>[^\n]*)";

fn text_field(labels: &str) -> Regex {
    Regex::new(&format!(
        r"{}(?:{})\s*[:\-=]\s*(?P<value>[^\n|]+?)\s*\|?\s*$",
        LINE_PREFIX, labels
    ))
    .expect("valid field regex")
}

fn amount_field(labels: &str) -> Regex {
    Regex::new(&format!(
        r"{}(?:{})\b{}{}",
        LINE_PREFIX, labels, AMOUNT_GAP, AMOUNT
    ))
    .expect("valid amount regex")
}

struct FieldPatterns {
    employee_id: Regex,
    employee_name: Regex,
    email: Regex,
    phone: Regex,
    designation: Regex,
    department: Regex,
    join_date: Regex,
    region: Regex,
    currency: Regex,
    basic_salary: Regex,
    hra: Regex,
    lta: Regex,
    variable_pay: Regex,
    bonuses: Regex,
    other_allowances: Regex,
    annual: Regex,
    statutory: Vec<(&'static str, Regex)>,
}

static PATTERNS: Lazy<FieldPatterns> = Lazy::new(|| FieldPatterns {
    employee_id: Regex::new(&format!(
        r"{}(?:employee\s*(?:id|code|number|no)\b\.?|emp\.?\s*(?:id|code))\s*[:#\-=]?\s*(?P<value>[A-Za-z0-9][A-Za-z0-9_\-/]*)",
        LINE_PREFIX
    ))
    .expect("valid regex"),
    employee_name: text_field(r"employee\s+name|name\s+of\s+(?:the\s+)?employee|full\s+name|name"),
    email: Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid regex"),
    phone: Regex::new(&format!(
        r"{}(?:phone|mobile|contact|tel(?:ephone)?)(?:\s+(?:no\.?|number))?\s*[:\-=]\s*(?P<value>\+?\d[\d \-()]{{6,}}\d)",
        LINE_PREFIX
    ))
    .expect("valid regex"),
    designation: text_field(r"designation|position|job\s+title|role"),
    department: text_field(r"department|dept\.?|division"),
    join_date: text_field(
        r"date\s+of\s+joining|joining\s+date|join\s+date|start\s+date|commencement\s+date",
    ),
    region: text_field(r"region|country"),
    currency: Regex::new(&format!(r"{}currency\s*[:\-=]\s*(?P<value>[A-Za-z]{{3}})\b", LINE_PREFIX))
        .expect("valid regex"),
    basic_salary: amount_field(r"basic(?:\s+(?:salary|pay|wage))?"),
    hra: amount_field(r"hra|house\s+rent\s+allowance|housing\s+allowance"),
    lta: amount_field(r"lta|leave\s+travel\s+allowance|travel\s+allowance"),
    variable_pay: amount_field(r"variable\s+pay|performance\s+pay|incentives?"),
    bonuses: amount_field(r"(?:joining\s+|annual\s+|performance\s+)?bonus(?:es)?"),
    other_allowances: amount_field(
        r"other\s+allowances?|special\s+allowances?|misc(?:ellaneous)?\s+allowances?",
    ),
    annual: Regex::new(r"(?i)per\s+annum|annual(?:ly)?|\bp\.?\s?a\b\.?|per\s+year|/\s*year|yearly")
        .expect("valid regex"),
    statutory: vec![
        (
            "PF",
            Regex::new(r"(?i)\b(?:E?PF|provident\s+fund)\b").expect("valid regex"),
        ),
        (
            "ESI",
            Regex::new(r"(?i)\bESIC?\b|employees?'?\s+state\s+insurance").expect("valid regex"),
        ),
        (
            "TDS",
            Regex::new(r"(?i)\bTDS\b|tax\s+deducted\s+at\s+source|income\s+tax")
                .expect("valid regex"),
        ),
        ("Gratuity", Regex::new(r"(?i)\bgratuity\b").expect("valid regex")),
        (
            "Professional Tax",
            Regex::new(r"(?i)professional\s+tax").expect("valid regex"),
        ),
    ],
});

fn capture_value(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.name("value"))
        .map(|m| m.as_str().trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', "").parse::<f64>().ok()
}

/// Recognised amount: a monthly figure, or a percentage of basic salary
enum Amount {
    Monthly(f64),
    PercentOfBasic(f64),
}

fn capture_amount(re: &Regex, text: &str) -> Option<Amount> {
    let caps: Captures = re.captures(text)?;
    let value = parse_amount(caps.name("amount")?.as_str())?;
    if caps.name("percent").is_some() {
        return Some(Amount::PercentOfBasic(value));
    }
    let rest = caps.name("rest").map(|m| m.as_str()).unwrap_or("");
    if PATTERNS.annual.is_match(rest) {
        Some(Amount::Monthly(value / 12.0))
    } else {
        Some(Amount::Monthly(value))
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

static ORDINAL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d)(?:st|nd|rd|th)\b").expect("valid regex"));

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %B %Y", "%d %b %Y", "%B %d, %Y",
    "%b %d, %Y", "%B %d %Y",
];

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // "1st March 2024" → "1 March 2024"
    let cleaned = ORDINAL_SUFFIX
        .replace_all(raw.trim().trim_end_matches('.'), "$1")
        .into_owned();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

fn normalize_region(raw: &str) -> String {
    match raw.trim().to_ascii_lowercase().as_str() {
        "india" => "IN".to_string(),
        "uae" | "united arab emirates" => "AE".to_string(),
        "usa" | "us" | "united states" | "united states of america" => "US".to_string(),
        "uk" | "united kingdom" | "great britain" => "GB".to_string(),
        "singapore" => "SG".to_string(),
        other if other.len() == 2 => other.to_ascii_uppercase(),
        _ => raw.trim().to_string(),
    }
}

fn infer_currency(text: &str) -> Option<String> {
    let explicit = capture_value(&PATTERNS.currency, text).map(|c| c.to_ascii_uppercase());
    if explicit.is_some() {
        return explicit;
    }
    if text.contains('₹') || text.contains("INR") || text.contains("Rs.") {
        Some("INR".to_string())
    } else if text.contains("AED") {
        Some("AED".to_string())
    } else if text.contains('€') {
        Some("EUR".to_string())
    } else if text.contains('£') {
        Some("GBP".to_string())
    } else if text.contains("USD") || text.contains('$') {
        Some("USD".to_string())
    } else {
        None
    }
}

/// Recognise contract fields in extracted text.
///
/// Fails with [`ParseError::NoRecognizedFields`] when neither an employee
/// identifier nor any salary amount is found.
pub fn recognize_fields(text: &str) -> Result<ContractFields, ParseError> {
    let p = &*PATTERNS;

    let mut pending_percent = Vec::new();
    let mut components = SalaryComponents::default();
    let mut any_amount = false;

    {
        let slots: [(&Regex, &mut f64, &str); 6] = [
            (&p.basic_salary, &mut components.basic_salary, "basic_salary"),
            (&p.hra, &mut components.hra, "hra"),
            (&p.lta, &mut components.lta, "lta"),
            (&p.variable_pay, &mut components.variable_pay, "variable_pay"),
            (&p.bonuses, &mut components.bonuses, "bonuses"),
            (&p.other_allowances, &mut components.other_allowances, "other_allowances"),
        ];
        for (re, slot, name) in slots {
            match capture_amount(re, text) {
                Some(Amount::Monthly(v)) => {
                    *slot = round2(v);
                    any_amount = true;
                }
                Some(Amount::PercentOfBasic(pct)) => pending_percent.push((name, pct)),
                None => {}
            }
        }
    }

    // Components stated as "40% of basic" resolve once the basic amount is known
    if components.basic_salary > 0.0 {
        let basic = components.basic_salary;
        for (name, pct) in pending_percent {
            let value = round2(basic * pct / 100.0);
            match name {
                "hra" => components.hra = value,
                "lta" => components.lta = value,
                "variable_pay" => components.variable_pay = value,
                "bonuses" => components.bonuses = value,
                "other_allowances" => components.other_allowances = value,
                _ => continue,
            }
            any_amount = true;
        }
    }

    let employee_id = capture_value(&p.employee_id, text);
    let employee_name = capture_value(&p.employee_name, text);

    if employee_id.is_none() && employee_name.is_none() && !any_amount {
        return Err(ParseError::NoRecognizedFields);
    }

    let join_date = match capture_value(&p.join_date, text) {
        Some(raw) => Some(parse_date(&raw).ok_or_else(|| {
            ParseError::InvalidField(format!("Unrecognised joining date: {}", raw))
        })?),
        None => None,
    };

    let statutory_obligations = p
        .statutory
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| name.to_string())
        .collect();

    Ok(ContractFields {
        employee_id,
        employee_name,
        employee_email: p.email.find(text).map(|m| m.as_str().to_string()),
        employee_phone: capture_value(&p.phone, text),
        designation: capture_value(&p.designation, text),
        department: capture_value(&p.department, text),
        join_date,
        salary_components: components,
        statutory_obligations,
        region: capture_value(&p.region, text).map(|r| normalize_region(&r)),
        currency: infer_currency(text),
    })
}
