//! Bulk employee import from CSV or XLSX
//!
//! Required columns: `employee_id`, `name`, `email`. Optional columns are
//! `phone`, `designation`, `department`, `join_date` and the six salary
//! component keys. A row whose employee ID or email already exists is
//! skipped; any other row-level problem is reported and the row is left out.
//! The whole import commits as one transaction.

use chrono::{Duration, NaiveDate};
use paytrack_common::api::{ImportRowError, ImportSummary, NewEmployee, SalaryComponents};
use sqlx::SqlitePool;

use super::spreadsheet::{read_sheet, Sheet, SheetFormat};
use crate::db::employees::{create_employee, CreateOutcome, DuplicateField};
use crate::error::{ApiError, ApiResult};

pub const REQUIRED_COLUMNS: [&str; 3] = ["employee_id", "name", "email"];

const SALARY_COLUMNS: [&str; 6] = [
    "basic_salary",
    "hra",
    "lta",
    "variable_pay",
    "bonuses",
    "other_allowances",
];

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Largest spreadsheet day serial (9999-12-31)
const MAX_DATE_SERIAL: f64 = 2_958_465.0;

/// Spreadsheet epoch for serial date cells
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

fn parse_join_date(value: &str) -> Result<NaiveDate, String> {
    // XLSX stores dates as day serials, sometimes with a time fraction
    if let Ok(serial) = value.parse::<f64>() {
        if serial >= 1.0 {
            return Some(serial.trunc())
                .filter(|days| *days <= MAX_DATE_SERIAL)
                .and_then(|days| Duration::try_days(days as i64))
                .and_then(|offset| excel_epoch().checked_add_signed(offset))
                .ok_or_else(|| format!("Invalid join_date '{}'", value));
        }
    }
    let date_part = value.split(['T', ' ']).next().unwrap_or(value);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
        .ok_or_else(|| format!("Invalid join_date '{}'", value))
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}

/// One sheet row bound to the normalized header names
struct RowView<'a> {
    sheet: &'a Sheet,
    cells: &'a [String],
}

impl<'a> RowView<'a> {
    fn get(&self, column: &str) -> Option<&'a str> {
        self.sheet
            .column(column)
            .and_then(|i| self.cells.get(i))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

fn employee_from_row(row: &RowView<'_>) -> Result<NewEmployee, String> {
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| row.get(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing required values: {}", missing.join(", ")));
    }

    let email = row.get("email").unwrap_or_default();
    if !looks_like_email(email) {
        return Err(format!("Invalid email '{}'", email));
    }

    let mut salary = SalaryComponents::default();
    let mut any_salary = false;
    for column in SALARY_COLUMNS {
        let Some(raw) = row.get(column) else { continue };
        let amount: f64 = raw
            .replace(',', "")
            .parse()
            .map_err(|_| format!("Invalid number '{}' for {}", raw, column))?;
        let slot = match column {
            "basic_salary" => &mut salary.basic_salary,
            "hra" => &mut salary.hra,
            "lta" => &mut salary.lta,
            "variable_pay" => &mut salary.variable_pay,
            "bonuses" => &mut salary.bonuses,
            _ => &mut salary.other_allowances,
        };
        *slot = amount;
        any_salary = true;
    }
    if any_salary {
        salary.validate()?;
    }

    Ok(NewEmployee {
        employee_id: row.get("employee_id").unwrap_or_default().to_string(),
        name: row.get("name").unwrap_or_default().to_string(),
        email: Some(email.to_string()),
        phone: row.get("phone").map(str::to_string),
        designation: row.get("designation").map(str::to_string),
        department: row.get("department").map(str::to_string),
        join_date: row.get("join_date").map(parse_join_date).transpose()?,
        salary_components: any_salary.then_some(salary),
    })
}

/// Import employees from an uploaded spreadsheet
pub async fn import_employees(
    pool: &SqlitePool,
    file_name: &str,
    bytes: &[u8],
) -> ApiResult<ImportSummary> {
    let format = SheetFormat::from_file_name(file_name)?;
    let owned = bytes.to_vec();
    let sheet = tokio::task::spawn_blocking(move || read_sheet(format, &owned))
        .await
        .map_err(|e| ApiError::Internal(format!("Spreadsheet reader panicked: {}", e)))??;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| sheet.column(c).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(ApiError::InvalidInput(format!(
            "Missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut summary = ImportSummary::default();
    let mut tx = pool.begin().await?;

    for (i, cells) in sheet.rows.iter().enumerate() {
        let row = RowView {
            sheet: &sheet,
            cells,
        };
        let label = row.get("name").or_else(|| row.get("employee_id")).map(str::to_string);

        let employee = match employee_from_row(&row) {
            Ok(employee) => employee,
            Err(error) => {
                summary.errors.push(ImportRowError {
                    row: i + 1,
                    employee: label,
                    error,
                });
                continue;
            }
        };

        let outcome = create_employee(&mut tx, &employee)
            .await
            .map_err(|e| ApiError::PersistenceFailure(e.to_string()))?;
        match outcome {
            CreateOutcome::Created => summary.created_count += 1,
            CreateOutcome::Duplicate(DuplicateField::EmployeeId | DuplicateField::Email) => {
                summary.skipped_count += 1
            }
            CreateOutcome::Duplicate(field) => summary.errors.push(ImportRowError {
                row: i + 1,
                employee: label,
                error: format!("Employee with this {} already exists", field),
            }),
        }
    }

    tx.commit().await?;

    tracing::info!(
        file_name,
        created = summary.created_count,
        skipped = summary.skipped_count,
        errors = summary.errors.len(),
        "Employee import finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::employees::{get_employee, list_employees};
    use crate::db::test_pool;
    use crate::services::spreadsheet::tests::xlsx_bytes;

    #[test]
    fn test_parse_join_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(parse_join_date("2024-03-01").unwrap(), expected);
        assert_eq!(parse_join_date("01/03/2024").unwrap(), expected);
        assert_eq!(parse_join_date("2024-03-01 00:00:00").unwrap(), expected);
        // 45352 days after 1899-12-30
        assert_eq!(parse_join_date("45352").unwrap(), expected);
        assert!(parse_join_date("March first").is_err());
    }

    #[test]
    fn test_out_of_range_date_serial_is_rejected() {
        assert_eq!(
            parse_join_date("2958465").unwrap(),
            NaiveDate::from_ymd_opt(9999, 12, 31).unwrap()
        );
        assert_eq!(
            parse_join_date("99999999").unwrap_err(),
            "Invalid join_date '99999999'"
        );
        assert!(parse_join_date("1e300").is_err());
        assert!(parse_join_date("inf").is_err());
    }

    #[tokio::test]
    async fn test_huge_date_serial_is_a_row_error() {
        let pool = test_pool().await;
        let csv = "employee_id,name,email,join_date\nE-1,Anu,anu@example.com,99999999\nE-2,Ben,ben@example.com,45352\n";
        let summary = import_employees(&pool, "staff.csv", csv.as_bytes()).await.unwrap();

        assert_eq!(summary.created_count, 1);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].row, 1);
        assert!(summary.errors[0].error.contains("join_date"));
        assert!(get_employee(&pool, "E-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rejects_other_extensions() {
        let pool = test_pool().await;
        let err = import_employees(&pool, "staff.xls", b"anything").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_missing_required_columns() {
        let pool = test_pool().await;
        let err = import_employees(&pool, "staff.csv", b"Employee ID,Name\nE1,Anu\n")
            .await
            .unwrap_err();
        match err {
            ApiError::InvalidInput(msg) => assert_eq!(msg, "Missing required columns: email"),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_csv_import_counts() {
        let pool = test_pool().await;
        let csv = "\
Employee ID,Name,Email,Phone,Basic Salary,HRA,Join Date
E1,Anu,anu@example.com,9000000001,42000,16800,2024-03-01
E2,Ben,ben@example.com,,abc,,
E1,Anu Again,other@example.com,,,,
E3,Cara,anu@example.com,,,,
E4,Dev,dev@example.com,9000000001,,,
E5,,eve@example.com,,,,
,,,,,,
E6,Fay,not-an-email,,,,
";
        let summary = import_employees(&pool, "staff.csv", csv.as_bytes()).await.unwrap();

        assert_eq!(summary.created_count, 1);
        // Duplicate ID (E1) and duplicate email (E3)
        assert_eq!(summary.skipped_count, 2);
        let failing_rows: Vec<usize> = summary.errors.iter().map(|e| e.row).collect();
        // Blank row is dropped before numbering
        assert_eq!(failing_rows, vec![2, 5, 6, 7]);
        assert!(summary.errors[0].error.contains("basic_salary"));
        assert!(summary.errors[1].error.contains("phone"));
        assert_eq!(summary.errors[2].employee.as_deref(), Some("E5"));

        let anu = get_employee(&pool, "E1").await.unwrap().unwrap();
        assert_eq!(anu.join_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        let salary = anu.salary_components.unwrap();
        assert_eq!(salary.basic_salary, 42000.0);
        assert_eq!(salary.lta, 0.0);
        assert_eq!(anu.status, "active");
    }

    #[tokio::test]
    async fn test_xlsx_import() {
        let pool = test_pool().await;
        let rows = r#"<row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c><c r="C1" t="s"><v>2</v></c><c r="D1" t="s"><v>3</v></c></row><row r="2"><c r="A2" t="s"><v>4</v></c><c r="B2" t="inlineStr"><is><t>Gita</t></is></c><c r="C2" t="s"><v>5</v></c><c r="D2"><v>45352</v></c></row>"#;
        let bytes = xlsx_bytes(
            &["employee_id", "name", "email", "join_date", "E-10", "gita@example.com"],
            rows,
        );

        let summary = import_employees(&pool, "staff.xlsx", &bytes).await.unwrap();
        assert_eq!(summary.created_count, 1);
        assert!(summary.errors.is_empty());

        let all = list_employees(&pool).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "Gita");
        assert_eq!(all[0].join_date, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert!(all[0].salary_components.is_none());
    }
}
