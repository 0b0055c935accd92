//! Employee persistence

use chrono::{NaiveDate, Utc};
use paytrack_common::api::{ContractRecord, Employee, NewEmployee, SalaryComponents};
use paytrack_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{parse_timestamp, timestamp};

/// Which unique field an insert collided with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateField {
    EmployeeId,
    Email,
    Phone,
}

impl std::fmt::Display for DuplicateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DuplicateField::EmployeeId => "employee ID",
            DuplicateField::Email => "email",
            DuplicateField::Phone => "phone",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    Duplicate(DuplicateField),
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// First unique field of `employee` that already exists
pub async fn find_duplicate(
    conn: &mut SqliteConnection,
    employee: &NewEmployee,
) -> Result<Option<DuplicateField>> {
    let checks = [
        (DuplicateField::EmployeeId, "employee_id", Some(employee.employee_id.trim())),
        (DuplicateField::Email, "email", non_empty(&employee.email)),
        (DuplicateField::Phone, "phone", non_empty(&employee.phone)),
    ];

    for (field, column, value) in checks {
        let Some(value) = value else { continue };
        let sql = format!("SELECT COUNT(*) FROM employees WHERE {} = ?", column);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(value)
            .fetch_one(&mut *conn)
            .await?;
        if count > 0 {
            return Ok(Some(field));
        }
    }
    Ok(None)
}

/// Insert an employee unless its id, email or phone is taken
pub async fn create_employee(
    conn: &mut SqliteConnection,
    employee: &NewEmployee,
) -> Result<CreateOutcome> {
    if let Some(field) = find_duplicate(conn, employee).await? {
        return Ok(CreateOutcome::Duplicate(field));
    }

    let salary_components = employee
        .salary_components
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT INTO employees (
            employee_id, name, email, phone, designation, department,
            join_date, salary_components, status, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'active', ?)
        "#,
    )
    .bind(employee.employee_id.trim())
    .bind(employee.name.trim())
    .bind(non_empty(&employee.email))
    .bind(non_empty(&employee.phone))
    .bind(non_empty(&employee.designation))
    .bind(non_empty(&employee.department))
    .bind(employee.join_date.map(|d| d.to_string()))
    .bind(salary_components)
    .bind(timestamp(Utc::now()))
    .execute(&mut *conn)
    .await?;

    Ok(CreateOutcome::Created)
}

/// Register the employee named by a contract if the id is new.
///
/// Returns `true` when a row was added. An email or phone already used by a
/// different employee leaves the store unchanged.
pub async fn register_from_contract(
    conn: &mut SqliteConnection,
    contract: &ContractRecord,
) -> Result<bool> {
    let employee = NewEmployee {
        employee_id: contract.employee_id.clone(),
        name: contract.employee_name.clone(),
        email: contract.employee_email.clone(),
        phone: contract.employee_phone.clone(),
        designation: Some(contract.designation.clone()),
        department: Some(contract.department.clone()),
        join_date: contract.join_date,
        salary_components: Some(contract.salary_components.clone()),
    };

    match create_employee(conn, &employee).await? {
        CreateOutcome::Created => Ok(true),
        CreateOutcome::Duplicate(_) => Ok(false),
    }
}

fn employee_from_row(row: &SqliteRow) -> Result<Employee> {
    let join_date: Option<String> = row.get("join_date");
    let join_date = join_date
        .map(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d"))
        .transpose()
        .map_err(|e| Error::Internal(format!("Invalid stored join_date: {}", e)))?;

    let salary_components: Option<String> = row.get("salary_components");
    let salary_components: Option<SalaryComponents> = salary_components
        .map(|s| serde_json::from_str(&s))
        .transpose()?;

    let created_at: String = row.get("created_at");

    Ok(Employee {
        employee_id: row.get("employee_id"),
        name: row.get("name"),
        email: row.get("email"),
        phone: row.get("phone"),
        designation: row.get("designation"),
        department: row.get("department"),
        join_date,
        salary_components,
        status: row.get("status"),
        created_at: parse_timestamp(&created_at)?,
    })
}

const EMPLOYEE_COLUMNS: &str = "employee_id, name, email, phone, designation, department, \
                                join_date, salary_components, status, created_at";

pub async fn get_employee(pool: &SqlitePool, employee_id: &str) -> Result<Option<Employee>> {
    let sql = format!("SELECT {} FROM employees WHERE employee_id = ?", EMPLOYEE_COLUMNS);
    let row = sqlx::query(&sql)
        .bind(employee_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(employee_from_row).transpose()
}

/// All employees in insertion order
pub async fn list_employees(pool: &SqlitePool) -> Result<Vec<Employee>> {
    let sql = format!("SELECT {} FROM employees ORDER BY rowid", EMPLOYEE_COLUMNS);
    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter().map(employee_from_row).collect()
}

pub async fn count_employees(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await?)
}
