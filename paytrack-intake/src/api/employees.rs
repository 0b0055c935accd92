//! Employee API handlers
//!
//! POST /employees, GET /employees, GET /employees/:employee_id,
//! POST /employees/import

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use paytrack_common::api::{
    CreateEmployeeResponse, Employee, EmployeeImportResponse, NewEmployee,
};

use super::multipart::read_single_file;
use crate::db::employees::{self, CreateOutcome};
use crate::error::{ApiError, ApiResult};
use crate::services::employee_importer::import_employees;
use crate::AppState;

fn validate_new_employee(employee: &NewEmployee) -> ApiResult<()> {
    if employee.employee_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("employee_id is required".to_string()));
    }
    if employee.name.trim().is_empty() {
        return Err(ApiError::InvalidInput("name is required".to_string()));
    }
    if let Some(components) = &employee.salary_components {
        components.validate().map_err(ApiError::InvalidInput)?;
    }
    Ok(())
}

/// POST /api/v1/employees
pub async fn create_employee(
    State(state): State<AppState>,
    body: Result<Json<NewEmployee>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateEmployeeResponse>)> {
    let Json(employee) = body.map_err(|e| ApiError::InvalidInput(e.body_text()))?;
    validate_new_employee(&employee)?;

    let mut conn = state.db.acquire().await?;
    match employees::create_employee(&mut conn, &employee).await? {
        CreateOutcome::Created => {
            tracing::info!(employee_id = %employee.employee_id, "Employee created");
            Ok((
                StatusCode::CREATED,
                Json(CreateEmployeeResponse {
                    success: true,
                    employee_id: employee.employee_id.trim().to_string(),
                    message: "Employee created successfully".to_string(),
                }),
            ))
        }
        CreateOutcome::Duplicate(field) => Err(ApiError::Conflict(format!(
            "Employee with this {} already exists",
            field
        ))),
    }
}

/// GET /api/v1/employees
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Json<Vec<Employee>>> {
    Ok(Json(employees::list_employees(&state.db).await?))
}

/// GET /api/v1/employees/:employee_id
pub async fn get_employee(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<Employee>> {
    employees::get_employee(&state.db, &employee_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Employee not found: {}", employee_id)))
}

/// POST /api/v1/employees/import
pub async fn import(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<EmployeeImportResponse>> {
    let file = read_single_file(multipart, &state.limits).await?;
    let details = import_employees(&state.db, &file.file_name, &file.bytes).await?;

    Ok(Json(EmployeeImportResponse {
        success: true,
        message: "Employee import process completed.".to_string(),
        details,
    }))
}

/// Build employee routes
pub fn employee_routes() -> Router<AppState> {
    Router::new()
        .route("/employees", post(create_employee).get(list_employees))
        .route("/employees/import", post(import))
        .route("/employees/:employee_id", get(get_employee))
}

#[cfg(test)]
mod tests {
    use super::*;
    use paytrack_common::api::SalaryComponents;

    #[test]
    fn test_validate_new_employee() {
        let mut employee = NewEmployee {
            employee_id: "E1".to_string(),
            name: "Anu".to_string(),
            ..Default::default()
        };
        assert!(validate_new_employee(&employee).is_ok());

        employee.salary_components = Some(SalaryComponents {
            hra: -1.0,
            ..Default::default()
        });
        assert!(matches!(
            validate_new_employee(&employee),
            Err(ApiError::InvalidInput(_))
        ));

        employee.salary_components = None;
        employee.name = "  ".to_string();
        assert!(validate_new_employee(&employee).is_err());
    }
}
