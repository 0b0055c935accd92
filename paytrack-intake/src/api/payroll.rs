//! Payroll workflow API handlers
//!
//! POST /payroll/upload-and-process, GET /payroll/status/:request_id,
//! GET /payroll/history/:employee_id, GET /agents

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use paytrack_common::api::{
    ContractRecord, JobStatusResponse, Stage, StageInfo, UploadResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use super::multipart::read_single_file;
use crate::error::{ApiError, ApiResult};
use crate::models::{PayrollJob, UploadedDocument};
use crate::services::upload_gateway::classify_upload;
use crate::{db, AppState};

/// Query string of the upload endpoint
#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    /// Respond only once the job is terminal
    #[serde(default)]
    pub wait: bool,
}

/// POST /api/v1/payroll/upload-and-process
///
/// Validates and parses the contract, persists contract and job, then runs
/// the remaining stages in a background task. The response is 202 at once,
/// or 200 once the task is done with `?wait=true`.
pub async fn upload_and_process(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<UploadResponse>)> {
    let file = read_single_file(multipart, &state.limits).await?;
    let kind = classify_upload(
        &file.file_name,
        file.content_type.as_deref(),
        file.bytes.len(),
        &state.limits,
    )?;

    tracing::debug!(
        file_name = %file.file_name,
        kind = ?kind,
        size = file.bytes.len(),
        "Upload accepted for parsing"
    );

    let document = UploadedDocument {
        file_name: file.file_name,
        kind,
        bytes: file.bytes,
    };
    let (contract, job) = state.gateway.accept(document).await?;
    let request_id = job.request_id();

    let response = UploadResponse {
        request_id,
        contract: contract.clone(),
        job: job.to_response(),
    };

    // The workflow owns its task; a dropped request only abandons the wait
    let workflow = tokio::spawn(async move {
        tracing::debug!(request_id = %request_id, "Background payroll workflow task started");
        let job = execute_payroll_workflow(state, job, contract).await;
        tracing::debug!(
            request_id = %request_id,
            status = %job.status(),
            "Background payroll workflow task finished"
        );
        job
    });

    if query.wait {
        let job = workflow.await.map_err(|e| {
            ApiError::Internal(format!("Payroll workflow {} did not finish: {}", request_id, e))
        })?;
        return Ok((
            StatusCode::OK,
            Json(UploadResponse {
                job: job.to_response(),
                ..response
            }),
        ));
    }

    Ok((StatusCode::ACCEPTED, Json(response)))
}

/// Run stages 2-5. If a transition cannot be persisted the job is marked
/// FAILED from its last stored snapshot so pollers always reach a terminal
/// state.
pub async fn execute_payroll_workflow(
    state: AppState,
    job: PayrollJob,
    contract: ContractRecord,
) -> PayrollJob {
    let request_id = job.request_id();
    let fallback = job.clone();

    let error = match state.orchestrator.execute(job, contract).await {
        Ok(job) => return job,
        Err(e) => e,
    };

    tracing::error!(request_id = %request_id, error = %error, "Payroll workflow aborted");
    state
        .record_error(format!("Payroll workflow {} aborted: {}", request_id, error))
        .await;

    let stored = match db::jobs::load_job(&state.db, request_id).await {
        Ok(Some(stored)) => stored,
        Ok(None) => fallback,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to reload job after abort");
            fallback
        }
    };

    match state
        .orchestrator
        .handle_failure(stored.clone(), &error.to_string())
        .await
    {
        Ok(job) => job,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to mark job as failed");
            stored
        }
    }
}

/// Unknown and malformed ids are both NotFound
fn parse_request_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(format!("Payroll job not found: {}", raw)))
}

/// GET /api/v1/payroll/status/:request_id
pub async fn get_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let request_id = parse_request_id(&request_id)?;

    let job = db::jobs::load_job(&state.db, request_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Payroll job not found: {}", request_id)))?;

    tracing::debug!(request_id = %request_id, status = %job.status(), "Status query");
    Ok(Json(job.to_response()))
}

/// GET /api/v1/payroll/history/:employee_id
///
/// Newest first; an employee without jobs gets an empty list.
pub async fn get_history(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> ApiResult<Json<Vec<JobStatusResponse>>> {
    let jobs = db::jobs::jobs_for_employee(&state.db, &employee_id).await?;
    Ok(Json(jobs.iter().map(PayrollJob::to_response).collect()))
}

/// GET /api/v1/agents
pub async fn list_agents() -> Json<Vec<StageInfo>> {
    Json(
        Stage::ALL
            .iter()
            .map(|stage| StageInfo {
                name: *stage,
                description: stage.description().to_string(),
                status: "active".to_string(),
            })
            .collect(),
    )
}

/// Build payroll workflow routes
pub fn payroll_routes() -> Router<AppState> {
    Router::new()
        .route("/payroll/upload-and-process", post(upload_and_process))
        .route("/payroll/status/:request_id", get(get_status))
        .route("/payroll/history/:employee_id", get(get_history))
        .route("/payroll/events", get(super::payroll_event_stream))
        .route("/agents", get(list_agents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_request_id_is_not_found() {
        assert!(matches!(parse_request_id("not-a-uuid"), Err(ApiError::NotFound(_))));
        let id = Uuid::new_v4();
        assert_eq!(parse_request_id(&id.to_string()).unwrap(), id);
    }

    #[tokio::test]
    async fn test_agents_in_stage_order() {
        let Json(agents) = list_agents().await;
        let names: Vec<Stage> = agents.iter().map(|a| a.name).collect();
        assert_eq!(names, Stage::ALL.to_vec());
        assert!(agents.iter().all(|a| a.status == "active"));
    }
}
