//! Dashboard summary endpoint

use axum::{extract::State, routing::get, Json, Router};
use paytrack_common::api::DashboardSummary;

use crate::error::ApiResult;
use crate::{db, AppState};

/// GET /api/v1/dashboard/summary
pub async fn get_summary(State(state): State<AppState>) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(db::dashboard::summary(&state.db).await?))
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard/summary", get(get_summary))
}
