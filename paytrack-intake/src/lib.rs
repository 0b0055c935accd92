//! paytrack-intake library interface
//!
//! Exposes the router and services for integration testing

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use paytrack_common::events::EventBus;
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::IntakeSettings;
use crate::models::ContractDefaults;
use crate::services::{ContractParser, UploadGateway, UploadLimits, WorkflowOrchestrator};

/// Multipart framing allowance on top of the file size ceiling
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub event_bus: EventBus,
    pub gateway: UploadGateway,
    pub orchestrator: WorkflowOrchestrator,
    pub limits: UploadLimits,
    /// Generated payslips and tax summaries, served under /downloads
    pub outputs_dir: PathBuf,
    pub startup_time: DateTime<Utc>,
    /// Last background failure, reported by /health
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        event_bus: EventBus,
        parser: Arc<dyn ContractParser>,
        settings: &IntakeSettings,
        uploads_dir: PathBuf,
        outputs_dir: PathBuf,
    ) -> Self {
        let defaults = ContractDefaults {
            region: settings.default_region.clone(),
            currency: settings.default_currency.clone(),
        };
        let gateway = UploadGateway::new(
            db.clone(),
            event_bus.clone(),
            parser,
            uploads_dir,
            defaults,
        );
        let orchestrator =
            WorkflowOrchestrator::new(db.clone(), event_bus.clone(), outputs_dir.clone());

        Self {
            db,
            event_bus,
            gateway,
            orchestrator,
            limits: UploadLimits {
                max_bytes: settings.max_upload_usize(),
            },
            outputs_dir,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember a background failure for diagnostics
    pub async fn record_error(&self, message: String) {
        *self.last_error.write().await = Some(message);
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    }
}

/// Build application router
pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    // The handler enforces the real ceiling so oversize uploads get a 400
    let body_limit = state.limits.max_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .merge(api::payroll_routes())
        .merge(api::employee_routes())
        .merge(api::dashboard_routes())
        .merge(api::download_routes());

    Router::new()
        .nest("/api/v1", api)
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
