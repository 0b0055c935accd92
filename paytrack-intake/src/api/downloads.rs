//! Generated document downloads

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Plain file name inside the outputs folder: no separators, no parent or
/// hidden entries
fn safe_file_name(name: &str) -> ApiResult<&str> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..");
    if !valid {
        return Err(ApiError::InvalidInput(format!("Invalid file name: {}", name)));
    }
    Ok(name)
}

fn content_type_for(name: &str) -> &'static str {
    if name.ends_with(".txt") {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}

/// GET /api/v1/downloads/:file_name
pub async fn download(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let name = safe_file_name(&file_name)?;
    let path = state.outputs_dir.join(name);

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound(format!("File not found: {}", name)));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::debug!(file_name = %name, size = bytes.len(), "Serving generated document");
    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(name).to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub fn download_routes() -> Router<AppState> {
    Router::new().route("/downloads/:file_name", get(download))
}
