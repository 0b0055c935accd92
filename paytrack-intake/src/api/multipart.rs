//! Single-file multipart extraction shared by the upload endpoints

use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::http::StatusCode;

use crate::error::{ApiError, ApiResult};
use crate::services::UploadLimits;

/// Form field carrying the uploaded file
pub const FILE_FIELD: &str = "file";

/// The one file of a multipart request
#[derive(Debug)]
pub struct ReceivedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError, limits: &UploadLimits) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::InvalidInput(format!(
            "File exceeds the maximum upload size of {} bytes",
            limits.max_bytes
        ));
    }
    ApiError::InvalidInput(format!("Malformed multipart body: {}", err.body_text()))
}

/// Read exactly one `file` field, enforcing the size ceiling while streaming.
///
/// Zero file fields, or more than one, is InvalidInput. Other form fields
/// are ignored.
pub async fn read_single_file(
    multipart: Result<Multipart, MultipartRejection>,
    limits: &UploadLimits,
) -> ApiResult<ReceivedFile> {
    let mut multipart = multipart.map_err(|e| {
        ApiError::InvalidInput(format!("Expected a multipart/form-data upload: {}", e.body_text()))
    })?;

    let mut received: Option<ReceivedFile> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limits))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if received.is_some() {
            return Err(ApiError::InvalidInput(
                "Exactly one file must be uploaded per request".to_string(),
            ));
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field.content_type().map(str::to_string);

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error(e, limits))?
        {
            limits.check_size(bytes.len() + chunk.len())?;
            bytes.extend_from_slice(&chunk);
        }

        received = Some(ReceivedFile {
            file_name,
            content_type,
            bytes,
        });
    }

    received.ok_or_else(|| {
        ApiError::InvalidInput(format!("No file uploaded (expected form field '{}')", FILE_FIELD))
    })
}
