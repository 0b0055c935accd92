//! Error types for paytrack-intake
//!
//! Every failure reaches the client as an HTTP status plus
//! `{"error": {"code", "message"}}`; the message is displayed verbatim.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use paytrack_common::api::{ErrorDetail, ErrorResponse};
use thiserror::Error;

use crate::models::TransitionError;
use crate::services::parser::ParseError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, oversized or disallowed upload; malformed request (400)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Parser errored or produced unusable output (422)
    #[error("Failed to parse contract: {0}")]
    ParseFailure(String),

    /// Unknown request id, employee or file (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate employee id, email or phone (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Store write failed (500)
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// paytrack-common error
    #[error("{0}")]
    Common(#[from] paytrack_common::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::PersistenceFailure(err.to_string())
    }
}

impl From<ParseError> for ApiError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::UnsupportedFormat(msg) => ApiError::InvalidInput(msg),
            other => ApiError::ParseFailure(other.to_string()),
        }
    }
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
            ApiError::ParseFailure(_) => (StatusCode::UNPROCESSABLE_ENTITY, "PARSE_FAILURE"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            ApiError::PersistenceFailure(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILURE")
            }
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            ApiError::Common(err) => match err {
                paytrack_common::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                paytrack_common::Error::InvalidInput(_) => {
                    (StatusCode::BAD_REQUEST, "INVALID_INPUT")
                }
                paytrack_common::Error::Database(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_FAILURE")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "Request failed");
        } else {
            tracing::debug!(code, error = %self, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        });

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
