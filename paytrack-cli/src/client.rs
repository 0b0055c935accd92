//! HTTP client for the intake service
//!
//! Error responses carry `{"error": {"code", "message"}}`; the message is
//! surfaced verbatim so the user sees exactly what the service said.

use paytrack_common::api::{
    CreateEmployeeResponse, DashboardSummary, Employee, EmployeeImportResponse, ErrorResponse,
    JobStatusResponse, NewEmployee, StageInfo, UploadResponse,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

const API_PREFIX: &str = "/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The service could not be reached
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response; `message` is the service's own text
    #[error("{message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// The response body did not match the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    #[error("Cannot read {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND.as_u16())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

/// Content type sent for an upload, by extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Intake service client
#[derive(Debug, Clone)]
pub struct IntakeClient {
    http: reqwest::Client,
    base_url: String,
}

impl IntakeClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, API_PREFIX, path)
    }

    /// Decode a success body, or turn an error body into [`ClientError::Api`]
    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn api_error(response: Response) -> ClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(err) => ClientError::Api {
                status: status.as_u16(),
                code: err.error.code,
                message: err.error.message,
            },
            Err(_) => ClientError::Api {
                status: status.as_u16(),
                code: "HTTP_ERROR".to_string(),
                message: if body.trim().is_empty() {
                    format!("Request failed with status {}", status)
                } else {
                    body
                },
            },
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.api_url(path)).send().await?;
        Self::decode(response).await
    }

    fn file_part(file_name: &str, bytes: Vec<u8>) -> Result<Part, ClientError> {
        Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type_for(file_name))
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    async fn read_file(path: &Path) -> Result<(String, Vec<u8>), ClientError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| ClientError::File {
            path: path.display().to_string(),
            source,
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok((file_name, bytes))
    }

    /// POST /payroll/upload-and-process with in-memory contents
    pub async fn upload_bytes(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        wait: bool,
    ) -> Result<UploadResponse, ClientError> {
        let form = Form::new().part("file", Self::file_part(file_name, bytes)?);
        let mut url = self.api_url("/payroll/upload-and-process");
        if wait {
            url.push_str("?wait=true");
        }
        tracing::debug!(file_name, wait, "Uploading contract");
        let response = self.http.post(url).multipart(form).send().await?;
        Self::decode(response).await
    }

    /// Upload a contract file from disk
    pub async fn upload(&self, path: &Path, wait: bool) -> Result<UploadResponse, ClientError> {
        let (file_name, bytes) = Self::read_file(path).await?;
        self.upload_bytes(&file_name, bytes, wait).await
    }

    pub async fn status(&self, request_id: Uuid) -> Result<JobStatusResponse, ClientError> {
        self.get(&format!("/payroll/status/{}", request_id)).await
    }

    pub async fn history(&self, employee_id: &str) -> Result<Vec<JobStatusResponse>, ClientError> {
        self.get(&format!("/payroll/history/{}", employee_id)).await
    }

    pub async fn agents(&self) -> Result<Vec<StageInfo>, ClientError> {
        self.get("/agents").await
    }

    pub async fn dashboard(&self) -> Result<DashboardSummary, ClientError> {
        self.get("/dashboard/summary").await
    }

    pub async fn employees(&self) -> Result<Vec<Employee>, ClientError> {
        self.get("/employees").await
    }

    pub async fn employee(&self, employee_id: &str) -> Result<Employee, ClientError> {
        self.get(&format!("/employees/{}", employee_id)).await
    }

    pub async fn create_employee(
        &self,
        employee: &NewEmployee,
    ) -> Result<CreateEmployeeResponse, ClientError> {
        let response = self
            .http
            .post(self.api_url("/employees"))
            .json(employee)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// POST /employees/import with a .csv or .xlsx file
    pub async fn import_employees(&self, path: &Path) -> Result<EmployeeImportResponse, ClientError> {
        let (file_name, bytes) = Self::read_file(path).await?;
        let form = Form::new().part("file", Self::file_part(&file_name, bytes)?);
        let response = self
            .http
            .post(self.api_url("/employees/import"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetch a generated document by its artifact URL (`/api/v1/downloads/...`)
    pub async fn download(&self, artifact_url: &str) -> Result<Vec<u8>, ClientError> {
        let url = if artifact_url.starts_with("http://") || artifact_url.starts_with("https://") {
            artifact_url.to_string()
        } else {
            format!("{}{}", self.base_url, artifact_url)
        };
        let response = self.http.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(response.bytes().await?.to_vec())
    }

    /// GET /health (root, outside the API prefix)
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }
}
