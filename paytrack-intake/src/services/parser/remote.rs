//! HTTP-backed contract parser
//!
//! Posts the raw document to an extraction service and expects
//! [`ContractFields`] JSON back. Any transport error, non-2xx status or
//! undecodable body is a parse failure.

use async_trait::async_trait;
use paytrack_common::api::ContractFields;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};

use super::{validate_fields, ContractParser, ParseError};
use crate::models::UploadedDocument;

/// Header carrying the original file name
pub const FILE_NAME_HEADER: &str = "x-file-name";

pub struct RemoteContractParser {
    client: reqwest::Client,
    url: String,
}

impl RemoteContractParser {
    const TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(url: impl Into<String>) -> Result<Self, ParseError> {
        let client = reqwest::Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(|e| ParseError::Remote(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ContractParser for RemoteContractParser {
    async fn parse(&self, document: &UploadedDocument) -> Result<ContractFields, ParseError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, document.kind.mime_type())
            .header(FILE_NAME_HEADER, &document.file_name)
            .body(document.bytes.clone())
            .send()
            .await
            .map_err(|e| ParseError::Remote(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, body = %body, "Remote parser rejected document");
            return Err(ParseError::Remote(format!("parser returned {}", status)));
        }

        let fields: ContractFields = response
            .json()
            .await
            .map_err(|e| ParseError::Remote(format!("undecodable response: {}", e)))?;

        validate_fields(&fields)?;

        let recognised = fields.employee_id.is_some()
            || fields.employee_name.is_some()
            || fields.salary_components.total() > 0.0;
        if !recognised {
            return Err(ParseError::NoRecognizedFields);
        }

        debug!(
            file_name = %document.file_name,
            employee_id = ?fields.employee_id,
            "Contract parsed remotely"
        );
        Ok(fields)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
