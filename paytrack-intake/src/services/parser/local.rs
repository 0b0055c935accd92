//! In-process contract parser

use async_trait::async_trait;
use paytrack_common::api::ContractFields;
use tracing::debug;

use super::{extract_text, recognize_fields, validate_fields, ContractParser, ParseError};
use crate::models::UploadedDocument;

/// Extracts text locally and recognises labelled fields
#[derive(Debug, Default, Clone)]
pub struct LocalContractParser;

impl LocalContractParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContractParser for LocalContractParser {
    async fn parse(&self, document: &UploadedDocument) -> Result<ContractFields, ParseError> {
        let kind = document.kind;
        let bytes = document.bytes.clone();

        // ZIP inflation and regex scans are CPU-bound
        let fields = tokio::task::spawn_blocking(move || {
            let text = extract_text(kind, &bytes)?;
            recognize_fields(&text)
        })
        .await
        .map_err(|e| ParseError::Extraction(format!("parser task failed: {}", e)))??;

        validate_fields(&fields)?;

        debug!(
            file_name = %document.file_name,
            employee_id = ?fields.employee_id,
            basic_salary = fields.salary_components.basic_salary,
            "Contract parsed locally"
        );
        Ok(fields)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
