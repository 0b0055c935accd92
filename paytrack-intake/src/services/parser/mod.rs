//! Contract parser capability
//!
//! The gateway only sees [`ContractParser`]: give it a document, get back
//! [`ContractFields`] or a [`ParseError`]. Two implementations exist:
//! [`LocalContractParser`] extracts text in-process and recognises labelled
//! fields; [`RemoteContractParser`] delegates to an HTTP extraction service.

mod extract;
mod fields;
mod local;
mod remote;

pub use extract::extract_text;
pub use fields::recognize_fields;
pub use local::LocalContractParser;
pub use remote::{RemoteContractParser, FILE_NAME_HEADER};

use async_trait::async_trait;
use std::sync::Arc;
use paytrack_common::api::ContractFields;
use thiserror::Error;

use crate::models::UploadedDocument;

/// Why a document could not be turned into contract fields
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// The parser does not handle this document type
    #[error("Unsupported document type: {0}")]
    UnsupportedFormat(String),

    /// Text extraction produced nothing
    #[error("Document contains no readable text")]
    EmptyDocument,

    /// The container or content stream is corrupt or unreadable
    #[error("Could not extract text: {0}")]
    Extraction(String),

    /// Text was read but no contract field was recognised
    #[error("No contract fields recognised in document")]
    NoRecognizedFields,

    /// A field was recognised with an unusable value
    #[error("Invalid field: {0}")]
    InvalidField(String),

    /// The remote parser failed or returned unusable output
    #[error("Remote parser error: {0}")]
    Remote(String),
}

/// Turns an uploaded document into structured contract fields
#[async_trait]
pub trait ContractParser: Send + Sync {
    async fn parse(&self, document: &UploadedDocument) -> Result<ContractFields, ParseError>;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}

/// Checks shared by every parser implementation
pub(crate) fn validate_fields(fields: &ContractFields) -> Result<(), ParseError> {
    fields
        .salary_components
        .validate()
        .map_err(ParseError::InvalidField)
}

/// Parser for the configured deployment: remote when a parser URL is set,
/// otherwise local extraction
pub fn build_parser(parser_url: Option<&str>) -> Result<Arc<dyn ContractParser>, ParseError> {
    match parser_url.map(str::trim).filter(|u| !u.is_empty()) {
        Some(url) => Ok(Arc::new(RemoteContractParser::new(url)?)),
        None => Ok(Arc::new(LocalContractParser::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_parser_selects_implementation() {
        assert_eq!(build_parser(None).unwrap().name(), "local");
        assert_eq!(build_parser(Some("  ")).unwrap().name(), "local");
        assert_eq!(
            build_parser(Some("http://localhost:9000/parse")).unwrap().name(),
            "remote"
        );
    }
}
