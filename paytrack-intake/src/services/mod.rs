//! Business logic services

pub mod anomaly_detector;
pub mod compliance_mapper;
pub mod document_generator;
pub mod employee_importer;
pub mod parser;
pub mod salary_calculator;
pub mod spreadsheet;
pub mod statutory;
pub mod upload_gateway;
pub mod workflow_orchestrator;

pub use parser::{
    build_parser, ContractParser, LocalContractParser, ParseError, RemoteContractParser, FILE_NAME_HEADER,
};
pub use upload_gateway::{UploadGateway, UploadLimits};
pub use workflow_orchestrator::WorkflowOrchestrator;

use thiserror::Error;

/// Failure inside a pipeline stage. The message becomes the stage error text.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not available")]
    MissingInput(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
