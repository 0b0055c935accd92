//! Domain models for paytrack-intake

pub mod contract;
pub mod payroll_job;

pub use contract::{ContractDefaults, UploadedDocument};
pub use payroll_job::{PayrollJob, TransitionError};
