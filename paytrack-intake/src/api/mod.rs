//! HTTP API handlers for paytrack-intake

pub mod dashboard;
pub mod downloads;
pub mod employees;
pub mod health;
pub mod multipart;
pub mod payroll;
pub mod sse;

pub use dashboard::dashboard_routes;
pub use downloads::download_routes;
pub use employees::employee_routes;
pub use health::health_routes;
pub use payroll::payroll_routes;
pub use sse::payroll_event_stream;
