//! # PayTrack Common Library
//!
//! Shared code for the PayTrack intake service and its client:
//! - API request/response types (contracts, payroll jobs, dashboard)
//! - Event types and the broadcast event bus
//! - Configuration loading and root folder resolution
//! - Logging initialisation

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
