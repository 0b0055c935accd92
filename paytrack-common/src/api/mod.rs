//! API types shared by the intake service and its clients

pub mod types;

pub use types::*;
