//! PayTrack client library
//!
//! - [`IntakeClient`]: HTTP client for every intake endpoint
//! - [`UploadSession`]: queued files, upload phase and last result
//! - [`Poller`]: fixed-interval status polling until a terminal state

pub mod client;
pub mod poll;
pub mod session;

pub use client::{ClientError, IntakeClient};
pub use poll::{PollError, Poller};
pub use session::{Phase, SessionError, UploadSession};
