//! Client-side upload session state
//!
//! Holds the files queued for upload, the phase of the current upload and the
//! last result. Nothing here is global: each caller owns its session.

use paytrack_common::api::JobStatusResponse;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Upload phase
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Succeeded,
    /// Message shown to the user as-is
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No files selected")]
    NoFiles,

    #[error("An upload is already in progress")]
    Busy,

    #[error("No upload is in progress")]
    NotLoading,
}

#[derive(Debug, Clone, Default)]
pub struct UploadSession {
    files: Vec<PathBuf>,
    phase: Phase,
    last_result: Option<JobStatusResponse>,
}

impl UploadSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn last_result(&self) -> Option<&JobStatusResponse> {
        self.last_result.as_ref()
    }

    /// Queue a file. Returns `false` if it is already queued.
    pub fn add_file(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.files.contains(&path) {
            return false;
        }
        self.files.push(path);
        true
    }

    /// Drop a queued file. Returns `false` if it was not queued.
    pub fn remove_file(&mut self, path: &Path) -> bool {
        let before = self.files.len();
        self.files.retain(|f| f != path);
        self.files.len() != before
    }

    /// Enter Loading; returns the files to send in queue order
    pub fn begin(&mut self) -> Result<Vec<PathBuf>, SessionError> {
        if self.phase == Phase::Loading {
            return Err(SessionError::Busy);
        }
        if self.files.is_empty() {
            return Err(SessionError::NoFiles);
        }
        self.phase = Phase::Loading;
        Ok(self.files.clone())
    }

    pub fn succeed(&mut self, result: JobStatusResponse) -> Result<(), SessionError> {
        if self.phase != Phase::Loading {
            return Err(SessionError::NotLoading);
        }
        self.phase = Phase::Succeeded;
        self.last_result = Some(result);
        Ok(())
    }

    /// Record a failure; the queued files stay so the user can retry
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        if self.phase != Phase::Loading {
            return Err(SessionError::NotLoading);
        }
        self.phase = Phase::Failed(message.into());
        Ok(())
    }

    /// After a success has been shown: clear the queue and return to Idle.
    /// Ignored in any other phase.
    pub fn acknowledge(&mut self) {
        if self.phase == Phase::Succeeded {
            self.files.clear();
            self.phase = Phase::Idle;
        }
    }

    /// Discard everything, including the last result
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
