//! Process-level errors and exit codes.

use std::path::PathBuf;

use arkmailer_core::SyncError;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors that end a run early.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("another run holds the lock file {}", path.display())]
    LockHeld { path: PathBuf },

    #[error("setup failed: {0}")]
    Setup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl AppError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Setup(_) | AppError::Io(_) => 1,
            AppError::Sync(SyncError::Configuration { .. }) => 1,
            AppError::Sync(_) => 2,
            AppError::LockHeld { .. } => 3,
        }
    }
}

/// Result type for the binary.
pub type AppResult<T> = Result<T, AppError>;
