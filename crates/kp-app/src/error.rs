//! Error types for the kp-app service layer.

use std::path::PathBuf;

use kp_core::{ItemId, ScenarioId};

/// Application error type wrapping the backend crates' errors behind one
/// interface for the CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Plan error: {0}")]
    Project(String),

    #[error("Failed to read plan file: {path}")]
    PlanFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write plan file: {path}")]
    PlanFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Plan validation failed: {0}")]
    Validation(String),

    #[error("Scenario error: {0}")]
    Scenario(#[from] kp_scenario::TreeError),

    #[error("No scenario selected")]
    NoScenarioSelected,

    #[error("Item {item} is not part of scenario {scenario}")]
    ItemNotFound { scenario: ScenarioId, item: ItemId },

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for kp-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<kp_project::ProjectError> for AppError {
    fn from(err: kp_project::ProjectError) -> Self {
        match err {
            kp_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Project(other.to_string()),
        }
    }
}

impl From<kp_project::ValidationError> for AppError {
    fn from(err: kp_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<kp_core::KpError> for AppError {
    fn from(err: kp_core::KpError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}
