//! Error types for the tt-app service layer.

use std::path::PathBuf;

/// Unified error for the CLI; backend errors are carried as their messages.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Scenario(String),

    #[error("Scenario file already exists: {path}")]
    ScenarioExists { path: PathBuf },

    #[error("Failed to write {path}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Scenario validation failed: {0}")]
    Validation(String),

    #[error("Controller setup failed: {0}")]
    Control(String),

    #[error("Simulation error: {0}")]
    Simulation(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<tt_project::ProjectError> for AppError {
    fn from(err: tt_project::ProjectError) -> Self {
        match err {
            tt_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Scenario(other.to_string()),
        }
    }
}

impl From<tt_project::ValidationError> for AppError {
    fn from(err: tt_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<tt_controls::ControlError> for AppError {
    fn from(err: tt_controls::ControlError) -> Self {
        AppError::Control(err.to_string())
    }
}

impl From<tt_sim::SimError> for AppError {
    fn from(err: tt_sim::SimError) -> Self {
        AppError::Simulation(err.to_string())
    }
}

impl From<tt_results::ResultsError> for AppError {
    fn from(err: tt_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
