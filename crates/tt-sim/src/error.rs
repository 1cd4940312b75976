//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered while building or stepping the plant and loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid time step: dt = {dt} (must be positive and finite)")]
    InvalidTimestep { dt: f64 },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Operation not allowed: {what}")]
    InvalidState { what: &'static str },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<tt_controls::ControlError> for SimError {
    fn from(e: tt_controls::ControlError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

/// Reject a non-positive or non-finite time step.
pub(crate) fn check_timestep(dt: f64) -> SimResult<f64> {
    if dt > 0.0 && dt.is_finite() {
        Ok(dt)
    } else {
        Err(SimError::InvalidTimestep { dt })
    }
}
