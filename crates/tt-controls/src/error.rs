//! Error types for control system operations.

use thiserror::Error;

/// Result type for control system operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building or driving controllers.
///
/// Runtime conditions of the control loop (bad time steps, saturation,
/// degenerate fuzzy sets, tuning timeouts) are not errors; they are reported
/// through state and counters instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid argument provided to a control function.
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Membership function breakpoints are not ordered `a <= b <= c`.
    #[error("Invalid membership function ({a}, {b}, {c}): breakpoints must satisfy a <= b <= c")]
    InvalidMembership { a: f64, b: f64, c: f64 },

    /// Rule table does not cover every (error, change) pair exactly once.
    #[error("Incomplete rule table: {what}")]
    RuleCoverage { what: String },

    /// Operation not allowed in the current state.
    #[error("Controller state error: {what}")]
    StateError { what: String },
}
