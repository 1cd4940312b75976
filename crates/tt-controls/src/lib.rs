//! Controllers and relay auto-tuning for the twintank plant.
//!
//! This crate holds everything that turns a measured tank level into an
//! inflow command. It knows nothing about the plant itself: every controller
//! is fed a process variable and a time step and answers with a clamped
//! output.
//!
//! # Architecture
//!
//! - [`PidController`]: classical PID with integral clamping and output clamping
//! - [`FuzzyGainScheduler`]: Mamdani inference from (error, error rate) to gains
//! - [`FuzzyPidController`]: the PID law driven by freshly scheduled gains
//! - [`RelayAutoTuner`]: relay-feedback experiment yielding Ku/Tu and
//!   Ziegler–Nichols gains
//!
//! Both controllers share one discrete PID law ([`controller::pid_law`]) so
//! the clamping invariants are enforced in a single place.

pub mod autotune;
pub mod controller;
pub mod error;
pub mod fuzzy;
pub mod fuzzy_pid;
pub mod pid;
pub mod ziegler_nichols;

pub use autotune::{
    OscillationEvent, RelayAutoTuner, RelayState, RelayTunerConfig, TunerPhase, TuningFailure,
    TuningResult,
};
pub use controller::{Controller, ControllerSaturation, OutputLimits, PidGains, PidState, StepSaturation};
pub use error::{ControlError, ControlResult};
pub use fuzzy::{
    FuzzyGainScheduler, FuzzyVariable, GainConsequent, LinguisticTerm, RuleEntry, RuleTable,
    Schedule, TriangularMf, Universe,
};
pub use fuzzy_pid::FuzzyPidController;
pub use pid::PidController;
