//! Shared application service layer for twintank.
//!
//! The CLI talks to the engine only through this crate: scenario files in,
//! cached runs and tuning results out.

pub mod error;
pub mod progress;
pub mod project_service;
pub mod run_service;
pub mod runtime;
pub mod tuning_service;

pub use error::{AppError, AppResult};
pub use progress::{RunProgressEvent, RunStage, SimProgress};
pub use project_service::{init_scenario, load_scenario, save_scenario, validate_scenario};
pub use run_service::{
    ClosedLoopRun, RunOptions, RunRequest, RunResponse, ensure_run, ensure_run_with_progress,
    export_run_csv, list_runs, load_run, simulate_closed_loop,
};
pub use runtime::{EventSchedule, apply_action, build_context};
pub use tuning_service::{
    AutotuneRequest, AutotuneResponse, TuningRun, ensure_autotune, ensure_autotune_with_progress,
    simulate_relay_tuning,
};
