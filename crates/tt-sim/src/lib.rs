//! Plant model and fixed-step simulation loop for the twintank system.
//!
//! Provides:
//! - Two-tank nonlinear level dynamics with valve outflows and interconnect
//! - Pluggable fixed-step integrators (forward Euler by default, RK4)
//! - One-shot outflow disturbance on tank 2
//! - `SimulationContext`: plant + controllers + relay tuner, one tick at a time

pub mod context;
pub mod error;
pub mod integrator;
pub mod model;
pub mod plant;

pub use context::{ControllerKind, LoopOptions, SimulationContext, TickSnapshot, TuningReport};
pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, IntegratorType, RK4};
pub use model::TransientModel;
pub use plant::{
    Disturbance, DisturbanceConfig, LevelSaturation, Levels, Outflows, PlantModel,
    PlantParameters, PlantState, interconnect_flow, tank_outflow,
};
