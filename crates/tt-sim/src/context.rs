//! The fixed-step simulation loop.
//!
//! [`SimulationContext`] owns the plant, both controllers and the relay
//! tuner. Each tick either the relay tuner (while an experiment is running)
//! or the active controller computes the inflow to tank 1 from the level of
//! tank 2, the plant advances, and simulation time moves on by `dt`.

use crate::error::{SimError, SimResult, check_timestep};
use crate::plant::{PlantModel, PlantState};
use serde::{Deserialize, Serialize};
use tt_controls::{
    Controller, FuzzyPidController, PidController, PidGains, RelayAutoTuner, TunerPhase,
    ziegler_nichols,
};

/// Which controller drives the plant outside of tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerKind {
    #[default]
    Pid,
    Fuzzy,
}

impl std::fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControllerKind::Pid => f.write_str("PID"),
            ControllerKind::Fuzzy => f.write_str("fuzzy PID"),
        }
    }
}

/// Fixed-step loop settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopOptions {
    /// Tick length (s).
    pub dt: f64,
    /// Ticks run per [`SimulationContext::frame`].
    pub simulation_speed: u32,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            dt: 0.1,
            simulation_speed: 1,
        }
    }
}

impl LoopOptions {
    pub fn validate(&self) -> SimResult<()> {
        check_timestep(self.dt)?;
        if self.simulation_speed == 0 {
            return Err(SimError::InvalidArg {
                what: "simulation_speed must be at least 1",
            });
        }
        Ok(())
    }
}

/// State visible to hosts after a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub time: f64,
    pub setpoint: f64,
    pub h1: f64,
    pub h2: f64,
    /// Inflow applied to tank 1 on the last tick (cm³/s).
    pub controller_output: f64,
    pub disturbance_active: bool,
    pub tuner_phase: TunerPhase,
    pub tuner_status: String,
}

/// Outcome of a completed relay experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningReport {
    pub ku: f64,
    pub tu: f64,
    /// Measured oscillation amplitude (cm).
    pub amplitude: f64,
    /// Ziegler–Nichols gains written into the PID controller.
    pub gains: PidGains,
}

/// Plant, controllers and relay tuner advanced together one tick at a time.
#[derive(Debug, Clone)]
pub struct SimulationContext {
    plant: PlantModel,
    pid: PidController,
    fuzzy: FuzzyPidController,
    tuner: RelayAutoTuner,
    active: ControllerKind,
    setpoint: f64,
    options: LoopOptions,
    time: f64,
    running: bool,
    last_output: f64,
    tuning_report: Option<TuningReport>,
}

impl SimulationContext {
    /// Assemble a context. Both controllers are moved to the PID's setpoint.
    pub fn new(
        plant: PlantModel,
        mut pid: PidController,
        mut fuzzy: FuzzyPidController,
        tuner: RelayAutoTuner,
        options: LoopOptions,
    ) -> SimResult<Self> {
        options.validate()?;
        let setpoint = pid.set_point();
        pid.reset();
        fuzzy.set_setpoint(setpoint);
        Ok(Self {
            plant,
            pid,
            fuzzy,
            tuner,
            active: ControllerKind::default(),
            setpoint,
            options,
            time: 0.0,
            running: false,
            last_output: 0.0,
            tuning_report: None,
        })
    }

    /// Default plant, PID gains 83.5/14.5/120, setpoint 25 cm, dt 0.1 s.
    pub fn with_defaults() -> SimResult<Self> {
        let limits = tt_controls::OutputLimits::default();
        Self::new(
            PlantModel::default(),
            PidController::new(PidGains::default(), 25.0, limits),
            FuzzyPidController::new(25.0, limits)?,
            RelayAutoTuner::default(),
            LoopOptions::default(),
        )
    }

    /// Advance one tick of `dt` seconds.
    ///
    /// Works whether or not the context is running; [`Self::frame`] is the
    /// entry point that honours start/stop.
    pub fn step(&mut self, dt: f64) -> SimResult<TickSnapshot> {
        let dt = check_timestep(dt)?;

        if self.tuner.is_running() {
            self.tuning_tick(dt)?;
        } else {
            let pv = self.plant.state().h2;
            let output = self.controller_mut().update(pv, dt);
            self.plant.advance(output, 0.0, dt, self.time)?;
            self.last_output = output;
        }

        self.time += dt;
        Ok(self.snapshot())
    }

    fn tuning_tick(&mut self, dt: f64) -> SimResult<()> {
        let level = self.plant.state().h2;
        if let Some(inflow) = self.tuner.step(level, self.time) {
            self.plant.advance(inflow, 0.0, dt, self.time)?;
            self.last_output = inflow;
        }

        match self.tuner.phase() {
            TunerPhase::Completed => {
                if let Some(result) = self.tuner.result().copied() {
                    let gains = ziegler_nichols::no_overshoot(&result);
                    self.pid.set_gains(gains);
                    self.tuning_report = Some(TuningReport {
                        ku: result.ku,
                        tu: result.tu,
                        amplitude: result.amplitude,
                        gains,
                    });
                    tracing::info!(
                        kp = gains.kp,
                        ki = gains.ki,
                        kd = gains.kd,
                        "Ziegler-Nichols gains applied"
                    );
                }
                self.stop();
            }
            TunerPhase::Failed(_) => self.stop(),
            TunerPhase::Idle | TunerPhase::Running => {}
        }
        Ok(())
    }

    /// Run `simulation_speed` ticks of the configured `dt`, if running.
    ///
    /// Stops early when a tuning experiment ends mid-frame.
    pub fn frame(&mut self) -> SimResult<Option<TickSnapshot>> {
        let mut last = None;
        for _ in 0..self.options.simulation_speed {
            if !self.running {
                break;
            }
            last = Some(self.step(self.options.dt)?);
        }
        Ok(last)
    }

    pub fn start(&mut self) {
        if !self.running {
            tracing::debug!(time = self.time, "simulation started");
        }
        self.running = true;
    }

    pub fn stop(&mut self) {
        if self.running {
            tracing::debug!(time = self.time, "simulation stopped");
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Stop, empty the tanks, open both valves, clear both controllers and
    /// any tuning experiment, and rewind time to zero. Gains are kept.
    pub fn reset(&mut self) -> SimResult<()> {
        self.stop();
        self.plant.reset();
        self.plant.set_valve_openings(100.0, 100.0)?;
        self.pid.reset();
        self.fuzzy.reset();
        self.tuner.cancel();
        self.time = 0.0;
        self.last_output = 0.0;
        tracing::debug!("simulation reset");
        Ok(())
    }

    /// Run a relay experiment from a reset plant.
    ///
    /// Refused while the context is running. The setpoint of both
    /// controllers becomes the tuning setpoint.
    pub fn start_auto_tune(&mut self, setpoint: f64, amplitude: f64) -> SimResult<()> {
        if self.running {
            return Err(SimError::InvalidState {
                what: "stop the simulation before auto-tuning",
            });
        }
        self.reset()?;
        self.tuner.start(setpoint, amplitude, self.time)?;
        self.set_setpoint(setpoint);
        self.tuning_report = None;
        self.start();
        Ok(())
    }

    pub fn set_active_controller(&mut self, kind: ControllerKind) {
        if self.active != kind {
            tracing::debug!(controller = %kind, "active controller changed");
        }
        self.active = kind;
    }

    pub fn active_controller(&self) -> ControllerKind {
        self.active
    }

    /// The controller selected by [`Self::active_controller`].
    pub fn controller(&self) -> &dyn Controller {
        match self.active {
            ControllerKind::Pid => &self.pid,
            ControllerKind::Fuzzy => &self.fuzzy,
        }
    }

    fn controller_mut(&mut self) -> &mut dyn Controller {
        match self.active {
            ControllerKind::Pid => &mut self.pid,
            ControllerKind::Fuzzy => &mut self.fuzzy,
        }
    }

    /// Replace the PID gains without clearing its state.
    pub fn set_gains(&mut self, gains: PidGains) {
        self.pid.set_gains(gains);
    }

    /// Move both controllers to `setpoint`, clearing their state.
    pub fn set_setpoint(&mut self, setpoint: f64) {
        tracing::debug!(setpoint, "setpoint changed");
        self.setpoint = setpoint;
        self.pid.set_setpoint(setpoint);
        self.fuzzy.set_setpoint(setpoint);
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn set_valve_openings(&mut self, valve1: f64, valve2: f64) -> SimResult<()> {
        self.plant.set_valve_openings(valve1, valve2)
    }

    /// Arm the disturbance at the current simulation time.
    pub fn trigger_disturbance(&mut self) {
        self.plant.trigger_disturbance(self.time);
    }

    pub fn snapshot(&self) -> TickSnapshot {
        let state: &PlantState = self.plant.state();
        TickSnapshot {
            time: self.time,
            setpoint: self.setpoint,
            h1: state.h1,
            h2: state.h2,
            controller_output: self.last_output,
            disturbance_active: state.disturbance.active,
            tuner_phase: self.tuner.phase(),
            tuner_status: self.tuner.status_message(),
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn options(&self) -> &LoopOptions {
        &self.options
    }

    pub fn plant(&self) -> &PlantModel {
        &self.plant
    }

    pub fn plant_mut(&mut self) -> &mut PlantModel {
        &mut self.plant
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn fuzzy(&self) -> &FuzzyPidController {
        &self.fuzzy
    }

    pub fn tuner(&self) -> &RelayAutoTuner {
        &self.tuner
    }

    /// Report of the most recent successful tuning, if any.
    pub fn tuning_report(&self) -> Option<&TuningReport> {
        self.tuning_report.as_ref()
    }
}
