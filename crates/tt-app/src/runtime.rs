//! Scenario to runtime: builds a [`SimulationContext`] and replays timed
//! events against it.

use tt_controls::{
    FuzzyPidController, OutputLimits, PidController, PidGains, RelayAutoTuner, RelayTunerConfig,
};
use tt_project::{ActionDef, ControllerChoice, EventDef, IntegratorChoice, Scenario};
use tt_sim::{
    ControllerKind, DisturbanceConfig, IntegratorType, LoopOptions, PlantModel, PlantParameters,
    SimulationContext,
};

use crate::error::AppResult;

pub fn controller_kind(choice: ControllerChoice) -> ControllerKind {
    match choice {
        ControllerChoice::Pid => ControllerKind::Pid,
        ControllerChoice::Fuzzy => ControllerKind::Fuzzy,
    }
}

fn integrator_type(choice: IntegratorChoice) -> IntegratorType {
    match choice {
        IntegratorChoice::ForwardEuler => IntegratorType::ForwardEuler,
        IntegratorChoice::Rk4 => IntegratorType::Rk4,
    }
}

/// Build a stopped context at `t = 0` with empty tanks.
pub fn build_context(scenario: &Scenario) -> AppResult<SimulationContext> {
    let plant_def = &scenario.plant;
    let plant = PlantModel::new(
        PlantParameters {
            area_1: plant_def.area_1_cm2,
            area_2: plant_def.area_2_cm2,
            alpha_1: plant_def.alpha_1,
            alpha_2: plant_def.alpha_2,
            alpha_3: plant_def.alpha_3,
            max_height: plant_def.max_height_cm,
        },
        DisturbanceConfig {
            flow: plant_def.disturbance.flow_cm3_s,
            duration: plant_def.disturbance.duration_s,
        },
        integrator_type(scenario.simulation.integrator),
    )?;

    let ctrl = &scenario.controller;
    let limits = OutputLimits::new(ctrl.output_min, ctrl.output_max)?;
    let gains = PidGains::new(ctrl.pid.kp, ctrl.pid.ki, ctrl.pid.kd)?;
    let pid = PidController::new(gains, ctrl.setpoint_cm, limits);
    let fuzzy = FuzzyPidController::new(ctrl.setpoint_cm, limits)?;

    let tuning = &scenario.tuning;
    let tuner = RelayAutoTuner::new(RelayTunerConfig {
        transient_cycles: tuning.transient_cycles,
        measurement_cycles: tuning.measurement_cycles,
        timeout_s: tuning.timeout_s,
        debounce_window_s: tuning.debounce_s,
    })?;

    let options = LoopOptions {
        dt: scenario.simulation.dt_s,
        simulation_speed: scenario.simulation.simulation_speed,
    };

    let mut ctx = SimulationContext::new(plant, pid, fuzzy, tuner, options)?;
    ctx.set_valve_openings(plant_def.valve_1_pct, plant_def.valve_2_pct)?;
    ctx.set_active_controller(controller_kind(ctrl.active));
    Ok(ctx)
}

pub fn apply_action(ctx: &mut SimulationContext, action: &ActionDef) -> AppResult<()> {
    match action {
        ActionDef::TriggerDisturbance => ctx.trigger_disturbance(),
        ActionDef::SetSetpoint { value_cm } => ctx.set_setpoint(*value_cm),
        ActionDef::SetValveOpenings {
            valve_1_pct,
            valve_2_pct,
        } => ctx.set_valve_openings(*valve_1_pct, *valve_2_pct)?,
        ActionDef::SetActiveController { kind } => ctx.set_active_controller(controller_kind(*kind)),
    }
    Ok(())
}

/// Time-ordered events, each fired once.
///
/// An event fires before the first tick whose start time is within half a
/// step of (or past) its `time_s`, so accumulated rounding in the clock never
/// delays it by a tick.
#[derive(Debug, Clone)]
pub struct EventSchedule {
    events: Vec<EventDef>,
    next: usize,
}

impl EventSchedule {
    pub fn new(events: &[EventDef]) -> Self {
        let mut events = events.to_vec();
        events.sort_by(|a, b| a.time_s.total_cmp(&b.time_s));
        Self { events, next: 0 }
    }

    /// Apply every event due at the start of a tick at `ctx.time()`.
    /// Returns how many fired.
    pub fn fire_due(&mut self, ctx: &mut SimulationContext, dt: f64) -> AppResult<usize> {
        let horizon = ctx.time() + 0.5 * dt;
        let mut fired = 0;
        while let Some(event) = self.events.get(self.next) {
            if event.time_s > horizon {
                break;
            }
            tracing::debug!(time = ctx.time(), action = ?event.action, "scenario event");
            apply_action(ctx, &event.action)?;
            self.next += 1;
            fired += 1;
        }
        Ok(fired)
    }

    pub fn remaining(&self) -> usize {
        self.events.len() - self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_builds_reference_context() {
        let ctx = build_context(&Scenario::default()).unwrap();
        assert_eq!(ctx.time(), 0.0);
        assert_eq!(ctx.setpoint(), 25.0);
        assert_eq!(ctx.active_controller(), ControllerKind::Pid);
        assert_eq!(ctx.pid().gains(), PidGains::default());
        assert_eq!(ctx.options().dt, 0.1);
        assert!(!ctx.is_running());
    }

    #[test]
    fn scenario_values_reach_the_context() {
        let mut scenario = Scenario::default();
        scenario.plant.valve_2_pct = 50.0;
        scenario.controller.active = ControllerChoice::Fuzzy;
        scenario.controller.setpoint_cm = 18.0;
        scenario.simulation.integrator = IntegratorChoice::Rk4;
        scenario.tuning.debounce_s = 1.0;

        let ctx = build_context(&scenario).unwrap();
        assert_eq!(ctx.plant().state().valve2_opening, 50.0);
        assert_eq!(ctx.active_controller(), ControllerKind::Fuzzy);
        assert_eq!(ctx.fuzzy().set_point(), 18.0);
        assert_eq!(ctx.plant().integrator(), IntegratorType::Rk4);
        assert_eq!(ctx.tuner().config().debounce_window_s, 1.0);
    }

    #[test]
    fn inverted_output_range_is_rejected() {
        let mut scenario = Scenario::default();
        scenario.controller.output_min = 10.0;
        scenario.controller.output_max = 5.0;
        assert!(build_context(&scenario).is_err());
    }

    #[test]
    fn events_fire_once_in_time_order() {
        let mut ctx = build_context(&Scenario::default()).unwrap();
        let mut schedule = EventSchedule::new(&[
            EventDef {
                time_s: 0.3,
                action: ActionDef::SetSetpoint { value_cm: 20.0 },
            },
            EventDef {
                time_s: 0.0,
                action: ActionDef::SetActiveController {
                    kind: ControllerChoice::Fuzzy,
                },
            },
        ]);

        assert_eq!(schedule.fire_due(&mut ctx, 0.1).unwrap(), 1);
        assert_eq!(ctx.active_controller(), ControllerKind::Fuzzy);
        assert_eq!(schedule.fire_due(&mut ctx, 0.1).unwrap(), 0);

        // The clock reads 0.30000000000000004 here
        for _ in 0..3 {
            ctx.step(0.1).unwrap();
        }
        assert_eq!(schedule.fire_due(&mut ctx, 0.1).unwrap(), 1);
        assert_eq!(ctx.setpoint(), 20.0);
        assert_eq!(schedule.remaining(), 0);
    }
}
