//! Scenario validation logic.

use crate::schema::{
    ActionDef, ControllerDef, EventDef, PlantDef, Scenario, SimulationDef, TuningDef,
};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Event {index} at t = {time_s} s: {reason}")]
    InvalidEvent {
        index: usize,
        time_s: f64,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl std::fmt::Display, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, value: f64) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(invalid(field, value, "must be finite"))
    }
}

fn positive(field: &str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? > 0.0 {
        Ok(value)
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<f64, ValidationError> {
    if finite(field, value)? >= 0.0 {
        Ok(value)
    } else {
        Err(invalid(field, value, "must be non-negative"))
    }
}

fn percent(field: &str, value: f64) -> Result<f64, ValidationError> {
    if (0.0..=100.0).contains(&finite(field, value)?) {
        Ok(value)
    } else {
        Err(invalid(field, value, "must be within [0, 100] %"))
    }
}

fn level(field: &str, value: f64, max_height: f64) -> Result<f64, ValidationError> {
    if (0.0..=max_height).contains(&finite(field, value)?) {
        Ok(value)
    } else {
        Err(invalid(
            field,
            value,
            &format!("must be within [0, {max_height}] cm"),
        ))
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > crate::migrate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }

    validate_plant(&scenario.plant)?;
    let max_height = scenario.plant.max_height_cm;
    validate_controller(&scenario.controller, max_height)?;
    validate_tuning(&scenario.tuning, max_height)?;
    validate_simulation(&scenario.simulation)?;
    validate_events(&scenario.events, &scenario.simulation, max_height)?;
    Ok(())
}

fn validate_plant(plant: &PlantDef) -> Result<(), ValidationError> {
    positive("plant.area_1_cm2", plant.area_1_cm2)?;
    positive("plant.area_2_cm2", plant.area_2_cm2)?;
    non_negative("plant.alpha_1", plant.alpha_1)?;
    non_negative("plant.alpha_2", plant.alpha_2)?;
    non_negative("plant.alpha_3", plant.alpha_3)?;
    positive("plant.max_height_cm", plant.max_height_cm)?;
    percent("plant.valve_1_pct", plant.valve_1_pct)?;
    percent("plant.valve_2_pct", plant.valve_2_pct)?;
    non_negative("plant.disturbance.flow_cm3_s", plant.disturbance.flow_cm3_s)?;
    non_negative("plant.disturbance.duration_s", plant.disturbance.duration_s)?;
    Ok(())
}

fn validate_controller(controller: &ControllerDef, max_height: f64) -> Result<(), ValidationError> {
    level("controller.setpoint_cm", controller.setpoint_cm, max_height)?;
    let min = finite("controller.output_min", controller.output_min)?;
    let max = finite("controller.output_max", controller.output_max)?;
    if min >= max {
        return Err(invalid(
            "controller.output_max",
            max,
            "must be greater than output_min",
        ));
    }
    finite("controller.pid.kp", controller.pid.kp)?;
    finite("controller.pid.ki", controller.pid.ki)?;
    finite("controller.pid.kd", controller.pid.kd)?;
    Ok(())
}

fn validate_tuning(tuning: &TuningDef, max_height: f64) -> Result<(), ValidationError> {
    level("tuning.setpoint_cm", tuning.setpoint_cm, max_height)?;
    positive("tuning.relay_amplitude", tuning.relay_amplitude)?;
    if tuning.measurement_cycles < 2 {
        return Err(invalid(
            "tuning.measurement_cycles",
            tuning.measurement_cycles,
            "at least two cycles are needed to measure a period",
        ));
    }
    if tuning
        .transient_cycles
        .checked_add(tuning.measurement_cycles)
        .is_none()
    {
        return Err(invalid(
            "tuning.transient_cycles",
            tuning.transient_cycles,
            "transient plus measurement cycles overflows",
        ));
    }
    positive("tuning.timeout_s", tuning.timeout_s)?;
    non_negative("tuning.debounce_s", tuning.debounce_s)?;
    Ok(())
}

fn validate_simulation(sim: &SimulationDef) -> Result<(), ValidationError> {
    positive("simulation.dt_s", sim.dt_s)?;
    positive("simulation.duration_s", sim.duration_s)?;
    if sim.simulation_speed == 0 {
        return Err(invalid(
            "simulation.simulation_speed",
            sim.simulation_speed,
            "must be at least 1",
        ));
    }
    if sim.record_every == 0 {
        return Err(invalid(
            "simulation.record_every",
            sim.record_every,
            "must be at least 1",
        ));
    }
    Ok(())
}

fn validate_events(
    events: &[EventDef],
    sim: &SimulationDef,
    max_height: f64,
) -> Result<(), ValidationError> {
    let mut previous = 0.0;
    for (index, event) in events.iter().enumerate() {
        let fail = |reason: String| ValidationError::InvalidEvent {
            index,
            time_s: event.time_s,
            reason,
        };

        if !event.time_s.is_finite() || event.time_s < 0.0 {
            return Err(fail("time must be finite and non-negative".to_string()));
        }
        // The last tick starts at duration - dt and fires events up to half a step ahead
        let last_due = sim.duration_s - 0.5 * sim.dt_s;
        if event.time_s > last_due {
            return Err(fail(format!(
                "too late to fire before the end of the run (last due time {last_due} s)"
            )));
        }
        if event.time_s < previous {
            return Err(fail("events must be sorted by time".to_string()));
        }
        previous = event.time_s;

        match &event.action {
            ActionDef::TriggerDisturbance | ActionDef::SetActiveController { .. } => {}
            ActionDef::SetSetpoint { value_cm } => {
                level("setpoint", *value_cm, max_height).map_err(|e| fail(e.to_string()))?;
            }
            ActionDef::SetValveOpenings {
                valve_1_pct,
                valve_2_pct,
            } => {
                percent("valve_1_pct", *valve_1_pct).map_err(|e| fail(e.to_string()))?;
                percent("valve_2_pct", *valve_2_pct).map_err(|e| fail(e.to_string()))?;
            }
        }
    }
    Ok(())
}
