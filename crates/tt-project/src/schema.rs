//! Scenario file schema.
//!
//! Every section and field is optional in the file; missing values take the
//! defaults of the reference plant and controller.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub plant: PlantDef,
    #[serde(default)]
    pub controller: ControllerDef,
    #[serde(default)]
    pub tuning: TuningDef,
    #[serde(default)]
    pub simulation: SimulationDef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventDef>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            version: crate::migrate::LATEST_VERSION,
            name: "Default scenario".to_string(),
            plant: PlantDef::default(),
            controller: ControllerDef::default(),
            tuning: TuningDef::default(),
            simulation: SimulationDef::default(),
            events: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlantDef {
    pub area_1_cm2: f64,
    pub area_2_cm2: f64,
    pub alpha_1: f64,
    pub alpha_2: f64,
    pub alpha_3: f64,
    pub max_height_cm: f64,
    pub valve_1_pct: f64,
    pub valve_2_pct: f64,
    pub disturbance: DisturbanceDef,
}

impl Default for PlantDef {
    fn default() -> Self {
        Self {
            area_1_cm2: 32.0,
            area_2_cm2: 32.0,
            alpha_1: 14.3,
            alpha_2: 14.3,
            alpha_3: 20.0,
            max_height_cm: 40.0,
            valve_1_pct: 100.0,
            valve_2_pct: 100.0,
            disturbance: DisturbanceDef::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisturbanceDef {
    pub flow_cm3_s: f64,
    pub duration_s: f64,
}

impl Default for DisturbanceDef {
    fn default() -> Self {
        Self {
            flow_cm3_s: 50.0,
            duration_s: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerChoice {
    #[default]
    Pid,
    Fuzzy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControllerDef {
    pub active: ControllerChoice,
    pub setpoint_cm: f64,
    pub output_min: f64,
    pub output_max: f64,
    pub pid: PidGainsDef,
}

impl Default for ControllerDef {
    fn default() -> Self {
        Self {
            active: ControllerChoice::Pid,
            setpoint_cm: 25.0,
            output_min: 0.0,
            output_max: 300.0,
            pid: PidGainsDef::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PidGainsDef {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl Default for PidGainsDef {
    fn default() -> Self {
        Self {
            kp: 83.5,
            ki: 14.5,
            kd: 120.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TuningDef {
    pub setpoint_cm: f64,
    /// Relay output `d` while on (cm³/s).
    pub relay_amplitude: f64,
    pub transient_cycles: u32,
    pub measurement_cycles: u32,
    pub timeout_s: f64,
    pub debounce_s: f64,
}

impl Default for TuningDef {
    fn default() -> Self {
        Self {
            setpoint_cm: 20.0,
            relay_amplitude: 100.0,
            transient_cycles: 3,
            measurement_cycles: 4,
            timeout_s: 200.0,
            debounce_s: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorChoice {
    #[default]
    ForwardEuler,
    Rk4,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationDef {
    pub dt_s: f64,
    pub duration_s: f64,
    /// Ticks per frame.
    pub simulation_speed: u32,
    pub integrator: IntegratorChoice,
    /// Store every N-th tick.
    pub record_every: usize,
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            dt_s: 0.1,
            duration_s: 60.0,
            simulation_speed: 1,
            integrator: IntegratorChoice::ForwardEuler,
            record_every: 1,
        }
    }
}

/// An action applied once the simulation clock reaches `time_s`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDef {
    pub time_s: f64,
    pub action: ActionDef,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ActionDef {
    TriggerDisturbance,
    SetSetpoint { value_cm: f64 },
    SetValveOpenings { valve_1_pct: f64, valve_2_pct: f64 },
    SetActiveController { kind: ControllerChoice },
}
