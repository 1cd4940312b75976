//! Result data types.

use serde::{Deserialize, Serialize};
use tt_project::ControllerChoice;

pub type RunId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunManifest {
    pub run_id: RunId,
    pub scenario_name: String,
    /// RFC 3339, UTC.
    pub timestamp: String,
    pub run_type: RunType,
    pub engine_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RunSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum RunType {
    ClosedLoop {
        controller: ControllerChoice,
        dt_s: f64,
        t_end_s: f64,
        steps: usize,
    },
    RelayTuning {
        setpoint_cm: f64,
        relay_amplitude: f64,
        dt_s: f64,
    },
}

/// One stored tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeseriesRecord {
    pub time_s: f64,
    pub setpoint_cm: f64,
    pub h1_cm: f64,
    pub h2_cm: f64,
    pub inflow_cm3_s: f64,
    #[serde(default)]
    pub disturbance_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub samples: usize,
    pub final_time_s: f64,
    pub final_h1_cm: f64,
    pub final_h2_cm: f64,
    pub peak_h2_cm: f64,
    /// Largest excursion of H2 above the setpoint in force at the time.
    pub overshoot_cm: f64,
    /// Fraction of samples with the inflow at the bounds of `[min, max]`.
    pub saturated_fraction: f64,
    /// Level clamp events over the whole run, both tanks.
    #[serde(default)]
    pub level_clamps: u64,
    /// Ticks on which the active controller's output was clamped.
    #[serde(default)]
    pub output_saturations: u64,
    /// Plant outflows at the end of the run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_outflows: Option<FlowSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tuning: Option<TuningSummary>,
}

/// Valve and interconnect flows in L/min.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct FlowSummary {
    pub tank_1_lpm: f64,
    pub tank_2_lpm: f64,
    /// Positive from tank 1 to tank 2.
    pub interconnect_lpm: f64,
}

/// Outcome of a relay tuning run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TuningSummary {
    pub completed: bool,
    /// Final tuner status line, including failure advice.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TunedGains>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TunedGains {
    pub ku: f64,
    pub tu: f64,
    /// Measured oscillation amplitude (cm).
    pub amplitude_cm: f64,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}
