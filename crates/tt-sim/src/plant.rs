//! Two-tank coupled liquid-level plant.
//!
//! Tank 1 receives the controlled inflow `Qi1`, tank 2 an optional `Qi2`.
//! Each tank drains through its own valve, and the tanks exchange liquid
//! through an interconnecting pipe whose flow follows the level difference:
//!
//! ```text
//! Qo1 = v1/100 * α1 * sqrt(H1)
//! Qo2 = v2/100 * α2 * sqrt(H2)
//! Qo3 = sign(H1 - H2) * α3 * sqrt(|H1 - H2|)
//! dH1/dt = (Qi1 - Qo1 - Qo3) / A1
//! dH2/dt = (Qi2 - Qo2 + Qo3) / A2
//! ```
//!
//! Lengths are in cm, flows in cm³/s, valve openings in percent.

use crate::error::{SimError, SimResult, check_timestep};
use crate::integrator::IntegratorType;
use crate::model::TransientModel;
use serde::{Deserialize, Serialize};
use tt_core::units::{VolumeRate, cm3ps, in_lpm};
use tt_core::{SaturationCounter, clamp_tracked};

/// Valve openings below this are treated as fully closed.
const VALVE_CLOSED_PCT: f64 = 0.001;

/// Immutable physical parameters of the plant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantParameters {
    /// Cross-section of tank 1 (cm²).
    pub area_1: f64,
    /// Cross-section of tank 2 (cm²).
    pub area_2: f64,
    /// Outlet coefficient of tank 1 (cm^(5/2)/s).
    pub alpha_1: f64,
    pub alpha_2: f64,
    /// Interconnect coefficient.
    pub alpha_3: f64,
    /// Tank height; levels are clamped to `[0, max_height]` (cm).
    pub max_height: f64,
}

impl Default for PlantParameters {
    fn default() -> Self {
        Self {
            area_1: 32.0,
            area_2: 32.0,
            alpha_1: 14.3,
            alpha_2: 14.3,
            alpha_3: 20.0,
            max_height: 40.0,
        }
    }
}

impl PlantParameters {
    pub fn validate(&self) -> SimResult<()> {
        let values = [
            self.area_1,
            self.area_2,
            self.alpha_1,
            self.alpha_2,
            self.alpha_3,
            self.max_height,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "plant parameters must be finite",
            });
        }
        if self.area_1 <= 0.0 || self.area_2 <= 0.0 {
            return Err(SimError::NonPhysical {
                what: "tank areas must be positive",
            });
        }
        if self.alpha_1 < 0.0 || self.alpha_2 < 0.0 || self.alpha_3 < 0.0 {
            return Err(SimError::NonPhysical {
                what: "flow coefficients must be non-negative",
            });
        }
        if self.max_height <= 0.0 {
            return Err(SimError::NonPhysical {
                what: "max height must be positive",
            });
        }
        Ok(())
    }
}

/// Size and length of the one-shot outflow disturbance on tank 2.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisturbanceConfig {
    /// Extra outflow from tank 2 while active (cm³/s).
    pub flow: f64,
    pub duration: f64,
}

impl Default for DisturbanceConfig {
    fn default() -> Self {
        Self {
            flow: 50.0,
            duration: 5.0,
        }
    }
}

impl DisturbanceConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.flow.is_finite() && self.duration.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "disturbance flow and duration must be finite",
            });
        }
        if self.flow < 0.0 || self.duration < 0.0 {
            return Err(SimError::NonPhysical {
                what: "disturbance flow and duration must be non-negative",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Disturbance {
    pub active: bool,
    pub start_time: f64,
}

/// Mutable plant state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub h1: f64,
    pub h2: f64,
    pub valve1_opening: f64,
    pub valve2_opening: f64,
    pub disturbance: Disturbance,
}

impl Default for PlantState {
    fn default() -> Self {
        Self {
            h1: 0.0,
            h2: 0.0,
            valve1_opening: 100.0,
            valve2_opening: 100.0,
            disturbance: Disturbance::default(),
        }
    }
}

/// Outflows of the current state (cm³/s).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Outflows {
    pub tank_1: f64,
    pub tank_2: f64,
    /// Positive from tank 1 to tank 2.
    pub interconnect: f64,
}

impl Outflows {
    pub fn as_volume_rates(&self) -> (VolumeRate, VolumeRate, VolumeRate) {
        (
            cm3ps(self.tank_1),
            cm3ps(self.tank_2),
            cm3ps(self.interconnect),
        )
    }

    /// The same flows in L/min, tank 1 first.
    pub fn litres_per_minute(&self) -> [f64; 3] {
        let (q1, q2, q3) = self.as_volume_rates();
        [in_lpm(q1), in_lpm(q2), in_lpm(q3)]
    }
}

/// Level clamp events per tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSaturation {
    pub tank_1: SaturationCounter,
    pub tank_2: SaturationCounter,
}

impl LevelSaturation {
    pub fn total(&self) -> u64 {
        self.tank_1.total() + self.tank_2.total()
    }
}

/// Drain flow through a valve at `opening` percent.
pub fn tank_outflow(opening: f64, alpha: f64, level: f64) -> f64 {
    if opening < VALVE_CLOSED_PCT {
        0.0
    } else {
        opening / 100.0 * alpha * level.max(0.0).sqrt()
    }
}

/// Flow through the interconnect, positive from tank 1 to tank 2.
pub fn interconnect_flow(alpha: f64, h1: f64, h2: f64) -> f64 {
    let diff = h1 - h2;
    if diff > 0.0 {
        alpha * diff.sqrt()
    } else if diff < 0.0 {
        -alpha * (-diff).sqrt()
    } else {
        0.0
    }
}

/// Tank levels integrated by the ODE solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Levels {
    pub h1: f64,
    pub h2: f64,
}

/// Plant equations with the inputs frozen for one step.
struct TankDynamics<'a> {
    params: &'a PlantParameters,
    qi1: f64,
    qi2: f64,
    valve1: f64,
    valve2: f64,
    disturbance_flow: f64,
}

impl TransientModel for TankDynamics<'_> {
    type State = Levels;

    fn rhs(&mut self, _t: f64, x: &Levels) -> SimResult<Levels> {
        let p = self.params;
        let qo1 = tank_outflow(self.valve1, p.alpha_1, x.h1);
        let qo2 = tank_outflow(self.valve2, p.alpha_2, x.h2);
        let qo3 = interconnect_flow(p.alpha_3, x.h1, x.h2);

        Ok(Levels {
            h1: (self.qi1 - qo1 - qo3) / p.area_1,
            h2: (self.qi2 - qo2 + qo3 - self.disturbance_flow) / p.area_2,
        })
    }

    fn add(&self, a: &Levels, b: &Levels) -> Levels {
        Levels {
            h1: a.h1 + b.h1,
            h2: a.h2 + b.h2,
        }
    }

    fn scale(&self, a: &Levels, scale: f64) -> Levels {
        Levels {
            h1: a.h1 * scale,
            h2: a.h2 * scale,
        }
    }
}

/// The two-tank plant: parameters, state and saturation diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct PlantModel {
    params: PlantParameters,
    disturbance: DisturbanceConfig,
    integrator: IntegratorType,
    state: PlantState,
    saturation: LevelSaturation,
}

impl PlantModel {
    pub fn new(
        params: PlantParameters,
        disturbance: DisturbanceConfig,
        integrator: IntegratorType,
    ) -> SimResult<Self> {
        params.validate()?;
        disturbance.validate()?;
        Ok(Self {
            params,
            disturbance,
            integrator,
            state: PlantState::default(),
            saturation: LevelSaturation::default(),
        })
    }

    /// Advance the plant by `dt` seconds with inflows `qi1`, `qi2` (cm³/s).
    ///
    /// `current_time` is only used to expire an active disturbance.
    pub fn advance(
        &mut self,
        qi1: f64,
        qi2: f64,
        dt: f64,
        current_time: f64,
    ) -> SimResult<PlantState> {
        let dt = check_timestep(dt)?;
        if !(qi1.is_finite() && qi2.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "inflows must be finite",
            });
        }

        let disturbance_flow = self.disturbance_flow(current_time);

        let mut dynamics = TankDynamics {
            params: &self.params,
            qi1,
            qi2,
            valve1: self.state.valve1_opening,
            valve2: self.state.valve2_opening,
            disturbance_flow,
        };
        let x = Levels {
            h1: self.state.h1,
            h2: self.state.h2,
        };
        let next = self
            .integrator
            .step(&mut dynamics, current_time, &x, dt)?;

        let max = self.params.max_height;
        let (h1, c1) = clamp_tracked(next.h1, 0.0, max);
        let (h2, c2) = clamp_tracked(next.h2, 0.0, max);
        if c1.is_clamped() || c2.is_clamped() {
            tracing::trace!(raw_h1 = next.h1, raw_h2 = next.h2, "tank level clamped");
        }
        self.saturation.tank_1.record(c1);
        self.saturation.tank_2.record(c2);

        self.state.h1 = h1;
        self.state.h2 = h2;
        Ok(self.state)
    }

    /// Extra outflow applied this step; clears an elapsed disturbance.
    fn disturbance_flow(&mut self, now: f64) -> f64 {
        let d = &mut self.state.disturbance;
        if !d.active {
            return 0.0;
        }
        if now - d.start_time < self.disturbance.duration {
            self.disturbance.flow
        } else {
            d.active = false;
            tracing::debug!(time = now, "disturbance cleared");
            0.0
        }
    }

    /// Set both valve openings, clamped to `[0, 100]` percent.
    pub fn set_valve_openings(&mut self, valve1: f64, valve2: f64) -> SimResult<()> {
        if !(valve1.is_finite() && valve2.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "valve openings must be finite",
            });
        }
        self.state.valve1_opening = valve1.clamp(0.0, 100.0);
        self.state.valve2_opening = valve2.clamp(0.0, 100.0);
        tracing::debug!(
            valve1 = self.state.valve1_opening,
            valve2 = self.state.valve2_opening,
            "valve openings set"
        );
        Ok(())
    }

    /// Arm the outflow disturbance starting at `now`.
    pub fn trigger_disturbance(&mut self, now: f64) {
        self.state.disturbance = Disturbance {
            active: true,
            start_time: now,
        };
        tracing::debug!(
            time = now,
            flow = self.disturbance.flow,
            duration = self.disturbance.duration,
            "disturbance triggered"
        );
    }

    /// Empty both tanks and clear the disturbance and saturation counters.
    /// Valve openings are left as they are.
    pub fn reset(&mut self) {
        self.state.h1 = 0.0;
        self.state.h2 = 0.0;
        self.state.disturbance = Disturbance::default();
        self.saturation = LevelSaturation::default();
    }

    pub fn outflows(&self) -> Outflows {
        let p = &self.params;
        let s = &self.state;
        Outflows {
            tank_1: tank_outflow(s.valve1_opening, p.alpha_1, s.h1),
            tank_2: tank_outflow(s.valve2_opening, p.alpha_2, s.h2),
            interconnect: interconnect_flow(p.alpha_3, s.h1, s.h2),
        }
    }

    pub fn state(&self) -> &PlantState {
        &self.state
    }

    pub fn params(&self) -> &PlantParameters {
        &self.params
    }

    pub fn disturbance_config(&self) -> &DisturbanceConfig {
        &self.disturbance
    }

    pub fn integrator(&self) -> IntegratorType {
        self.integrator
    }

    pub fn saturation(&self) -> &LevelSaturation {
        &self.saturation
    }

    /// Place the plant at given levels, clamped to the tank height.
    pub fn set_levels(&mut self, h1: f64, h2: f64) -> SimResult<()> {
        if !(h1.is_finite() && h2.is_finite()) {
            return Err(SimError::InvalidArg {
                what: "levels must be finite",
            });
        }
        self.state.h1 = h1.clamp(0.0, self.params.max_height);
        self.state.h2 = h2.clamp(0.0, self.params.max_height);
        Ok(())
    }
}

impl Default for PlantModel {
    fn default() -> Self {
        Self {
            params: PlantParameters::default(),
            disturbance: DisturbanceConfig::default(),
            integrator: IntegratorType::default(),
            state: PlantState::default(),
            saturation: LevelSaturation::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::units::in_cm3ps;

    #[test]
    fn parameter_validation() {
        assert!(PlantParameters::default().validate().is_ok());
        let bad = PlantParameters {
            area_1: 0.0,
            ..PlantParameters::default()
        };
        assert!(PlantModel::new(bad, DisturbanceConfig::default(), IntegratorType::ForwardEuler).is_err());
        let bad = PlantParameters {
            alpha_3: f64::NAN,
            ..PlantParameters::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn first_step_from_empty_tanks() {
        let mut plant = PlantModel::default();
        let s = plant.advance(100.0, 0.0, 0.1, 0.0).unwrap();
        // Only Qi1 acts: dH1/dt = 100 / 32
        assert!((s.h1 - 0.3125).abs() < 1e-12);
        assert_eq!(s.h2, 0.0);
    }

    #[test]
    fn interconnect_flow_is_antisymmetric() {
        assert_eq!(interconnect_flow(20.0, 5.0, 5.0), 0.0);
        let forward = interconnect_flow(20.0, 9.0, 5.0);
        assert!((forward - 40.0).abs() < 1e-12);
        assert_eq!(interconnect_flow(20.0, 5.0, 9.0), -forward);
    }

    #[test]
    fn closed_valve_has_no_outflow() {
        assert_eq!(tank_outflow(0.0005, 14.3, 25.0), 0.0);
        assert!((tank_outflow(50.0, 14.3, 25.0) - 35.75).abs() < 1e-12);
    }

    #[test]
    fn invalid_timestep_leaves_state() {
        let mut plant = PlantModel::default();
        plant.advance(100.0, 0.0, 0.1, 0.0).unwrap();
        let before = *plant.state();
        assert_eq!(
            plant.advance(100.0, 0.0, 0.0, 0.1),
            Err(SimError::InvalidTimestep { dt: 0.0 })
        );
        assert!(plant.advance(100.0, 0.0, -0.1, 0.1).is_err());
        assert!(plant.advance(100.0, 0.0, f64::NAN, 0.1).is_err());
        assert_eq!(*plant.state(), before);
    }

    #[test]
    fn levels_clamp_and_count() {
        let mut plant = PlantModel::default();
        plant.set_valve_openings(0.0, 0.0).unwrap();
        for i in 0..200 {
            plant.advance(300.0, 300.0, 0.1, i as f64 * 0.1).unwrap();
        }
        assert_eq!(plant.state().h1, 40.0);
        assert_eq!(plant.state().h2, 40.0);
        assert!(plant.saturation().tank_1.high > 0);
        assert!(plant.saturation().tank_2.high > 0);

        plant.reset();
        assert_eq!(plant.saturation().total(), 0);
        assert_eq!(plant.state().valve1_opening, 0.0);
    }

    #[test]
    fn valve_openings_clamp() {
        let mut plant = PlantModel::default();
        plant.set_valve_openings(150.0, -10.0).unwrap();
        assert_eq!(plant.state().valve1_opening, 100.0);
        assert_eq!(plant.state().valve2_opening, 0.0);
        assert!(plant.set_valve_openings(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn disturbance_drains_tank_two_then_clears() {
        let mut plant = PlantModel::default();
        plant.set_valve_openings(0.0, 0.0).unwrap();
        plant.set_levels(20.0, 20.0).unwrap();
        plant.trigger_disturbance(10.0);

        let s = plant.advance(0.0, 0.0, 0.1, 10.0).unwrap();
        assert!((s.h2 - (20.0 - 50.0 / 32.0 * 0.1)).abs() < 1e-12);
        assert!(s.disturbance.active);

        // 5 s later the disturbance expires on the next advance
        let s = plant.advance(0.0, 0.0, 0.1, 15.0).unwrap();
        assert!(!s.disturbance.active);
    }

    #[test]
    fn outflows_report_flow_units() {
        let mut plant = PlantModel::default();
        plant.set_levels(25.0, 16.0).unwrap();
        let flows = plant.outflows();
        assert!((flows.tank_1 - 71.5).abs() < 1e-12);
        assert!((flows.tank_2 - 57.2).abs() < 1e-12);
        assert!((flows.interconnect - 60.0).abs() < 1e-12);
        let (q1, _, _) = flows.as_volume_rates();
        assert!((in_cm3ps(q1) - 71.5).abs() < 1e-9);
        // 71.5 cm3/s = 4.29 L/min
        let lpm = flows.litres_per_minute();
        assert!((lpm[0] - 4.29).abs() < 1e-9);
        assert!((lpm[2] - 3.6).abs() < 1e-9);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn levels_stay_in_bounds(
            inputs in prop::collection::vec((-500.0_f64..500.0, -500.0_f64..500.0), 1..100),
            valves in (0.0_f64..100.0, 0.0_f64..100.0),
            dt in 0.001_f64..2.0,
        ) {
            let mut plant = PlantModel::default();
            plant.set_valve_openings(valves.0, valves.1).unwrap();
            for (i, (qi1, qi2)) in inputs.into_iter().enumerate() {
                let s = plant.advance(qi1, qi2, dt, i as f64 * dt).unwrap();
                prop_assert!((0.0..=40.0).contains(&s.h1));
                prop_assert!((0.0..=40.0).contains(&s.h2));
            }
        }
    }
}
