//! Shared controller types and the discrete PID law.
//!
//! Both controller variants evaluate the same structural law:
//!
//! ```text
//! P = Kp * e
//! I = clamp(I + Ki * e * dt, out_min, out_max)
//! D = Kd * de/dt
//! u = clamp(P + I + D, out_min, out_max)
//! ```
//!
//! Anti-windup is by clamping the accumulator, not by conditional
//! integration: the integral keeps accumulating while the output saturates,
//! but never leaves the output range.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use tt_core::{Clamped, SaturationCounter, clamp_tracked};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

impl PidGains {
    /// Create a gain set, rejecting non-finite values.
    pub fn new(kp: f64, ki: f64, kd: f64) -> ControlResult<Self> {
        if !(kp.is_finite() && ki.is_finite() && kd.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "gains must be finite",
            });
        }
        Ok(Self { kp, ki, kd })
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 83.5,
            ki: 14.5,
            kd: 120.0,
        }
    }
}

/// Output range shared by the controller output and the integral accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputLimits {
    pub min: f64,
    pub max: f64,
}

impl OutputLimits {
    pub fn new(min: f64, max: f64) -> ControlResult<Self> {
        if !(min.is_finite() && max.is_finite()) {
            return Err(ControlError::InvalidArg {
                what: "output limits must be finite",
            });
        }
        if min >= max {
            return Err(ControlError::InvalidArg {
                what: "out_min must be less than out_max",
            });
        }
        Ok(Self { min, max })
    }

    pub fn clamp(&self, value: f64) -> (f64, Clamped) {
        clamp_tracked(value, self.min, self.max)
    }
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 300.0,
        }
    }
}

/// Mutable state carried between controller ticks.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidState {
    /// Integral accumulator, already multiplied by Ki.
    pub integral: f64,
    pub last_error: f64,
    pub last_output: f64,
}

/// Which clamps fired on a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSaturation {
    pub integral: Clamped,
    pub output: Clamped,
}

impl Default for StepSaturation {
    fn default() -> Self {
        Self {
            integral: Clamped::No,
            output: Clamped::No,
        }
    }
}

/// Saturation diagnostics accumulated by a controller.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ControllerSaturation {
    pub integral: SaturationCounter,
    pub output: SaturationCounter,
    /// Clamps that fired on the most recent effective update.
    pub last: StepSaturation,
}

impl ControllerSaturation {
    pub(crate) fn record(&mut self, step: StepSaturation) {
        self.integral.record(step.integral);
        self.output.record(step.output);
        self.last = step;
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One evaluation of the PID law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidStep {
    pub state: PidState,
    pub proportional: f64,
    pub derivative: f64,
    pub saturation: StepSaturation,
}

/// Evaluate the discrete PID law.
///
/// `error_rate` is supplied by the caller so the classical controller can use
/// the raw difference quotient while the fuzzy controller uses its clamped
/// change-of-error. `dt` must be positive; callers guard that.
pub fn pid_law(
    gains: &PidGains,
    limits: &OutputLimits,
    state: &PidState,
    error: f64,
    error_rate: f64,
    dt: f64,
) -> PidStep {
    let proportional = gains.kp * error;

    let (integral, integral_clamp) = limits.clamp(state.integral + gains.ki * error * dt);

    let derivative = gains.kd * error_rate;

    let (output, output_clamp) = limits.clamp(proportional + integral + derivative);

    PidStep {
        state: PidState {
            integral,
            last_error: error,
            last_output: output,
        },
        proportional,
        derivative,
        saturation: StepSaturation {
            integral: integral_clamp,
            output: output_clamp,
        },
    }
}

/// Returns true when an update with these inputs must be skipped.
///
/// A non-positive or non-finite `dt` is the caller's logic error; a
/// non-finite measurement would poison the accumulator. Both leave the
/// controller untouched and repeat the previous output.
pub(crate) fn skip_update(process_variable: f64, dt: f64) -> bool {
    !(dt > 0.0 && dt.is_finite() && process_variable.is_finite())
}

/// Common surface of the controllers the simulation loop can switch between.
pub trait Controller {
    /// Advance the controller by `dt` seconds and return the clamped output.
    fn update(&mut self, process_variable: f64, dt: f64) -> f64;

    /// Change the setpoint. Clears all internal state.
    fn set_setpoint(&mut self, set_point: f64);

    fn set_point(&self) -> f64;

    fn reset(&mut self);

    fn last_output(&self) -> f64;

    fn state(&self) -> &PidState;

    fn saturation(&self) -> &ControllerSaturation;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_limits_validation() {
        assert!(OutputLimits::new(0.0, 300.0).is_ok());
        assert!(OutputLimits::new(1.0, 0.0).is_err());
        assert!(OutputLimits::new(1.0, 1.0).is_err());
        assert!(OutputLimits::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn gains_reject_non_finite() {
        assert!(PidGains::new(1.0, f64::INFINITY, 0.0).is_err());
        assert!(PidGains::new(1.0, 2.0, 3.0).is_ok());
    }

    #[test]
    fn law_clamps_integral_and_output() {
        let gains = PidGains::new(10.0, 1000.0, 0.0).unwrap();
        let limits = OutputLimits::new(0.0, 300.0).unwrap();
        let step = pid_law(&gains, &limits, &PidState::default(), 50.0, 0.0, 1.0);

        assert_eq!(step.state.integral, 300.0);
        assert_eq!(step.state.last_output, 300.0);
        assert_eq!(step.saturation.integral, Clamped::High);
        assert_eq!(step.saturation.output, Clamped::High);
    }

    #[test]
    fn law_terms_without_saturation() {
        let gains = PidGains::new(2.0, 1.0, 0.5).unwrap();
        let limits = OutputLimits::new(-100.0, 100.0).unwrap();
        let step = pid_law(&gains, &limits, &PidState::default(), 3.0, 4.0, 0.1);

        assert!((step.proportional - 6.0).abs() < 1e-12);
        assert!((step.state.integral - 0.3).abs() < 1e-12);
        assert!((step.derivative - 2.0).abs() < 1e-12);
        assert!((step.state.last_output - 8.3).abs() < 1e-12);
        assert_eq!(step.state.last_error, 3.0);
        assert_eq!(step.saturation, StepSaturation::default());
    }

    #[test]
    fn skip_update_guards() {
        assert!(skip_update(1.0, 0.0));
        assert!(skip_update(1.0, -0.1));
        assert!(skip_update(1.0, f64::NAN));
        assert!(skip_update(f64::NAN, 0.1));
        assert!(!skip_update(1.0, 0.1));
    }
}
