//! Classical PID controller.
//!
//! - Integral accumulates `Ki * e * dt` and is clamped to the output range
//! - Derivative acts on the raw error difference `(e - e_prev) / dt`
//! - Output is clamped to the output range
//! - Changing the setpoint clears all state (no bumpless transfer)

use crate::controller::{
    Controller, ControllerSaturation, OutputLimits, PidGains, PidState, pid_law, skip_update,
};

/// PID controller with integral clamping and output clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct PidController {
    gains: PidGains,
    set_point: f64,
    limits: OutputLimits,
    state: PidState,
    saturation: ControllerSaturation,
}

impl PidController {
    /// Create a new PID controller with cleared state.
    ///
    /// # Arguments
    ///
    /// * `gains` - Proportional, integral and derivative gains
    /// * `set_point` - Desired process variable
    /// * `limits` - Output range, also bounding the integral accumulator
    pub fn new(gains: PidGains, set_point: f64, limits: OutputLimits) -> Self {
        Self {
            gains,
            set_point,
            limits,
            state: PidState::default(),
            saturation: ControllerSaturation::default(),
        }
    }

    /// Compute the controller output for the measured `process_variable`.
    ///
    /// A non-positive `dt` (or a non-finite measurement) is a no-op that
    /// returns the previous output without touching any state.
    pub fn update(&mut self, process_variable: f64, dt: f64) -> f64 {
        if skip_update(process_variable, dt) {
            return self.state.last_output;
        }

        let error = self.set_point - process_variable;
        let error_rate = (error - self.state.last_error) / dt;

        let step = pid_law(
            &self.gains,
            &self.limits,
            &self.state,
            error,
            error_rate,
            dt,
        );
        self.state = step.state;
        self.saturation.record(step.saturation);

        self.state.last_output
    }

    /// Replace the gains. State is kept so tuning can be applied live.
    pub fn set_gains(&mut self, gains: PidGains) {
        tracing::debug!(kp = gains.kp, ki = gains.ki, kd = gains.kd, "PID gains updated");
        self.gains = gains;
    }

    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn limits(&self) -> OutputLimits {
        self.limits
    }

    /// Update the setpoint and clear the controller state.
    pub fn set_setpoint(&mut self, set_point: f64) {
        self.set_point = set_point;
        self.reset();
    }

    pub fn set_point(&self) -> f64 {
        self.set_point
    }

    /// Clear integral, last error and last output.
    pub fn reset(&mut self) {
        self.state = PidState::default();
        self.saturation.reset();
    }

    pub fn state(&self) -> &PidState {
        &self.state
    }

    pub fn last_output(&self) -> f64 {
        self.state.last_output
    }

    pub fn saturation(&self) -> &ControllerSaturation {
        &self.saturation
    }
}

impl Controller for PidController {
    fn update(&mut self, process_variable: f64, dt: f64) -> f64 {
        PidController::update(self, process_variable, dt)
    }

    fn set_setpoint(&mut self, set_point: f64) {
        PidController::set_setpoint(self, set_point)
    }

    fn set_point(&self) -> f64 {
        self.set_point
    }

    fn reset(&mut self) {
        PidController::reset(self)
    }

    fn last_output(&self) -> f64 {
        self.state.last_output
    }

    fn state(&self) -> &PidState {
        &self.state
    }

    fn saturation(&self) -> &ControllerSaturation {
        &self.saturation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tt_core::Clamped;

    fn controller(kp: f64, ki: f64, kd: f64, sp: f64) -> PidController {
        PidController::new(
            PidGains::new(kp, ki, kd).unwrap(),
            sp,
            OutputLimits::new(0.0, 300.0).unwrap(),
        )
    }

    #[test]
    fn proportional_only() {
        let mut pid = controller(2.0, 0.0, 0.0, 10.0);
        let output = pid.update(5.0, 0.1);
        assert!((output - 10.0).abs() < 1e-12);
    }

    #[test]
    fn first_update_derivative_kicks_from_zero_error() {
        let mut pid = controller(0.0, 0.0, 1.0, 10.0);
        // last_error starts at 0, so de/dt = (10 - 0) / 0.1
        let output = pid.update(0.0, 0.1);
        assert!((output - 100.0).abs() < 1e-9);
        // Constant error afterwards: no derivative action
        let output = pid.update(0.0, 0.1);
        assert!(output.abs() < 1e-9);
    }

    #[test]
    fn integral_accumulates_ki_times_error() {
        let mut pid = controller(0.0, 2.0, 0.0, 10.0);
        for _ in 0..10 {
            pid.update(9.0, 0.1);
        }
        // 10 steps * Ki(2) * e(1) * dt(0.1)
        assert!((pid.state().integral - 2.0).abs() < 1e-9);
        assert!((pid.last_output() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn anti_windup_holds_integral_at_output_max() {
        let mut pid = controller(83.5, 14.5, 120.0, 40.0);
        for _ in 0..10_000 {
            let output = pid.update(0.0, 0.1);
            assert!(output <= 300.0);
            assert!(pid.state().integral <= 300.0);
        }
        assert_eq!(pid.state().integral, 300.0);
        assert_eq!(pid.last_output(), 300.0);
        assert_eq!(pid.saturation().last.integral, Clamped::High);
        assert!(pid.saturation().output.high > 0);
    }

    #[test]
    fn negative_error_clamps_output_low() {
        let mut pid = controller(10.0, 1.0, 0.0, 0.0);
        let output = pid.update(20.0, 0.1);
        assert_eq!(output, 0.0);
        assert_eq!(pid.state().integral, 0.0);
        assert_eq!(pid.saturation().last.output, Clamped::Low);
    }

    #[test]
    fn zero_dt_is_noop() {
        let mut pid = controller(83.5, 14.5, 120.0, 25.0);
        let previous = pid.update(12.0, 0.1);
        let before = *pid.state();

        assert_eq!(pid.update(3.0, 0.0), previous);
        assert_eq!(pid.update(3.0, -1.0), previous);
        assert_eq!(*pid.state(), before);
    }

    #[test]
    fn setpoint_change_resets_state() {
        let mut pid = controller(83.5, 14.5, 120.0, 25.0);
        pid.update(10.0, 0.1);
        assert!(pid.state().integral > 0.0);

        pid.set_setpoint(20.0);
        assert_eq!(pid.set_point(), 20.0);
        assert_eq!(*pid.state(), PidState::default());
    }

    #[test]
    fn set_gains_keeps_state() {
        let mut pid = controller(1.0, 1.0, 0.0, 25.0);
        pid.update(10.0, 0.1);
        let before = *pid.state();
        pid.set_gains(PidGains::new(3.3, 1.2, 5.5).unwrap());
        assert_eq!(*pid.state(), before);
        assert_eq!(pid.gains().kp, 3.3);
    }
}
