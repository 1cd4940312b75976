//! PID controller whose gains are rescheduled by fuzzy inference every tick.

use crate::controller::{
    Controller, ControllerSaturation, OutputLimits, PidGains, PidState, pid_law, skip_update,
};
use crate::error::ControlResult;
use crate::fuzzy::FuzzyGainScheduler;

/// Fuzzy gain-scheduled PID controller.
///
/// Error and change of error are clamped to the scheduler's universes before
/// use. The clamped error drives the P and I terms and is what gets
/// remembered as `last_error`; the derivative term is `Kd * ce` on the clamped
/// change of error.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyPidController {
    scheduler: FuzzyGainScheduler,
    set_point: f64,
    limits: OutputLimits,
    state: PidState,
    last_gains: Option<PidGains>,
    saturation: ControllerSaturation,
    degenerate_count: u64,
}

impl FuzzyPidController {
    /// Controller using the standard rule base.
    pub fn new(set_point: f64, limits: OutputLimits) -> ControlResult<Self> {
        Ok(Self::with_scheduler(
            FuzzyGainScheduler::new()?,
            set_point,
            limits,
        ))
    }

    pub fn with_scheduler(
        scheduler: FuzzyGainScheduler,
        set_point: f64,
        limits: OutputLimits,
    ) -> Self {
        Self {
            scheduler,
            set_point,
            limits,
            state: PidState::default(),
            last_gains: None,
            saturation: ControllerSaturation::default(),
            degenerate_count: 0,
        }
    }

    pub fn update(&mut self, process_variable: f64, dt: f64) -> f64 {
        if skip_update(process_variable, dt) {
            return self.state.last_output;
        }

        let raw_error = self.set_point - process_variable;
        let raw_change = (raw_error - self.state.last_error) / dt;
        let error = self.scheduler.error_universe().clamp(raw_error);
        let change = self.scheduler.change_universe().clamp(raw_change);

        let schedule = self.scheduler.schedule(error, change);
        if schedule.degenerate {
            self.degenerate_count += 1;
        }

        let step = pid_law(
            &schedule.gains,
            &self.limits,
            &self.state,
            error,
            change,
            dt,
        );
        self.state = step.state;
        self.saturation.record(step.saturation);
        self.last_gains = Some(schedule.gains);

        self.state.last_output
    }

    /// Gains scheduled on the most recent effective update.
    pub fn last_gains(&self) -> Option<PidGains> {
        self.last_gains
    }

    pub fn scheduler(&self) -> &FuzzyGainScheduler {
        &self.scheduler
    }

    pub fn limits(&self) -> OutputLimits {
        self.limits
    }

    /// Number of updates whose aggregate defuzzified to a zero gain.
    pub fn degenerate_count(&self) -> u64 {
        self.degenerate_count
    }

    pub fn set_setpoint(&mut self, set_point: f64) {
        self.set_point = set_point;
        self.reset();
    }

    pub fn set_point(&self) -> f64 {
        self.set_point
    }

    pub fn reset(&mut self) {
        self.state = PidState::default();
        self.last_gains = None;
        self.saturation.reset();
        self.degenerate_count = 0;
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

impl Controller for FuzzyPidController {
    fn update(&mut self, process_variable: f64, dt: f64) -> f64 {
        FuzzyPidController::update(self, process_variable, dt)
    }

    fn set_setpoint(&mut self, set_point: f64) {
        FuzzyPidController::set_setpoint(self, set_point)
    }

    fn set_point(&self) -> f64 {
        self.set_point
    }

    fn reset(&mut self) {
        FuzzyPidController::reset(self)
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

    fn controller(sp: f64) -> FuzzyPidController {
        FuzzyPidController::new(sp, OutputLimits::default()).unwrap()
    }

    #[test]
    fn at_setpoint_from_rest_output_is_zero() {
        let mut c = controller(25.0);
        let out = c.update(25.0, 0.1);
        assert_eq!(out, 0.0);
        let gains = c.last_gains().unwrap();
        assert!((gains.kp - 150.0).abs() < 1e-9);
        assert!((gains.ki - 30.0).abs() < 1e-9);
        assert!((gains.kd - 150.0).abs() < 1e-9);
    }

    #[test]
    fn error_is_clamped_to_its_universe() {
        let mut c = controller(100.0);
        c.update(0.0, 0.1);
        // Raw error 100 is remembered as the clamped 50
        assert_eq!(c.state().last_error, 50.0);
        assert_eq!(c.last_output(), 300.0);
    }

    #[test]
    fn zero_dt_is_noop() {
        let mut c = controller(25.0);
        let previous = c.update(10.0, 0.1);
        let before = *c.state();
        assert_eq!(c.update(0.0, 0.0), previous);
        assert_eq!(*c.state(), before);
    }

    #[test]
    fn setpoint_change_clears_state() {
        let mut c = controller(25.0);
        c.update(10.0, 0.1);
        assert!(c.state().integral > 0.0);
        c.set_setpoint(20.0);
        assert_eq!(*c.state(), PidState::default());
        assert_eq!(c.last_gains(), None);
    }

    #[test]
    fn usable_through_the_trait() {
        let mut c: Box<dyn Controller> = Box::new(controller(25.0));
        let out = c.update(0.0, 0.1);
        assert!((0.0..=300.0).contains(&out));
        assert_eq!(c.set_point(), 25.0);
    }
}
