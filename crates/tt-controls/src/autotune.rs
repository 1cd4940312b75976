//! Relay-feedback auto-tuning.
//!
//! The tuner replaces the controller with a bang-bang relay around the tuning
//! setpoint: full `amplitude` inflow while the level is below the setpoint,
//! no inflow once it reaches it. The resulting limit cycle gives the ultimate
//! period `Tu` and, through the describing-function approximation, the
//! ultimate gain `Ku = 4d / (π a)`.
//!
//! Each switch to On logs a trough and each switch to Off logs a peak. Events
//! of one kind closer together than the debounce window are dropped, which
//! keeps level chatter right at the setpoint from counting as cycles.

use crate::error::{ControlError, ControlResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tt_core::mean;

/// Relay experiment constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelayTunerConfig {
    /// Cycles ignored while the oscillation settles.
    pub transient_cycles: u32,
    /// Cycles the measurement is taken over.
    pub measurement_cycles: u32,
    /// Seconds after start before the experiment is abandoned.
    pub timeout_s: f64,
    /// Minimum spacing between two logged events of the same kind (s).
    pub debounce_window_s: f64,
}

impl Default for RelayTunerConfig {
    fn default() -> Self {
        Self {
            transient_cycles: 3,
            measurement_cycles: 4,
            timeout_s: 200.0,
            debounce_window_s: 0.5,
        }
    }
}

impl RelayTunerConfig {
    pub fn validate(&self) -> ControlResult<()> {
        if self.measurement_cycles < 2 {
            return Err(ControlError::InvalidArg {
                what: "measurement_cycles must be at least 2 to measure a period",
            });
        }
        if self
            .transient_cycles
            .checked_add(self.measurement_cycles)
            .is_none()
        {
            return Err(ControlError::InvalidArg {
                what: "transient_cycles + measurement_cycles overflows",
            });
        }
        if !(self.timeout_s.is_finite() && self.timeout_s > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "timeout_s must be positive",
            });
        }
        if !(self.debounce_window_s.is_finite() && self.debounce_window_s >= 0.0) {
            return Err(ControlError::InvalidArg {
                what: "debounce_window_s must be non-negative",
            });
        }
        Ok(())
    }

    /// Troughs that must be logged before the measurement can complete.
    pub fn cycles_required(&self) -> u32 {
        self.transient_cycles.saturating_add(self.measurement_cycles)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayState {
    On,
    Off,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TuningFailure {
    /// No completed measurement within the timeout.
    Timeout,
    /// Logged events gave a zero or non-finite amplitude or period.
    NoOscillation,
}

impl std::fmt::Display for TuningFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningFailure::Timeout => f.write_str("timeout"),
            TuningFailure::NoOscillation => f.write_str("no measurable oscillation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TunerPhase {
    Idle,
    Running,
    Completed,
    Failed(TuningFailure),
}

/// A relay switch that was logged as a peak or trough.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OscillationEvent {
    pub time: f64,
    pub level: f64,
}

/// Ultimate gain and period measured by a completed experiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TuningResult {
    pub ku: f64,
    pub tu: f64,
    /// Mean peak-to-trough distance `a` (cm).
    pub amplitude: f64,
}

/// Relay auto-tuner state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayAutoTuner {
    config: RelayTunerConfig,
    phase: TunerPhase,
    relay: RelayState,
    setpoint: f64,
    amplitude: f64,
    start_time: f64,
    cycle_count: u32,
    peaks: Vec<OscillationEvent>,
    troughs: Vec<OscillationEvent>,
    result: Option<TuningResult>,
}

impl Default for RelayAutoTuner {
    fn default() -> Self {
        Self {
            config: RelayTunerConfig::default(),
            phase: TunerPhase::Idle,
            relay: RelayState::Off,
            setpoint: 0.0,
            amplitude: 0.0,
            start_time: 0.0,
            cycle_count: 0,
            peaks: Vec::new(),
            troughs: Vec::new(),
            result: None,
        }
    }
}

impl RelayAutoTuner {
    pub fn new(config: RelayTunerConfig) -> ControlResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    /// Begin a new experiment at time `now`, discarding any previous one.
    pub fn start(&mut self, setpoint: f64, amplitude: f64, now: f64) -> ControlResult<()> {
        if !setpoint.is_finite() {
            return Err(ControlError::InvalidArg {
                what: "tuning setpoint must be finite",
            });
        }
        if !(amplitude.is_finite() && amplitude > 0.0) {
            return Err(ControlError::InvalidArg {
                what: "relay amplitude must be positive",
            });
        }

        self.phase = TunerPhase::Running;
        self.relay = RelayState::Off;
        self.setpoint = setpoint;
        self.amplitude = amplitude;
        self.start_time = now;
        self.cycle_count = 0;
        self.peaks.clear();
        self.troughs.clear();
        self.result = None;

        tracing::info!(setpoint, amplitude, start = now, "relay tuning started");
        Ok(())
    }

    /// Advance the experiment with the measured `level` at time `now`.
    ///
    /// Returns the relay inflow to apply this tick, or `None` when the tuner
    /// is not running or has just timed out (the plant must not advance).
    pub fn step(&mut self, level: f64, now: f64) -> Option<f64> {
        if self.phase != TunerPhase::Running {
            return None;
        }

        if now - self.start_time > self.config.timeout_s {
            self.fail(TuningFailure::Timeout);
            return None;
        }

        let inflow = if level < self.setpoint {
            if self.relay != RelayState::On {
                self.relay = RelayState::On;
                if self.log_event(Extremum::Trough, now, level) {
                    self.cycle_count += 1;
                }
            }
            self.amplitude
        } else {
            if self.relay != RelayState::Off {
                self.relay = RelayState::Off;
                self.log_event(Extremum::Peak, now, level);
            }
            0.0
        };

        if self.measurement_ready() {
            match self.extract() {
                Some(result) => {
                    tracing::info!(
                        ku = result.ku,
                        tu = result.tu,
                        amplitude = result.amplitude,
                        cycles = self.cycle_count,
                        "relay tuning completed"
                    );
                    self.result = Some(result);
                    self.phase = TunerPhase::Completed;
                }
                None => self.fail(TuningFailure::NoOscillation),
            }
        }

        Some(inflow)
    }

    /// Abandon the experiment and return to `Idle`.
    pub fn cancel(&mut self) {
        if self.phase == TunerPhase::Running {
            tracing::info!(cycles = self.cycle_count, "relay tuning cancelled");
        }
        self.phase = TunerPhase::Idle;
        self.relay = RelayState::Off;
    }

    pub fn phase(&self) -> TunerPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == TunerPhase::Running
    }

    pub fn relay_state(&self) -> RelayState {
        self.relay
    }

    pub fn config(&self) -> &RelayTunerConfig {
        &self.config
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    pub fn peaks(&self) -> &[OscillationEvent] {
        &self.peaks
    }

    pub fn troughs(&self) -> &[OscillationEvent] {
        &self.troughs
    }

    pub fn result(&self) -> Option<&TuningResult> {
        self.result.as_ref()
    }

    /// Human-readable progress line for hosts.
    pub fn status_message(&self) -> String {
        match self.phase {
            TunerPhase::Idle => String::new(),
            TunerPhase::Running => format!(
                "Relay tuning: cycle {}/{}",
                self.cycle_count,
                self.config.cycles_required()
            ),
            TunerPhase::Completed => match self.result {
                Some(r) => format!("Tuning complete: Ku={:.2}, Tu={:.2} s", r.ku, r.tu),
                None => "Tuning complete".to_string(),
            },
            TunerPhase::Failed(TuningFailure::Timeout) => format!(
                "Tuning timed out after {:.0} s: the level may not be oscillating. \
                 Retry with a larger relay amplitude.",
                self.config.timeout_s
            ),
            TunerPhase::Failed(TuningFailure::NoOscillation) => {
                "Tuning failed: oscillation too small to measure".to_string()
            }
        }
    }

    fn fail(&mut self, failure: TuningFailure) {
        tracing::info!(
            %failure,
            cycles = self.cycle_count,
            peaks = self.peaks.len(),
            troughs = self.troughs.len(),
            "relay tuning failed"
        );
        self.phase = TunerPhase::Failed(failure);
    }

    /// Returns true when the event was logged.
    fn log_event(&mut self, kind: Extremum, time: f64, level: f64) -> bool {
        let window = self.config.debounce_window_s;
        let log = match kind {
            Extremum::Peak => &mut self.peaks,
            Extremum::Trough => &mut self.troughs,
        };
        let debounced = log.last().is_some_and(|prev| time - prev.time <= window);
        if debounced {
            tracing::trace!(?kind, time, level, "relay switch debounced");
            return false;
        }
        log.push(OscillationEvent { time, level });
        tracing::debug!(?kind, time, level, "relay switch logged");
        true
    }

    fn measurement_ready(&self) -> bool {
        let n = self.config.measurement_cycles as usize;
        self.cycle_count >= self.config.cycles_required()
            && self.peaks.len() >= n
            && self.troughs.len() >= n
    }

    fn extract(&self) -> Option<TuningResult> {
        let n = self.config.measurement_cycles as usize;
        let peaks = &self.peaks[self.peaks.len() - n..];
        let troughs = &self.troughs[self.troughs.len() - n..];

        let periods: Vec<f64> = peaks
            .windows(2)
            .chain(troughs.windows(2))
            .map(|w| w[1].time - w[0].time)
            .collect();
        let tu = mean(&periods)?;

        let swings: Vec<f64> = peaks
            .iter()
            .zip(troughs)
            .map(|(p, t)| (p.level - t.level).abs())
            .collect();
        let amplitude = mean(&swings)?;

        if !(tu.is_finite() && tu > 0.0 && amplitude.is_finite() && amplitude > 0.0) {
            return None;
        }

        Some(TuningResult {
            ku: 4.0 * self.amplitude / (PI * amplitude),
            tu,
            amplitude,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Extremum {
    Peak,
    Trough,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(setpoint: f64, amplitude: f64) -> RelayAutoTuner {
        let mut tuner = RelayAutoTuner::new(RelayTunerConfig::default()).unwrap();
        tuner.start(setpoint, amplitude, 0.0).unwrap();
        tuner
    }

    #[test]
    fn start_validates_inputs() {
        let mut tuner = RelayAutoTuner::default();
        assert!(tuner.start(f64::NAN, 100.0, 0.0).is_err());
        assert!(tuner.start(20.0, 0.0, 0.0).is_err());
        assert!(tuner.start(20.0, -5.0, 0.0).is_err());
        assert_eq!(tuner.phase(), TunerPhase::Idle);
        assert!(tuner.start(20.0, 100.0, 3.0).is_ok());
        assert_eq!(tuner.phase(), TunerPhase::Running);
        assert_eq!(tuner.relay_state(), RelayState::Off);
        assert_eq!(tuner.start_time(), 3.0);
    }

    #[test]
    fn config_validation() {
        assert!(RelayTunerConfig::default().validate().is_ok());
        let bad = RelayTunerConfig {
            measurement_cycles: 1,
            ..RelayTunerConfig::default()
        };
        assert!(RelayAutoTuner::new(bad).is_err());
        let bad = RelayTunerConfig {
            timeout_s: 0.0,
            ..RelayTunerConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn huge_cycle_counts_are_rejected() {
        let huge = RelayTunerConfig {
            transient_cycles: u32::MAX,
            ..RelayTunerConfig::default()
        };
        assert!(RelayAutoTuner::new(huge).is_err());
        assert_eq!(huge.cycles_required(), u32::MAX);

        let edge = RelayTunerConfig {
            transient_cycles: u32::MAX - 4,
            ..RelayTunerConfig::default()
        };
        let mut tuner = RelayAutoTuner::new(edge).unwrap();
        tuner.start(20.0, 100.0, 0.0).unwrap();
        assert_eq!(tuner.step(10.0, 0.0), Some(100.0));
        assert!(tuner.status_message().contains(&u32::MAX.to_string()));
    }

    #[test]
    fn relay_law_switches_on_level() {
        let mut tuner = running(20.0, 150.0);
        assert_eq!(tuner.step(10.0, 0.0), Some(150.0));
        assert_eq!(tuner.relay_state(), RelayState::On);
        assert_eq!(tuner.step(20.0, 1.0), Some(0.0));
        assert_eq!(tuner.relay_state(), RelayState::Off);
        assert_eq!(tuner.troughs().len(), 1);
        assert_eq!(tuner.peaks().len(), 1);
        assert_eq!(tuner.cycle_count(), 1);
    }

    #[test]
    fn crossings_within_window_are_debounced() {
        let mut tuner = running(20.0, 100.0);
        tuner.step(19.9, 0.0);
        tuner.step(20.1, 0.1);
        tuner.step(19.9, 0.2);
        tuner.step(20.1, 0.3);
        assert_eq!(tuner.troughs().len(), 1);
        assert_eq!(tuner.peaks().len(), 1);
        assert_eq!(tuner.cycle_count(), 1);

        // Exactly one window later is still debounced
        tuner.step(19.9, 0.5);
        assert_eq!(tuner.troughs().len(), 1);
        tuner.step(20.1, 0.55);
        tuner.step(19.9, 0.6);
        assert_eq!(tuner.troughs().len(), 2);
        assert_eq!(tuner.cycle_count(), 2);
    }

    #[test]
    fn timeout_fails_without_inflow() {
        let mut tuner = running(20.0, 100.0);
        assert!(tuner.step(5.0, 200.0).is_some());
        assert_eq!(tuner.step(5.0, 200.1), None);
        assert_eq!(tuner.phase(), TunerPhase::Failed(TuningFailure::Timeout));
        assert!(tuner.result().is_none());
        assert!(tuner.status_message().contains("larger relay amplitude"));
        // Further ticks do nothing
        assert_eq!(tuner.step(5.0, 201.0), None);
    }

    /// Drive an ideal square oscillation: trough at t = 4k, peak at t = 4k + 2.
    fn drive_square_wave(tuner: &mut RelayAutoTuner, swing: f64) {
        let mut t = 0.0;
        while tuner.is_running() && t < 100.0 {
            tuner.step(20.0 - swing / 2.0, t);
            tuner.step(20.0 + swing / 2.0, t + 2.0);
            t += 4.0;
        }
    }

    #[test]
    fn completes_after_transient_and_measurement_cycles() {
        let mut tuner = running(20.0, 100.0);
        drive_square_wave(&mut tuner, 1.0);

        assert_eq!(tuner.phase(), TunerPhase::Completed);
        assert_eq!(tuner.cycle_count(), 7);
        let result = tuner.result().copied().unwrap();
        assert!((result.tu - 4.0).abs() < 1e-12);
        assert!((result.amplitude - 1.0).abs() < 1e-12);
        assert!((result.ku - 400.0 / PI).abs() < 1e-9);
        assert!(tuner.status_message().starts_with("Tuning complete"));
    }

    #[test]
    fn zero_period_is_not_an_oscillation() {
        let mut tuner = running(20.0, 100.0);
        for _ in 0..4 {
            tuner.peaks.push(OscillationEvent { time: 1.0, level: 20.5 });
            tuner.troughs.push(OscillationEvent { time: 1.0, level: 19.5 });
        }
        assert!(tuner.extract().is_none());
    }

    #[test]
    fn cancel_returns_to_idle() {
        let mut tuner = running(20.0, 100.0);
        tuner.step(10.0, 0.0);
        tuner.cancel();
        assert_eq!(tuner.phase(), TunerPhase::Idle);
        assert_eq!(tuner.step(10.0, 0.1), None);
    }
}
