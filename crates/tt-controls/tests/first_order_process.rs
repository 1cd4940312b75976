//! Controllers and the relay tuner against a first-order process with dead
//! time: `x' = (K·u(t − L) − x) / τ`, K = 2, τ = 5 s, L = 1 s.

use std::collections::VecDeque;

use tt_controls::{
    Controller, FuzzyPidController, OutputLimits, PidController, PidGains, RelayAutoTuner,
    RelayTunerConfig, TunerPhase, ziegler_nichols,
};

const DT: f64 = 0.05;

struct DeadTimeProcess {
    x: f64,
    pipeline: VecDeque<f64>,
}

impl DeadTimeProcess {
    fn new() -> Self {
        Self {
            x: 0.0,
            pipeline: std::iter::repeat_n(0.0, 20).collect(),
        }
    }

    fn advance(&mut self, u: f64) {
        self.pipeline.push_back(u);
        let delayed = self.pipeline.pop_front().unwrap_or(0.0);
        self.x += (2.0 * delayed - self.x) / 5.0 * DT;
    }
}

#[test]
fn pi_control_settles_without_large_overshoot() {
    let limits = OutputLimits::default();
    let mut pid = PidController::new(PidGains::new(1.0, 0.3, 0.0).unwrap(), 10.0, limits);
    let mut process = DeadTimeProcess::new();
    let mut peak: f64 = 0.0;
    for _ in 0..1200 {
        let u = pid.update(process.x, DT);
        process.advance(u);
        peak = peak.max(process.x);
    }
    assert!((process.x - 10.0).abs() < 1e-3, "final {}", process.x);
    assert!(peak < 12.0, "peak {peak}");
}

#[test]
fn controllers_are_interchangeable_behind_the_trait() {
    let limits = OutputLimits::new(0.0, 50.0).unwrap();
    let mut loops: Vec<Box<dyn Controller>> = vec![
        Box::new(PidController::new(PidGains::default(), 10.0, limits)),
        Box::new(FuzzyPidController::new(10.0, limits).unwrap()),
    ];
    for controller in loops.iter_mut() {
        let mut process = DeadTimeProcess::new();
        for _ in 0..400 {
            let u = controller.update(process.x, DT);
            assert!((0.0..=50.0).contains(&u));
            process.advance(u);
        }
        assert_eq!(controller.last_output(), controller.state().last_output);

        controller.set_setpoint(5.0);
        assert_eq!(controller.set_point(), 5.0);
        assert_eq!(controller.last_output(), 0.0);
    }
}

#[test]
fn relay_experiment_on_dead_time_process() {
    let mut tuner = RelayAutoTuner::new(RelayTunerConfig::default()).unwrap();
    tuner.start(10.0, 20.0, 0.0).unwrap();
    let mut process = DeadTimeProcess::new();

    let mut t = 0.0;
    while let Some(u) = tuner.step(process.x, t) {
        process.advance(u);
        t += DT;
        if tuner.phase() != TunerPhase::Running {
            break;
        }
    }

    assert_eq!(tuner.phase(), TunerPhase::Completed);
    assert!(t < 40.0, "took {t} s");
    let result = *tuner.result().unwrap();
    // Dead time plus lag gives a period of a few dead times
    assert!(result.tu > 4.0 && result.tu < 5.0, "Tu = {}", result.tu);
    let expected_ku = 4.0 * 20.0 / (std::f64::consts::PI * result.amplitude);
    assert!((result.ku - expected_ku).abs() < 1e-9 * expected_ku);

    let gains = ziegler_nichols::no_overshoot(&result);
    assert!((gains.kp - 0.33 * result.ku).abs() < 1e-9 * result.ku);
    assert!((gains.ki * result.tu - 0.6 * result.ku).abs() < 1e-9 * result.ku);
    assert!(tuner.status_message().starts_with("Tuning complete"));
}
