//! Integration tests: relay-feedback auto-tuning on the default plant.

use tt_controls::{PidGains, RelayState, TunerPhase, TuningFailure};
use tt_sim::SimulationContext;

/// Drive frames until the experiment stops the context.
fn run_until_stopped(ctx: &mut SimulationContext) -> usize {
    let mut frames = 0;
    while ctx.is_running() {
        ctx.frame().unwrap();
        frames += 1;
        assert!(frames < 5_000, "tuning never terminated");
    }
    frames
}

#[test]
fn relay_tuning_completes_and_applies_gains() {
    let mut ctx = SimulationContext::with_defaults().unwrap();
    ctx.start_auto_tune(20.0, 200.0).unwrap();
    run_until_stopped(&mut ctx);

    assert_eq!(ctx.tuner().phase(), TunerPhase::Completed);
    assert!(ctx.time() < 60.0, "took {} s", ctx.time());
    assert_eq!(ctx.tuner().cycle_count(), 7);
    assert!(ctx.tuner().peaks().len() >= 4);
    assert!(ctx.tuner().troughs().len() >= 4);

    let report = *ctx.tuning_report().unwrap();
    assert!(report.tu > 4.0 && report.tu < 5.2, "Tu = {}", report.tu);
    assert!(report.amplitude > 0.0 && report.amplitude < 0.1);
    let expected_ku = 4.0 * 200.0 / (std::f64::consts::PI * report.amplitude);
    assert!((report.ku - expected_ku).abs() < 1e-6 * expected_ku);

    let gains = ctx.pid().gains();
    assert_eq!(gains, report.gains);
    assert!((gains.kp - 0.33 * report.ku).abs() < 1e-9 * report.ku);
    assert!((gains.ki - 0.6 * report.ku / report.tu).abs() < 1e-9 * report.ku);
    assert!((gains.kd - 0.11 * report.ku * report.tu).abs() < 1e-9 * report.ku);

    let status = ctx.snapshot().tuner_status;
    assert!(status.starts_with("Tuning complete"), "{status}");
}

#[test]
fn logged_extrema_straddle_the_tuning_setpoint() {
    let mut ctx = SimulationContext::with_defaults().unwrap();
    ctx.start_auto_tune(20.0, 300.0).unwrap();
    run_until_stopped(&mut ctx);

    assert_eq!(ctx.tuner().phase(), TunerPhase::Completed);
    for peak in ctx.tuner().peaks() {
        assert!(peak.level >= 20.0);
    }
    for trough in ctx.tuner().troughs() {
        assert!(trough.level < 20.0);
    }
    // Same-kind events are spaced by more than the debounce window
    for pair in ctx.tuner().troughs().windows(2) {
        assert!(pair[1].time - pair[0].time > 0.5);
    }
}

#[test]
fn too_small_amplitude_times_out_without_touching_gains() {
    let mut ctx = SimulationContext::with_defaults().unwrap();
    ctx.start_auto_tune(20.0, 100.0).unwrap();
    run_until_stopped(&mut ctx);

    assert_eq!(
        ctx.tuner().phase(),
        TunerPhase::Failed(TuningFailure::Timeout)
    );
    // 100 cm³/s cannot hold tank 2 at 20 cm: the relay never switches off
    assert!(ctx.tuner().peaks().is_empty());
    assert_eq!(ctx.tuner().relay_state(), RelayState::On);
    assert!(ctx.plant().state().h2 < 20.0);
    assert!(ctx.time() > 200.0 && ctx.time() < 200.5);

    assert_eq!(ctx.pid().gains(), PidGains::default());
    assert!(ctx.tuning_report().is_none());
    assert!(ctx.snapshot().tuner_status.contains("larger relay amplitude"));
}

#[test]
fn reset_cancels_a_running_experiment() {
    let mut ctx = SimulationContext::with_defaults().unwrap();
    ctx.start_auto_tune(20.0, 200.0).unwrap();
    for _ in 0..50 {
        ctx.frame().unwrap();
    }
    ctx.reset().unwrap();
    assert_eq!(ctx.tuner().phase(), TunerPhase::Idle);
    assert!(!ctx.is_running());
    assert_eq!(ctx.time(), 0.0);
}
