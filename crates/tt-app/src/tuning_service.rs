//! Relay auto-tuning runs.
//!
//! A tuning run always starts from a reset plant (empty tanks, valves fully
//! open); scheduled scenario events do not apply.

use std::path::Path;
use std::time::Instant;

use tt_controls::TunerPhase;
use tt_project::{PidGainsDef, Scenario};
use tt_results::{
    RunManifest, RunStore, RunSummary, RunType, TimeseriesRecord, TunedGains, TuningSummary,
};

use crate::error::{AppError, AppResult};
use crate::progress::{self, RunProgressEvent, RunStage, SimProgress};
use crate::project_service;
use crate::run_service::{RunOptions, step_count, to_record};
use crate::runtime;

pub struct AutotuneRequest<'a> {
    pub scenario_path: &'a Path,
    /// Defaults to `tuning.setpoint_cm`.
    pub setpoint_cm: Option<f64>,
    /// Defaults to `tuning.relay_amplitude`.
    pub amplitude: Option<f64>,
    /// Write the resulting gains into the scenario file.
    pub apply_gains: bool,
    pub options: RunOptions,
}

#[derive(Debug, Clone)]
pub struct AutotuneResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub outcome: TuningSummary,
    pub loaded_from_cache: bool,
    /// The scenario file was updated with the tuned gains.
    pub gains_applied: bool,
    pub elapsed_wall_s: f64,
}

#[derive(Debug, Clone)]
pub struct TuningRun {
    pub records: Vec<TimeseriesRecord>,
    pub outcome: TuningSummary,
    pub level_clamps: u64,
}

/// Run one relay experiment on the scenario's plant until it completes or
/// fails. `on_record` sees every `record_every`-th frame.
pub fn simulate_relay_tuning(
    scenario: &Scenario,
    setpoint_cm: f64,
    amplitude: f64,
    mut on_record: impl FnMut(&TimeseriesRecord, &SimProgress) -> AppResult<()>,
) -> AppResult<TuningRun> {
    let mut ctx = runtime::build_context(scenario)?;
    ctx.start_auto_tune(setpoint_cm, amplitude)?;

    let timeout_s = ctx.tuner().config().timeout_s;
    let record_every = scenario.simulation.record_every.max(1);
    // The tuner times out on its own; this only guards against a stuck loop.
    let max_frames = step_count(timeout_s, ctx.options().dt) + 2;

    let mut records = Vec::new();
    let mut frames = 0usize;
    while ctx.is_running() {
        let Some(snap) = ctx.frame()? else {
            break;
        };
        frames += 1;
        if frames > max_frames {
            return Err(AppError::Simulation(format!(
                "relay experiment still running after {} s",
                snap.time
            )));
        }

        if frames % record_every == 0 || !ctx.is_running() {
            let record = to_record(&snap);
            let progress = SimProgress {
                sim_time_s: snap.time,
                t_end_s: timeout_s,
                fraction_complete: (snap.time / timeout_s).min(1.0),
                step: frames,
            };
            on_record(&record, &progress)?;
            records.push(record);
        }
    }

    let tuner = ctx.tuner();
    let outcome = TuningSummary {
        completed: tuner.phase() == TunerPhase::Completed,
        status: tuner.status_message(),
        result: ctx.tuning_report().map(|report| TunedGains {
            ku: report.ku,
            tu: report.tu,
            amplitude_cm: report.amplitude,
            kp: report.gains.kp,
            ki: report.gains.ki,
            kd: report.gains.kd,
        }),
    };
    match tuner.phase() {
        TunerPhase::Completed => tracing::info!(time = ctx.time(), "relay tuning completed"),
        phase => tracing::warn!(time = ctx.time(), ?phase, "relay tuning did not complete"),
    }

    Ok(TuningRun {
        records,
        outcome,
        level_clamps: ctx.plant().saturation().total(),
    })
}

fn apply_gains(path: &Path, scenario: &mut Scenario, gains: &TunedGains) -> AppResult<()> {
    scenario.controller.pid = PidGainsDef {
        kp: gains.kp,
        ki: gains.ki,
        kd: gains.kd,
    };
    project_service::save_scenario(path, scenario)?;
    tracing::info!(path = %path.display(), "tuned gains written to scenario");
    Ok(())
}

pub fn ensure_autotune(request: &AutotuneRequest) -> AppResult<AutotuneResponse> {
    ensure_autotune_with_progress(request, None)
}

pub fn ensure_autotune_with_progress(
    request: &AutotuneRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<AutotuneResponse> {
    let started = Instant::now();
    let options = &request.options;

    progress::emit(&mut progress_cb, RunStage::LoadingScenario, started, "Loading scenario");
    let mut scenario = project_service::load_scenario(request.scenario_path)?;
    let setpoint_cm = request.setpoint_cm.unwrap_or(scenario.tuning.setpoint_cm);
    let amplitude = request.amplitude.unwrap_or(scenario.tuning.relay_amplitude);

    progress::emit(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let run_type = RunType::RelayTuning {
        setpoint_cm,
        relay_amplitude: amplitude,
        dt_s: scenario.simulation.dt_s,
    };
    let run_id = tt_results::compute_run_id(&scenario, &run_type, &options.engine_version);
    let store = RunStore::for_scenario(request.scenario_path)?;

    let (manifest, loaded_from_cache) = if options.use_cache && store.has_run(&run_id) {
        progress::emit(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            "Loading cached tuning run",
        );
        (store.load_manifest(&run_id)?, true)
    } else {
        let mut next_report = 0.0;
        let run = simulate_relay_tuning(&scenario, setpoint_cm, amplitude, |_, sim| {
            if sim.fraction_complete >= next_report {
                progress::emit_sim(&mut progress_cb, RunStage::Tuning, started, sim.clone());
                next_report = sim.fraction_complete + 0.05;
            }
            Ok(())
        })?;

        progress::emit(&mut progress_cb, RunStage::SavingResults, started, "Saving results");
        // Relay output sits at 0 or the amplitude on every tick
        let summary = tt_results::summarize(&run.records, (0.0, amplitude)).map(|s| RunSummary {
            level_clamps: run.level_clamps,
            tuning: Some(run.outcome.clone()),
            ..s
        });
        let manifest = RunManifest {
            run_id: run_id.clone(),
            scenario_name: scenario.name.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            run_type,
            engine_version: options.engine_version.clone(),
            summary,
        };
        store.save_run(&manifest, &run.records)?;
        (manifest, false)
    };

    let outcome = manifest
        .summary
        .as_ref()
        .and_then(|s| s.tuning.clone())
        .ok_or_else(|| AppError::Results(format!("run {run_id} has no tuning outcome")))?;

    let mut gains_applied = false;
    if request.apply_gains {
        if let Some(gains) = outcome.result.as_ref() {
            apply_gains(request.scenario_path, &mut scenario, gains)?;
            gains_applied = true;
        }
    }

    progress::emit(&mut progress_cb, RunStage::Completed, started, "Tuning finished");
    Ok(AutotuneResponse {
        run_id,
        manifest,
        outcome,
        loaded_from_cache,
        gains_applied,
        elapsed_wall_s: started.elapsed().as_secs_f64(),
    })
}
