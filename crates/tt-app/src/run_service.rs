//! Closed-loop run execution and caching service.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use tt_project::Scenario;
use tt_results::{
    CsvSeriesWriter, FlowSummary, RunManifest, RunStore, RunSummary, RunType, TimeseriesRecord,
    write_csv,
};
use tt_sim::{Outflows, SimulationContext, TickSnapshot};

use crate::error::{AppError, AppResult};
use crate::progress::{self, RunProgressEvent, RunStage, SimProgress};
use crate::project_service;
use crate::runtime::{self, EventSchedule};

/// Options for running simulations.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub use_cache: bool,
    pub engine_version: String,
    /// Overrides `simulation.duration_s`.
    pub duration_s: Option<f64>,
    /// Also write the level history as CSV.
    pub csv_path: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            duration_s: None,
            csv_path: None,
        }
    }
}

pub struct RunRequest<'a> {
    pub scenario_path: &'a Path,
    pub options: RunOptions,
}

#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub elapsed_wall_s: f64,
    /// Rows written to the CSV file, when one was requested.
    pub csv_rows: Option<usize>,
}

/// Whole-run counters of a closed-loop simulation.
#[derive(Debug, Clone, Default)]
pub struct ClosedLoopRun {
    pub records: Vec<TimeseriesRecord>,
    pub steps: usize,
    pub level_clamps: u64,
    pub output_saturations: u64,
    pub final_outflows: Outflows,
}

fn flow_summary(outflows: &Outflows) -> FlowSummary {
    let [tank_1_lpm, tank_2_lpm, interconnect_lpm] = outflows.litres_per_minute();
    FlowSummary {
        tank_1_lpm,
        tank_2_lpm,
        interconnect_lpm,
    }
}

pub(crate) fn step_count(t_end_s: f64, dt_s: f64) -> usize {
    ((t_end_s / dt_s).round() as usize).max(1)
}

pub(crate) fn to_record(snap: &TickSnapshot) -> TimeseriesRecord {
    TimeseriesRecord {
        time_s: snap.time,
        setpoint_cm: snap.setpoint,
        h1_cm: snap.h1,
        h2_cm: snap.h2,
        inflow_cm3_s: snap.controller_output,
        disturbance_active: snap.disturbance_active,
    }
}

fn output_clamped(ctx: &SimulationContext) -> bool {
    ctx.controller().saturation().last.output.is_clamped()
}

/// Simulate `scenario` for `t_end_s` seconds with its scheduled events.
///
/// Every `record_every`-th tick and the final tick are recorded and handed
/// to `on_record` as they are produced.
pub fn simulate_closed_loop(
    scenario: &Scenario,
    t_end_s: f64,
    mut on_record: impl FnMut(&TimeseriesRecord, &SimProgress) -> AppResult<()>,
) -> AppResult<ClosedLoopRun> {
    let dt = scenario.simulation.dt_s;
    let record_every = scenario.simulation.record_every.max(1);
    let steps = step_count(t_end_s, dt);

    let mut ctx = runtime::build_context(scenario)?;
    let mut events = EventSchedule::new(&scenario.events);
    let mut run = ClosedLoopRun {
        steps,
        ..ClosedLoopRun::default()
    };

    tracing::info!(
        scenario = %scenario.name,
        controller = %ctx.active_controller(),
        steps,
        dt,
        "closed-loop run started"
    );

    ctx.start();
    for step in 1..=steps {
        events.fire_due(&mut ctx, dt)?;
        let snap = ctx.step(dt)?;
        if output_clamped(&ctx) {
            run.output_saturations += 1;
        }

        if step % record_every == 0 || step == steps {
            let record = to_record(&snap);
            let progress = SimProgress {
                sim_time_s: snap.time,
                t_end_s,
                fraction_complete: step as f64 / steps as f64,
                step,
            };
            on_record(&record, &progress)?;
            run.records.push(record);
        }
    }
    ctx.stop();

    run.level_clamps = ctx.plant().saturation().total();
    run.final_outflows = ctx.plant().outflows();
    tracing::info!(
        final_h2 = ctx.plant().state().h2,
        level_clamps = run.level_clamps,
        output_saturations = run.output_saturations,
        "closed-loop run finished"
    );
    Ok(run)
}

fn open_csv(path: &Path) -> AppResult<CsvSeriesWriter<BufWriter<File>>> {
    let file = File::create(path).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(CsvSeriesWriter::new(BufWriter::new(file))?)
}

/// Execute or load a run.
pub fn ensure_run(request: &RunRequest) -> AppResult<RunResponse> {
    ensure_run_with_progress(request, None)
}

/// Execute or load a run and stream progress events.
pub fn ensure_run_with_progress(
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let options = &request.options;

    progress::emit(&mut progress_cb, RunStage::LoadingScenario, started, "Loading scenario");
    let mut scenario = project_service::load_scenario(request.scenario_path)?;
    if let Some(duration) = options.duration_s {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(AppError::InvalidInput(format!(
                "duration must be positive, got {duration}"
            )));
        }
        scenario.simulation.duration_s = duration;
    }

    progress::emit(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let dt_s = scenario.simulation.dt_s;
    let t_end_s = scenario.simulation.duration_s;
    let run_type = RunType::ClosedLoop {
        controller: scenario.controller.active,
        dt_s,
        t_end_s,
        steps: step_count(t_end_s, dt_s),
    };
    let run_id = tt_results::compute_run_id(&scenario, &run_type, &options.engine_version);
    let store = RunStore::for_scenario(request.scenario_path)?;

    if options.use_cache && store.has_run(&run_id) {
        progress::emit(
            &mut progress_cb,
            RunStage::LoadingCachedResult,
            started,
            "Loading cached run",
        );
        let manifest = store.load_manifest(&run_id)?;
        let csv_rows = match &options.csv_path {
            Some(path) => Some(export_records(path, &store.load_timeseries(&run_id)?)?),
            None => None,
        };
        progress::emit(&mut progress_cb, RunStage::Completed, started, "Loaded cached run");
        return Ok(RunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            csv_rows,
        });
    }

    let mut csv = match &options.csv_path {
        Some(path) => Some(open_csv(path)?),
        None => None,
    };
    // Roughly twenty progress events per run
    let report_every = (step_count(t_end_s, dt_s) / 20).max(1);
    let mut next_report = report_every;
    let run = simulate_closed_loop(&scenario, t_end_s, |record, sim| {
        if let Some(writer) = csv.as_mut() {
            writer.write_record(record)?;
        }
        if sim.step >= next_report {
            progress::emit_sim(&mut progress_cb, RunStage::Simulating, started, sim.clone());
            next_report = sim.step + report_every;
        }
        Ok(())
    })?;
    let csv_rows = match csv {
        Some(writer) => {
            let rows = writer.rows();
            writer.finish()?;
            Some(rows)
        }
        None => None,
    };

    progress::emit(&mut progress_cb, RunStage::SavingResults, started, "Saving results");
    let summary = tt_results::summarize(
        &run.records,
        (scenario.controller.output_min, scenario.controller.output_max),
    )
    .map(|s| RunSummary {
        level_clamps: run.level_clamps,
        output_saturations: run.output_saturations,
        final_outflows: Some(flow_summary(&run.final_outflows)),
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

    progress::emit(&mut progress_cb, RunStage::Completed, started, "Run completed");
    Ok(RunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        elapsed_wall_s: started.elapsed().as_secs_f64(),
        csv_rows,
    })
}

fn export_records(path: &Path, records: &[TimeseriesRecord]) -> AppResult<usize> {
    let file = File::create(path).map_err(|e| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut out = write_csv(BufWriter::new(file), records)?;
    out.flush()?;
    Ok(records.len())
}

/// Write a stored run's level history as CSV to `out`; returns the row count.
pub fn export_run_csv(scenario_path: &Path, run_id: &str, out: impl Write) -> AppResult<usize> {
    let (_, records) = load_run(scenario_path, run_id)?;
    write_csv(out, &records)?;
    Ok(records.len())
}

/// Stored runs of the scenario at `scenario_path`, most recent first.
pub fn list_runs(scenario_path: &Path) -> AppResult<Vec<RunManifest>> {
    let scenario = project_service::load_scenario(scenario_path)?;
    let store = RunStore::for_scenario(scenario_path)?;

    let mut runs = store.list_runs(&scenario.name)?;
    runs.reverse();
    Ok(runs)
}

pub fn load_run(
    scenario_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<TimeseriesRecord>)> {
    let store = RunStore::for_scenario(scenario_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_timeseries(run_id)?;

    Ok((manifest, records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_count_rounds_to_nearest_tick() {
        assert_eq!(step_count(60.0, 0.1), 600);
        assert_eq!(step_count(0.3, 0.1), 3);
        assert_eq!(step_count(0.01, 0.1), 1);
    }

    #[test]
    fn records_follow_record_every() {
        let mut scenario = Scenario::default();
        scenario.simulation.record_every = 4;
        let mut seen = 0;
        let run = simulate_closed_loop(&scenario, 1.0, |_, _| {
            seen += 1;
            Ok(())
        })
        .unwrap();
        // ticks 4 and 8, plus the final tick 10
        assert_eq!(run.records.len(), 3);
        assert_eq!(seen, 3);
        assert!((run.records[2].time_s - 1.0).abs() < 1e-9);
        // Empty tanks start far below setpoint: full inflow
        assert_eq!(run.records[0].inflow_cm3_s, 300.0);
        assert_eq!(run.output_saturations, 10);
    }

    #[test]
    fn record_callback_error_aborts_the_run() {
        let scenario = Scenario::default();
        let err = simulate_closed_loop(&scenario, 1.0, |_, _| {
            Err(AppError::InvalidInput("stop".to_string()))
        })
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
