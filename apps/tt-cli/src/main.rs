use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tt_app::{
    AppResult, AutotuneRequest, RunOptions, RunProgressEvent, RunRequest, RunStage,
    project_service, run_service, tuning_service,
};
use tt_results::{RunManifest, RunType};

#[derive(Parser)]
#[command(name = "tt-cli")]
#[command(about = "Twin-tank level control simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default scenario file
    Init {
        /// Where to write the scenario (.yaml or .json)
        scenario_path: PathBuf,
    },
    /// Validate a scenario file
    Validate {
        /// Path to the scenario file
        scenario_path: PathBuf,
    },
    /// Run the closed-loop simulation with the scenario's events
    Run {
        /// Path to the scenario file
        scenario_path: PathBuf,
        /// Simulated time in seconds (overrides the scenario)
        #[arg(long)]
        duration: Option<f64>,
        /// Also write the level history to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// Relay-feedback auto-tuning of the PID gains
    Autotune {
        /// Path to the scenario file
        scenario_path: PathBuf,
        /// Tuning setpoint in cm
        #[arg(long)]
        setpoint: Option<f64>,
        /// Relay amplitude in cm³/s
        #[arg(long)]
        amplitude: Option<f64>,
        /// Write the tuned gains into the scenario file
        #[arg(long)]
        apply: bool,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for a scenario
    Runs {
        /// Path to the scenario file
        scenario_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the scenario file
        scenario_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export a run's level history as CSV
    ExportSeries {
        /// Path to the scenario file
        scenario_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { scenario_path } => cmd_init(&scenario_path),
        Commands::Validate { scenario_path } => cmd_validate(&scenario_path),
        Commands::Run {
            scenario_path,
            duration,
            csv,
            no_cache,
        } => cmd_run(&scenario_path, duration, csv, !no_cache),
        Commands::Autotune {
            scenario_path,
            setpoint,
            amplitude,
            apply,
            no_cache,
        } => cmd_autotune(&scenario_path, setpoint, amplitude, apply, !no_cache),
        Commands::Runs { scenario_path } => cmd_runs(&scenario_path),
        Commands::ShowRun {
            scenario_path,
            run_id,
        } => cmd_show_run(&scenario_path, &run_id),
        Commands::ExportSeries {
            scenario_path,
            run_id,
            output,
        } => cmd_export_series(&scenario_path, &run_id, output.as_deref()),
    }
}

fn cmd_init(scenario_path: &Path) -> AppResult<()> {
    let scenario = project_service::init_scenario(scenario_path)?;
    println!(
        "✓ Wrote scenario '{}' to {}",
        scenario.name,
        scenario_path.display()
    );
    Ok(())
}

fn cmd_validate(scenario_path: &Path) -> AppResult<()> {
    println!("Validating scenario: {}", scenario_path.display());
    let scenario = project_service::load_scenario(scenario_path)?;
    project_service::validate_scenario(&scenario)?;
    println!("✓ Scenario is valid");
    println!(
        "  {} s at dt = {} s, {} controller, {} event(s)",
        scenario.simulation.duration_s,
        scenario.simulation.dt_s,
        tt_app::runtime::controller_kind(scenario.controller.active),
        scenario.events.len()
    );
    Ok(())
}

/// Progress printer that redraws at most every 100 ms or on a stage change.
fn progress_printer() -> impl FnMut(RunProgressEvent) {
    let mut last_emit = Instant::now();
    let mut last_stage = None;
    move |event: RunProgressEvent| {
        let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
        if emit_now {
            render_cli_progress(&event);
            last_stage = Some(event.stage);
            last_emit = Instant::now();
        }
    }
}

fn cmd_run(
    scenario_path: &Path,
    duration: Option<f64>,
    csv: Option<PathBuf>,
    use_cache: bool,
) -> AppResult<()> {
    println!("Running scenario: {}", scenario_path.display());

    let request = RunRequest {
        scenario_path,
        options: RunOptions {
            use_cache,
            duration_s: duration,
            csv_path: csv.clone(),
            ..RunOptions::default()
        },
    };

    let mut printer = progress_printer();
    let response = run_service::ensure_run_with_progress(&request, Some(&mut printer))?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!(
            "✓ Simulation completed in {:.3}s: {}",
            response.elapsed_wall_s, response.run_id
        );
    }
    print_manifest(&response.manifest);

    if let (Some(path), Some(rows)) = (csv, response.csv_rows) {
        println!("✓ Wrote {} rows to {}", rows, path.display());
    }
    Ok(())
}

fn cmd_autotune(
    scenario_path: &Path,
    setpoint: Option<f64>,
    amplitude: Option<f64>,
    apply: bool,
    use_cache: bool,
) -> AppResult<()> {
    println!("Relay auto-tuning: {}", scenario_path.display());

    let request = AutotuneRequest {
        scenario_path,
        setpoint_cm: setpoint,
        amplitude,
        apply_gains: apply,
        options: RunOptions {
            use_cache,
            ..RunOptions::default()
        },
    };

    let mut printer = progress_printer();
    let response = tuning_service::ensure_autotune_with_progress(&request, Some(&mut printer))?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    }
    println!("{}", response.outcome.status);

    match &response.outcome.result {
        Some(g) => {
            println!("  Ku = {:.3}", g.ku);
            println!("  Tu = {:.3} s", g.tu);
            println!("  Oscillation amplitude = {:.4} cm", g.amplitude_cm);
            println!("Ziegler-Nichols (no overshoot) gains:");
            println!("  Kp = {:.4}", g.kp);
            println!("  Ki = {:.4}", g.ki);
            println!("  Kd = {:.4}", g.kd);
            if response.gains_applied {
                println!("✓ Gains written to {}", scenario_path.display());
            }
        }
        None => println!("  PID gains unchanged"),
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (event.stage, &event.sim) {
        (RunStage::Simulating | RunStage::Tuning, Some(s)) => {
            let width = 28usize;
            let filled = ((s.fraction_complete * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            print!(
                "\r[{}] {:>6.2}%  phase={}  t={:.1}/{:.1}s  step={}  elapsed={:.1}s",
                bar,
                s.fraction_complete * 100.0,
                event.stage.label(),
                s.sim_time_s,
                s.t_end_s,
                s.step,
                event.elapsed_wall_s
            );
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
        }
    }
    let _ = io::stdout().flush();
}

fn describe_run_type(run_type: &RunType) -> String {
    match run_type {
        RunType::ClosedLoop {
            controller,
            dt_s,
            t_end_s,
            ..
        } => format!("closed loop ({controller:?}), {t_end_s} s at dt = {dt_s} s"),
        RunType::RelayTuning {
            setpoint_cm,
            relay_amplitude,
            ..
        } => format!("relay tuning at {setpoint_cm} cm, amplitude {relay_amplitude} cm³/s"),
    }
}

fn print_manifest(manifest: &RunManifest) {
    println!("  Run: {}", describe_run_type(&manifest.run_type));
    let Some(s) = &manifest.summary else {
        println!("  No samples recorded");
        return;
    };
    println!("\nSummary:");
    println!("  Samples:        {}", s.samples);
    println!("  Final time:     {:.1} s", s.final_time_s);
    println!("  Final H1:       {:.3} cm", s.final_h1_cm);
    println!("  Final H2:       {:.3} cm", s.final_h2_cm);
    println!("  Peak H2:        {:.3} cm", s.peak_h2_cm);
    println!("  Overshoot:      {:.3} cm", s.overshoot_cm);
    println!(
        "  Saturated:      {:.1}% of samples",
        100.0 * s.saturated_fraction
    );
    println!("  Output clamps:  {}", s.output_saturations);
    println!("  Level clamps:   {}", s.level_clamps);
    if let Some(flows) = &s.final_outflows {
        println!(
            "  Final outflows: {:.2} / {:.2} L/min, interconnect {:.2} L/min",
            flows.tank_1_lpm, flows.tank_2_lpm, flows.interconnect_lpm
        );
    }
    if let Some(tuning) = &s.tuning {
        println!("  Tuning:         {}", tuning.status);
    }
}

fn cmd_runs(scenario_path: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(scenario_path)?;

    if runs.is_empty() {
        println!("No cached runs found for {}", scenario_path.display());
    } else {
        println!("Cached runs for '{}':", runs[0].scenario_name);
        for manifest in runs {
            println!(
                "  {} ({})  {}",
                manifest.run_id,
                manifest.timestamp,
                describe_run_type(&manifest.run_type)
            );
        }
    }
    Ok(())
}

fn cmd_show_run(scenario_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let (manifest, records) = run_service::load_run(scenario_path, run_id)?;
    println!("  Scenario: {}", manifest.scenario_name);
    println!("  Created:  {}", manifest.timestamp);
    println!("  Engine:   {}", manifest.engine_version);
    print_manifest(&manifest);
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        println!(
            "  Time range: {:.3} - {:.3} s ({} records)",
            first.time_s,
            last.time_s,
            records.len()
        );
    }
    Ok(())
}

fn cmd_export_series(scenario_path: &Path, run_id: &str, output: Option<&Path>) -> AppResult<()> {
    if let Some(path) = output {
        let file = std::fs::File::create(path)?;
        let rows = run_service::export_run_csv(scenario_path, run_id, io::BufWriter::new(file))?;
        println!("✓ Exported {} rows to {}", rows, path.display());
    } else {
        let stdout = io::stdout();
        run_service::export_run_csv(scenario_path, run_id, stdout.lock())?;
    }
    tracing::debug!(run_id, "series exported");
    Ok(())
}
