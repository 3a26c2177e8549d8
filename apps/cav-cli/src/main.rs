use cav_app::{AppResult, SessionFormat, compile_config};
use cav_config::SimConfig;
use cav_history::HistoryStore;
use cav_session::{SessionData, SessionMeta};
use cav_sim::{ControlParameters, ScanParameter, ScanRequest, SimEngine, run_scan};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "cav-cli")]
#[command(about = "Virtual RF cavity simulator - headless front end", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate {
        /// Path to the configuration YAML file
        config_path: PathBuf,
    },
    /// Run a batch simulation and optionally save the session
    Run {
        /// Path to a configuration YAML file (defaults to the built-in cavity)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Number of simulation steps
        #[arg(long, default_value_t = 8192)]
        steps: usize,
        /// Drive in pulsed mode instead of CW
        #[arg(long)]
        pulsed: bool,
        /// Record control-parameter snapshots alongside the samples
        #[arg(long)]
        record: bool,
        /// RNG seed override for the microphonics sequence
        #[arg(long)]
        seed: Option<u64>,
        /// Session output path (.json or .csv)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sweep a control parameter and print the settled response
    Scan {
        /// Path to a configuration YAML file (defaults to the built-in cavity)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Parameter to sweep: amplitude, phase, freq_offset, beam_current, gain
        parameter: String,
        /// Sweep range minimum
        min: f64,
        /// Sweep range maximum
        max: f64,
        /// Number of setpoints
        #[arg(long, default_value_t = 20)]
        points: usize,
        /// Settling steps per setpoint
        #[arg(long, default_value_t = 100)]
        settle: usize,
    },
    /// Convert a structured session file to the tabular encoding
    Export {
        /// Input session file (.json)
        session_path: PathBuf,
        /// Output CSV path
        output: PathBuf,
    },
    /// Print session metadata and channel statistics
    Show {
        /// Session file (.json or .csv)
        session_path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::Run {
            config,
            steps,
            pulsed,
            record,
            seed,
            output,
        } => cmd_run(config.as_deref(), steps, pulsed, record, seed, output.as_deref()),
        Commands::Scan {
            config,
            parameter,
            min,
            max,
            points,
            settle,
        } => cmd_scan(config.as_deref(), &parameter, min, max, points, settle),
        Commands::Export {
            session_path,
            output,
        } => cmd_export(&session_path, &output),
        Commands::Show { session_path } => cmd_show(&session_path),
    }
}

fn load_config(path: Option<&Path>) -> AppResult<SimConfig> {
    match path {
        Some(p) => Ok(cav_config::load_yaml(p)?),
        None => Ok(SimConfig::default()),
    }
}

fn session_format(path: &Path) -> AppResult<SessionFormat> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Ok(SessionFormat::Json),
        Some("csv") => Ok(SessionFormat::Csv),
        _ => Err(cav_app::AppError::InvalidInput(
            "session path must end in .json or .csv".to_string(),
        )),
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating configuration: {}", config_path.display());
    let config = cav_config::load_yaml(config_path)?;
    println!(
        "✓ Configuration is valid ({} mechanical modes, dt = {:.1e} s)",
        config.modes.len(),
        config.dt
    );
    Ok(())
}

fn cmd_run(
    config: Option<&Path>,
    steps: usize,
    pulsed: bool,
    record: bool,
    seed: Option<u64>,
    output: Option<&Path>,
) -> AppResult<()> {
    let mut config = load_config(config)?;
    if let Some(seed) = seed {
        config.seed = seed;
    }
    let runtime = compile_config(&config)?;
    let mut engine = SimEngine::new(runtime.engine_params, &runtime.modes)?;
    let mut history: HistoryStore<ControlParameters> =
        HistoryStore::new(runtime.modes.len(), runtime.history_capacity)?;

    let ctrl = ControlParameters {
        pulsed,
        ..Default::default()
    };

    println!(
        "Running {} steps ({} mode, dt = {:.1e} s)",
        steps,
        if pulsed { "pulsed" } else { "CW" },
        config.dt
    );
    engine.start();
    for _ in 0..steps {
        let out = engine.step(&ctrl)?;
        history.append(out.sample, &out.mode_values, record.then_some(&ctrl));
    }

    if let Some(last) = history.latest() {
        println!("✓ Simulation completed");
        println!("  Final cavity voltage : {:.3} MV", last.vc_magnitude() * 1e-6);
        println!("  Final phase          : {:.1} deg", last.vc_phase_deg());
        println!("  Final detuning       : {:.1} Hz", last.detuning_hz());
    }

    if let Some(path) = output {
        let format = session_format(path)?;
        let p = &runtime.engine_params;
        let meta = SessionMeta::now(p.dt, p.f0_hz, p.ql, p.roq, p.beta, runtime.modes.clone());
        let session = SessionData::from_snapshot(Some(meta), &history.snapshot());
        match format {
            SessionFormat::Json => cav_session::save_json(path, &session)?,
            SessionFormat::Csv => cav_session::save_csv(path, &session)?,
        }
        println!("✓ Session saved to {} ({} rows)", path.display(), session.len());
    }

    Ok(())
}

fn cmd_scan(
    config: Option<&Path>,
    parameter: &str,
    min: f64,
    max: f64,
    points: usize,
    settle: usize,
) -> AppResult<()> {
    let config = load_config(config)?;
    let runtime = compile_config(&config)?;
    let parameter: ScanParameter = parameter.parse()?;

    let request = ScanRequest {
        parameter,
        min,
        max,
        num_points: points,
        settle_steps: settle,
    };
    println!(
        "Scanning {} over [{}, {}] with {} points ({} settle steps each)",
        parameter, min, max, points, settle
    );
    let result = run_scan(
        runtime.engine_params,
        &runtime.modes,
        &ControlParameters::default(),
        &request,
    )?;

    println!("{:>14}  {:>14}", parameter.as_str(), "response (MV)");
    for point in &result.points {
        println!("{:>14.6}  {:>14.6}", point.value, point.response_mv);
    }
    println!("✓ Scan completed ({} points)", result.points.len());
    Ok(())
}

fn cmd_export(session_path: &Path, output: &Path) -> AppResult<()> {
    let session = cav_session::load_json(session_path)?;
    cav_session::save_csv(output, &session)?;
    println!(
        "✓ Exported {} rows to {}",
        session.len(),
        output.display()
    );
    Ok(())
}

fn cmd_show(session_path: &Path) -> AppResult<()> {
    let session = match session_format(session_path)? {
        SessionFormat::Json => cav_session::load_json(session_path)?,
        SessionFormat::Csv => cav_session::load_csv(session_path)?,
    };

    match &session.meta {
        Some(meta) => {
            println!("Session captured {}", meta.timestamp);
            println!(
                "  Cavity: f0 = {:.4e} Hz, QL = {:.2e}, R/Q = {}, beta = {:.0e}",
                meta.f0_hz, meta.ql, meta.roq, meta.beta
            );
            println!("  Timestep: {:.1e} s", meta.dt);
            println!("  Mechanical modes: {}", meta.modes.len());
        }
        None => println!("Session (no metadata block)"),
    }
    println!("  Rows: {}", session.len());
    println!("  Recorded parameter snapshots: {}", session.recorded_params.len());

    if !session.is_empty() {
        let last = session.len() - 1;
        let vc_mag = session.vc_re[last].hypot(session.vc_im[last]);
        let peak = session
            .vc_re
            .iter()
            .zip(&session.vc_im)
            .map(|(re, im)| re.hypot(*im))
            .fold(0.0_f64, f64::max);
        println!("  Final |vc|: {:.3} MV", vc_mag * 1e-6);
        println!("  Peak  |vc|: {:.3} MV", peak * 1e-6);
    }
    Ok(())
}
