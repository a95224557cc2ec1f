//! Current-driven homogenisation of a metamaterial unit cell
//!
//! Runs one model of the registry and writes the demodulated `Ex` waveform
//! to `<output-dir>/<name>.dat`.
//!
//! ```text
//! cdh --model SphereWire radius=25e-6 Kx=2000
//! cdh --config fishnet.toml frequency_domain=true frequency=1.2e12
//! ```

use cdhsim::config;
use cdhsim::output::{self, MARKER_FILE, OUTPUT_DIR};
use cdhsim::simulation::{run_cdh, LogNotifier, RunOutcome};
use cdhsim::utilities::spectrum::effective_permittivity;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line arguments of a CDH run
#[derive(Parser, Debug)]
#[command(name = "cdh")]
#[command(about = "FDTD current-driven homogenisation of metamaterial unit cells", long_about = None)]
struct Args {
    /// Model name (default, Slab, SphereWire, RodArray, ESRRArray, SphereInDiel, Fishnet, HalfSpace)
    #[arg(long)]
    model: Option<String>,

    /// TOML file with model parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of the waveform files
    #[arg(long, default_value = OUTPUT_DIR)]
    output_dir: PathBuf,

    /// File recording the name of the last simulation
    #[arg(long, default_value = MARKER_FILE)]
    marker: PathBuf,

    /// Courant number c·dt/Δ
    #[arg(long, default_value_t = cdhsim::domain::maxwell::DEFAULT_COURANT)]
    courant: f64,

    /// Worker threads (default: all cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Only log warnings and errors
    #[arg(long)]
    quiet: bool,

    /// Parameter overrides
    #[arg(value_name = "KEY=VALUE")]
    overrides: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_level = if args.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()?;
    }

    let model_config = config::load(args.model.as_deref(), args.config.as_deref(), &args.overrides)?;
    let model = model_config.build()?;
    info!(
        "model {} ({} materials), cell {:.3e} m, resolution {:.3e} m",
        model.simulation_name,
        model.materials.len(),
        model.size[0],
        model.resolution
    );

    let result = run_cdh(&model, args.courant, args.threads, &LogNotifier, None)?;

    let path = output::write_monitor_file(
        &args.output_dir,
        &result.simulation_name,
        &model.parameters,
        result.component.name(),
        &result.times,
        &result.values,
    )?;
    output::write_marker(&args.marker, &result.simulation_name)?;
    info!("waveform written to {}", path.display());

    match &result.outcome {
        RunOutcome::TimeDomain(_) => {
            let eps = effective_permittivity(
                &result.times,
                &result.values,
                &model.time_profile(),
                model.k,
                result.dt,
                model.resolution,
                4,
            )?;
            match eps.value_at(model.src_freq) {
                Some(v) => info!(
                    "effective permittivity at {:.3e} Hz: {:.4} {:+.4}i",
                    model.src_freq, v.re, v.im
                ),
                None => warn!("source frequency lies outside the recorded band"),
            }
        }
        RunOutcome::FrequencyDomain(r) => {
            if let Some(v) = result.values.first() {
                info!(
                    "Ex average {:.4e} {:+.4e}i ({} iterations)",
                    v.re, v.im, r.iterations
                );
            }
        }
    }
    Ok(())
}
