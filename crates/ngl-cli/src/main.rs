//! ngl-resum CLI

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ngl_core::{Dipole, FourVector};
use ngl_shower::{
    EVENTS_CUTOFF, Event, ProductionDipoles, RapidityGap, Resummation, ResummationReport,
    RunConfig, Shower, records_from_jsonl, run_batch,
};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ngl-resum")]
#[command(about = "Monte-Carlo resummation of non-global logarithms")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shower one back-to-back dipole along the z-axis with a central rapidity gap
    Dipole {
        /// Velocity of both legs (1 = massless)
        #[arg(short, long, default_value = "1.0")]
        beta: f64,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Shower every event of a JSON-lines record file; the gap excludes cones around the b-jets
    Events {
        /// Input events, one JSON record per line
        #[arg(short, long)]
        input: PathBuf,

        /// Stop after so many records
        #[arg(long)]
        max_events: Option<usize>,

        /// Cone radius around each b-jet
        #[arg(long)]
        jet_radius: Option<f64>,

        /// Production dipoles (intermediate, outgoing, none)
        #[arg(long)]
        production: Option<ProductionDipoles>,

        /// Also add top decay dipoles
        #[arg(long)]
        decay_dipoles: bool,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Print version
    Version,
}

/// Options shared by both drivers. Flags override `--config`.
#[derive(Args)]
struct RunArgs {
    /// Run configuration (JSON). Missing keys take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Lower |rapidity| edge of the gap
    #[arg(long)]
    y_min: Option<f64>,

    /// Upper |rapidity| edge of the gap
    #[arg(short = 'y', long)]
    y_max: Option<f64>,

    /// Showers per event
    #[arg(short, long)]
    nsh: Option<usize>,

    /// Maximal shower time
    #[arg(short, long)]
    t_max: Option<f64>,

    /// Number of histogram bins
    #[arg(short = 'm', long)]
    n_bins: Option<usize>,

    /// Collinear cutoff of the shower [default: 6 for dipole, 5 for events]
    #[arg(short, long)]
    cutoff: Option<f64>,

    /// Random seed (drawn and logged when absent)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Skip the fixed-order estimators
    #[arg(long)]
    no_fixed_order: bool,

    /// Output file for results (pretty JSON). Defaults to stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Threads (0 = auto).
    #[arg(long, default_value = "0")]
    threads: usize,
}

impl RunArgs {
    fn load_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => RunConfig::default(),
        };
        if let Some(v) = self.y_min {
            config.y_min = v;
        }
        if let Some(v) = self.y_max {
            config.y_max = v;
        }
        if let Some(v) = self.nsh {
            config.nsh = v;
        }
        if let Some(v) = self.t_max {
            config.t_max = v;
        }
        if let Some(v) = self.n_bins {
            config.n_bins = v;
        }
        if self.cutoff.is_some() {
            config.cutoff = self.cutoff;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.no_fixed_order {
            config.fixed_order = false;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt().with_max_level(cli.log_level).with_target(false).init();

    match cli.command {
        Commands::Dipole { beta, run } => cmd_dipole(beta, &run),
        Commands::Events { input, max_events, jet_radius, production, decay_dipoles, run } => {
            let mut config = run.load_config()?.with_default_cutoff(EVENTS_CUTOFF);
            if let Some(v) = max_events {
                config.max_events = v;
            }
            if let Some(v) = jet_radius {
                config.jet_radius = v;
            }
            if let Some(v) = production {
                config.production = v;
            }
            if decay_dipoles {
                config.decay_dipoles = true;
            }
            cmd_events(&input, config, &run)
        }
        Commands::Version => {
            println!("ngl-resum {}", ngl_core::VERSION);
            Ok(())
        }
    }
}

fn cmd_dipole(beta: f64, run: &RunArgs) -> Result<()> {
    let config = run.load_config()?;
    config.validate()?;
    setup_threads(run.threads);
    let seed = config.resolve_seed();

    let t0 = std::time::Instant::now();
    let dipole =
        Dipole::new(FourVector::new(1.0, 0.0, 0.0, beta), FourVector::new(1.0, 0.0, 0.0, -beta))?;
    let event = Event::from_dipoles(vec![dipole])?;
    let gap = RapidityGap::new(config.y_min, config.y_max)?;
    let shower = Shower::new(&event, &gap, config.shower_settings(seed))?;
    tracing::info!(beta, rate = shower.rate(), nsh = config.nsh, "showering dipole");
    let result = shower.shower()?;
    tracing::info!(
        n_emissions = result.n_emissions,
        wall_time_s = result.wall_time_s,
        "shower complete"
    );

    let mut agg = Resummation::new(config.n_bins, config.t_max, config.nsh)?;
    agg.observe_weight(event.weight());
    agg.add(&result)?;
    agg.record_event(true);

    write_report(run.output.as_ref(), &agg.report()?, t0.elapsed().as_secs_f64(), seed)
}

fn cmd_events(input: &PathBuf, config: RunConfig, run: &RunArgs) -> Result<()> {
    config.validate()?;
    setup_threads(run.threads);
    let seed = config.resolve_seed();

    tracing::info!(path = %input.display(), "reading events");
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let region = config.region();

    let t0 = std::time::Instant::now();
    let agg = run_batch(
        records_from_jsonl(BufReader::new(file)),
        &config.batch_options(seed),
        |_| true,
        |event: &Event| region.build(event),
    )?;
    tracing::info!(
        n_events = agg.n_events(),
        n_valid_events = agg.n_valid_events(),
        "resummation complete"
    );

    write_report(run.output.as_ref(), &agg.report()?, t0.elapsed().as_secs_f64(), seed)
}

fn setup_threads(threads: usize) {
    if threads > 0 {
        // Best-effort; if a global pool already exists, keep going.
        let _ = rayon::ThreadPoolBuilder::new().num_threads(threads).build_global();
    }
}

fn write_report(
    output: Option<&PathBuf>,
    report: &ResummationReport,
    runtime_s: f64,
    seed: u64,
) -> Result<()> {
    let output_json = serde_json::json!({
        "runtime_s": runtime_s,
        "bins": report.bins,
        "snlo": report.snlo,
        "snlo_error": report.snlo_error,
        "snnlo": report.snnlo,
        "snnlo_error": report.snnlo_error,
        "n_events": report.n_events,
        "n_valid_events": report.n_valid_events,
        "event_weight": report.event_weight,
        "weight_mismatches": report.weight_mismatches,
        "seed": seed,
    });
    write_json(output, output_json)
}

fn write_json(output: Option<&PathBuf>, value: serde_json::Value) -> Result<()> {
    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&value)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
