use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;

use exorsim::config_loader::{self, CliOverrides};
use exorsim::node::ForwardingPolicy;
use exorsim::report::{generate_json_report, generate_text_report};
use exorsim::simulation::Simulation;

/// Simulator for ExOR-style opportunistic routing over lossy meshes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the simulation configuration YAML file
    #[arg(short, long)]
    config: PathBuf,

    /// Output directory for the JSON and text reports
    #[arg(short, long, default_value = "exorsim_output")]
    output: PathBuf,

    /// Override the RNG seed
    #[arg(long)]
    seed: Option<u64>,

    /// Override the forwarding policy (unconditional, best_holder)
    #[arg(long)]
    policy: Option<ForwardingPolicy>,

    /// Override the number of independent runs
    #[arg(long)]
    runs: Option<u32>,

    /// Override the flush-round bound
    #[arg(long)]
    max_rounds: Option<u32>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            seed: self.seed,
            policy: self.policy,
            runs: self.runs,
            max_rounds: self.max_rounds,
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = config_loader::load_config(&args.config)?;

    // Initialize logging, RUST_LOG wins over the configured level
    let level = config.general.log_level.clone().unwrap_or_else(|| "info".to_string());
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    info!("Starting ExOrSim");
    info!("Configuration file: {:?}", args.config);
    info!("Output directory: {:?}", args.output);

    config_loader::apply_overrides(&mut config, &args.overrides())?;

    let mut simulation = Simulation::from_config(&config)
        .wrap_err("Failed to build the simulated network")?;
    let report = simulation.run().wrap_err("Simulation failed")?;

    fs::create_dir_all(&args.output)
        .wrap_err_with(|| format!("Failed to create output directory '{}'", args.output.display()))?;
    generate_json_report(&report, &args.output.join("report.json"))?;
    generate_text_report(&report, &args.output.join("report.txt"))?;

    let summary = &report.summary;
    info!(
        "Mean delivery ratio {:.1}% over {} runs ({:.1} transmissions per run)",
        summary.mean_delivery_ratio * 100.0,
        summary.runs,
        summary.mean_transmissions
    );
    if summary.settled_runs < summary.runs {
        warn!(
            "{} of {} runs hit the round bound before settling",
            summary.runs - summary.settled_runs,
            summary.runs
        );
    }

    Ok(())
}
