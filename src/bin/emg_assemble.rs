//! Assemble a synthetic needle-EMG trace from saved MUPs and firing times.

use clap::Parser;
use needle_emg::assembly::{EmgAssemblyDriver, MotorUnitSource};
use needle_emg::config::{ConfigLoader, SimulationConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "emg-assemble")]
#[command(about = "Sum jittered motor-unit potentials into a synthetic EMG trace")]
struct Args {
    /// Configuration files, merged in order over the defaults
    #[arg(short, long, num_args = 1..)]
    config: Vec<PathBuf>,

    /// Motor units to assemble; defaults to every unit with a firing file
    #[arg(short, long, num_args = 1..)]
    units: Vec<u32>,

    /// Write the effective configuration here and exit
    #[arg(long)]
    export_config: Option<PathBuf>,

    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let loader = if args.config.is_empty() {
        ConfigLoader::new()
    } else {
        ConfigLoader::with_paths(args.config.clone())
    };
    let config = loader.load()?;

    if let Some(path) = &args.export_config {
        loader.export_config(&config, path)?;
        info!(path = %path.display(), "configuration exported");
        return Ok(());
    }

    let units = if args.units.is_empty() { discover_units(&config) } else { args.units.clone() };
    if units.is_empty() {
        return Err(format!("no firing files found in {}", config.paths.firing_dir.display()).into());
    }

    let sources: Vec<_> = units.iter().map(|&u| MotorUnitSource::from_config(&config, u)).collect();
    let summary = EmgAssemblyDriver::new(&config)?.run(&sources)?;

    println!("Units assembled:      {}", summary.units_processed);
    println!("Units not detected:   {}", summary.units_skipped.len());
    println!("Firings overlaid:     {}", summary.firings_overlaid);
    println!("Firings past end:     {}", summary.firings_past_end);
    println!(
        "Ground-truth records: {} ({} dropped, {} outside run)",
        summary.ground_truth_records, summary.dropped_records, summary.records_outside_run
    );
    println!("EMG file:             {}", summary.emg_path.display());
    println!("Ground truth:         {}", summary.gst_path.display());
    Ok(())
}

/// Consecutive units from 1 whose firing file exists
fn discover_units(config: &SimulationConfig) -> Vec<u32> {
    (1..).take_while(|&u| config.firing_path(u).exists()).collect()
}
