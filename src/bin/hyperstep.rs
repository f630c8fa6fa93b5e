use clap::{Parser, Subcommand};
use eyre::{bail, eyre, WrapErr};
use hyperstep::config::{SimulationConfig, PRESET_NAMES};
use hyperstep::simulation::run_simulation;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Load stepping Newton continuation for hyperelastic beams")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a simulation from a JSON configuration file or a built-in preset.
    Run {
        #[arg(short, long, conflicts_with = "preset")]
        config: Option<PathBuf>,

        #[arg(short, long)]
        preset: Option<String>,

        /// Override the number of load steps.
        #[arg(short, long)]
        steps: Option<usize>,

        /// Directory for per-step VTK output.
        #[arg(long)]
        vtk: Option<PathBuf>,

        /// Write the load path as JSON to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the configuration of a built-in preset as JSON.
    Preset { name: String },
}

fn preset(name: &str) -> eyre::Result<SimulationConfig> {
    SimulationConfig::preset(name)
        .ok_or_else(|| eyre!("Unknown preset \"{}\". Available presets: {}", name, PRESET_NAMES.join(", ")))
}

fn main() -> eyre::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::Preset { name } => {
            println!("{}", preset(&name)?.to_json_string_pretty()?);
        }
        Command::Run {
            config,
            preset: preset_name,
            steps,
            vtk,
            output,
        } => {
            let mut config = match (config, preset_name) {
                (Some(path), None) => SimulationConfig::from_json_file(&path)?,
                (None, Some(name)) => preset(&name)?,
                _ => bail!("Exactly one of --config and --preset must be given"),
            };
            if let Some(steps) = steps {
                config.load.steps = steps;
            }
            if vtk.is_some() {
                config.output.vtk_directory = vtk;
            }

            let report = run_simulation(&config)?;

            println!("{:>6} {:>12} {:>28} {:>16}", "step", "fraction", "load", "quantity");
            for step in report.path.steps() {
                println!(
                    "{:>6} {:>12.6} {:>28} {:>16.8e}",
                    step.step,
                    step.fraction,
                    step.load.to_string(),
                    step.quantity
                );
            }

            if let Some(path) = output {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let json = serde_json::to_string_pretty(&report.path)?;
                fs::write(&path, json).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            }
        }
    }

    Ok(())
}
