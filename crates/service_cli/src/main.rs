//! Checkpoint CLI - Planning and Simulation of Checkpoint Schedules
//!
//! Command-line front end to the `checkpoint_schedule` library.
//!
//! # Commands
//!
//! - `checkpoint plan` - List the actions of the configured schedule
//! - `checkpoint simulate` - Drive the schedule against a simulated solver
//! - `checkpoint advance --steps <n> --snapshots <s>` - Query the step-advance optimizer
//! - `checkpoint allocate --max-n <n> --ram <r> --disk <d>` - Show the RAM/disk slot allocation
//! - `checkpoint check` - Validate the configuration file
//!
//! Settings are read from `checkpoint.toml` (see [`config`]) and may be
//! overridden with `CHECKPOINT_*` environment variables.

use std::path::PathBuf;

use checkpoint_schedule::{AllocationWeights, Trajectory};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod error;

pub use error::{CliError, Result};

use crate::commands::allocate::AllocateArgs;
use crate::config::{CliConfig, OutputFormat};

/// Checkpoint schedule planner
#[derive(Parser)]
#[command(name = "checkpoint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "checkpoint.toml")]
    config: PathBuf,

    /// Output format, overriding the configuration
    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the actions of the configured schedule
    Plan {
        /// Trajectory length seen by the simulated solver
        #[arg(short, long)]
        steps: Option<usize>,

        /// Number of reverse sweeps
        #[arg(long)]
        sweeps: Option<usize>,
    },

    /// Drive the configured schedule against a simulated solver
    Simulate {
        /// Trajectory length seen by the simulated solver
        #[arg(short, long)]
        steps: Option<usize>,

        /// Number of reverse sweeps
        #[arg(long)]
        sweeps: Option<usize>,
    },

    /// Compute the forward run before the next snapshot
    Advance {
        /// Steps up to the step whose adjoint is next
        #[arg(short = 'n', long)]
        steps: usize,

        /// Free snapshot slots
        #[arg(short, long)]
        snapshots: usize,

        /// Step-advance trajectory (maximum, revolve)
        #[arg(short, long, default_value = "maximum")]
        trajectory: Trajectory,
    },

    /// Allocate multistage snapshot slots between RAM and disk
    Allocate {
        /// Trajectory length
        #[arg(short = 'n', long)]
        max_n: usize,

        /// Snapshot slots in RAM
        #[arg(long)]
        ram: usize,

        /// Snapshot slots on disk
        #[arg(long)]
        disk: usize,

        /// Weight added per write
        #[arg(long, default_value_t = 1.0)]
        write_weight: f64,

        /// Weight added per read
        #[arg(long, default_value_t = 1.0)]
        read_weight: f64,

        /// Additional weight added per deleting read
        #[arg(long, default_value_t = 0.0)]
        delete_weight: f64,

        /// Step-advance trajectory of the dry run (maximum, revolve)
        #[arg(short, long, default_value = "maximum")]
        trajectory: Trajectory,
    },

    /// Validate the configuration file
    Check,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load_or_default(&cli.config)?.with_env_override();

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if cli.verbose {
        info!("Verbose mode enabled");
    }
    debug!(path = %cli.config.display(), "configuration loaded");

    let format = cli.format.unwrap_or(config.output);

    match cli.command {
        Commands::Plan { steps, sweeps } => commands::plan::run(&config, steps, sweeps, format)?,
        Commands::Simulate { steps, sweeps } => {
            commands::simulate::run(&config, steps, sweeps, format)?
        }
        Commands::Advance {
            steps,
            snapshots,
            trajectory,
        } => commands::advance::run(steps, snapshots, trajectory, format)?,
        Commands::Allocate {
            max_n,
            ram,
            disk,
            write_weight,
            read_weight,
            delete_weight,
            trajectory,
        } => {
            let args = AllocateArgs {
                max_n,
                ram,
                disk,
                weights: AllocationWeights {
                    write: write_weight,
                    read: read_weight,
                    delete: delete_weight,
                },
                trajectory,
            };
            commands::allocate::run(&args, format)?
        }
        Commands::Check => commands::check::run(&config)?,
    }

    Ok(())
}
