//! CLI error types.

use checkpoint_schedule::{DriveError, ScheduleError, SimulationError};
use thiserror::Error;

use crate::config::ConfigError;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration file or override problem
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Schedule construction or consistency error
    #[error("Schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// Failure while driving the simulated run
    #[error("Simulation error: {0}")]
    Simulation(#[from] DriveError<SimulationError>),

    /// Invalid command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON output failure
    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
