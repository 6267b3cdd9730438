//! CLI configuration management.
//!
//! Loads `checkpoint.toml` with environment variable overrides:
//!
//! ```toml
//! log_level = "info"
//! output = "table"
//!
//! [schedule]
//! strategy = "two_level"
//! disk_period = 10
//! binomial_snapshots = 3
//!
//! [simulation]
//! steps = 95
//! sweeps = 2
//! ```

use std::path::Path;

use checkpoint_schedule::ScheduleConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Output format of command results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON document
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown format: {}. Supported: table, json", other)),
        }
    }
}

/// Simulated run parameters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// Trajectory length seen by the simulated driver
    #[serde(default)]
    pub steps: Option<usize>,

    /// Number of reverse sweeps to drive
    #[serde(default = "default_sweeps")]
    pub sweeps: usize,
}

fn default_sweeps() -> usize {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: None,
            sweeps: default_sweeps(),
        }
    }
}

/// CLI configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CliConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Output format
    #[serde(default)]
    pub output: OutputFormat,

    /// Schedule to plan or simulate
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Simulated run parameters
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output: OutputFormat::default(),
            schedule: ScheduleConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from `path`, or the default if the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides
    pub fn with_env_override(mut self) -> Self {
        if let Ok(log_level) = std::env::var("CHECKPOINT_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Ok(output) = std::env::var("CHECKPOINT_OUTPUT") {
            self.output = output.parse().unwrap_or(self.output);
        }

        if let Ok(steps) = std::env::var("CHECKPOINT_STEPS") {
            self.simulation.steps = steps.parse().ok().or(self.simulation.steps);
        }

        if let Ok(sweeps) = std::env::var("CHECKPOINT_SWEEPS") {
            self.simulation.sweeps = sweeps.parse().unwrap_or(self.simulation.sweeps);
        }

        self
    }

    /// Returns the trajectory length the simulated driver will use
    pub fn steps(&self) -> Option<usize> {
        self.simulation.steps.or_else(|| self.schedule.max_n())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.to_lowercase().as_str()) {
            errors.push(format!(
                "Invalid log_level '{}'. Valid values: {:?}",
                self.log_level, valid_log_levels
            ));
        }

        if let Err(err) = self.schedule.validate() {
            errors.push(format!("schedule: {}", err));
        }

        if self.simulation.sweeps == 0 {
            errors.push("simulation.sweeps must be greater than 0".to_string());
        }

        match (self.simulation.steps, self.schedule.max_n()) {
            (Some(0), _) => errors.push("simulation.steps must be greater than 0".to_string()),
            (Some(steps), Some(max_n)) if steps != max_n => errors.push(format!(
                "simulation.steps {} does not match schedule max_n {}",
                steps, max_n
            )),
            (None, None) => errors.push(format!(
                "simulation.steps is required for the {} strategy",
                self.schedule.strategy()
            )),
            _ => {}
        }

        if self.schedule.max_n().is_some() && self.simulation.sweeps > 1 {
            errors.push(format!(
                "{} schedules support a single reverse sweep, got sweeps = {}",
                self.schedule.strategy(),
                self.simulation.sweeps
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Configuration error type
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// IO error reading config file
    #[error("IO error: {0}")]
    Io(String),
    /// Parse error in config file
    #[error("Parse error: {0}")]
    Parse(String),
    /// Validation error
    #[error("Validation errors: {}", .0.join("; "))]
    Validation(Vec<String>),
}
