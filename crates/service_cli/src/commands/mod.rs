//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod advance;
pub mod allocate;
pub mod check;
pub mod plan;
pub mod simulate;

use checkpoint_schedule::{Action, DriveStats, ScheduleRunner, SimulatedDriver};
use tracing::{debug, info};

use crate::config::CliConfig;
use crate::{CliError, Result};

/// Builds the configured schedule and drives it against a simulated solver.
///
/// `steps` and `sweeps` override the `[simulation]` section. Stops early
/// once the schedule reports exhaustion.
pub(crate) fn execute(
    config: &CliConfig,
    steps: Option<usize>,
    sweeps: Option<usize>,
) -> Result<(DriveStats, Vec<Action>)> {
    let mut config = config.clone();
    if steps.is_some() {
        config.simulation.steps = steps;
    }
    if let Some(sweeps) = sweeps {
        config.simulation.sweeps = sweeps;
    }
    config.validate()?;

    let steps = config.steps().ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "--steps is required for the {} strategy",
            config.schedule.strategy()
        ))
    })?;

    info!("Schedule: {}", config.schedule);
    let mut schedule = config.schedule.build()?;
    let mut driver = SimulatedDriver::with_steps(steps);
    let mut runner = ScheduleRunner::recording(&mut *schedule);

    runner.run_forward(&mut driver)?;
    for sweep in 1..=config.simulation.sweeps {
        let exhausted = runner.run_reverse(&mut driver)?;
        debug!(sweep, exhausted, "reverse sweep complete");
        if exhausted {
            break;
        }
    }

    Ok(runner.into_parts())
}
