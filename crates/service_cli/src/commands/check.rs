//! Check command implementation
//!
//! Validates the configuration and summarises the schedule it describes.

use tracing::info;

use crate::config::CliConfig;
use crate::Result;

/// Run the check command
pub fn run(config: &CliConfig) -> Result<()> {
    info!("Checking configuration...");
    config.validate()?;

    println!("{}", summary(config)?);
    info!("Configuration OK");
    Ok(())
}

fn summary(config: &CliConfig) -> Result<String> {
    let schedule = config.schedule.build()?;
    let steps = config
        .steps()
        .map_or_else(|| "determined at run time".to_string(), |n| n.to_string());

    Ok(format!(
        "Schedule:   {}\nSteps:      {}\nSweeps:     {}\nUses disk:  {}\nLog level:  {}",
        config.schedule,
        steps,
        config.simulation.sweeps,
        schedule.uses_disk_storage(),
        config.log_level
    ))
}
