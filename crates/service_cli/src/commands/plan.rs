//! Plan command implementation
//!
//! Lists the actions the configured schedule issues for a simulated run.

use checkpoint_schedule::Action;
use tracing::info;

use crate::config::{CliConfig, OutputFormat};
use crate::Result;

/// Run the plan command
pub fn run(
    config: &CliConfig,
    steps: Option<usize>,
    sweeps: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    info!("Planning schedule...");
    let (stats, actions) = super::execute(config, steps, sweeps)?;
    info!(
        actions = stats.actions,
        forward_steps = stats.forward_steps,
        "Planning complete"
    );

    println!("{}", render(&actions, format)?);
    Ok(())
}

fn render(actions: &[Action], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(actions)?),
        OutputFormat::Table => {
            let width = actions.len().to_string().len();
            let lines: Vec<String> = actions
                .iter()
                .enumerate()
                .map(|(i, action)| format!("{:>width$}  {}", i, action, width = width))
                .collect();
            Ok(lines.join("\n"))
        }
    }
}
