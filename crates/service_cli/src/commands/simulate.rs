//! Simulate command implementation
//!
//! Drives the configured schedule against the simulated solver and reports
//! the cost of the run.

use checkpoint_schedule::DriveStats;
use tracing::info;

use crate::config::{CliConfig, OutputFormat};
use crate::Result;

/// Run the simulate command
pub fn run(
    config: &CliConfig,
    steps: Option<usize>,
    sweeps: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    info!("Starting simulation...");
    let (stats, _) = super::execute(config, steps, sweeps)?;
    info!("Simulation complete");

    println!("{}", render(&stats, format)?);
    Ok(())
}

fn render(stats: &DriveStats, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(stats)?),
        OutputFormat::Table => {
            let ratio = stats
                .recompute_ratio()
                .map_or_else(|| "-".to_string(), |ratio| format!("{:.3}", ratio));
            let max_n = stats
                .max_n
                .map_or_else(|| "-".to_string(), |max_n| max_n.to_string());
            let rows = [
                ("Steps", max_n),
                ("Actions", stats.actions.to_string()),
                ("Forward steps", stats.forward_steps.to_string()),
                ("Adjoint steps", stats.adjoint_steps.to_string()),
                ("Recompute ratio", ratio),
                (
                    "Writes (RAM/disk)",
                    format!("{}/{}", stats.writes.ram, stats.writes.disk),
                ),
                (
                    "Reads (RAM/disk)",
                    format!("{}/{}", stats.reads.ram, stats.reads.disk),
                ),
                ("Deleting reads", stats.deletions.to_string()),
                ("Peak snapshots", stats.peak_snapshots.to_string()),
                ("Reverse sweeps", stats.reverse_sweeps.to_string()),
            ];

            let mut lines = vec![
                "┌───────────────────┬────────────┐".to_string(),
                "│ Metric            │ Value      │".to_string(),
                "├───────────────────┼────────────┤".to_string(),
            ];
            lines.extend(
                rows.iter()
                    .map(|(name, value)| format!("│ {:<17} │ {:<10} │", name, value)),
            );
            lines.push("└───────────────────┴────────────┘".to_string());
            Ok(lines.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_table() {
        let (stats, _) = crate::commands::execute(&CliConfig::default(), None, None).unwrap();
        let table = render(&stats, OutputFormat::Table).unwrap();
        assert!(table.contains("│ Forward steps     │ 25         │"));
        assert!(table.contains("│ Recompute ratio   │ 2.500      │"));
    }

    #[test]
    fn test_render_json() {
        let (stats, _) = crate::commands::execute(&CliConfig::default(), None, None).unwrap();
        let json = render(&stats, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["adjoint_steps"], 10);
        assert_eq!(value["reverse_sweeps"], 1);
    }
}
