//! Advance command implementation
//!
//! Reports how far the step-advance optimizer moves before the next
//! snapshot, and the full sequence of forward runs it would take.

use checkpoint_schedule::{advance_sequence, n_advance, Trajectory};
use serde::Serialize;
use tracing::info;

use crate::config::OutputFormat;
use crate::Result;

#[derive(Debug, Serialize)]
struct AdvanceReport {
    steps: usize,
    snapshots: usize,
    trajectory: Trajectory,
    advance: usize,
    runs: Vec<usize>,
}

/// Run the advance command
pub fn run(
    steps: usize,
    snapshots: usize,
    trajectory: Trajectory,
    format: OutputFormat,
) -> Result<()> {
    info!("Computing advance for {} steps, {} snapshots", steps, snapshots);
    let report = compute(steps, snapshots, trajectory)?;
    println!("{}", render(&report, format)?);
    Ok(())
}

fn compute(steps: usize, snapshots: usize, trajectory: Trajectory) -> Result<AdvanceReport> {
    Ok(AdvanceReport {
        steps,
        snapshots,
        trajectory,
        advance: n_advance(steps, snapshots, trajectory)?,
        runs: advance_sequence(steps, snapshots, trajectory)?,
    })
}

fn render(report: &AdvanceReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Table => {
            let runs: Vec<String> = report.runs.iter().map(usize::to_string).collect();
            Ok(format!(
                "Trajectory: {}\nSteps:      {}\nSnapshots:  {}\nAdvance:    {}\nRuns:       [{}]",
                report.trajectory,
                report.steps,
                report.snapshots,
                report.advance,
                runs.join(", ")
            ))
        }
    }
}
