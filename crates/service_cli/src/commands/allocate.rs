//! Allocate command implementation
//!
//! Shows which snapshot slots of a multistage schedule are placed in RAM.

use checkpoint_schedule::{allocate_snapshots, AllocationWeights, SnapshotAllocation, Trajectory};
use serde::Serialize;
use tracing::info;

use crate::config::OutputFormat;
use crate::Result;

/// Arguments of the allocate command
#[derive(Debug, Clone)]
pub struct AllocateArgs {
    /// Trajectory length
    pub max_n: usize,
    /// Snapshot slots in RAM
    pub ram: usize,
    /// Snapshot slots on disk
    pub disk: usize,
    /// Per-operation cost weights
    pub weights: AllocationWeights,
    /// Step-advance trajectory of the dry run
    pub trajectory: Trajectory,
}

#[derive(Debug, Serialize)]
struct SlotRow {
    slot: usize,
    weight: f64,
    storage: &'static str,
}

/// Run the allocate command
pub fn run(args: &AllocateArgs, format: OutputFormat) -> Result<()> {
    info!(
        "Allocating {} RAM and {} disk slots for {} steps",
        args.ram, args.disk, args.max_n
    );
    let allocation = allocate_snapshots(
        args.max_n,
        args.ram,
        args.disk,
        args.weights,
        args.trajectory,
    )?;
    println!("{}", render(&allocation, format)?);
    Ok(())
}

fn rows(allocation: &SnapshotAllocation) -> Vec<SlotRow> {
    allocation
        .weights()
        .iter()
        .zip(allocation.storage())
        .enumerate()
        .map(|(slot, (&weight, storage))| SlotRow {
            slot,
            weight,
            storage: storage.as_str(),
        })
        .collect()
}

fn render(allocation: &SnapshotAllocation, format: OutputFormat) -> Result<String> {
    let rows = rows(allocation);
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&rows)?),
        OutputFormat::Table => {
            let mut lines = vec!["Slot  Weight      Storage".to_string()];
            lines.extend(
                rows.iter()
                    .map(|row| format!("{:<4}  {:<10.1}  {}", row.slot, row.weight, row.storage)),
            );
            Ok(lines.join("\n"))
        }
    }
}
