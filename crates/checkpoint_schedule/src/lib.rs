//! # checkpoint_schedule: Checkpoint Scheduling for Adjoint Computations
//!
//! Reverse-mode differentiation of a time-stepping computation needs the
//! forward states in reverse order. Storing every state is rarely
//! affordable, so a schedule stores a bounded number of snapshots and
//! recomputes the rest. This crate decides which steps to snapshot, on
//! which storage tier, and when to recompute.
//!
//! ## Components
//!
//! - Action protocol: [`Action`], [`StorageTier`] (`action`)
//! - Step-advance optimizer: [`n_advance`], [`Trajectory`] (`advance`)
//! - Snapshot tier allocator: [`allocate_snapshots`] (`allocation`)
//! - Schedule protocol: [`CheckpointSchedule`], [`ScheduleState`] (`schedule`)
//! - Strategies: [`MultistageCheckpointSchedule`] for a known number of
//!   steps, [`TwoLevelCheckpointSchedule`] for trajectories whose length is
//!   found while running
//! - Execution: [`CheckpointDriver`], [`ScheduleRunner`], and the
//!   [`SimulatedDriver`] reference driver
//! - Declarative configuration: [`ScheduleConfig`]
//!
//! A schedule never touches simulation data. The driver executes each
//! action before requesting the next.
//!
//! ## Usage Examples
//!
//! ```rust
//! use checkpoint_schedule::{drive, MultistageCheckpointSchedule, SimulatedDriver};
//!
//! let mut schedule = MultistageCheckpointSchedule::new(100, 5, 0).unwrap();
//! let mut driver = SimulatedDriver::with_steps(100);
//!
//! let stats = drive(&mut schedule, &mut driver).unwrap();
//! assert_eq!(stats.adjoint_steps, 100);
//! assert_eq!(stats.forward_steps, 416);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization for actions, tiers, trajectories, statistics and
//!   [`ScheduleConfig`]

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod action;
pub mod advance;
pub mod allocation;
mod binomial;
pub mod config;
pub mod driver;
pub mod error;
pub mod multistage;
pub mod schedule;
pub mod simulation;
pub mod snapshot;
pub mod two_level;

pub use action::{Action, StorageTier};
pub use advance::{advance_sequence, n_advance, Trajectory};
pub use allocation::{allocate_snapshots, AllocationWeights, SnapshotAllocation};
pub use config::ScheduleConfig;
pub use driver::{
    drive, drive_forward, drive_reverse, CheckpointDriver, DriveError, DriveStats,
    ScheduleRunner, TierCounts,
};
pub use error::{ConfigError, ScheduleError, ScheduleResult};
pub use multistage::{MultistageCheckpointSchedule, MultistageCheckpointScheduleBuilder};
pub use schedule::{Actions, CheckpointSchedule, ScheduleState};
pub use simulation::{SimulatedDriver, SimulationError};
pub use snapshot::{Snapshot, SnapshotStack};
pub use two_level::{TwoLevelCheckpointSchedule, TwoLevelCheckpointScheduleBuilder};
