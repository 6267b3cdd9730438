//! Execution of a schedule against a driver.
//!
//! A [`CheckpointDriver`] performs the work behind each action: forward and
//! adjoint steps, snapshot storage, and release of retained data. The
//! [`ScheduleRunner`] pulls actions from a schedule, dispatches them to the
//! driver in order and accumulates [`DriveStats`].

use thiserror::Error;
use tracing::debug;

use crate::action::{Action, StorageTier};
use crate::error::ScheduleError;
use crate::schedule::CheckpointSchedule;

#[cfg(feature = "serde")]
use serde::Serialize;

/// Callbacks executing checkpointing actions.
///
/// Each method corresponds to one [`Action`] variant and must complete the
/// action's effect before returning.
pub trait CheckpointDriver {
    /// Driver failure type.
    type Error: std::error::Error + 'static;

    /// Sets data retention for the next forward run.
    fn configure(&mut self, store_ics: bool, store_data: bool) -> Result<(), Self::Error>;

    /// Runs forward steps `n0..n1`.
    ///
    /// Returns `Some(n)` if the trajectory ended at step `n`, which may lie
    /// inside the requested run. A schedule of unknown length is finalized
    /// at `n`.
    fn forward(&mut self, n0: usize, n1: usize) -> Result<Option<usize>, Self::Error>;

    /// Stores the retained initial conditions of step `n`.
    fn write(&mut self, n: usize, storage: StorageTier) -> Result<(), Self::Error>;

    /// Restores the state at step `n`, freeing the snapshot if `delete`.
    fn read(&mut self, n: usize, storage: StorageTier, delete: bool) -> Result<(), Self::Error>;

    /// Discards retained data.
    fn clear(&mut self, clear_ics: bool, clear_data: bool) -> Result<(), Self::Error>;

    /// Runs the adjoint of step `n0..n1`.
    fn reverse(&mut self, n1: usize, n0: usize) -> Result<(), Self::Error>;

    /// Called once the forward sweep is complete.
    fn end_forward(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Called at the end of every reverse sweep.
    fn end_reverse(&mut self, exhausted: bool) -> Result<(), Self::Error> {
        let _ = exhausted;
        Ok(())
    }
}

/// Failure while driving a schedule.
#[derive(Debug, Error)]
pub enum DriveError<E> {
    /// The schedule failed.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// The driver failed to execute an action.
    #[error("Driver error: {0}")]
    Driver(#[source] E),
}

/// Snapshot operation counts per tier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct TierCounts {
    /// Operations on RAM.
    pub ram: usize,
    /// Operations on disk.
    pub disk: usize,
}

impl TierCounts {
    /// Records one operation on `storage`.
    pub fn record(&mut self, storage: StorageTier) {
        match storage {
            StorageTier::Ram => self.ram += 1,
            StorageTier::Disk => self.disk += 1,
        }
    }

    /// Returns the total over both tiers.
    #[inline]
    pub fn total(&self) -> usize {
        self.ram + self.disk
    }
}

/// Statistics of a driven schedule.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct DriveStats {
    /// Actions executed.
    pub actions: usize,
    /// Forward steps executed, including recomputation.
    pub forward_steps: usize,
    /// Adjoint steps executed.
    pub adjoint_steps: usize,
    /// Snapshot writes.
    pub writes: TierCounts,
    /// Snapshot reads.
    pub reads: TierCounts,
    /// Reads that freed their snapshot.
    pub deletions: usize,
    /// Snapshots held when the run stopped.
    pub live_snapshots: usize,
    /// Largest number of snapshots held at once.
    pub peak_snapshots: usize,
    /// Completed reverse sweeps.
    pub reverse_sweeps: usize,
    /// Trajectory length, once known.
    pub max_n: Option<usize>,
}

impl DriveStats {
    /// Returns forward steps executed per step of the trajectory.
    ///
    /// A value of 1 means no recomputation took place.
    pub fn recompute_ratio(&self) -> Option<f64> {
        match self.max_n {
            Some(max_n) if max_n > 0 => Some(self.forward_steps as f64 / max_n as f64),
            _ => None,
        }
    }

    fn record(&mut self, action: &Action) {
        self.actions += 1;
        match *action {
            Action::Write { storage, .. } => {
                self.writes.record(storage);
                self.live_snapshots += 1;
                self.peak_snapshots = self.peak_snapshots.max(self.live_snapshots);
            }
            Action::Read {
                storage, delete, ..
            } => {
                self.reads.record(storage);
                if delete {
                    self.deletions += 1;
                    self.live_snapshots = self.live_snapshots.saturating_sub(1);
                }
            }
            Action::Reverse { .. } => self.adjoint_steps += 1,
            Action::EndReverse { .. } => self.reverse_sweeps += 1,
            _ => {}
        }
    }
}

/// Drives a schedule against a driver, one action at a time.
///
/// # Examples
///
/// ```rust
/// use checkpoint_schedule::{MultistageCheckpointSchedule, ScheduleRunner, SimulatedDriver};
///
/// let mut schedule = MultistageCheckpointSchedule::new(10, 3, 0).unwrap();
/// let mut driver = SimulatedDriver::with_steps(10);
///
/// let mut runner = ScheduleRunner::new(&mut schedule);
/// runner.run_forward(&mut driver).unwrap();
/// let exhausted = runner.run_reverse(&mut driver).unwrap();
///
/// assert!(exhausted);
/// assert_eq!(runner.stats().adjoint_steps, 10);
/// assert!(runner.stats().peak_snapshots <= 3);
/// ```
pub struct ScheduleRunner<'s, S: CheckpointSchedule + ?Sized> {
    schedule: &'s mut S,
    stats: DriveStats,
    recorded: Option<Vec<Action>>,
}

impl<'s, S: CheckpointSchedule + ?Sized> ScheduleRunner<'s, S> {
    /// Creates a runner.
    pub fn new(schedule: &'s mut S) -> Self {
        Self {
            stats: DriveStats {
                max_n: schedule.max_n(),
                ..Default::default()
            },
            schedule,
            recorded: None,
        }
    }

    /// Creates a runner that also keeps every executed action.
    pub fn recording(schedule: &'s mut S) -> Self {
        let mut runner = Self::new(schedule);
        runner.recorded = Some(Vec::new());
        runner
    }

    /// Returns the statistics so far.
    #[inline]
    pub fn stats(&self) -> &DriveStats {
        &self.stats
    }

    /// Returns the executed actions, if recording.
    pub fn actions(&self) -> Option<&[Action]> {
        self.recorded.as_deref()
    }

    /// Consumes the runner, returning its statistics.
    pub fn into_stats(self) -> DriveStats {
        self.stats
    }

    /// Consumes the runner, returning its statistics and recorded actions.
    pub fn into_parts(self) -> (DriveStats, Vec<Action>) {
        (self.stats, self.recorded.unwrap_or_default())
    }

    /// Executes actions up to and including `EndForward`.
    ///
    /// # Errors
    ///
    /// Returns the first schedule or driver failure.
    pub fn run_forward<D: CheckpointDriver>(
        &mut self,
        driver: &mut D,
    ) -> Result<(), DriveError<D::Error>> {
        loop {
            if self.step(driver)? == Action::EndForward {
                return Ok(());
            }
        }
    }

    /// Executes actions up to and including the next `EndReverse`,
    /// returning its `exhausted` flag.
    ///
    /// # Errors
    ///
    /// Returns the first schedule or driver failure.
    pub fn run_reverse<D: CheckpointDriver>(
        &mut self,
        driver: &mut D,
    ) -> Result<bool, DriveError<D::Error>> {
        loop {
            if let Action::EndReverse { exhausted } = self.step(driver)? {
                return Ok(exhausted);
            }
        }
    }

    /// Executes a single action.
    ///
    /// # Errors
    ///
    /// Returns the first schedule or driver failure.
    pub fn step<D: CheckpointDriver>(
        &mut self,
        driver: &mut D,
    ) -> Result<Action, DriveError<D::Error>> {
        let action = self.schedule.next_action()?;
        self.stats.record(&action);
        if let Some(recorded) = self.recorded.as_mut() {
            recorded.push(action);
        }

        match action {
            Action::Configure {
                store_ics,
                store_data,
            } => driver
                .configure(store_ics, store_data)
                .map_err(DriveError::Driver)?,
            Action::Forward { n0, n1 } => {
                let end = driver.forward(n0, n1).map_err(DriveError::Driver)?;
                let stop = end.map_or(n1, |end| end.clamp(n0, n1));
                self.stats.forward_steps += stop - n0;
                if let Some(end) = end {
                    if self.schedule.max_n().is_none() {
                        debug!(n = end, "finalizing trajectory");
                        self.schedule.finalize(end)?;
                    }
                }
            }
            Action::Write { n, storage } => driver.write(n, storage).map_err(DriveError::Driver)?,
            Action::Read { n, storage, delete } => driver
                .read(n, storage, delete)
                .map_err(DriveError::Driver)?,
            Action::Clear {
                clear_ics,
                clear_data,
            } => driver
                .clear(clear_ics, clear_data)
                .map_err(DriveError::Driver)?,
            Action::EndForward => {
                self.stats.max_n = self.schedule.max_n();
                driver.end_forward().map_err(DriveError::Driver)?;
            }
            Action::Reverse { n1, n0 } => driver.reverse(n1, n0).map_err(DriveError::Driver)?,
            Action::EndReverse { exhausted } => {
                debug!(
                    actions = self.stats.actions,
                    forward_steps = self.stats.forward_steps,
                    adjoint_steps = self.stats.adjoint_steps,
                    exhausted,
                    "reverse sweep driven"
                );
                driver.end_reverse(exhausted).map_err(DriveError::Driver)?;
            }
        }
        Ok(action)
    }
}

/// Drives the forward sweep of a schedule.
///
/// # Errors
///
/// Returns the first schedule or driver failure.
pub fn drive_forward<S, D>(schedule: &mut S, driver: &mut D) -> Result<DriveStats, DriveError<D::Error>>
where
    S: CheckpointSchedule + ?Sized,
    D: CheckpointDriver,
{
    let mut runner = ScheduleRunner::new(schedule);
    runner.run_forward(driver)?;
    Ok(runner.into_stats())
}

/// Drives one reverse sweep of a schedule whose forward sweep is complete.
///
/// # Errors
///
/// Returns the first schedule or driver failure.
pub fn drive_reverse<S, D>(schedule: &mut S, driver: &mut D) -> Result<DriveStats, DriveError<D::Error>>
where
    S: CheckpointSchedule + ?Sized,
    D: CheckpointDriver,
{
    let mut runner = ScheduleRunner::new(schedule);
    runner.run_reverse(driver)?;
    Ok(runner.into_stats())
}

/// Drives a forward sweep followed by one reverse sweep.
///
/// # Errors
///
/// Returns the first schedule or driver failure.
pub fn drive<S, D>(schedule: &mut S, driver: &mut D) -> Result<DriveStats, DriveError<D::Error>>
where
    S: CheckpointSchedule + ?Sized,
    D: CheckpointDriver,
{
    let mut runner = ScheduleRunner::new(schedule);
    runner.run_forward(driver)?;
    runner.run_reverse(driver)?;
    Ok(runner.into_stats())
}
