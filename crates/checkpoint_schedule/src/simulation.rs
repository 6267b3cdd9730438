//! Deterministic reference driver.
//!
//! [`SimulatedDriver`] stands in for a real solver. The simulated state is
//! just the current step index, which is enough to check that a schedule
//! uses the protocol consistently: forward runs start where the state is,
//! snapshots exist before they are read, and every adjoint step has the
//! forward data it depends on.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::trace;

use crate::action::StorageTier;
use crate::driver::CheckpointDriver;

/// Protocol violations detected by [`SimulatedDriver`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SimulationError {
    /// Forward run not starting at the current state.
    #[error("Forward run from step {n0} but the state is at step {position}")]
    OutOfOrder {
        /// Current state.
        position: usize,
        /// Requested start.
        n0: usize,
    },

    /// Forward run of no steps.
    #[error("Non-advancing forward run: {n0} -> {n1}")]
    NonAdvancing {
        /// Start of the run.
        n0: usize,
        /// End of the run.
        n1: usize,
    },

    /// Forward run starting at or after the final step.
    #[error("Forward run from step {n} past the final step {end}")]
    BeyondEnd {
        /// Start of the run.
        n: usize,
        /// Final step.
        end: usize,
    },

    /// Write without retained initial conditions for the step.
    #[error("No initial conditions retained for step {n}")]
    MissingIcs {
        /// Step of the write.
        n: usize,
    },

    /// Write of a snapshot that already exists.
    #[error("Snapshot {n} already stored on {storage}")]
    DuplicateSnapshot {
        /// Step of the snapshot.
        n: usize,
        /// Tier of the snapshot.
        storage: StorageTier,
    },

    /// Read of a snapshot that does not exist.
    #[error("No snapshot {n} stored on {storage}")]
    MissingSnapshot {
        /// Step of the snapshot.
        n: usize,
        /// Tier of the snapshot.
        storage: StorageTier,
    },

    /// Tier capacity exceeded.
    #[error("{storage} capacity of {capacity} snapshots exceeded")]
    TierFull {
        /// Full tier.
        storage: StorageTier,
        /// Configured capacity.
        capacity: usize,
    },

    /// Adjoint step before the forward sweep ended.
    #[error("Adjoint step before the end of the forward sweep")]
    ReverseBeforeEnd,

    /// Adjoint step out of order.
    #[error("Adjoint step {n1} -> {n0}, expected step ending at {expected}")]
    UnexpectedReverse {
        /// End of the step.
        n1: usize,
        /// Start of the step.
        n0: usize,
        /// Expected end of the step.
        expected: usize,
    },

    /// Adjoint step without its forward data.
    #[error("No forward data retained for step {n}")]
    MissingData {
        /// Start of the step.
        n: usize,
    },

    /// Forward sweep ended at a different step than the trajectory.
    #[error("Forward sweep ended at step {actual}, trajectory has {expected} steps")]
    LengthMismatch {
        /// Trajectory length.
        expected: usize,
        /// Position at the end of the forward sweep.
        actual: usize,
    },

    /// Reverse sweep ended early.
    #[error("Reverse sweep ended after {completed} of {expected} adjoint steps")]
    IncompleteReverse {
        /// Adjoint steps taken.
        completed: usize,
        /// Trajectory length.
        expected: usize,
    },
}

/// Reference driver validating the action protocol.
///
/// # Examples
///
/// ```rust
/// use checkpoint_schedule::{CheckpointDriver, SimulatedDriver, StorageTier};
///
/// let mut driver = SimulatedDriver::with_steps(4);
/// driver.configure(true, false).unwrap();
/// assert_eq!(driver.forward(0, 2).unwrap(), None);
/// driver.write(0, StorageTier::Ram).unwrap();
///
/// // Snapshot 2 was never written
/// assert!(driver.read(2, StorageTier::Ram, true).is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct SimulatedDriver {
    steps: Option<usize>,
    ram_capacity: Option<usize>,
    disk_capacity: Option<usize>,

    position: usize,
    store_ics: bool,
    store_data: bool,
    retained_ics: Option<usize>,
    retained_data: BTreeSet<usize>,
    snapshots: BTreeSet<(StorageTier, usize)>,

    end: Option<usize>,
    reversed: usize,
}

impl SimulatedDriver {
    /// Creates a driver for a trajectory that never ends by itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a driver for a trajectory of `steps` steps.
    ///
    /// Forward runs crossing step `steps` stop there and report the end of
    /// the trajectory.
    pub fn with_steps(steps: usize) -> Self {
        Self {
            steps: Some(steps),
            ..Self::default()
        }
    }

    /// Limits the number of snapshots held on `storage`.
    pub fn with_capacity(mut self, storage: StorageTier, capacity: usize) -> Self {
        match storage {
            StorageTier::Ram => self.ram_capacity = Some(capacity),
            StorageTier::Disk => self.disk_capacity = Some(capacity),
        }
        self
    }

    /// Returns the current step of the simulated state.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the step at which the forward sweep ended, once it has.
    #[inline]
    pub fn end(&self) -> Option<usize> {
        self.end
    }

    /// Returns true if a snapshot of step `n` is held on `storage`.
    pub fn has_snapshot(&self, n: usize, storage: StorageTier) -> bool {
        self.snapshots.contains(&(storage, n))
    }

    /// Returns the number of snapshots held on `storage`.
    pub fn snapshot_count(&self, storage: StorageTier) -> usize {
        self.snapshots.iter().filter(|(tier, _)| *tier == storage).count()
    }

    fn capacity(&self, storage: StorageTier) -> Option<usize> {
        match storage {
            StorageTier::Ram => self.ram_capacity,
            StorageTier::Disk => self.disk_capacity,
        }
    }
}

impl CheckpointDriver for SimulatedDriver {
    type Error = SimulationError;

    fn configure(&mut self, store_ics: bool, store_data: bool) -> Result<(), Self::Error> {
        self.store_ics = store_ics;
        self.store_data = store_data;
        Ok(())
    }

    fn forward(&mut self, n0: usize, n1: usize) -> Result<Option<usize>, Self::Error> {
        if n0 != self.position {
            return Err(SimulationError::OutOfOrder {
                position: self.position,
                n0,
            });
        }
        if n1 <= n0 {
            return Err(SimulationError::NonAdvancing { n0, n1 });
        }

        let stop = match self.steps {
            Some(steps) if n0 >= steps => {
                return Err(SimulationError::BeyondEnd { n: n0, end: steps });
            }
            Some(steps) => n1.min(steps),
            None => n1,
        };

        if self.store_ics {
            self.retained_ics = Some(n0);
        }
        if self.store_data {
            self.retained_data.extend(n0..stop);
        }
        self.position = stop;
        trace!(n0, n1 = stop, "simulated forward run");

        Ok(self.steps.filter(|&steps| stop == steps))
    }

    fn write(&mut self, n: usize, storage: StorageTier) -> Result<(), Self::Error> {
        if self.retained_ics != Some(n) {
            return Err(SimulationError::MissingIcs { n });
        }
        if self.has_snapshot(n, storage) {
            return Err(SimulationError::DuplicateSnapshot { n, storage });
        }
        if let Some(capacity) = self.capacity(storage) {
            if self.snapshot_count(storage) >= capacity {
                return Err(SimulationError::TierFull { storage, capacity });
            }
        }
        self.snapshots.insert((storage, n));
        Ok(())
    }

    fn read(&mut self, n: usize, storage: StorageTier, delete: bool) -> Result<(), Self::Error> {
        if !self.has_snapshot(n, storage) {
            return Err(SimulationError::MissingSnapshot { n, storage });
        }
        if delete {
            self.snapshots.remove(&(storage, n));
        }
        self.position = n;
        Ok(())
    }

    fn clear(&mut self, clear_ics: bool, clear_data: bool) -> Result<(), Self::Error> {
        if clear_ics {
            self.retained_ics = None;
        }
        if clear_data {
            self.retained_data.clear();
        }
        Ok(())
    }

    fn reverse(&mut self, n1: usize, n0: usize) -> Result<(), Self::Error> {
        let end = self.end.ok_or(SimulationError::ReverseBeforeEnd)?;
        let expected = end - self.reversed;
        if n1 != expected || n0 + 1 != n1 {
            return Err(SimulationError::UnexpectedReverse { n1, n0, expected });
        }
        if !self.retained_data.contains(&n0) {
            return Err(SimulationError::MissingData { n: n0 });
        }
        self.reversed += 1;
        Ok(())
    }

    fn end_forward(&mut self) -> Result<(), Self::Error> {
        if let Some(steps) = self.steps {
            if steps != self.position {
                return Err(SimulationError::LengthMismatch {
                    expected: steps,
                    actual: self.position,
                });
            }
        }
        self.end = Some(self.position);
        self.reversed = 0;
        Ok(())
    }

    fn end_reverse(&mut self, _exhausted: bool) -> Result<(), Self::Error> {
        let expected = self.end.ok_or(SimulationError::ReverseBeforeEnd)?;
        if self.reversed != expected {
            return Err(SimulationError::IncompleteReverse {
                completed: self.reversed,
                expected,
            });
        }
        self.reversed = 0;
        Ok(())
    }
}
