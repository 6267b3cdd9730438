//! Multistage binomial checkpointing.
//!
//! Offline strategy for a trajectory of known length, following
//!
//! - Griewank, A., & Walther, A. (2000). Algorithm 799: revolve.
//!   ACM TOMS 26(1), 19-45.
//! - Stumm, P., & Walther, A. (2009). MultiStage approaches for optimal
//!   offline checkpointing. SIAM J. Sci. Comput. 31(3), 1946-1967.
//!
//! The RAM/disk split of the snapshot slots is decided once, at
//! construction, by [`allocate_snapshots`].

use tracing::debug;

use crate::action::{Action, StorageTier};
use crate::advance::Trajectory;
use crate::allocation::{allocate_snapshots, AllocationWeights};
use crate::binomial::BinomialSweep;
use crate::error::{ConfigError, ScheduleError, ScheduleResult};
use crate::schedule::{CheckpointSchedule, Emitter, ScheduleState};
use crate::snapshot::SnapshotStack;

/// Binomial checkpointing schedule over `max_n` steps.
///
/// Produces one forward sweep followed by one reverse sweep, then ends
/// with `EndReverse { exhausted: true }`. Further calls to
/// [`next_action`](CheckpointSchedule::next_action) return
/// [`ScheduleError::Exhausted`].
///
/// # Examples
///
/// ```rust
/// use checkpoint_schedule::{Action, CheckpointSchedule, MultistageCheckpointSchedule};
///
/// let mut schedule = MultistageCheckpointSchedule::builder(10)
///     .snapshots_in_ram(3)
///     .build()
///     .unwrap();
///
/// assert_eq!(
///     schedule.next_action().unwrap(),
///     Action::Configure { store_ics: true, store_data: false }
/// );
/// assert_eq!(schedule.next_action().unwrap(), Action::Forward { n0: 0, n1: 4 });
/// ```
#[derive(Clone, Debug)]
pub struct MultistageCheckpointSchedule {
    state: ScheduleState,
    max_n: usize,
    snapshots_in_ram: usize,
    snapshots_on_disk: usize,
    trajectory: Trajectory,
    sweep: BinomialSweep,
    exhausted: bool,
    emitter: Emitter,
}

impl MultistageCheckpointSchedule {
    /// Creates a schedule with the default trajectory policy.
    ///
    /// # Errors
    ///
    /// See [`MultistageCheckpointScheduleBuilder::build`].
    pub fn new(
        max_n: usize,
        snapshots_in_ram: usize,
        snapshots_on_disk: usize,
    ) -> ScheduleResult<Self> {
        Self::builder(max_n)
            .snapshots_in_ram(snapshots_in_ram)
            .snapshots_on_disk(snapshots_on_disk)
            .build()
    }

    /// Creates a builder for a trajectory of `max_n` steps.
    #[inline]
    pub fn builder(max_n: usize) -> MultistageCheckpointScheduleBuilder {
        MultistageCheckpointScheduleBuilder {
            max_n,
            ..Default::default()
        }
    }

    /// Creates a schedule with an explicit tier for every slot.
    pub(crate) fn with_storage(
        max_n: usize,
        storage: Vec<StorageTier>,
        keep_block_0_ics: bool,
        trajectory: Trajectory,
    ) -> Self {
        let snapshots_in_ram = storage.iter().filter(|&&t| t == StorageTier::Ram).count();
        let snapshots_on_disk = storage.len() - snapshots_in_ram;
        let sweep = BinomialSweep::forward(SnapshotStack::new(storage), trajectory, keep_block_0_ics);
        Self {
            state: ScheduleState::new(Some(max_n)),
            max_n,
            snapshots_in_ram,
            snapshots_on_disk,
            trajectory,
            sweep,
            exhausted: false,
            emitter: Emitter::default(),
        }
    }

    /// Returns the number of RAM slots.
    #[inline]
    pub fn snapshots_in_ram(&self) -> usize {
        self.snapshots_in_ram
    }

    /// Returns the number of disk slots.
    #[inline]
    pub fn snapshots_on_disk(&self) -> usize {
        self.snapshots_on_disk
    }

    /// Returns the trajectory policy.
    #[inline]
    pub fn trajectory(&self) -> Trajectory {
        self.trajectory
    }

    /// Returns the tier of every snapshot slot, bottom of the stack first.
    pub fn storage(&self) -> &[StorageTier] {
        self.sweep.snapshots().slots()
    }

    /// Returns the snapshots currently held.
    pub fn snapshots(&self) -> &SnapshotStack {
        self.sweep.snapshots()
    }

    fn produce(&mut self) -> ScheduleResult<Action> {
        match self.sweep.next(&mut self.state, self.max_n, self.max_n)? {
            Some(action) => {
                if action == Action::EndForward {
                    debug!(max_n = self.max_n, "multistage forward sweep complete");
                }
                Ok(action)
            }
            None => {
                if self.state.r() != self.max_n {
                    return Err(ScheduleError::invalid_state(format!(
                        "reverse sweep ended after {} of {} steps",
                        self.state.r(),
                        self.max_n
                    )));
                }
                if !self.sweep.snapshots().is_empty() {
                    return Err(ScheduleError::invalid_state(format!(
                        "{} snapshots left at end of reverse sweep",
                        self.sweep.snapshots().len()
                    )));
                }
                self.exhausted = true;
                debug!(max_n = self.max_n, "multistage reverse sweep complete");
                Ok(Action::EndReverse { exhausted: true })
            }
        }
    }
}

impl CheckpointSchedule for MultistageCheckpointSchedule {
    fn next_action(&mut self) -> ScheduleResult<Action> {
        self.emitter.check()?;
        if self.exhausted {
            return Err(ScheduleError::Exhausted);
        }
        let result = self.produce();
        self.emitter.record(result)
    }

    fn state(&self) -> &ScheduleState {
        &self.state
    }

    fn finalize(&mut self, n: usize) -> ScheduleResult<()> {
        self.state.finalize(n)
    }

    fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    fn uses_disk_storage(&self) -> bool {
        self.snapshots_on_disk > 0
    }

    fn is_running(&self) -> bool {
        self.emitter.is_running()
    }
}

/// Builder for [`MultistageCheckpointSchedule`].
#[derive(Clone, Debug, Default)]
pub struct MultistageCheckpointScheduleBuilder {
    max_n: usize,
    snapshots_in_ram: usize,
    snapshots_on_disk: usize,
    keep_block_0_ics: bool,
    trajectory: Trajectory,
}

impl MultistageCheckpointScheduleBuilder {
    /// Sets the number of RAM snapshot slots.
    #[inline]
    pub fn snapshots_in_ram(mut self, snapshots: usize) -> Self {
        self.snapshots_in_ram = snapshots;
        self
    }

    /// Sets the number of disk snapshot slots.
    #[inline]
    pub fn snapshots_on_disk(mut self, snapshots: usize) -> Self {
        self.snapshots_on_disk = snapshots;
        self
    }

    /// Retains the initial conditions of step 0 across the reverse sweep.
    #[inline]
    pub fn keep_block_0_ics(mut self, keep: bool) -> Self {
        self.keep_block_0_ics = keep;
        self
    }

    /// Sets the trajectory policy.
    #[inline]
    pub fn trajectory(mut self, trajectory: Trajectory) -> Self {
        self.trajectory = trajectory;
        self
    }

    /// Builds the schedule, running the tier allocator when both tiers
    /// have slots.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::Config`] if `max_n < 1`, or if no snapshot
    /// slots are configured for a trajectory of more than one step.
    pub fn build(self) -> ScheduleResult<MultistageCheckpointSchedule> {
        if self.max_n < 1 {
            return Err(ConfigError::InvalidParameter {
                name: "max_n",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        let snapshots = self.snapshots_in_ram + self.snapshots_on_disk;
        if snapshots == 0 && self.max_n > 1 {
            return Err(ConfigError::InvalidParameter {
                name: "snapshots",
                reason: format!("at least one snapshot required for {} steps", self.max_n),
            }
            .into());
        }

        let storage = if self.snapshots_in_ram == 0 {
            vec![StorageTier::Disk; self.snapshots_on_disk]
        } else if self.snapshots_on_disk == 0 {
            vec![StorageTier::Ram; self.snapshots_in_ram]
        } else {
            allocate_snapshots(
                self.max_n,
                self.snapshots_in_ram,
                self.snapshots_on_disk,
                AllocationWeights::default(),
                self.trajectory,
            )?
            .into_storage()
        };

        debug!(
            max_n = self.max_n,
            snapshots_in_ram = self.snapshots_in_ram,
            snapshots_on_disk = self.snapshots_on_disk,
            trajectory = %self.trajectory,
            "multistage schedule created"
        );
        Ok(MultistageCheckpointSchedule::with_storage(
            self.max_n,
            storage,
            self.keep_block_0_ics,
            self.trajectory,
        ))
    }
}
