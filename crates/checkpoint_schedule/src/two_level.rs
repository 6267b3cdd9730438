//! Two-level mixed periodic/binomial checkpointing.
//!
//! The forward sweep writes a disk snapshot at the start of every period
//! of `disk_period` steps until the driver finalizes the trajectory. Each
//! period is then reversed, last period first, with a binomial sweep using
//! `binomial_snapshots` inner snapshots. The schedule is never exhausted:
//! period snapshots are kept, so any number of reverse sweeps can follow
//! the one forward sweep.
//!
//! - Pringle, G. J., Jones, D. C., Goswami, S., Narayanan, S. H. K., &
//!   Goldberg, D. (2016). Providing the ARCHER community with adjoint
//!   modelling tools for high-performance oceanographic and cryospheric
//!   computation. EPCC.
//! - Goldberg, D. N., Smith, T. A., Narayanan, S. H. K., Heimbach, P., &
//!   Morlighem, M. (2020). Bathymetric influences on Antarctic ice-shelf
//!   melt rates. JGR Oceans 125(11).

use tracing::debug;

use crate::action::{Action, StorageTier};
use crate::advance::Trajectory;
use crate::binomial::BinomialSweep;
use crate::error::{ConfigError, ScheduleError, ScheduleResult};
use crate::schedule::{CheckpointSchedule, Emitter, ScheduleState};
use crate::snapshot::SnapshotStack;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    ForwardConfigure,
    ForwardRun,
    ForwardWrite { n0: usize },
    ForwardClear,
    /// Select the next period to reverse, or end the sweep.
    PeriodStart,
    /// Binomial sweep over the period starting at `n0s`.
    Period { n0s: usize },
}

/// Two-level checkpointing schedule for trajectories of unknown length.
///
/// # Examples
///
/// ```rust
/// use checkpoint_schedule::{Action, CheckpointSchedule, StorageTier, TwoLevelCheckpointSchedule};
///
/// let mut schedule = TwoLevelCheckpointSchedule::builder(5)
///     .binomial_snapshots(1)
///     .build()
///     .unwrap();
///
/// schedule.next_action().unwrap();
/// assert_eq!(schedule.next_action().unwrap(), Action::Forward { n0: 0, n1: 5 });
/// assert_eq!(
///     schedule.next_action().unwrap(),
///     Action::Write { n: 0, storage: StorageTier::Disk }
/// );
/// assert_eq!(schedule.max_n(), None);
/// ```
#[derive(Clone, Debug)]
pub struct TwoLevelCheckpointSchedule {
    state: ScheduleState,
    period: usize,
    binomial_snapshots: usize,
    binomial_storage: StorageTier,
    trajectory: Trajectory,
    phase: Phase,
    sweep: BinomialSweep,
    emitter: Emitter,
}

impl TwoLevelCheckpointSchedule {
    /// Creates a schedule with disk-tier inner snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if `disk_period < 1`.
    pub fn new(disk_period: usize, binomial_snapshots: usize) -> Result<Self, ConfigError> {
        Self::builder(disk_period)
            .binomial_snapshots(binomial_snapshots)
            .build()
    }

    /// Creates a builder with the given disk snapshot period.
    #[inline]
    pub fn builder(disk_period: usize) -> TwoLevelCheckpointScheduleBuilder {
        TwoLevelCheckpointScheduleBuilder {
            disk_period,
            ..Default::default()
        }
    }

    /// Returns the disk snapshot period.
    #[inline]
    pub fn disk_period(&self) -> usize {
        self.period
    }

    /// Returns the number of inner snapshots per period.
    #[inline]
    pub fn binomial_snapshots(&self) -> usize {
        self.binomial_snapshots
    }

    /// Returns the tier of the inner snapshots.
    #[inline]
    pub fn binomial_storage(&self) -> StorageTier {
        self.binomial_storage
    }

    /// Returns the trajectory policy of the inner sweeps.
    #[inline]
    pub fn binomial_trajectory(&self) -> Trajectory {
        self.trajectory
    }

    fn produce(&mut self) -> ScheduleResult<Action> {
        loop {
            match self.phase {
                Phase::ForwardConfigure => {
                    if let Some(max_n) = self.state.max_n() {
                        debug!(max_n, period = self.period, "two-level forward sweep complete");
                        self.phase = Phase::PeriodStart;
                        return Ok(Action::EndForward);
                    }
                    self.phase = Phase::ForwardRun;
                    return Ok(Action::Configure {
                        store_ics: true,
                        store_data: false,
                    });
                }
                Phase::ForwardRun => {
                    if self.state.max_n().is_some() {
                        return Err(ScheduleError::invalid_state(
                            "trajectory finalized before forward run",
                        ));
                    }
                    let (n0, n1) = self.state.advance_to(self.state.n() + self.period)?;
                    self.phase = Phase::ForwardWrite { n0 };
                    return Ok(Action::Forward { n0, n1 });
                }
                Phase::ForwardWrite { n0 } => {
                    self.phase = Phase::ForwardClear;
                    return Ok(Action::Write {
                        n: n0,
                        storage: StorageTier::Disk,
                    });
                }
                Phase::ForwardClear => {
                    self.phase = Phase::ForwardConfigure;
                    return Ok(Action::Clear {
                        clear_ics: true,
                        clear_data: true,
                    });
                }
                Phase::PeriodStart => {
                    let max_n = self.max_n_or_err()?;
                    let r = self.state.r();
                    if r < max_n {
                        let n = max_n - r - 1;
                        let n0s = (n / self.period) * self.period;
                        let n1s = (n0s + self.period).min(max_n);
                        if r != max_n - n1s {
                            return Err(ScheduleError::invalid_state(format!(
                                "reverse cursor {} not at end of period {}..{}",
                                r, n0s, n1s
                            )));
                        }
                        self.sweep.restart(n0s)?;
                        self.phase = Phase::Period { n0s };
                        continue;
                    }
                    if r != max_n {
                        return Err(ScheduleError::invalid_state(format!(
                            "reverse sweep ended after {} of {} steps",
                            r, max_n
                        )));
                    }
                    // Reset for another reverse sweep
                    self.state.reset_reverse();
                    debug!(max_n, "two-level reverse sweep complete");
                    return Ok(Action::EndReverse { exhausted: false });
                }
                Phase::Period { n0s } => {
                    let max_n = self.max_n_or_err()?;
                    if let Some(action) = self.sweep.next(&mut self.state, max_n, max_n - n0s)? {
                        return Ok(action);
                    }
                    if self.state.r() != max_n - n0s {
                        return Err(ScheduleError::invalid_state(format!(
                            "period {} ended with reverse cursor {}",
                            n0s,
                            self.state.r()
                        )));
                    }
                    if !self.sweep.snapshots().is_empty() {
                        return Err(ScheduleError::invalid_state(format!(
                            "{} snapshots left at end of period {}",
                            self.sweep.snapshots().len(),
                            n0s
                        )));
                    }
                    self.phase = Phase::PeriodStart;
                }
            }
        }
    }

    fn max_n_or_err(&self) -> ScheduleResult<usize> {
        self.state
            .max_n()
            .ok_or_else(|| ScheduleError::invalid_state("reverse sweep before finalize"))
    }
}

impl CheckpointSchedule for TwoLevelCheckpointSchedule {
    fn next_action(&mut self) -> ScheduleResult<Action> {
        self.emitter.check()?;
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
        false
    }

    fn uses_disk_storage(&self) -> bool {
        true
    }

    fn is_running(&self) -> bool {
        self.emitter.is_running()
    }
}

/// Builder for [`TwoLevelCheckpointSchedule`].
#[derive(Clone, Debug, Default)]
pub struct TwoLevelCheckpointScheduleBuilder {
    disk_period: usize,
    binomial_snapshots: usize,
    binomial_storage: StorageTier,
    keep_block_0_ics: bool,
    binomial_trajectory: Trajectory,
}

impl TwoLevelCheckpointScheduleBuilder {
    /// Sets the number of inner snapshots per period.
    #[inline]
    pub fn binomial_snapshots(mut self, snapshots: usize) -> Self {
        self.binomial_snapshots = snapshots;
        self
    }

    /// Sets the tier of the inner snapshots.
    #[inline]
    pub fn binomial_storage(mut self, storage: StorageTier) -> Self {
        self.binomial_storage = storage;
        self
    }

    /// Retains the initial conditions of step 0 across the reverse sweep.
    #[inline]
    pub fn keep_block_0_ics(mut self, keep: bool) -> Self {
        self.keep_block_0_ics = keep;
        self
    }

    /// Sets the trajectory policy of the inner sweeps.
    #[inline]
    pub fn binomial_trajectory(mut self, trajectory: Trajectory) -> Self {
        self.binomial_trajectory = trajectory;
        self
    }

    /// Builds the schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] if `disk_period < 1`.
    pub fn build(self) -> Result<TwoLevelCheckpointSchedule, ConfigError> {
        if self.disk_period < 1 {
            return Err(ConfigError::InvalidParameter {
                name: "disk_period",
                reason: "must be positive".to_string(),
            });
        }

        // Slot 0 holds the period snapshot
        let mut slots = Vec::with_capacity(self.binomial_snapshots + 1);
        slots.push(StorageTier::Disk);
        slots.extend(std::iter::repeat(self.binomial_storage).take(self.binomial_snapshots));

        debug!(
            disk_period = self.disk_period,
            binomial_snapshots = self.binomial_snapshots,
            binomial_storage = %self.binomial_storage,
            "two-level schedule created"
        );
        Ok(TwoLevelCheckpointSchedule {
            state: ScheduleState::new(None),
            period: self.disk_period,
            binomial_snapshots: self.binomial_snapshots,
            binomial_storage: self.binomial_storage,
            trajectory: self.binomial_trajectory,
            phase: Phase::ForwardConfigure,
            sweep: BinomialSweep::reverse(
                SnapshotStack::new(slots),
                self.binomial_trajectory,
                self.keep_block_0_ics,
            ),
            emitter: Emitter::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Runs the forward sweep, finalizing at `max_n` during the run that
    /// crosses it.
    fn run_forward(schedule: &mut TwoLevelCheckpointSchedule, max_n: usize) -> Vec<Action> {
        let mut actions = Vec::new();
        loop {
            let action = schedule.next_action().unwrap();
            actions.push(action);
            match action {
                Action::Forward { n1, .. } if n1 >= max_n && schedule.max_n().is_none() => {
                    schedule.finalize(max_n).unwrap();
                }
                Action::EndForward => return actions,
                _ => {}
            }
        }
    }

    fn run_reverse(schedule: &mut TwoLevelCheckpointSchedule) -> Vec<Action> {
        let mut actions = Vec::new();
        loop {
            let action = schedule.next_action().unwrap();
            actions.push(action);
            if action.is_end_reverse() {
                return actions;
            }
        }
    }

    fn render(actions: &[Action]) -> Vec<String> {
        actions.iter().map(|a| a.to_string()).collect()
    }

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_zero_period_rejected() {
        let err = TwoLevelCheckpointSchedule::new(0, 2).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "disk_period",
                ..
            }
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let schedule = TwoLevelCheckpointSchedule::builder(4).build().unwrap();
        assert_eq!(schedule.disk_period(), 4);
        assert_eq!(schedule.binomial_snapshots(), 0);
        assert_eq!(schedule.binomial_storage(), StorageTier::Disk);
        assert_eq!(schedule.binomial_trajectory(), Trajectory::Maximum);
        assert!(schedule.uses_disk_storage());
        assert!(!schedule.is_exhausted());
        assert_eq!(schedule.max_n(), None);
    }

    // ========================================================================
    // Forward Sweep Tests
    // ========================================================================

    #[test]
    fn test_forward_writes_each_period_to_disk() {
        let mut schedule = TwoLevelCheckpointSchedule::builder(5)
            .binomial_snapshots(1)
            .binomial_storage(StorageTier::Ram)
            .build()
            .unwrap();
        let actions = run_forward(&mut schedule, 15);

        let mut expected = Vec::new();
        for n0 in [0, 5, 10] {
            expected.push("Configure(true, false)".to_string());
            expected.push(format!("Forward({}, {})", n0, n0 + 5));
            expected.push(format!("Write({}, disk)", n0));
            expected.push("Clear(true, true)".to_string());
        }
        expected.push("EndForward()".to_string());
        assert_eq!(render(&actions), expected);
        assert_eq!(schedule.max_n(), Some(15));
    }

    #[test]
    fn test_finalize_between_configure_and_forward_fails() {
        let mut schedule = TwoLevelCheckpointSchedule::new(5, 1).unwrap();
        schedule.next_action().unwrap();
        schedule.next_action().unwrap();
        schedule.next_action().unwrap();
        schedule.next_action().unwrap();

        // Configure for the second period, then finalize at the cursor
        schedule.next_action().unwrap();
        schedule.finalize(5).unwrap();
        let err = schedule.next_action().unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidState(_)));

        // Poisoned
        assert_eq!(schedule.next_action(), Err(err));
    }

    // ========================================================================
    // Reverse Sweep Tests
    // ========================================================================

    #[test]
    fn test_reverse_prefix_with_ram_binomial_snapshots() {
        let mut schedule = TwoLevelCheckpointSchedule::builder(5)
            .binomial_snapshots(1)
            .binomial_storage(StorageTier::Ram)
            .build()
            .unwrap();
        run_forward(&mut schedule, 15);
        let actions = run_reverse(&mut schedule);

        assert_eq!(
            render(&actions[..13]),
            vec![
                "Read(10, disk, false)",
                "Clear(true, true)",
                "Configure(false, false)",
                "Forward(10, 12)",
                "Clear(true, true)",
                "Configure(true, false)",
                "Forward(12, 14)",
                "Write(12, RAM)",
                "Clear(true, true)",
                "Configure(false, true)",
                "Forward(14, 15)",
                "Reverse(15, 14)",
                "Clear(true, true)",
            ]
        );
        assert_eq!(actions.last(), Some(&Action::EndReverse { exhausted: false }));
    }

    #[test]
    fn test_reverse_sweep_is_repeatable() {
        let mut schedule = TwoLevelCheckpointSchedule::new(5, 2).unwrap();
        run_forward(&mut schedule, 15);

        let first = run_reverse(&mut schedule);
        assert_eq!(schedule.r(), 0);
        let second = run_reverse(&mut schedule);
        assert_eq!(first, second);
    }

    #[test]
    fn test_mid_period_finalize() {
        let mut schedule = TwoLevelCheckpointSchedule::new(5, 2).unwrap();
        let forward = run_forward(&mut schedule, 13);
        let writes: Vec<&Action> = forward
            .iter()
            .filter(|a| matches!(a, Action::Write { .. }))
            .collect();
        assert_eq!(writes.len(), 3);
        assert_eq!(schedule.n(), 13);

        let reverse = run_reverse(&mut schedule);
        assert_eq!(
            render(&reverse[..12]),
            vec![
                "Read(10, disk, false)",
                "Clear(true, true)",
                "Configure(false, false)",
                "Forward(10, 11)",
                "Clear(true, true)",
                "Configure(true, false)",
                "Forward(11, 12)",
                "Write(11, disk)",
                "Clear(true, true)",
                "Configure(false, true)",
                "Forward(12, 13)",
                "Reverse(13, 12)",
            ]
        );
        let reverses = reverse
            .iter()
            .filter(|a| matches!(a, Action::Reverse { .. }))
            .count();
        assert_eq!(reverses, 13);
    }

    #[test]
    fn test_period_snapshots_never_deleted() {
        let mut schedule = TwoLevelCheckpointSchedule::new(4, 1).unwrap();
        run_forward(&mut schedule, 12);
        for action in run_reverse(&mut schedule) {
            if let Action::Read { n, delete, .. } = action {
                if n % 4 == 0 {
                    assert!(!delete, "period snapshot {} deleted", n);
                }
            }
        }
    }
}
