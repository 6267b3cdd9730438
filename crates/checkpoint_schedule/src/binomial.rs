//! Binomial sweep shared by the multistage and two-level schedules.
//!
//! A sweep runs forward from the cursor, writing snapshots at the run
//! lengths chosen by [`n_advance`], takes one adjoint step, then restores
//! the latest snapshot and repeats until the reverse cursor reaches the
//! end of the interval it was given.

use crate::action::Action;
use crate::advance::{n_advance, Trajectory};
use crate::error::{ScheduleError, ScheduleResult};
use crate::schedule::ScheduleState;
use crate::snapshot::SnapshotStack;

/// Position within the sweep. Each phase emits exactly one action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    /// Decide between another snapshot run and the final forward step.
    Advance,
    /// Forward run that ends with a snapshot write.
    AdvanceForward,
    AdvanceWrite { n0: usize },
    AdvanceClear,
    /// Single step feeding the adjoint.
    StepForward,
    EndForward,
    StepReverse,
    StepClear,
    /// Restore the latest snapshot.
    Restore,
    RestoreClear { recompute: bool },
    /// Run forward from a retained snapshot without writing it again.
    RecomputeConfigure,
    RecomputeForward,
    RecomputeClear,
}

/// Shared binomial state machine.
#[derive(Clone, Debug)]
pub(crate) struct BinomialSweep {
    phase: Phase,
    snapshots: SnapshotStack,
    trajectory: Trajectory,
    keep_block_0_ics: bool,
    end_forward_pending: bool,
}

impl BinomialSweep {
    /// Starts with the forward sweep from step 0. `EndForward` is emitted
    /// after the first forward step that feeds an adjoint step.
    pub(crate) fn forward(
        snapshots: SnapshotStack,
        trajectory: Trajectory,
        keep_block_0_ics: bool,
    ) -> Self {
        Self {
            phase: Phase::Advance,
            snapshots,
            trajectory,
            keep_block_0_ics,
            end_forward_pending: true,
        }
    }

    /// Starts idle; call [`BinomialSweep::restart`] before use.
    pub(crate) fn reverse(
        snapshots: SnapshotStack,
        trajectory: Trajectory,
        keep_block_0_ics: bool,
    ) -> Self {
        Self {
            phase: Phase::Restore,
            snapshots,
            trajectory,
            keep_block_0_ics,
            end_forward_pending: false,
        }
    }

    /// Begins a reverse sweep from a persistent snapshot at step `base`.
    pub(crate) fn restart(&mut self, base: usize) -> ScheduleResult<()> {
        if !self.snapshots.is_empty() {
            return Err(ScheduleError::invalid_state(format!(
                "{} snapshots left over before restarting at step {}",
                self.snapshots.len(),
                base
            )));
        }
        self.snapshots.push_persistent(base)?;
        self.phase = Phase::Restore;
        Ok(())
    }

    pub(crate) fn snapshots(&self) -> &SnapshotStack {
        &self.snapshots
    }

    /// Produces the next action, or `None` once `state.r()` has reached
    /// `r_end` and the sweep is waiting to be restarted or closed.
    pub(crate) fn next(
        &mut self,
        state: &mut ScheduleState,
        max_n: usize,
        r_end: usize,
    ) -> ScheduleResult<Option<Action>> {
        let action = match self.phase {
            Phase::Advance => {
                let target = remaining(max_n, state.r())?;
                let n = state.n();
                if n + 1 < target {
                    self.phase = Phase::AdvanceForward;
                    Action::Configure {
                        store_ics: true,
                        store_data: false,
                    }
                } else if n + 1 == target {
                    self.phase = Phase::StepForward;
                    Action::Configure {
                        store_ics: self.keep_block_0_ics && n == 0,
                        store_data: true,
                    }
                } else {
                    return Err(ScheduleError::invalid_state(format!(
                        "forward cursor {} does not precede step {}",
                        n, target
                    )));
                }
            }
            Phase::AdvanceForward => {
                let (n0, n1) = self.advance(state, max_n, self.snapshots.free_slots())?;
                self.phase = Phase::AdvanceWrite { n0 };
                Action::Forward { n0, n1 }
            }
            Phase::AdvanceWrite { n0 } => {
                if n0 >= max_n {
                    return Err(ScheduleError::invalid_state(format!(
                        "snapshot at step {} beyond final step {}",
                        n0, max_n
                    )));
                }
                let storage = self.snapshots.push(n0)?;
                self.phase = Phase::AdvanceClear;
                Action::Write { n: n0, storage }
            }
            Phase::AdvanceClear => {
                self.phase = Phase::Advance;
                clear_all()
            }
            Phase::StepForward => {
                let (n0, n1) = state.advance_to(state.n() + 1)?;
                self.phase = if self.end_forward_pending {
                    Phase::EndForward
                } else {
                    Phase::StepReverse
                };
                Action::Forward { n0, n1 }
            }
            Phase::EndForward => {
                self.end_forward_pending = false;
                self.phase = Phase::StepReverse;
                Action::EndForward
            }
            Phase::StepReverse => {
                let action = state.reverse_step()?;
                self.phase = Phase::StepClear;
                action
            }
            Phase::StepClear => {
                self.phase = Phase::Restore;
                Action::Clear {
                    clear_ics: !self.keep_block_0_ics || state.n() != 1,
                    clear_data: true,
                }
            }
            Phase::Restore => {
                if state.r() >= r_end {
                    return Ok(None);
                }
                let snapshot = self.snapshots.top()?;
                let next = remaining(max_n, state.r())? - 1;
                if snapshot.n > next {
                    return Err(ScheduleError::invalid_state(format!(
                        "snapshot at step {} beyond adjoint position {}",
                        snapshot.n, next
                    )));
                }

                state.restore(snapshot.n);
                if snapshot.n == next {
                    self.snapshots.pop()?;
                    self.phase = Phase::RestoreClear { recompute: false };
                    Action::Read {
                        n: snapshot.n,
                        storage: snapshot.storage,
                        delete: !snapshot.persistent,
                    }
                } else {
                    self.phase = Phase::RestoreClear { recompute: true };
                    Action::Read {
                        n: snapshot.n,
                        storage: snapshot.storage,
                        delete: false,
                    }
                }
            }
            Phase::RestoreClear { recompute } => {
                self.phase = if recompute {
                    Phase::RecomputeConfigure
                } else {
                    Phase::Advance
                };
                clear_all()
            }
            Phase::RecomputeConfigure => {
                self.phase = Phase::RecomputeForward;
                Action::Configure {
                    store_ics: false,
                    store_data: false,
                }
            }
            Phase::RecomputeForward => {
                // The restored snapshot keeps its slot but is not rewritten
                let (n0, n1) = self.advance(state, max_n, self.snapshots.free_slots() + 1)?;
                self.phase = Phase::RecomputeClear;
                Action::Forward { n0, n1 }
            }
            Phase::RecomputeClear => {
                self.phase = Phase::Advance;
                clear_all()
            }
        };
        Ok(Some(action))
    }

    fn advance(
        &self,
        state: &mut ScheduleState,
        max_n: usize,
        snapshots: usize,
    ) -> ScheduleResult<(usize, usize)> {
        let n0 = state.n();
        let steps = remaining(max_n, state.r())?
            .checked_sub(n0)
            .ok_or_else(|| {
                ScheduleError::invalid_state(format!("forward cursor {} past adjoint position", n0))
            })?;
        let n1 = n0 + n_advance(steps, snapshots, self.trajectory)?;
        state.advance_to(n1)
    }
}

/// Position of the next adjoint step's end, `max_n - r`.
fn remaining(max_n: usize, r: usize) -> ScheduleResult<usize> {
    max_n.checked_sub(r).ok_or_else(|| {
        ScheduleError::invalid_state(format!("{} adjoint steps exceed {} steps", r, max_n))
    })
}

fn clear_all() -> Action {
    Action::Clear {
        clear_ics: true,
        clear_data: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::StorageTier;

    fn run_sweep(max_n: usize, capacity: usize) -> Vec<Action> {
        let mut state = ScheduleState::new(Some(max_n));
        let mut sweep = BinomialSweep::forward(
            SnapshotStack::uniform(capacity, StorageTier::Ram),
            Trajectory::Maximum,
            false,
        );
        let mut actions = Vec::new();
        while let Some(action) = sweep.next(&mut state, max_n, max_n).unwrap() {
            actions.push(action);
        }
        assert_eq!(state.r(), max_n);
        assert!(sweep.snapshots().is_empty());
        actions
    }

    #[test]
    fn test_single_step_sweep() {
        let actions = run_sweep(1, 1);
        assert_eq!(
            actions,
            vec![
                Action::Configure {
                    store_ics: false,
                    store_data: true
                },
                Action::Forward { n0: 0, n1: 1 },
                Action::EndForward,
                Action::Reverse { n1: 1, n0: 0 },
                clear_all(),
            ]
        );
    }

    #[test]
    fn test_two_step_sweep_writes_initial_snapshot() {
        let actions = run_sweep(2, 1);
        assert_eq!(actions[0], Action::Configure { store_ics: true, store_data: false });
        assert_eq!(actions[1], Action::Forward { n0: 0, n1: 1 });
        assert_eq!(
            actions[2],
            Action::Write {
                n: 0,
                storage: StorageTier::Ram
            }
        );
        assert!(actions.contains(&Action::Read {
            n: 0,
            storage: StorageTier::Ram,
            delete: true
        }));
    }

    #[test]
    fn test_restart_requires_empty_stack() {
        let mut sweep = BinomialSweep::reverse(
            SnapshotStack::uniform(2, StorageTier::Disk),
            Trajectory::Maximum,
            false,
        );
        sweep.restart(0).unwrap();
        assert!(matches!(
            sweep.restart(5),
            Err(ScheduleError::InvalidState(_))
        ));
    }

    #[test]
    fn test_persistent_base_is_never_deleted() {
        let max_n = 3;
        let mut state = ScheduleState::new(Some(max_n));
        state.advance_to(max_n).unwrap();

        let mut sweep = BinomialSweep::reverse(
            SnapshotStack::uniform(2, StorageTier::Disk),
            Trajectory::Maximum,
            false,
        );
        sweep.restart(0).unwrap();

        let mut reads = Vec::new();
        while let Some(action) = sweep.next(&mut state, max_n, max_n).unwrap() {
            if let Action::Read { n: 0, delete, .. } = action {
                reads.push(delete);
            }
        }
        assert!(!reads.is_empty());
        assert!(reads.iter().all(|&delete| !delete));
    }
}
