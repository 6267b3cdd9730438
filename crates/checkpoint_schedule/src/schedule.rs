//! Schedule protocol shared by every checkpointing strategy.
//!
//! A schedule owns a [`ScheduleState`] (forward cursor `n`, reverse cursor
//! `r`, trajectory length `max_n`) and advances it only while producing
//! actions. Drivers pull actions one at a time with
//! [`CheckpointSchedule::next_action`].

use tracing::{trace, warn};

use crate::action::Action;
use crate::error::{ScheduleError, ScheduleResult};

/// Step counters of a schedule.
///
/// - `n`: forward cursor. Advances with every `Forward`, moves back when a
///   snapshot is read.
/// - `r`: number of adjoint steps completed in the current reverse sweep.
/// - `max_n`: trajectory length, unknown until finalized for online
///   schedules.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScheduleState {
    n: usize,
    r: usize,
    max_n: Option<usize>,
}

impl ScheduleState {
    /// Creates the initial state, at step 0 with no adjoint steps taken.
    pub fn new(max_n: Option<usize>) -> Self {
        Self { n: 0, r: 0, max_n }
    }

    /// Returns the forward cursor.
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// Returns the number of completed adjoint steps.
    #[inline]
    pub fn r(&self) -> usize {
        self.r
    }

    /// Returns the trajectory length, if known.
    #[inline]
    pub fn max_n(&self) -> Option<usize> {
        self.max_n
    }

    /// Fixes the trajectory length at step `n`.
    ///
    /// If `max_n` is unknown the forward cursor may be past `n` (the driver
    /// stopped inside a forward run), and both are set to `n`. If `max_n` is
    /// known, the cursor and `max_n` must both equal `n`.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidFinalize`] if `n == 0` or `n` is
    /// inconsistent with the state.
    pub fn finalize(&mut self, n: usize) -> ScheduleResult<()> {
        if n < 1 {
            return Err(ScheduleError::InvalidFinalize {
                n,
                reason: "trajectory must contain at least one step".to_string(),
            });
        }

        match self.max_n {
            None => {
                if self.n < n {
                    return Err(ScheduleError::InvalidFinalize {
                        n,
                        reason: format!("forward cursor is only at step {}", self.n),
                    });
                }
                self.n = n;
                self.max_n = Some(n);
                Ok(())
            }
            Some(max_n) if max_n != n || self.n != n => Err(ScheduleError::InvalidFinalize {
                n,
                reason: format!("cursor at {} of {} steps", self.n, max_n),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Moves the forward cursor to `n1`, returning the run `(n0, n1)`.
    pub(crate) fn advance_to(&mut self, n1: usize) -> ScheduleResult<(usize, usize)> {
        let n0 = self.n;
        if n1 <= n0 {
            return Err(ScheduleError::NonAdvancing { n0, n1 });
        }
        self.n = n1;
        Ok((n0, n1))
    }

    /// Moves the forward cursor to a restored snapshot.
    pub(crate) fn restore(&mut self, n: usize) {
        self.n = n;
    }

    /// Records one adjoint step ending at the forward cursor.
    pub(crate) fn reverse_step(&mut self) -> ScheduleResult<Action> {
        let n1 = self.n;
        let n0 = n1
            .checked_sub(1)
            .ok_or_else(|| ScheduleError::invalid_state("adjoint step before step 0"))?;
        self.r += 1;
        Ok(Action::Reverse { n1, n0 })
    }

    /// Resets the reverse cursor for another reverse sweep.
    pub(crate) fn reset_reverse(&mut self) {
        self.r = 0;
    }
}

/// A checkpointing strategy producing a sequence of [`Action`]s.
///
/// The driver executes each action before requesting the next one. Any
/// error other than [`ScheduleError::Exhausted`] is fatal: the schedule
/// stays poisoned and returns the same error from every later call.
pub trait CheckpointSchedule {
    /// Produces the next action.
    ///
    /// # Errors
    ///
    /// Returns an internal-consistency error if the schedule state is
    /// invalid, or [`ScheduleError::Exhausted`] once a non-reusable schedule
    /// has completed.
    fn next_action(&mut self) -> ScheduleResult<Action>;

    /// Returns the step counters.
    fn state(&self) -> &ScheduleState;

    /// Fixes the trajectory length. See [`ScheduleState::finalize`].
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidFinalize`] for an inconsistent `n`.
    fn finalize(&mut self, n: usize) -> ScheduleResult<()>;

    /// Returns true once the schedule cannot produce further actions.
    fn is_exhausted(&self) -> bool;

    /// Returns true if the schedule may place snapshots on disk.
    fn uses_disk_storage(&self) -> bool;

    /// Returns true once the first action has been requested.
    fn is_running(&self) -> bool;

    /// Returns the forward cursor.
    fn n(&self) -> usize {
        self.state().n()
    }

    /// Returns the number of completed adjoint steps.
    fn r(&self) -> usize {
        self.state().r()
    }

    /// Returns the trajectory length, if known.
    fn max_n(&self) -> Option<usize> {
        self.state().max_n()
    }

    /// Returns an iterator over the remaining actions.
    fn actions(&mut self) -> Actions<'_, Self>
    where
        Self: Sized,
    {
        Actions::new(self)
    }
}

/// Iterator adapter over a schedule's actions.
///
/// Stops after the first error or after `EndReverse { exhausted: true }`.
/// Schedules that are never exhausted yield actions indefinitely, so callers
/// bound the iteration themselves (for example with `take_while`).
///
/// # Example
///
/// ```rust
/// use checkpoint_schedule::{Action, CheckpointSchedule, MultistageCheckpointSchedule};
///
/// let mut schedule = MultistageCheckpointSchedule::new(10, 3, 0).unwrap();
/// let actions: Vec<Action> = schedule.actions().collect::<Result<_, _>>().unwrap();
///
/// let reverses = actions
///     .iter()
///     .filter(|a| matches!(a, Action::Reverse { .. }))
///     .count();
/// assert_eq!(reverses, 10);
/// ```
pub struct Actions<'a, S: CheckpointSchedule + ?Sized> {
    schedule: &'a mut S,
    done: bool,
}

impl<'a, S: CheckpointSchedule + ?Sized> Actions<'a, S> {
    /// Wraps a schedule.
    pub fn new(schedule: &'a mut S) -> Self {
        let done = schedule.is_exhausted();
        Self { schedule, done }
    }
}

impl<S: CheckpointSchedule + ?Sized> Iterator for Actions<'_, S> {
    type Item = ScheduleResult<Action>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = self.schedule.next_action();
        match &result {
            Ok(Action::EndReverse { exhausted: true }) | Err(_) => self.done = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

/// Tracks whether a schedule has started and whether it has failed.
#[derive(Clone, Debug, Default)]
pub(crate) struct Emitter {
    running: bool,
    failure: Option<ScheduleError>,
}

impl Emitter {
    /// Returns the recorded failure, if any.
    pub(crate) fn check(&self) -> ScheduleResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Records the outcome of producing an action.
    pub(crate) fn record(&mut self, result: ScheduleResult<Action>) -> ScheduleResult<Action> {
        self.running = true;
        match &result {
            Ok(action) => trace!(action = %action, "checkpoint action"),
            Err(ScheduleError::Exhausted) => {}
            Err(err) => {
                if self.failure.is_none() {
                    warn!(error = %err, "checkpoint schedule failed");
                    self.failure = Some(err.clone());
                }
            }
        }
        result
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }
}
