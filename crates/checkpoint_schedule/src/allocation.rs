//! Snapshot tier allocation.
//!
//! Assigns each snapshot slot to RAM or disk by dry-running a multistage
//! schedule and weighting how often each stack position is written and
//! read. The most heavily used slots go to RAM.

use crate::action::{Action, StorageTier};
use crate::advance::Trajectory;
use crate::error::{ConfigError, ScheduleError, ScheduleResult};
use crate::multistage::MultistageCheckpointSchedule;
use crate::schedule::CheckpointSchedule;

/// Cost weights per snapshot operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AllocationWeights {
    /// Weight added per write.
    pub write: f64,
    /// Weight added per read.
    pub read: f64,
    /// Additional weight added per deleting read.
    pub delete: f64,
}

impl Default for AllocationWeights {
    fn default() -> Self {
        Self {
            write: 1.0,
            read: 1.0,
            delete: 0.0,
        }
    }
}

/// Result of [`allocate_snapshots`].
#[derive(Clone, Debug, PartialEq)]
pub struct SnapshotAllocation {
    weights: Vec<f64>,
    storage: Vec<StorageTier>,
}

impl SnapshotAllocation {
    /// Returns the accumulated weight of every slot, bottom of the stack first.
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Returns the tier of every slot, bottom of the stack first.
    #[inline]
    pub fn storage(&self) -> &[StorageTier] {
        &self.storage
    }

    /// Consumes the allocation, returning the tier of every slot.
    pub fn into_storage(self) -> Vec<StorageTier> {
        self.storage
    }
}

/// Allocates `snapshots_in_ram + snapshots_on_disk` slots between tiers.
///
/// Slots are identified by stack position at the time of each operation.
/// Ties in accumulated weight keep slot order, so with equal usage the
/// lowest slots are assigned RAM.
///
/// # Errors
///
/// Returns a [`ConfigError`] for `max_n < 1` or a negative or non-finite
/// weight, and propagates any error of the dry-run schedule.
///
/// # Examples
///
/// ```
/// use checkpoint_schedule::{allocate_snapshots, AllocationWeights, StorageTier, Trajectory};
///
/// let allocation =
///     allocate_snapshots(10, 1, 2, AllocationWeights::default(), Trajectory::Maximum).unwrap();
/// assert_eq!(allocation.weights(), &[3.0, 5.0, 7.0]);
/// assert_eq!(
///     allocation.storage(),
///     &[StorageTier::Disk, StorageTier::Disk, StorageTier::Ram]
/// );
/// ```
pub fn allocate_snapshots(
    max_n: usize,
    snapshots_in_ram: usize,
    snapshots_on_disk: usize,
    weights: AllocationWeights,
    trajectory: Trajectory,
) -> ScheduleResult<SnapshotAllocation> {
    if max_n < 1 {
        return Err(ConfigError::InvalidParameter {
            name: "max_n",
            reason: "must be at least 1".to_string(),
        }
        .into());
    }
    for (name, value) in [
        ("write_weight", weights.write),
        ("read_weight", weights.read),
        ("delete_weight", weights.delete),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name,
                reason: format!("must be finite and non-negative, got {}", value),
            }
            .into());
        }
    }

    let snapshots = snapshots_in_ram + snapshots_on_disk;
    let mut usage = vec![0.0; snapshots];
    let mut depth = 0usize;

    let mut schedule = MultistageCheckpointSchedule::with_storage(
        max_n,
        vec![StorageTier::Disk; snapshots],
        false,
        trajectory,
    );
    for action in schedule.actions() {
        match action? {
            Action::Write { .. } => {
                let slot = usage.get_mut(depth).ok_or(ScheduleError::SnapshotOverflow {
                    capacity: snapshots,
                })?;
                *slot += weights.write;
                depth += 1;
            }
            Action::Read { delete, .. } => {
                let index = depth.checked_sub(1).ok_or(ScheduleError::SnapshotUnderflow)?;
                usage[index] += weights.read;
                if delete {
                    usage[index] += weights.delete;
                    depth = index;
                }
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(ScheduleError::invalid_state(format!(
            "{} snapshots left after allocation dry run",
            depth
        )));
    }

    let mut order: Vec<usize> = (0..snapshots).collect();
    // Stable: equal weights keep slot order
    order.sort_by(|&a, &b| usage[b].total_cmp(&usage[a]));

    let mut storage = vec![StorageTier::Disk; snapshots];
    for &slot in order.iter().take(snapshots_in_ram) {
        storage[slot] = StorageTier::Ram;
    }

    Ok(SnapshotAllocation {
        weights: usage,
        storage,
    })
}
