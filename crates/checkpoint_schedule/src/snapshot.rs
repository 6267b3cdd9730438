//! Bounded snapshot stack.
//!
//! The schedule tracks which steps currently hold a snapshot. Simulation
//! state itself lives with the driver; the stack only records step indices
//! and the tier of the slot each snapshot occupies.

use crate::action::StorageTier;
use crate::error::{ScheduleError, ScheduleResult};

/// A snapshot record held by a schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot {
    /// Step index of the captured state.
    pub n: usize,

    /// Tier of the slot holding the snapshot.
    pub storage: StorageTier,

    /// Persistent snapshots outlive the stack entry and are never deleted
    /// on read (two-level period snapshots).
    pub persistent: bool,
}

/// Fixed-capacity stack of snapshots with a tier assigned to each slot.
///
/// Slot `i` is the `i`-th position from the bottom of the stack. The tier
/// of a snapshot is decided by the slot it lands in, not by its step index.
///
/// # Example
///
/// ```rust
/// use checkpoint_schedule::{SnapshotStack, StorageTier};
///
/// let mut stack = SnapshotStack::new(vec![StorageTier::Ram, StorageTier::Disk]);
/// assert_eq!(stack.push(0).unwrap(), StorageTier::Ram);
/// assert_eq!(stack.push(4).unwrap(), StorageTier::Disk);
/// assert!(stack.push(7).is_err());
///
/// assert_eq!(stack.pop().unwrap().n, 4);
/// assert_eq!(stack.free_slots(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotStack {
    /// Tier of each slot, bottom first.
    slots: Vec<StorageTier>,

    /// Live snapshots, bottom first.
    entries: Vec<Snapshot>,
}

impl SnapshotStack {
    /// Creates an empty stack with one slot per entry of `slots`.
    pub fn new(slots: Vec<StorageTier>) -> Self {
        Self {
            entries: Vec::with_capacity(slots.len()),
            slots,
        }
    }

    /// Creates an empty stack whose slots all use `storage`.
    pub fn uniform(capacity: usize, storage: StorageTier) -> Self {
        Self::new(vec![storage; capacity])
    }

    /// Pushes a snapshot at step `n` into the next free slot.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::SnapshotOverflow`] if every slot is occupied.
    pub fn push(&mut self, n: usize) -> ScheduleResult<StorageTier> {
        self.push_entry(n, false)
    }

    /// Pushes a snapshot that must never be deleted on read.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::SnapshotOverflow`] if every slot is occupied.
    pub fn push_persistent(&mut self, n: usize) -> ScheduleResult<StorageTier> {
        self.push_entry(n, true)
    }

    fn push_entry(&mut self, n: usize, persistent: bool) -> ScheduleResult<StorageTier> {
        let storage = *self
            .slots
            .get(self.entries.len())
            .ok_or(ScheduleError::SnapshotOverflow {
                capacity: self.slots.len(),
            })?;
        self.entries.push(Snapshot {
            n,
            storage,
            persistent,
        });
        Ok(storage)
    }

    /// Returns the most recent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::SnapshotUnderflow`] if the stack is empty.
    pub fn top(&self) -> ScheduleResult<Snapshot> {
        self.entries
            .last()
            .copied()
            .ok_or(ScheduleError::SnapshotUnderflow)
    }

    /// Removes and returns the most recent snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::SnapshotUnderflow`] if the stack is empty.
    pub fn pop(&mut self) -> ScheduleResult<Snapshot> {
        self.entries.pop().ok_or(ScheduleError::SnapshotUnderflow)
    }

    /// Returns the number of live snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no snapshots are live.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of unoccupied slots.
    pub fn free_slots(&self) -> usize {
        self.slots.len() - self.entries.len()
    }

    /// Returns the tier of every slot, bottom first.
    pub fn slots(&self) -> &[StorageTier] {
        &self.slots
    }

    /// Returns an iterator over live snapshots, bottom first.
    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_uniform_stack() {
        let stack = SnapshotStack::uniform(3, StorageTier::Disk);
        assert_eq!(stack.capacity(), 3);
        assert_eq!(stack.free_slots(), 3);
        assert!(stack.is_empty());
        assert!(stack.slots().iter().all(|&tier| tier == StorageTier::Disk));
    }

    #[test]
    fn test_zero_capacity_stack_rejects_push() {
        let mut stack = SnapshotStack::uniform(0, StorageTier::Ram);
        assert_eq!(
            stack.push(0),
            Err(ScheduleError::SnapshotOverflow { capacity: 0 })
        );
    }

    // ========================================================================
    // Push/Pop Tests
    // ========================================================================

    #[test]
    fn test_push_uses_slot_tier() {
        let mut stack =
            SnapshotStack::new(vec![StorageTier::Disk, StorageTier::Ram, StorageTier::Disk]);
        assert_eq!(stack.push(0).unwrap(), StorageTier::Disk);
        assert_eq!(stack.push(3).unwrap(), StorageTier::Ram);

        // Popping then pushing reuses the same slot
        stack.pop().unwrap();
        assert_eq!(stack.push(5).unwrap(), StorageTier::Ram);
        assert_eq!(stack.top().unwrap().n, 5);
    }

    #[test]
    fn test_overflow_at_capacity() {
        let mut stack = SnapshotStack::uniform(2, StorageTier::Ram);
        stack.push(0).unwrap();
        stack.push(1).unwrap();
        assert_eq!(
            stack.push(2),
            Err(ScheduleError::SnapshotOverflow { capacity: 2 })
        );
        assert_eq!(stack.len(), 2);
    }

    #[test]
    fn test_underflow_when_empty() {
        let mut stack = SnapshotStack::uniform(2, StorageTier::Ram);
        assert_eq!(stack.top(), Err(ScheduleError::SnapshotUnderflow));
        assert_eq!(stack.pop(), Err(ScheduleError::SnapshotUnderflow));
    }

    #[test]
    fn test_persistent_flag() {
        let mut stack = SnapshotStack::new(vec![StorageTier::Disk, StorageTier::Ram]);
        stack.push_persistent(10).unwrap();
        stack.push(12).unwrap();

        let flags: Vec<(usize, bool)> = stack.iter().map(|s| (s.n, s.persistent)).collect();
        assert_eq!(flags, vec![(10, true), (12, false)]);
    }
}
