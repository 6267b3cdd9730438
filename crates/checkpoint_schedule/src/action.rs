//! Action protocol exchanged between a schedule and its driver.
//!
//! A schedule never touches simulation data. It emits [`Action`] records
//! that the driver executes strictly in the order they are produced.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Storage tier for a snapshot.
///
/// # Examples
///
/// ```
/// use checkpoint_schedule::StorageTier;
///
/// let tier: StorageTier = "RAM".parse().unwrap();
/// assert_eq!(tier, StorageTier::Ram);
/// assert_eq!(tier.to_string(), "RAM");
/// assert!("tape".parse::<StorageTier>().is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StorageTier {
    /// Fast, in-memory storage.
    #[cfg_attr(feature = "serde", serde(rename = "RAM", alias = "ram"))]
    Ram,

    /// Slow, on-disk storage.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "disk", alias = "Disk", alias = "DISK"))]
    Disk,
}

impl StorageTier {
    /// Returns the canonical name of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageTier::Ram => "RAM",
            StorageTier::Disk => "disk",
        }
    }
}

impl fmt::Display for StorageTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ram" => Ok(StorageTier::Ram),
            "disk" => Ok(StorageTier::Disk),
            _ => Err(ConfigError::UnknownStorage(s.to_string())),
        }
    }
}

/// One unit of work for the driver.
///
/// Step indices follow the forward trajectory: 0 is the initial state and
/// `max_n` the final state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "action", rename_all = "snake_case")
)]
pub enum Action {
    /// Configure data retention for the next forward run.
    Configure {
        /// Retain the initial conditions of the run (required by a following `Write`).
        store_ics: bool,
        /// Retain the non-linear dependency data needed by an adjoint step.
        store_data: bool,
    },

    /// Run forward steps `n0..n1`.
    Forward {
        /// First step.
        n0: usize,
        /// One past the last step.
        n1: usize,
    },

    /// Store the retained initial conditions at step `n` as a snapshot.
    Write {
        /// Step index of the snapshot.
        n: usize,
        /// Target tier.
        storage: StorageTier,
    },

    /// Restore the state at step `n`.
    Read {
        /// Step index of the snapshot.
        n: usize,
        /// Tier holding the snapshot.
        storage: StorageTier,
        /// Free the snapshot once restored.
        delete: bool,
    },

    /// Discard retained data.
    Clear {
        /// Discard retained initial conditions.
        clear_ics: bool,
        /// Discard retained non-linear dependency data.
        clear_data: bool,
    },

    /// The forward sweep is complete and `max_n` is fixed.
    EndForward,

    /// Run the adjoint of step `n0..n1`.
    Reverse {
        /// End of the step.
        n1: usize,
        /// Start of the step.
        n0: usize,
    },

    /// The reverse sweep is complete.
    EndReverse {
        /// No further sweeps can be driven from this schedule.
        exhausted: bool,
    },
}

impl Action {
    /// Returns the action name.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Configure { .. } => "Configure",
            Action::Forward { .. } => "Forward",
            Action::Write { .. } => "Write",
            Action::Read { .. } => "Read",
            Action::Clear { .. } => "Clear",
            Action::EndForward => "EndForward",
            Action::Reverse { .. } => "Reverse",
            Action::EndReverse { .. } => "EndReverse",
        }
    }

    /// Returns `true` for `EndReverse`.
    #[inline]
    pub fn is_end_reverse(&self) -> bool {
        matches!(self, Action::EndReverse { .. })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Configure {
                store_ics,
                store_data,
            } => write!(f, "Configure({}, {})", store_ics, store_data),
            Action::Forward { n0, n1 } => write!(f, "Forward({}, {})", n0, n1),
            Action::Write { n, storage } => write!(f, "Write({}, {})", n, storage),
            Action::Read { n, storage, delete } => {
                write!(f, "Read({}, {}, {})", n, storage, delete)
            }
            Action::Clear {
                clear_ics,
                clear_data,
            } => write!(f, "Clear({}, {})", clear_ics, clear_data),
            Action::EndForward => f.write_str("EndForward()"),
            Action::Reverse { n1, n0 } => write!(f, "Reverse({}, {})", n1, n0),
            Action::EndReverse { exhausted } => write!(f, "EndReverse({})", exhausted),
        }
    }
}
