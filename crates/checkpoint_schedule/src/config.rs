//! Declarative schedule configuration.
//!
//! [`ScheduleConfig`] names a strategy and its construction parameters. With
//! the `serde` feature it deserializes from an internally tagged table:
//!
//! ```toml
//! strategy = "two_level"
//! disk_period = 10
//! binomial_snapshots = 3
//! binomial_storage = "RAM"
//! ```

use std::fmt;

use crate::action::StorageTier;
use crate::advance::Trajectory;
use crate::error::{ConfigError, ScheduleResult};
use crate::multistage::MultistageCheckpointSchedule;
use crate::schedule::CheckpointSchedule;
use crate::two_level::TwoLevelCheckpointSchedule;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Strategy and parameters of a checkpointing schedule.
///
/// # Examples
///
/// ```rust
/// use checkpoint_schedule::{ScheduleConfig, Trajectory};
///
/// let config = ScheduleConfig::Multistage {
///     max_n: 100,
///     snapshots_in_ram: 5,
///     snapshots_on_disk: 0,
///     keep_block_0_ics: false,
///     trajectory: Trajectory::Revolve,
/// };
/// assert!(config.validate().is_ok());
///
/// let schedule = config.build().unwrap();
/// assert_eq!(schedule.max_n(), Some(100));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(tag = "strategy", rename_all = "snake_case")
)]
pub enum ScheduleConfig {
    /// Offline binomial checkpointing over a known number of steps.
    Multistage {
        /// Number of steps.
        max_n: usize,
        /// RAM snapshot slots.
        #[cfg_attr(feature = "serde", serde(default))]
        snapshots_in_ram: usize,
        /// Disk snapshot slots.
        #[cfg_attr(feature = "serde", serde(default))]
        snapshots_on_disk: usize,
        /// Retain step 0 initial conditions.
        #[cfg_attr(feature = "serde", serde(default))]
        keep_block_0_ics: bool,
        /// Forward-run policy.
        #[cfg_attr(feature = "serde", serde(default))]
        trajectory: Trajectory,
    },

    /// Periodic disk snapshots with binomial checkpointing inside periods.
    TwoLevel {
        /// Steps between disk snapshots.
        disk_period: usize,
        /// Inner snapshots per period.
        #[cfg_attr(feature = "serde", serde(default))]
        binomial_snapshots: usize,
        /// Tier of the inner snapshots.
        #[cfg_attr(feature = "serde", serde(default))]
        binomial_storage: StorageTier,
        /// Retain step 0 initial conditions.
        #[cfg_attr(feature = "serde", serde(default))]
        keep_block_0_ics: bool,
        /// Forward-run policy inside periods.
        #[cfg_attr(feature = "serde", serde(default))]
        binomial_trajectory: Trajectory,
    },
}

impl ScheduleConfig {
    /// Returns the strategy name.
    pub fn strategy(&self) -> &'static str {
        match self {
            ScheduleConfig::Multistage { .. } => "multistage",
            ScheduleConfig::TwoLevel { .. } => "two_level",
        }
    }

    /// Returns the trajectory length if it is fixed by the configuration.
    pub fn max_n(&self) -> Option<usize> {
        match self {
            ScheduleConfig::Multistage { max_n, .. } => Some(*max_n),
            ScheduleConfig::TwoLevel { .. } => None,
        }
    }

    /// Checks the parameters without building a schedule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidParameter`] for:
    /// - `max_n < 1`
    /// - no snapshot slots for a multistage trajectory of more than one step
    /// - `disk_period < 1`
    pub fn validate(&self) -> Result<(), ConfigError> {
        match *self {
            ScheduleConfig::Multistage {
                max_n,
                snapshots_in_ram,
                snapshots_on_disk,
                ..
            } => {
                if max_n < 1 {
                    return Err(ConfigError::InvalidParameter {
                        name: "max_n",
                        reason: "must be at least 1".to_string(),
                    });
                }
                if snapshots_in_ram + snapshots_on_disk == 0 && max_n > 1 {
                    return Err(ConfigError::InvalidParameter {
                        name: "snapshots",
                        reason: format!("at least one snapshot required for {} steps", max_n),
                    });
                }
                Ok(())
            }
            ScheduleConfig::TwoLevel { disk_period, .. } => {
                if disk_period < 1 {
                    return Err(ConfigError::InvalidParameter {
                        name: "disk_period",
                        reason: "must be positive".to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Builds the configured schedule.
    ///
    /// # Errors
    ///
    /// Returns any error of [`validate`](Self::validate), or of the snapshot
    /// tier allocation run for mixed multistage storage.
    pub fn build(&self) -> ScheduleResult<Box<dyn CheckpointSchedule>> {
        self.validate()?;
        let schedule: Box<dyn CheckpointSchedule> = match *self {
            ScheduleConfig::Multistage {
                max_n,
                snapshots_in_ram,
                snapshots_on_disk,
                keep_block_0_ics,
                trajectory,
            } => Box::new(
                MultistageCheckpointSchedule::builder(max_n)
                    .snapshots_in_ram(snapshots_in_ram)
                    .snapshots_on_disk(snapshots_on_disk)
                    .keep_block_0_ics(keep_block_0_ics)
                    .trajectory(trajectory)
                    .build()?,
            ),
            ScheduleConfig::TwoLevel {
                disk_period,
                binomial_snapshots,
                binomial_storage,
                keep_block_0_ics,
                binomial_trajectory,
            } => Box::new(
                TwoLevelCheckpointSchedule::builder(disk_period)
                    .binomial_snapshots(binomial_snapshots)
                    .binomial_storage(binomial_storage)
                    .keep_block_0_ics(keep_block_0_ics)
                    .binomial_trajectory(binomial_trajectory)
                    .build()?,
            ),
        };
        Ok(schedule)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig::Multistage {
            max_n: 10,
            snapshots_in_ram: 3,
            snapshots_on_disk: 0,
            keep_block_0_ics: false,
            trajectory: Trajectory::Maximum,
        }
    }
}

impl fmt::Display for ScheduleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleConfig::Multistage {
                max_n,
                snapshots_in_ram,
                snapshots_on_disk,
                keep_block_0_ics,
                trajectory,
            } => write!(
                f,
                "multistage(max_n={}, ram={}, disk={}, keep_block_0_ics={}, trajectory={})",
                max_n, snapshots_in_ram, snapshots_on_disk, keep_block_0_ics, trajectory
            ),
            ScheduleConfig::TwoLevel {
                disk_period,
                binomial_snapshots,
                binomial_storage,
                keep_block_0_ics,
                binomial_trajectory,
            } => write!(
                f,
                "two_level(disk_period={}, binomial_snapshots={}, binomial_storage={}, \
                 keep_block_0_ics={}, trajectory={})",
                disk_period, binomial_snapshots, binomial_storage, keep_block_0_ics, binomial_trajectory
            ),
        }
    }
}
