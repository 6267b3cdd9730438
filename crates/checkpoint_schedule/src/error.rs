//! Error types for checkpoint scheduling.
//!
//! Two classes of failure exist:
//!
//! - [`ConfigError`]: invalid construction parameters, reported eagerly when
//!   a schedule is built.
//! - [`ScheduleError`]: internal-consistency violations raised while actions
//!   are produced. These are fatal; a schedule that has returned one is
//!   poisoned and keeps returning it.

use thiserror::Error;

/// Configuration error for checkpoint schedules.
///
/// These errors occur during construction when invalid parameters are provided.
///
/// # Examples
///
/// ```
/// use checkpoint_schedule::ConfigError;
///
/// let err = ConfigError::InvalidParameter {
///     name: "disk_period",
///     reason: "must be positive".to_string(),
/// };
/// assert!(err.to_string().contains("disk_period"));
/// ```
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Invalid parameter value with name and description.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the invalid value.
        reason: String,
    },

    /// Trajectory policy name not recognised.
    #[error("Unknown trajectory '{0}'. Supported: maximum, revolve")]
    UnknownTrajectory(String),

    /// Storage tier name not recognised.
    #[error("Unknown storage '{0}'. Supported: RAM, disk")]
    UnknownStorage(String),

    /// IO error reading a configuration file.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error in a configuration file.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors raised while a schedule produces actions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Wrapped configuration error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `n_advance` called outside its domain.
    #[error("Invalid advance request: {n} steps with {snapshots} snapshots")]
    InvalidAdvance {
        /// Remaining steps.
        n: usize,
        /// Available snapshot slots.
        snapshots: usize,
    },

    /// A forward run that does not move the cursor forward.
    #[error("Non-advancing forward run: {n0} -> {n1}")]
    NonAdvancing {
        /// Start of the run.
        n0: usize,
        /// End of the run.
        n1: usize,
    },

    /// A snapshot was pushed onto a full stack.
    #[error("Snapshot stack overflow (capacity: {capacity})")]
    SnapshotOverflow {
        /// Configured stack capacity.
        capacity: usize,
    },

    /// A snapshot was requested from an empty stack.
    #[error("Snapshot stack is empty")]
    SnapshotUnderflow,

    /// Invalid finalization request.
    #[error("Invalid finalize at step {n}: {reason}")]
    InvalidFinalize {
        /// Requested final step.
        n: usize,
        /// Description of the issue.
        reason: String,
    },

    /// Any other internal-consistency violation.
    #[error("Invalid checkpointing state: {0}")]
    InvalidState(String),

    /// The schedule has completed and cannot produce further actions.
    #[error("Checkpoint schedule is exhausted")]
    Exhausted,
}

/// Result type for schedule operations.
pub type ScheduleResult<T> = Result<T, ScheduleError>;

impl ScheduleError {
    /// Shorthand for [`ScheduleError::InvalidState`].
    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}
