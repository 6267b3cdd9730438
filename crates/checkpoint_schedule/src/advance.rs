//! Step-advance optimizer for binomial checkpointing.
//!
//! Chooses how far to run forward before the next snapshot, given the
//! number of remaining steps and free snapshot slots, following
//!
//! Griewank, A., & Walther, A. (2000). Algorithm 799: revolve: an
//! implementation of checkpointing for the reverse or adjoint mode
//! of computational differentiation. ACM TOMS 26(1), 19-45.

use std::fmt;
use std::str::FromStr;

use crate::error::{ConfigError, ScheduleError, ScheduleResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Tie-break policy for the forward-run length.
///
/// # Examples
///
/// ```
/// use checkpoint_schedule::{n_advance, Trajectory};
///
/// assert_eq!(n_advance(20, 4, Trajectory::Maximum).unwrap(), 9);
/// assert_eq!(n_advance(20, 4, Trajectory::Revolve).unwrap(), 5);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum Trajectory {
    /// Largest run length admitted by the binomial bounds.
    ///
    /// Minimises the number of snapshot writes.
    #[default]
    Maximum,

    /// Run lengths of the classical revolve recurrence (GW2000, bottom of p. 34).
    Revolve,
}

impl Trajectory {
    /// Returns the canonical name of the policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Trajectory::Maximum => "maximum",
            Trajectory::Revolve => "revolve",
        }
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trajectory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "maximum" => Ok(Trajectory::Maximum),
            "revolve" => Ok(Trajectory::Revolve),
            _ => Err(ConfigError::UnknownTrajectory(s.to_string())),
        }
    }
}

/// Determines the forward-run length before the next snapshot.
///
/// `n` is the number of steps from the current position to the step whose
/// adjoint is needed next (inclusive of that step), and `snapshots` the
/// number of free snapshot slots.
///
/// - `snapshots == 1` returns `n - 1` (minimal storage).
/// - `snapshots >= n - 1` returns `1` (maximal storage).
/// - Otherwise the result `r` satisfies `0 < r < n`.
///
/// # Errors
///
/// Returns [`ScheduleError::InvalidAdvance`] if `n < 1` or `snapshots == 0`.
///
/// # Examples
///
/// ```
/// use checkpoint_schedule::{n_advance, Trajectory};
///
/// assert_eq!(n_advance(10, 1, Trajectory::Maximum).unwrap(), 9);
/// assert_eq!(n_advance(10, 9, Trajectory::Maximum).unwrap(), 1);
/// assert_eq!(n_advance(100, 5, Trajectory::Revolve).unwrap(), 45);
/// ```
pub fn n_advance(n: usize, snapshots: usize, trajectory: Trajectory) -> ScheduleResult<usize> {
    if n < 1 || snapshots == 0 {
        return Err(ScheduleError::InvalidAdvance { n, snapshots });
    }

    // Excess snapshots are never useful
    let snapshots = snapshots.min(n - 1).max(1);
    if snapshots == 1 {
        return Ok(n - 1);
    } else if snapshots == n - 1 {
        return Ok(1);
    }

    let m = n as u128;
    let s = snapshots as u128;

    // Smallest t >= 2 with beta(s, t - 1) < m <= beta(s, t), where
    // beta(s, t) = C(s + t, t) (GW2000, Proposition 1)
    let mut t: u128 = 2;
    let mut b_s_tm2: u128 = 1;
    let mut b_s_tm1: u128 = s + 1;
    let mut b_s_t: u128 = ((s + 1) * (s + 2)) / 2;
    while b_s_tm1 >= m || m > b_s_t {
        t += 1;
        b_s_tm2 = b_s_tm1;
        b_s_tm1 = b_s_t;
        b_s_t = (b_s_t * (s + t)) / t;
    }

    let b_sm1_tm1 = (b_s_tm1 * s) / (s + t - 1);
    let b_sm2_tm1 = (b_sm1_tm1 * (s - 1)) / (s + t - 2);

    let advance = match trajectory {
        Trajectory::Maximum => {
            // Maximal step compatible with GW2000 Fig. 4
            let b_sm1_tm2 = (b_s_tm2 * s) / (s + t - 2);
            if m <= b_s_tm1 + b_sm1_tm2 {
                m + b_s_tm2 - b_s_tm1
            } else if m <= b_s_tm1 + b_sm2_tm1 + b_sm1_tm2 {
                b_s_tm2 + b_sm1_tm2
            } else if m <= b_s_tm1 + b_sm1_tm1 + b_sm2_tm1 {
                m - b_sm1_tm1 - b_sm2_tm1
            } else {
                b_s_tm1
            }
        }
        Trajectory::Revolve => {
            if m <= b_s_tm1 + b_sm2_tm1 {
                b_s_tm2
            } else if m < b_s_tm1 + b_sm1_tm1 + b_sm2_tm1 {
                m - b_sm1_tm1 - b_sm2_tm1
            } else {
                b_s_tm1
            }
        }
    };

    if advance == 0 || advance >= m {
        return Err(ScheduleError::invalid_state(format!(
            "advance of {} for {} steps with {} snapshots",
            advance, n, snapshots
        )));
    }
    // advance < m <= usize::MAX
    Ok(advance as usize)
}

/// Returns the run lengths of a complete forward sweep over `n` steps.
///
/// Each run consumes one snapshot slot, so the sequence is what a
/// multistage schedule with `snapshots` slots performs before its first
/// adjoint step. The lengths sum to `n - 1`.
///
/// # Examples
///
/// ```
/// use checkpoint_schedule::{advance_sequence, Trajectory};
///
/// let runs = advance_sequence(100, 5, Trajectory::Revolve).unwrap();
/// assert_eq!(runs, vec![45, 25, 16, 9, 4]);
/// ```
pub fn advance_sequence(
    n: usize,
    snapshots: usize,
    trajectory: Trajectory,
) -> ScheduleResult<Vec<usize>> {
    if n < 1 {
        return Err(ScheduleError::InvalidAdvance { n, snapshots });
    }

    let mut runs = Vec::new();
    let mut position = 0;
    let mut free = snapshots;
    while position + 1 < n {
        let run = n_advance(n - position, free, trajectory)?;
        runs.push(run);
        position += run;
        free = free.saturating_sub(1);
    }
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Limiting Case Tests
    // ========================================================================

    #[test]
    fn test_single_snapshot_is_minimal_storage() {
        assert_eq!(n_advance(10, 1, Trajectory::Maximum).unwrap(), 9);
        assert_eq!(n_advance(10, 1, Trajectory::Revolve).unwrap(), 9);
        assert_eq!(n_advance(2, 1, Trajectory::Maximum).unwrap(), 1);
    }

    #[test]
    fn test_excess_snapshots_is_maximal_storage() {
        assert_eq!(n_advance(10, 9, Trajectory::Maximum).unwrap(), 1);
        assert_eq!(n_advance(10, 50, Trajectory::Maximum).unwrap(), 1);
        assert_eq!(n_advance(10, 9, Trajectory::Revolve).unwrap(), 1);
    }

    #[test]
    fn test_single_step_cannot_advance() {
        assert_eq!(n_advance(1, 3, Trajectory::Maximum).unwrap(), 0);
    }

    #[test]
    fn test_invalid_requests() {
        assert_eq!(
            n_advance(0, 3, Trajectory::Maximum),
            Err(ScheduleError::InvalidAdvance { n: 0, snapshots: 3 })
        );
        assert_eq!(
            n_advance(10, 0, Trajectory::Revolve),
            Err(ScheduleError::InvalidAdvance {
                n: 10,
                snapshots: 0
            })
        );
    }

    // ========================================================================
    // Reference Table Tests
    // ========================================================================

    #[test]
    fn test_maximum_table_ten_steps() {
        let runs: Vec<usize> = (1..10)
            .map(|s| n_advance(10, s, Trajectory::Maximum).unwrap())
            .collect();
        assert_eq!(runs, vec![9, 6, 4, 3, 2, 2, 2, 2, 1]);
    }

    #[test]
    fn test_revolve_reference_table() {
        let expected = [
            (20, [19, 14, 10, 5, 6]),
            (50, [49, 40, 30, 20, 21]),
            (100, [99, 86, 65, 50, 45]),
        ];
        for (n, row) in expected {
            for (i, &advance) in row.iter().enumerate() {
                assert_eq!(
                    n_advance(n, i + 1, Trajectory::Revolve).unwrap(),
                    advance,
                    "revolve n={} snapshots={}",
                    n,
                    i + 1
                );
            }
        }
    }

    #[test]
    fn test_maximum_reference_table() {
        let expected = [
            (20, [19, 14, 10, 9, 6]),
            (50, [49, 41, 30, 25, 21]),
            (100, [99, 87, 72, 55, 45]),
        ];
        for (n, row) in expected {
            for (i, &advance) in row.iter().enumerate() {
                assert_eq!(
                    n_advance(n, i + 1, Trajectory::Maximum).unwrap(),
                    advance,
                    "maximum n={} snapshots={}",
                    n,
                    i + 1
                );
            }
        }
    }

    #[test]
    fn test_advance_sequence_sums_to_final_step() {
        for trajectory in [Trajectory::Maximum, Trajectory::Revolve] {
            let runs = advance_sequence(100, 5, trajectory).unwrap();
            assert_eq!(runs, vec![45, 25, 16, 9, 4]);
            assert_eq!(runs.iter().sum::<usize>(), 99);
        }
    }

    #[test]
    fn test_advance_sequence_single_step() {
        assert!(advance_sequence(1, 0, Trajectory::Maximum)
            .unwrap()
            .is_empty());
    }

    // ========================================================================
    // Trajectory Tests
    // ========================================================================

    #[test]
    fn test_trajectory_parse() {
        assert_eq!("maximum".parse::<Trajectory>().unwrap(), Trajectory::Maximum);
        assert_eq!("Revolve".parse::<Trajectory>().unwrap(), Trajectory::Revolve);
        assert_eq!(
            "greedy".parse::<Trajectory>(),
            Err(ConfigError::UnknownTrajectory("greedy".to_string()))
        );
    }

    #[test]
    fn test_trajectory_default_is_maximum() {
        assert_eq!(Trajectory::default(), Trajectory::Maximum);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn trajectory_strategy() -> impl Strategy<Value = Trajectory> {
            prop_oneof![Just(Trajectory::Maximum), Just(Trajectory::Revolve)]
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(1000))]

            #[test]
            fn test_advance_is_strictly_inside_interval(
                n in 2usize..5000,
                snapshots in 1usize..80,
                trajectory in trajectory_strategy()
            ) {
                let advance = n_advance(n, snapshots, trajectory).unwrap();
                if snapshots == 1 {
                    prop_assert_eq!(advance, n - 1);
                } else if snapshots >= n - 1 {
                    prop_assert_eq!(advance, 1);
                } else {
                    prop_assert!(advance > 0 && advance < n);
                }
            }

            #[test]
            fn test_advance_sequence_reaches_last_step(
                n in 1usize..2000,
                snapshots in 1usize..40,
                trajectory in trajectory_strategy()
            ) {
                let runs = advance_sequence(n, snapshots, trajectory).unwrap();
                prop_assert_eq!(runs.iter().sum::<usize>(), n - 1);
                prop_assert!(runs.len() <= snapshots);
                prop_assert!(runs.iter().all(|&run| run > 0));
            }
        }
    }
}
