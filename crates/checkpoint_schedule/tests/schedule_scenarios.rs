//! End-to-end checkpointing scenarios.
//!
//! Each schedule is driven against the simulated driver, which rejects any
//! action sequence a real solver could not execute.

use std::collections::BTreeSet;

use checkpoint_schedule::{
    drive, n_advance, Action, CheckpointSchedule, MultistageCheckpointSchedule, ScheduleConfig,
    ScheduleRunner, SimulatedDriver, StorageTier, Trajectory, TwoLevelCheckpointSchedule,
};

fn count(actions: &[Action], name: &str) -> usize {
    actions.iter().filter(|a| a.name() == name).count()
}

// ============================================================================
// Multistage Scenarios
// ============================================================================

/// Ten steps with three RAM snapshots.
#[test]
fn test_ten_steps_three_snapshots() {
    let mut schedule = MultistageCheckpointSchedule::builder(10)
        .snapshots_in_ram(3)
        .trajectory(Trajectory::Maximum)
        .build()
        .unwrap();
    let mut driver = SimulatedDriver::with_steps(10).with_capacity(StorageTier::Ram, 3);

    let mut runner = ScheduleRunner::recording(&mut schedule);
    runner.run_forward(&mut driver).unwrap();
    assert!(runner.run_reverse(&mut driver).unwrap());
    let (stats, actions) = runner.into_parts();

    assert_eq!(count(&actions, "EndForward"), 1);
    assert_eq!(count(&actions, "Reverse"), 10);
    assert!(stats.peak_snapshots <= 3);
    assert_eq!(stats.live_snapshots, 0);
    assert_eq!(stats.writes.disk, 0);
    assert_eq!(actions.last(), Some(&Action::EndReverse { exhausted: true }));

    assert!(schedule.is_exhausted());
    assert!(schedule.snapshots().is_empty());
    assert_eq!(schedule.r(), 10);
}

/// Adjoint steps run strictly from the end, one step at a time.
#[test]
fn test_reverse_order() {
    let mut schedule = MultistageCheckpointSchedule::new(30, 4, 0).unwrap();
    let reverses: Vec<(usize, usize)> = schedule
        .actions()
        .filter_map(|action| match action.unwrap() {
            Action::Reverse { n1, n0 } => Some((n1, n0)),
            _ => None,
        })
        .collect();

    let expected: Vec<(usize, usize)> = (1..=30).rev().map(|n| (n, n - 1)).collect();
    assert_eq!(reverses, expected);
}

/// RAM and disk slots both respect their capacities.
#[test]
fn test_mixed_storage_respects_tier_capacities() {
    let mut schedule = MultistageCheckpointSchedule::new(50, 2, 3).unwrap();
    let mut driver = SimulatedDriver::with_steps(50)
        .with_capacity(StorageTier::Ram, 2)
        .with_capacity(StorageTier::Disk, 3);

    let stats = drive(&mut schedule, &mut driver).unwrap();
    assert_eq!(stats.adjoint_steps, 50);
    assert!(stats.writes.ram > 0);
    assert!(stats.writes.disk > 0);
    assert!(stats.peak_snapshots <= 5);
    assert_eq!(driver.snapshot_count(StorageTier::Ram), 0);
    assert_eq!(driver.snapshot_count(StorageTier::Disk), 0);
}

/// The two RAM slots of a mixed schedule carry more traffic than the three
/// disk slots.
#[test]
fn test_allocator_places_busy_slots_in_ram() {
    let mut schedule = MultistageCheckpointSchedule::new(20, 2, 3).unwrap();
    let stats = drive(&mut schedule, &mut SimulatedDriver::with_steps(20)).unwrap();
    let ram_ops = stats.writes.ram + stats.reads.ram;
    let disk_ops = stats.writes.disk + stats.reads.disk;
    assert_eq!(ram_ops, 18);
    assert_eq!(disk_ops, 15);
}

/// Initial conditions of step 0 survive the whole reverse sweep.
#[test]
fn test_keep_block_0_ics() {
    let mut schedule = MultistageCheckpointSchedule::builder(12)
        .snapshots_on_disk(2)
        .keep_block_0_ics(true)
        .build()
        .unwrap();
    let actions: Vec<Action> = schedule.actions().collect::<Result<_, _>>().unwrap();

    let last_reverse = actions
        .iter()
        .rposition(|a| matches!(a, Action::Reverse { n0: 0, .. }))
        .unwrap();
    assert_eq!(
        actions[last_reverse - 2],
        Action::Configure {
            store_ics: true,
            store_data: true
        }
    );
    assert_eq!(
        actions[last_reverse + 1],
        Action::Clear {
            clear_ics: false,
            clear_data: true
        }
    );

    let mut driver = SimulatedDriver::with_steps(12);
    let mut schedule = MultistageCheckpointSchedule::builder(12)
        .snapshots_on_disk(2)
        .keep_block_0_ics(true)
        .build()
        .unwrap();
    drive(&mut schedule, &mut driver).unwrap();
}

/// Published step sizes for 100 steps and 5 snapshots.
#[test]
fn test_revolve_reference_steps() {
    assert_eq!(n_advance(10, 1, Trajectory::Maximum).unwrap(), 9);
    assert_eq!(n_advance(10, 9, Trajectory::Maximum).unwrap(), 1);

    let steps: Vec<usize> = (1..=5)
        .map(|s| n_advance(100, s, Trajectory::Revolve).unwrap())
        .collect();
    assert_eq!(steps, vec![99, 86, 65, 50, 45]);
}

// ============================================================================
// Two-Level Scenarios
// ============================================================================

/// Three full periods restore exactly the three period snapshots.
#[test]
fn test_two_level_three_periods() {
    let mut schedule = TwoLevelCheckpointSchedule::builder(5)
        .binomial_snapshots(1)
        .binomial_storage(StorageTier::Ram)
        .build()
        .unwrap();
    let mut driver = SimulatedDriver::with_steps(15);

    let mut runner = ScheduleRunner::recording(&mut schedule);
    runner.run_forward(&mut driver).unwrap();
    let exhausted = runner.run_reverse(&mut driver).unwrap();
    let (stats, actions) = runner.into_parts();
    assert!(!exhausted);

    let disk_reads: BTreeSet<usize> = actions
        .iter()
        .filter_map(|a| match a {
            Action::Read {
                n,
                storage: StorageTier::Disk,
                delete,
            } => {
                assert!(!delete);
                Some(*n)
            }
            _ => None,
        })
        .collect();
    assert_eq!(disk_reads, BTreeSet::from([0, 5, 10]));

    let disk_writes: Vec<usize> = actions
        .iter()
        .filter_map(|a| match a {
            Action::Write {
                n,
                storage: StorageTier::Disk,
            } => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(disk_writes, vec![0, 5, 10]);

    assert_eq!(stats.adjoint_steps, 15);
    assert_eq!(actions.last(), Some(&Action::EndReverse { exhausted: false }));
    assert_eq!(driver.snapshot_count(StorageTier::Disk), 3);
    assert_eq!(driver.snapshot_count(StorageTier::Ram), 0);
}

/// A second reverse sweep repeats the first.
#[test]
fn test_two_level_reverse_sweeps_repeat() {
    let mut schedule = TwoLevelCheckpointSchedule::new(5, 2).unwrap();
    let mut driver = SimulatedDriver::with_steps(15);

    let mut runner = ScheduleRunner::recording(&mut schedule);
    runner.run_forward(&mut driver).unwrap();
    let forward_len = runner.actions().map_or(0, |a| a.len());

    runner.run_reverse(&mut driver).unwrap();
    let first_len = runner.actions().map_or(0, |a| a.len()) - forward_len;
    runner.run_reverse(&mut driver).unwrap();
    let (stats, actions) = runner.into_parts();

    let first = &actions[forward_len..forward_len + first_len];
    let second = &actions[forward_len + first_len..];
    assert_eq!(first, second);
    assert_eq!(stats.reverse_sweeps, 2);
    assert_eq!(stats.adjoint_steps, 30);
}

/// The driver stops inside the last period.
#[test]
fn test_two_level_trajectory_ends_inside_period() {
    let mut schedule = TwoLevelCheckpointSchedule::new(5, 2).unwrap();
    let mut driver = SimulatedDriver::with_steps(13);

    let stats = drive(&mut schedule, &mut driver).unwrap();
    assert_eq!(schedule.max_n(), Some(13));
    assert_eq!(stats.max_n, Some(13));
    assert_eq!(stats.adjoint_steps, 13);
    for n in [0, 5, 10] {
        assert!(driver.has_snapshot(n, StorageTier::Disk));
    }
}

/// Without inner snapshots every adjoint step recomputes from the period
/// snapshot.
#[test]
fn test_two_level_without_binomial_snapshots() {
    let mut schedule = TwoLevelCheckpointSchedule::new(4, 0).unwrap();
    let mut driver = SimulatedDriver::with_steps(8);
    let stats = drive(&mut schedule, &mut driver).unwrap();

    assert_eq!(stats.adjoint_steps, 8);
    assert_eq!(stats.writes.total(), 2);
    // 8 forward steps, then 3 + 1, 2 + 1, 1 + 1 and 1 recomputed per period
    assert_eq!(stats.forward_steps, 8 + 2 * 10);
}

// ============================================================================
// Configuration Scenarios
// ============================================================================

/// A boxed schedule from configuration drives like a concrete one.
#[test]
fn test_config_built_schedule() {
    let config = ScheduleConfig::Multistage {
        max_n: 100,
        snapshots_in_ram: 5,
        snapshots_on_disk: 0,
        keep_block_0_ics: false,
        trajectory: Trajectory::Revolve,
    };
    let mut schedule = config.build().unwrap();
    let stats = drive(schedule.as_mut(), &mut SimulatedDriver::with_steps(100)).unwrap();
    assert_eq!(stats.forward_steps, 416);
    assert_eq!(stats.actions, 941);
    assert!(schedule.is_exhausted());
}
