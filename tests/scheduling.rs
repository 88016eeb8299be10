//! Scheduling engine tests: worked examples plus properties checked over
//! seeded random workloads.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use procsim::*;

mod common;
use common::{assert_close, rec, sample_workload};

fn random_workload(rng: &mut StdRng, n: usize) -> Vec<ProcessRecord> {
    (0..n)
        .map(|i| {
            rec(
                i as i32 + 1,
                rng.gen_range(0..30),
                rng.gen_range(1..10),
                rng.gen_range(-2..5),
            )
        })
        .collect()
}

#[test]
fn test_fcfs_worked_example() {
    common::setup_test();
    let schedule = run_fcfs(&sample_workload());
    schedule.dump();

    assert_eq!(
        schedule.timeline,
        vec![
            Slice { pid: Pid(1), start: 0, end: 5 },
            Slice { pid: Pid(2), start: 5, end: 8 },
            Slice { pid: Pid(3), start: 8, end: 16 },
        ]
    );
    let wt: Vec<TimeUnits> = schedule.process_stats().iter().map(|p| p.waiting_time).collect();
    let tat: Vec<TimeUnits> = schedule
        .process_stats()
        .iter()
        .map(|p| p.turnaround_time)
        .collect();
    assert_eq!(wt, vec![0, 4, 6]);
    assert_eq!(tat, vec![5, 7, 14]);
    assert_close(schedule.stats.avg_waiting, 3.33);
    assert_close(schedule.stats.avg_turnaround, 8.67);
    assert_eq!(schedule.stats.total_waiting, 10);
    assert_eq!(schedule.stats.total_turnaround, 26);
}

#[test]
fn test_priority_worked_example() {
    common::setup_test();
    let schedule = run_priority(&sample_workload());
    schedule.dump();

    // Only P1 has arrived at t=0; at t=5 P2 (prio 1) beats P3 (prio 3).
    assert_eq!(schedule.dispatch_order(), vec![Pid(1), Pid(2), Pid(3)]);
    assert_eq!(schedule.time_markers(), vec![0, 5, 8, 16]);
    assert_eq!(schedule.stats_for(Pid(2)).unwrap().waiting_time, 4);
    assert_eq!(schedule.stats_for(Pid(3)).unwrap().waiting_time, 6);
}

#[test]
fn test_policies_diverge_when_priority_matters() {
    let records = vec![rec(1, 0, 4, 3), rec(2, 1, 2, 3), rec(3, 2, 1, 0)];
    let fcfs = run_fcfs(&records);
    let prio = run_priority(&records);
    assert_eq!(fcfs.dispatch_order(), vec![Pid(1), Pid(2), Pid(3)]);
    assert_eq!(prio.dispatch_order(), vec![Pid(1), Pid(3), Pid(2)]);
    // Same work, same makespan, different waiting.
    assert_eq!(fcfs.stats.makespan, prio.stats.makespan);
    assert!(prio.stats.total_waiting < fcfs.stats.total_waiting);
}

#[test]
fn test_runs_are_independent_and_deterministic() {
    let records = sample_workload();
    let first = run_priority(&records);
    let _ = run_fcfs(&records);
    let second = run_priority(&records);
    assert_eq!(first.timeline, second.timeline);
    assert_eq!(first.processes, second.processes);
    assert_eq!(first.stats, second.stats);
    assert!(records.iter().all(|p| !p.completed && p.waiting_time == 0));
}

#[test]
fn test_stale_run_state_is_reset() {
    let mut records = sample_workload();
    for p in &mut records {
        p.waiting_time = 99;
        p.turnaround_time = 99;
        p.completed = true;
    }
    let schedule = run_priority(&records);
    assert_eq!(schedule.timeline.len(), 3);
    assert_eq!(schedule.stats.total_waiting, 10);
}

#[test]
fn test_fcfs_properties_random() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..200 {
        let n = rng.gen_range(1..12);
        let records = random_workload(&mut rng, n);
        let schedule = run_fcfs(&records);

        let by_pid: HashMap<Pid, &ProcessRecord> =
            schedule.processes.iter().map(|p| (p.pid, p)).collect();
        let mut prev_end = 0;
        for slice in &schedule.timeline {
            let p = by_pid[&slice.pid];
            assert!(slice.start >= prev_end, "slices overlap");
            assert_eq!(slice.start, prev_end.max(p.arrival_time));
            assert_eq!(p.waiting_time, slice.start - p.arrival_time);
            assert_eq!(p.turnaround_time, p.waiting_time + p.burst_time);
            assert_eq!(slice.duration(), p.burst_time);
            prev_end = slice.end;
        }

        // Arrival order, stable on ties.
        let arrivals: Vec<TimeUnits> = schedule.processes.iter().map(|p| p.arrival_time).collect();
        assert!(arrivals.windows(2).all(|w| w[0] <= w[1]));
    }
}

#[test]
fn test_fcfs_no_gaps_end_time_is_burst_sum() {
    let records = vec![rec(1, 0, 3, 0), rec(2, 0, 4, 0), rec(3, 2, 2, 0), rec(4, 5, 6, 0)];
    let schedule = run_fcfs(&records);
    let burst_sum: TimeUnits = records.iter().map(|p| p.burst_time).sum();
    assert_eq!(schedule.stats.makespan, burst_sum);
    assert_eq!(schedule.stats.idle_time, 0);
    assert_close(schedule.stats.utilization(), 1.0);
}

#[test]
fn test_priority_never_skips_better_arrived_process() {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let n = rng.gen_range(1..12);
        let records = random_workload(&mut rng, n);
        let schedule = run_priority(&records);
        assert_eq!(schedule.timeline.len(), records.len());

        // Position in the stable arrival order, used for tie checks.
        let order: HashMap<Pid, usize> = schedule
            .processes
            .iter()
            .enumerate()
            .map(|(i, p)| (p.pid, i))
            .collect();
        let by_pid: HashMap<Pid, &ProcessRecord> =
            schedule.processes.iter().map(|p| (p.pid, p)).collect();

        for (i, slice) in schedule.timeline.iter().enumerate() {
            let chosen = by_pid[&slice.pid];
            for later in &schedule.timeline[i + 1..] {
                let other = by_pid[&later.pid];
                if other.arrival_time > slice.start {
                    continue;
                }
                assert!(
                    other.priority > chosen.priority
                        || (other.priority == chosen.priority
                            && order[&other.pid] > order[&chosen.pid]),
                    "{} dispatched at {} ahead of better {}",
                    chosen.pid,
                    slice.start,
                    other.pid
                );
            }
            assert_eq!(chosen.turnaround_time, chosen.waiting_time + chosen.burst_time);
            assert!(slice.start >= chosen.arrival_time);
        }
    }
}

/// Straightforward priority scheduler that advances an idle CPU one unit
/// at a time and rescans every process on each step.
fn priority_by_ticks(records: &[ProcessRecord]) -> Vec<Slice> {
    let mut procs = records.to_vec();
    procs.sort_by_key(|p| p.arrival_time);
    let mut done = vec![false; procs.len()];
    let mut timeline = Vec::with_capacity(procs.len());
    let mut now = 0;

    while timeline.len() < procs.len() {
        let best = (0..procs.len())
            .filter(|&i| !done[i] && procs[i].arrival_time <= now)
            .min_by_key(|&i| (procs[i].priority, i));
        match best {
            Some(i) => {
                done[i] = true;
                let end = now + procs[i].burst_time;
                timeline.push(Slice { pid: procs[i].pid, start: now, end });
                now = end;
            }
            None => now += 1,
        }
    }
    timeline
}

#[test]
fn test_priority_matches_tick_by_tick_reference() {
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..200 {
        let n = rng.gen_range(1..12);
        // Wide arrival spread so idle gaps are common.
        let records: Vec<ProcessRecord> = (0..n)
            .map(|i| {
                rec(
                    i as i32 + 1,
                    rng.gen_range(0..60),
                    rng.gen_range(1..6),
                    rng.gen_range(-2..3),
                )
            })
            .collect();
        let schedule = run_priority(&records);
        assert_eq!(schedule.timeline, priority_by_ticks(&records), "{records:?}");
    }
}

#[test]
fn test_priority_idle_gap() {
    // CPU idles 2..10; the late arrival with worse priority still runs at 10.
    let records = vec![rec(1, 0, 2, 1), rec(2, 10, 3, 9), rec(3, 11, 1, 0)];
    let schedule = run_priority(&records);
    assert_eq!(
        schedule.timeline,
        vec![
            Slice { pid: Pid(1), start: 0, end: 2 },
            Slice { pid: Pid(2), start: 10, end: 13 },
            Slice { pid: Pid(3), start: 13, end: 14 },
        ]
    );
    assert_eq!(schedule.stats.idle_time, 8);
    assert_eq!(schedule.timeline, priority_by_ticks(&records));
}

#[test]
fn test_empty_workload() {
    for policy in Policy::ALL {
        let schedule = policy.run(&[]);
        assert!(schedule.timeline.is_empty());
        assert_eq!(schedule.stats.count, 0);
        assert_eq!(schedule.stats.avg_waiting, 0.0);
        assert_eq!(schedule.stats.avg_turnaround, 0.0);
    }
}
