//! Scheduling engine.
//!
//! Pure, single-threaded computation over logical time. Each run clones its
//! input so runs never observe each other's computed fields, and the same
//! input always yields the same `Schedule`.

use std::collections::VecDeque;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::process::ProcessRecord;
use crate::ready::ReadyQueue;
use crate::schedule::{Schedule, Slice};
use crate::types::TimeUnits;

/// Scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Policy {
    /// First-Come-First-Served.
    Fcfs,
    /// Non-preemptive priority, lowest value first.
    Priority,
}

impl Policy {
    /// Both policies, in the order they are reported.
    pub const ALL: [Policy; 2] = [Policy::Fcfs, Policy::Priority];

    pub fn run(self, records: &[ProcessRecord]) -> Schedule {
        match self {
            Policy::Fcfs => run_fcfs(records),
            Policy::Priority => run_priority(records),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::Fcfs => f.write_str("FCFS"),
            Policy::Priority => f.write_str("Priority"),
        }
    }
}

/// Clone the input, clear any stale run state, and stable-sort by arrival.
fn prepare(records: &[ProcessRecord]) -> Vec<ProcessRecord> {
    let mut procs = records.to_vec();
    for p in &mut procs {
        p.reset();
    }
    // sort_by_key is stable: input order breaks arrival ties.
    procs.sort_by_key(|p| p.arrival_time);
    procs
}

/// Run First-Come-First-Served over `records`.
pub fn run_fcfs(records: &[ProcessRecord]) -> Schedule {
    let mut procs = prepare(records);
    let mut timeline = Vec::with_capacity(procs.len());
    let mut now: TimeUnits = 0;

    for p in &mut procs {
        if now < p.arrival_time {
            debug!(from = now, to = p.arrival_time, "idle");
            now = p.arrival_time;
        }
        let start = now;
        now = p.dispatch(start);
        debug!(pid = p.pid.0, start, end = now, wait = p.waiting_time, "dispatch");
        timeline.push(Slice {
            pid: p.pid,
            start,
            end: now,
        });
    }

    Schedule::new(Policy::Fcfs, timeline, procs)
}

/// Run non-preemptive priority scheduling over `records`.
///
/// Records are admitted to the ready set once their arrival time has been
/// reached. When nothing is ready the clock jumps straight to the next
/// arrival, which yields the same timeline as ticking one unit at a time.
pub fn run_priority(records: &[ProcessRecord]) -> Schedule {
    let mut procs = prepare(records);
    let mut timeline = Vec::with_capacity(procs.len());
    let mut pending: VecDeque<usize> = (0..procs.len()).collect();
    let mut ready = ReadyQueue::new();
    let mut now: TimeUnits = 0;
    let mut completed = 0;

    while completed < procs.len() {
        while let Some(&idx) = pending.front() {
            if procs[idx].arrival_time > now {
                break;
            }
            pending.pop_front();
            debug!(pid = procs[idx].pid.0, prio = procs[idx].priority, now, "admit");
            ready.admit(idx, procs[idx].priority);
        }

        let Some(idx) = ready.pop() else {
            // Nothing runnable. pending cannot be empty here: every record
            // is either completed, ready, or still pending.
            let next = pending
                .front()
                .map(|&idx| procs[idx].arrival_time)
                .unwrap_or(now.saturating_add(1));
            debug!(from = now, to = next, "idle");
            now = next;
            continue;
        };

        let p = &mut procs[idx];
        let start = now;
        now = p.dispatch(start);
        completed += 1;
        debug!(
            pid = p.pid.0,
            prio = p.priority,
            start,
            end = now,
            wait = p.waiting_time,
            "dispatch"
        );
        timeline.push(Slice {
            pid: p.pid,
            start,
            end: now,
        });
    }

    Schedule::new(Policy::Priority, timeline, procs)
}
