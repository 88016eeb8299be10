//! Aggregate statistics for a scheduling run.
//!
//! Everything here is derived from the final records and timeline of one
//! run. Nothing is cached between runs.

use serde::Serialize;

use crate::process::ProcessRecord;
use crate::schedule::Slice;
use crate::types::TimeUnits;

/// Per-process result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessStats {
    pub pid: crate::types::Pid,
    pub waiting_time: TimeUnits,
    pub turnaround_time: TimeUnits,
}

impl From<&ProcessRecord> for ProcessStats {
    fn from(p: &ProcessRecord) -> Self {
        ProcessStats {
            pid: p.pid,
            waiting_time: p.waiting_time,
            turnaround_time: p.turnaround_time,
        }
    }
}

/// Sums, means and CPU accounting for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleStats {
    /// Number of processes scheduled.
    pub count: usize,
    pub total_waiting: TimeUnits,
    pub total_turnaround: TimeUnits,
    /// Mean waiting time (0 if empty).
    pub avg_waiting: f64,
    /// Mean turnaround time (0 if empty).
    pub avg_turnaround: f64,
    /// End time of the last slice.
    pub makespan: TimeUnits,
    /// Sum of all bursts.
    pub busy_time: TimeUnits,
    /// Time the CPU sat idle waiting for arrivals.
    pub idle_time: TimeUnits,
}

impl ScheduleStats {
    pub fn compute(records: &[ProcessRecord], timeline: &[Slice]) -> Self {
        let count = records.len();
        let total_waiting = saturating_sum(records.iter().map(|p| p.waiting_time));
        let total_turnaround = saturating_sum(records.iter().map(|p| p.turnaround_time));
        let busy_time = saturating_sum(timeline.iter().map(Slice::duration));
        let makespan = timeline.last().map_or(0, |s| s.end);

        ScheduleStats {
            count,
            total_waiting,
            total_turnaround,
            avg_waiting: mean(total_waiting, count),
            avg_turnaround: mean(total_turnaround, count),
            makespan,
            busy_time,
            idle_time: makespan.saturating_sub(busy_time),
        }
    }

    /// Fraction of the makespan the CPU was busy, in `[0, 1]`.
    pub fn utilization(&self) -> f64 {
        if self.makespan == 0 {
            0.0
        } else {
            self.busy_time as f64 / self.makespan as f64
        }
    }
}

fn saturating_sum(values: impl Iterator<Item = TimeUnits>) -> TimeUnits {
    values.fold(0, TimeUnits::saturating_add)
}

fn mean(sum: TimeUnits, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
