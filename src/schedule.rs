//! Result of a scheduling run: the Gantt timeline plus per-process numbers.

use serde::Serialize;
use tracing::info;

use crate::engine::Policy;
use crate::process::ProcessRecord;
use crate::stats::{ProcessStats, ScheduleStats};
use crate::types::{Pid, TimeUnits};

/// One uninterrupted execution interval on the simulated CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slice {
    pub pid: Pid,
    pub start: TimeUnits,
    pub end: TimeUnits,
}

impl Slice {
    pub fn duration(&self) -> TimeUnits {
        self.end - self.start
    }
}

/// Everything a single policy run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub policy: Policy,
    /// Execution intervals in dispatch order.
    pub timeline: Vec<Slice>,
    /// Final records, in arrival order (stable with respect to input).
    pub processes: Vec<ProcessRecord>,
    pub stats: ScheduleStats,
}

impl Schedule {
    pub(crate) fn new(policy: Policy, timeline: Vec<Slice>, processes: Vec<ProcessRecord>) -> Self {
        let stats = ScheduleStats::compute(&processes, &timeline);
        Schedule {
            policy,
            timeline,
            processes,
            stats,
        }
    }

    /// Dispatch order as a list of pids.
    pub fn dispatch_order(&self) -> Vec<Pid> {
        self.timeline.iter().map(|s| s.pid).collect()
    }

    /// Cumulative time markers: 0 followed by the end of each slice.
    pub fn time_markers(&self) -> Vec<TimeUnits> {
        std::iter::once(0)
            .chain(self.timeline.iter().map(|s| s.end))
            .collect()
    }

    /// Per-process waiting/turnaround, in the same order as `processes`.
    pub fn process_stats(&self) -> Vec<ProcessStats> {
        self.processes.iter().map(ProcessStats::from).collect()
    }

    /// Stats for one process. With duplicate pids the first match wins.
    pub fn stats_for(&self, pid: Pid) -> Option<ProcessStats> {
        self.processes
            .iter()
            .find(|p| p.pid == pid)
            .map(ProcessStats::from)
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty()
    }

    /// Log the timeline and summary at info level.
    pub fn dump(&self) {
        for slice in &self.timeline {
            info!(
                policy = %self.policy,
                pid = slice.pid.0,
                start = slice.start,
                end = slice.end,
                "RUN"
            );
        }
        info!(
            policy = %self.policy,
            count = self.stats.count,
            avg_wt = self.stats.avg_waiting,
            avg_tat = self.stats.avg_turnaround,
            makespan = self.stats.makespan,
            "summary"
        );
    }
}
