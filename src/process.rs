//! Process model shared by both simulations.

use std::fmt;

use serde::Serialize;

use crate::types::{Pid, Priority, TimeUnits};

/// A process descriptor plus the fields a scheduling run computes for it.
///
/// `waiting_time`, `turnaround_time` and `completed` belong to a single
/// run. The engine clones its input before mutating, so a record handed to
/// `run_fcfs` can be handed to `run_priority` unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessRecord {
    pub pid: Pid,
    pub arrival_time: TimeUnits,
    /// CPU time needed once dispatched. Always positive.
    pub burst_time: TimeUnits,
    pub priority: Priority,
    pub waiting_time: TimeUnits,
    pub turnaround_time: TimeUnits,
    pub completed: bool,
}

impl ProcessRecord {
    pub fn new(pid: Pid, arrival_time: TimeUnits, burst_time: TimeUnits, priority: Priority) -> Self {
        ProcessRecord {
            pid,
            arrival_time,
            burst_time,
            priority,
            waiting_time: 0,
            turnaround_time: 0,
            completed: false,
        }
    }

    /// Clear the computed fields so the record can take part in another run.
    pub fn reset(&mut self) {
        self.waiting_time = 0;
        self.turnaround_time = 0;
        self.completed = false;
    }

    /// Record a dispatch at `now` and return the completion time.
    ///
    /// Callers never dispatch before arrival; the engine jumps the clock
    /// forward over idle gaps first. Times saturate at `TimeUnits::MAX`.
    pub(crate) fn dispatch(&mut self, now: TimeUnits) -> TimeUnits {
        debug_assert!(now >= self.arrival_time);
        self.waiting_time = now.saturating_sub(self.arrival_time);
        self.turnaround_time = self.waiting_time.saturating_add(self.burst_time);
        self.completed = true;
        now.saturating_add(self.burst_time)
    }
}

impl fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PID: {}, Arrival Time: {}, Burst Time: {}, Priority: {}",
            self.pid.0, self.arrival_time, self.burst_time, self.priority
        )
    }
}
