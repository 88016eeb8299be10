//! Human-readable rendering of simulation results and log output.

use std::fmt;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

use crate::agents::{BufferEvent, SimulationOutcome, Unit};
use crate::schedule::Schedule;

/// Text report for one scheduling run: Gantt chart, time markers,
/// per-process stats and averages.
///
/// ```text
/// Gantt Chart: | P1 | P2 | P3 |
/// 0	5	8	16
/// ```
pub struct ScheduleReport<'a>(pub &'a Schedule);

impl fmt::Display for ScheduleReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.0;
        writeln!(f, "{} Scheduling:", s.policy)?;

        write!(f, "Gantt Chart: |")?;
        for slice in &s.timeline {
            write!(f, " {} |", slice.pid)?;
        }
        writeln!(f)?;

        let markers: Vec<String> = s.time_markers().iter().map(|t| t.to_string()).collect();
        writeln!(f, "{}", markers.join("\t"))?;

        writeln!(f)?;
        writeln!(f, "Processes Stats:")?;
        for p in s.process_stats() {
            writeln!(
                f,
                "PID: {} | WT: {} | TAT: {}",
                p.pid.0, p.waiting_time, p.turnaround_time
            )?;
        }
        writeln!(f, "Average WT: {:.2}", s.stats.avg_waiting)?;
        writeln!(f, "Average TAT: {:.2}", s.stats.avg_turnaround)?;
        write!(
            f,
            "CPU utilization: {:.1}% (idle {} of {})",
            s.stats.utilization() * 100.0,
            s.stats.idle_time,
            s.stats.makespan
        )
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Producer(pid) => write!(f, "Process {}", pid.0),
            Unit::Consumer(id) => write!(f, "Consumer {id}"),
        }
    }
}

impl fmt::Display for BufferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BufferEvent::Arrived { pid, arrival_time } => {
                write!(f, "[Process {}] Arrived at time {arrival_time}", pid.0)
            }
            BufferEvent::WaitingToProduce { pid } => {
                write!(f, "[Producer {}] Waiting to produce...", pid.0)
            }
            BufferEvent::Produced { pid, item } => {
                write!(f, "[Producer {}] Produced item {item}", pid.0)
            }
            BufferEvent::Finished { pid, burst_time } => {
                write!(f, "[Process {}] Finished after burst {burst_time}", pid.0)
            }
            BufferEvent::WaitingToConsume { consumer } => {
                write!(f, "[Consumer {consumer}] Waiting to consume...")
            }
            BufferEvent::Consumed { consumer, item } => {
                write!(f, "[Consumer {consumer}] Consumed item {item}")
            }
            BufferEvent::Interrupted { unit } => write!(f, "[{unit}] Interrupted."),
            BufferEvent::Stranded { unit } => {
                write!(f, "[{unit}] Gave up: nobody left on the other side.")
            }
        }
    }
}

impl fmt::Display for SimulationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Produced: {:?}", self.produced)?;
        writeln!(f, "Consumed: {:?}", self.consumed)?;
        writeln!(f, "Left in buffer: {:?}", self.leftover)?;
        if !self.interrupted.is_empty() {
            writeln!(f, "Interrupted: {}", join_units(&self.interrupted))?;
        }
        if !self.stranded.is_empty() {
            writeln!(f, "Stranded: {}", join_units(&self.stranded))?;
        }
        if self.completed_normally() {
            write!(f, "All processes and consumer completed.")
        } else {
            write!(f, "Simulation ended early.")
        }
    }
}

fn join_units(units: &[Unit]) -> String {
    units
        .iter()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Compact event format: thread name, level, message, then `key=value`
/// fields.
///
/// ```text
/// [producer-2]  INFO buffer put item=2 len=1
/// ```
pub struct SimFormat;

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let thread = std::thread::current();
        write!(writer, "[{}] ", thread.name().unwrap_or("?"))?;

        let level = *event.metadata().level();
        if writer.has_ansi_escapes() {
            let color = match level {
                Level::ERROR => "\x1b[31m",
                Level::WARN => "\x1b[33m",
                Level::INFO => "\x1b[32m",
                Level::DEBUG => "\x1b[34m",
                Level::TRACE => "\x1b[35m",
            };
            write!(writer, "{color}{level:>5}\x1b[0m ")?;
        } else {
            write!(writer, "{level:>5} ")?;
        }

        let mut visitor = FieldCollector::default();
        event.record(&mut visitor);

        write!(writer, "{}", visitor.message)?;
        for (key, value) in &visitor.fields {
            write!(writer, " {key}={value}")?;
        }
        writeln!(writer)
    }
}

/// Collects the message and key-value fields of a tracing event.
#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: Vec<(&'static str, String)>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push((field.name(), format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push((field.name(), value.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::run_fcfs;
    use crate::process::ProcessRecord;
    use crate::types::Pid;

    #[test]
    fn test_schedule_report_layout() {
        let records = vec![
            ProcessRecord::new(Pid(1), 0, 5, 2),
            ProcessRecord::new(Pid(2), 1, 3, 1),
            ProcessRecord::new(Pid(3), 2, 8, 3),
        ];
        let schedule = run_fcfs(&records);
        let text = ScheduleReport(&schedule).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "FCFS Scheduling:");
        assert_eq!(lines[1], "Gantt Chart: | P1 | P2 | P3 |");
        assert_eq!(lines[2], "0\t5\t8\t16");
        assert!(text.contains("PID: 2 | WT: 4 | TAT: 7"));
        assert!(text.contains("Average WT: 3.33"));
        assert!(text.contains("Average TAT: 8.67"));
    }

    #[test]
    fn test_buffer_event_lines() {
        let ev = BufferEvent::Produced {
            pid: Pid(3),
            item: 3,
        };
        assert_eq!(ev.to_string(), "[Producer 3] Produced item 3");
        let ev = BufferEvent::Interrupted {
            unit: Unit::Consumer(1),
        };
        assert_eq!(ev.to_string(), "[Consumer 1] Interrupted.");
    }
}
