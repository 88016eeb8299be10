//! procsim - Deterministic CPU scheduling and bounded-buffer simulation.
//!
//! Two independent simulations share the same process list:
//!
//! - **Scheduling**: FCFS and non-preemptive priority runs over logical
//!   time, producing a Gantt timeline and waiting/turnaround statistics.
//!   Pure and single-threaded; identical input gives identical output.
//! - **Producer/consumer**: each process becomes a producer thread that
//!   puts its pid into a shared bounded buffer after its arrival and burst
//!   delays, while one consumer takes a fixed number of items.
//!
//! # Architecture
//!
//! - **Engine**: FCFS and priority policies over cloned records
//! - **Ready**: priority-ordered ready set with deterministic tiebreak
//! - **Stats**: sums, averages and CPU accounting per run
//! - **Buffer**: semaphore-pair + mutex bounded FIFO with cancellation
//! - **Agents**: producer/consumer threads and the orchestrator
//! - **Loader / Report**: process-list parsing and text rendering
//!
//! # Usage
//!
//! ```rust
//! use procsim::*;
//!
//! let records = parse_processes("PID AT BT PRI\n1 0 5 2\n2 1 3 1\n3 2 8 3\n");
//! let schedule = run_fcfs(&records);
//! assert_eq!(schedule.time_markers(), vec![0, 5, 8, 16]);
//! println!("{}", ScheduleReport(&schedule));
//! ```

pub mod agents;
pub mod buffer;
pub mod engine;
pub mod loader;
pub mod process;
pub mod ready;
pub mod report;
pub mod schedule;
pub mod stats;
pub mod sync;
pub mod types;

// Re-export the main public types for convenience.
pub use agents::{
    BufferEvent, CancelHandle, ProducerConsumer, SimulationConfig, SimulationOutcome, Unit,
};
pub use buffer::{BoundedBuffer, DEFAULT_CAPACITY};
pub use engine::{run_fcfs, run_priority, Policy};
pub use loader::{load_processes, parse_processes};
pub use process::ProcessRecord;
pub use report::{ScheduleReport, SimFormat};
pub use schedule::{Schedule, Slice};
pub use stats::{ProcessStats, ScheduleStats};
pub use sync::{BufferError, Cancelled, Shutdown};
pub use types::{Pid, Priority, TimeUnits};
