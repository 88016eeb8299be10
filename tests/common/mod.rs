#![allow(dead_code)]

use procsim::{Pid, ProcessRecord, SimFormat, TimeUnits};

/// Initialize tracing from `RUST_LOG`.
///
/// `try_init()` is idempotent: first call in the process succeeds,
/// subsequent calls are silently ignored.
pub fn setup_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .event_format(SimFormat)
        .try_init();
}

/// Shorthand record constructor: `(pid, arrival, burst, priority)`.
pub fn rec(pid: i32, arrival: TimeUnits, burst: TimeUnits, priority: i32) -> ProcessRecord {
    ProcessRecord::new(Pid(pid), arrival, burst, priority)
}

/// The three-process workload used by the worked examples.
pub fn sample_workload() -> Vec<ProcessRecord> {
    vec![rec(1, 0, 5, 2), rec(2, 1, 3, 1), rec(3, 2, 8, 3)]
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected:.2}, got {actual:.4}"
    );
}
