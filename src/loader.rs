//! Process-list loader.
//!
//! Format: one header line, then one process per line as four
//! whitespace-separated integers `pid arrival burst priority`. Lines that do
//! not have exactly four integer fields are skipped. Arrival and burst must
//! fit in 32 bits, which keeps every derived time within `TimeUnits`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::process::ProcessRecord;
use crate::types::{Pid, Priority, TimeUnits};

/// Why a line was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LineError {
    FieldCount(usize),
    BadField(&'static str, String),
    ZeroBurst,
}

fn parse_field<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, LineError> {
    raw.parse()
        .map_err(|_| LineError::BadField(name, raw.to_string()))
}

fn parse_line(line: &str) -> Result<ProcessRecord, LineError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(LineError::FieldCount(fields.len()));
    }
    let pid: i32 = parse_field("pid", fields[0])?;
    let arrival: u32 = parse_field("arrival", fields[1])?;
    let burst: u32 = parse_field("burst", fields[2])?;
    let priority: Priority = parse_field("priority", fields[3])?;
    if burst == 0 {
        return Err(LineError::ZeroBurst);
    }
    Ok(ProcessRecord::new(
        Pid(pid),
        TimeUnits::from(arrival),
        TimeUnits::from(burst),
        priority,
    ))
}

/// Parse a process list. The first line is always treated as a header.
pub fn parse_processes(text: &str) -> Vec<ProcessRecord> {
    let mut records = Vec::new();
    let mut seen = HashSet::new();

    for (lineno, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(rec) => {
                if !seen.insert(rec.pid) {
                    warn!(line = lineno + 1, pid = rec.pid.0, "duplicate pid");
                }
                records.push(rec);
            }
            Err(LineError::ZeroBurst) => {
                warn!(line = lineno + 1, "skipping process with zero burst time");
            }
            Err(e) => {
                debug!(line = lineno + 1, err = ?e, "skipping malformed line");
            }
        }
    }
    records
}

/// Read and parse the process list at `path`.
///
/// An unreadable file is an error. A readable file with no valid lines
/// yields an empty list.
pub fn load_processes(path: impl AsRef<Path>) -> Result<Vec<ProcessRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read process list {}", path.display()))?;
    let records = parse_processes(&text);
    info!(path = %path.display(), count = records.len(), "loaded processes");
    Ok(records)
}
