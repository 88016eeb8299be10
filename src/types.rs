//! Newtype wrappers and type aliases for domain concepts.
//!
//! Process identifiers get a newtype so they cannot be confused with
//! times or priorities. Plain quantities (logical time) use aliases.

use std::fmt;

use serde::Serialize;

/// Process identifier, as read from the process list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Pid(pub i32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// Simulated time in discrete logical units.
pub type TimeUnits = u64;

/// Scheduling priority. Lower values are served first.
pub type Priority = i32;
